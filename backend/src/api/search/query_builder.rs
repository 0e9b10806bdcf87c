//! Translation of a search context into a boolean search-engine query.

use common::{
    pagination::Pagination,
    search_const::MAX_RESULT_WINDOW,
    search_context::{SearchContext, SearchParam},
    search_result::{STORAGE_OFFLINE, STORAGE_ONLINE},
};
use serde_json::{Map, Value, json};

use crate::api::search::dates::{DateBound, end_bound, start_bound};
use crate::api::search::geometry::{Shape, parse_bbox, parse_polygon};
use crate::error::{Result, SearchError};

pub const GEOMETRY_FIELD: &str = "spatial.geometries.search";
pub const CLOUD_COVER_FIELD: &str = "misc.quality_info.Cloud Coverage Assessment";
pub const START_TIME_FIELD: &str = "temporal.start_time";
pub const END_TIME_FIELD: &str = "temporal.end_time";
/// Results are always newest coverage first.
pub const SORT_FIELD: &str = END_TIME_FIELD;

/// Where a parameter is looked up in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMapping {
    Single(&'static str),
    /// The value may match any of several fields.
    AnyOf(&'static [&'static str]),
}

/// Index fields of the exact-match parameters. Spatial, temporal, cloud cover
/// and paging parameters are handled separately.
pub fn field_mapping(param: SearchParam) -> Option<FieldMapping> {
    use FieldMapping::*;
    let mapping = match param {
        SearchParam::Uid => Single("misc.product_info.Name"),
        SearchParam::DataFormat => Single("data_format.format"),
        SearchParam::DataOnline => Single("file.location"),
        SearchParam::Instrument => Single("misc.platform.Instrument Abbreviation"),
        SearchParam::Mission => Single("misc.platform.Mission"),
        SearchParam::Name => Single("misc.product_info.Name"),
        SearchParam::Platform => Single("misc.platform.Satellite"),
        SearchParam::PolarisationChannels => Single("misc.product_info.Polarisation"),
        SearchParam::ProductType => Single("misc.product_info.Product Type"),
        SearchParam::OrbitDirection => Single("misc.orbit_info.Pass Direction"),
        SearchParam::OrbitNumber => Single("misc.orbit_info.Start Orbit Number"),
        SearchParam::RelativeOrbitNumber => Single("misc.orbit_info.Start Relative Orbit Number"),
        SearchParam::Resolution => Single("misc.product_info.Resolution"),
        SearchParam::SensorMode => AnyOf(&["misc.product_info.Datatake Type", "misc.platform.Instrument Mode"]),
        _ => return None,
    };
    Some(mapping)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    MatchPhrase { field: &'static str, value: String },
    Range { field: &'static str, bounds: Vec<(&'static str, Value)> },
    GeoShape { field: &'static str, shape: Shape },
}

impl Clause {
    pub fn to_json(&self) -> Value {
        match self {
            Clause::MatchPhrase { field, value } => json!({"match_phrase": {*field: value}}),
            Clause::Range { field, bounds } => {
                let bounds = bounds
                    .iter()
                    .map(|(op, value)| (op.to_string(), value.clone()))
                    .collect::<Map<String, Value>>();
                json!({"range": {*field: bounds}})
            }
            Clause::GeoShape { field, shape } => json!({"geo_shape": {*field: {"shape": shape.to_json()}}}),
        }
    }
}

/// The compound query for one request. Absent parameters contribute nothing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPlan {
    pub must: Vec<Clause>,
    /// One disjunction per multi-field parameter; at least one clause of
    /// every group has to match.
    pub should: Vec<Vec<Clause>>,
    pub filter: Vec<Clause>,
}

impl QueryPlan {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.filter.is_empty()
    }

    /// The `bool` query object. A single should-group is sent as the query's
    /// own `should` list; several groups are each nested in `must` so that
    /// every group has to match.
    pub fn to_json(&self) -> Value {
        let mut must = self.must.iter().map(Clause::to_json).collect::<Vec<_>>();
        let mut bool_query = Map::new();

        match self.should.as_slice() {
            [] => {}
            [group] => {
                bool_query.insert("should".to_string(), group.iter().map(Clause::to_json).collect());
                bool_query.insert("minimum_should_match".to_string(), json!(1));
            }
            groups => {
                for group in groups {
                    must.push(json!({"bool": {
                        "should": group.iter().map(Clause::to_json).collect::<Vec<_>>(),
                        "minimum_should_match": 1,
                    }}));
                }
            }
        }
        if !must.is_empty() {
            bool_query.insert("must".to_string(), Value::Array(must));
        }
        if !self.filter.is_empty() {
            bool_query.insert("filter".to_string(), self.filter.iter().map(Clause::to_json).collect());
        }
        json!({"bool": bool_query})
    }
}

/// Absolute hit range `[from, from + size)` requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultWindow {
    pub from: u64,
    pub size: u64,
}

pub fn build_query_plan(context: &SearchContext) -> Result<QueryPlan> {
    let mut plan = QueryPlan::default();

    for (param, value) in context.iter() {
        match field_mapping(param) {
            Some(FieldMapping::Single(field)) => {
                let value = match param {
                    SearchParam::DataOnline => storage_location(value),
                    _ => value.to_string(),
                };
                plan.must.push(Clause::MatchPhrase { field, value });
            }
            Some(FieldMapping::AnyOf(fields)) => {
                let group = fields
                    .iter()
                    .copied()
                    .map(|field| Clause::MatchPhrase { field, value: value.to_string() })
                    .collect();
                plan.should.push(group);
            }
            None => {}
        }
    }

    if let Some(shape) = context.get(SearchParam::Bbox).and_then(parse_bbox) {
        plan.filter.push(Clause::GeoShape { field: GEOMETRY_FIELD, shape });
    }
    if let Some(geometry) = context.get(SearchParam::Geometry) {
        let shape = parse_polygon(geometry)?;
        plan.filter.push(Clause::GeoShape { field: GEOMETRY_FIELD, shape });
    }
    plan.filter.extend(temporal_clauses(context)?);
    plan.filter.extend(cloud_cover_clause(context)?);

    Ok(plan)
}

/// `true`/`false` select the storage state; anything else is matched as given.
fn storage_location(value: &str) -> String {
    if value.eq_ignore_ascii_case("true") {
        STORAGE_ONLINE.to_string()
    } else if value.eq_ignore_ascii_case("false") {
        STORAGE_OFFLINE.to_string()
    } else {
        value.to_string()
    }
}

fn range_clause(field: &'static str, bound: DateBound) -> Clause {
    Clause::Range {
        field,
        bounds: vec![(bound.operator(), Value::String(bound.value().to_string()))],
    }
}

fn temporal_clauses(context: &SearchContext) -> Result<Vec<Clause>> {
    let mut clauses = Vec::new();
    if let Some(start_date) = context.get(SearchParam::StartDate) {
        clauses.push(range_clause(END_TIME_FIELD, start_bound(start_date)?));
    }
    if let Some(end_date) = context.get(SearchParam::EndDate) {
        clauses.push(range_clause(START_TIME_FIELD, end_bound(end_date)?));
    }
    Ok(clauses)
}

fn cloud_cover_clause(context: &SearchContext) -> Result<Option<Clause>> {
    let parse = |param: SearchParam| -> Result<Option<f64>> {
        context
            .get(param)
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| SearchError::client(format!("Invalid {}, it must be a number", param.name())))
            })
            .transpose()
    };
    let mut bounds = Vec::new();
    if let Some(min) = parse(SearchParam::MinCloudCoverPercentage)? {
        bounds.push(("gte", json!(min)));
    }
    if let Some(max) = parse(SearchParam::MaxCloudCoverPercentage)? {
        bounds.push(("lte", json!(max)));
    }
    if bounds.is_empty() {
        return Ok(None);
    }
    Ok(Some(Clause::Range { field: CLOUD_COVER_FIELD, bounds }))
}

/// The hit range for the requested page. Fails when the page reaches past
/// the engine's result window.
pub fn result_window(pagination: &Pagination) -> Result<ResultWindow> {
    let offset = pagination.offset();
    let first = offset.max(0);
    let last = offset.saturating_add(pagination.count).max(0);

    if first.max(last) > MAX_RESULT_WINDOW {
        return Err(SearchError::client(
            "This server is currently only able to page through the first 10,000 results. \
             You could try additional constraints on the query.",
        ));
    }
    Ok(ResultWindow {
        from: first as u64,
        size: (last - first).max(0) as u64,
    })
}

/// Complete request body: query, recency sort, window and explain flag.
pub fn build_search_body(plan: &QueryPlan, window: ResultWindow) -> Value {
    json!({
        "query": plan.to_json(),
        "sort": [{SORT_FIELD: {"order": "desc"}}],
        "from": window.from,
        "size": window.size,
        "explain": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> SearchContext {
        SearchContext::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn default_context_has_no_clauses() {
        let plan = build_query_plan(&context(&[])).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.to_json(), json!({"bool": {}}));
    }

    #[test]
    fn single_field_parameters_are_phrase_matches() {
        let plan = build_query_plan(&context(&[("platform", "Sentinel-1A"), ("orbitDirection", "ASCENDING")])).unwrap();
        assert_eq!(
            plan.to_json(),
            json!({"bool": {"must": [
                {"match_phrase": {"misc.platform.Satellite": "Sentinel-1A"}},
                {"match_phrase": {"misc.orbit_info.Pass Direction": "ASCENDING"}},
            ]}})
        );
    }

    #[test]
    fn data_online_maps_to_storage_state() {
        for value in ["true", "TRUE", "True"] {
            let plan = build_query_plan(&context(&[("dataOnline", value)])).unwrap();
            assert_eq!(plan.must, vec![Clause::MatchPhrase { field: "file.location", value: "on_disk".to_string() }]);
        }
        let plan = build_query_plan(&context(&[("dataOnline", "false")])).unwrap();
        assert_eq!(plan.must, vec![Clause::MatchPhrase { field: "file.location", value: "on_tape".to_string() }]);

        let plan = build_query_plan(&context(&[("dataOnline", "maybe")])).unwrap();
        assert_eq!(plan.must, vec![Clause::MatchPhrase { field: "file.location", value: "maybe".to_string() }]);
    }

    #[test]
    fn sensor_mode_is_a_single_should_group() {
        let plan = build_query_plan(&context(&[("sensorMode", "EW")])).unwrap();
        assert!(plan.must.is_empty());
        assert_eq!(
            plan.to_json(),
            json!({"bool": {
                "should": [
                    {"match_phrase": {"misc.product_info.Datatake Type": "EW"}},
                    {"match_phrase": {"misc.platform.Instrument Mode": "EW"}},
                ],
                "minimum_should_match": 1,
            }})
        );
    }

    #[test]
    fn several_should_groups_are_all_required() {
        let group = |value: &str| {
            vec![
                Clause::MatchPhrase { field: "a", value: value.to_string() },
                Clause::MatchPhrase { field: "b", value: value.to_string() },
            ]
        };
        let plan = QueryPlan { should: vec![group("x"), group("y")], ..Default::default() };
        let query = plan.to_json();
        assert!(query["bool"].get("should").is_none());
        let must = query["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(must[1]["bool"]["minimum_should_match"], json!(1));
        assert_eq!(must[1]["bool"]["should"][0], json!({"match_phrase": {"a": "y"}}));
    }

    #[test]
    fn spatial_filters() {
        let plan = build_query_plan(&context(&[
            ("bbox", "1,1,90,-90"),
            ("geometry", "POLYGON((30 10,40 40,20 40,10 20,30 10))"),
        ]))
        .unwrap();
        assert_eq!(plan.filter.len(), 2);
        assert_eq!(
            plan.filter[0].to_json(),
            json!({"geo_shape": {"spatial.geometries.search": {"shape": {
                "type": "envelope", "coordinates": [[1.0, 1.0], [90.0, -90.0]]
            }}}})
        );
        assert_eq!(plan.filter[1].to_json()["geo_shape"][GEOMETRY_FIELD]["shape"]["type"], json!("polygon"));
    }

    #[test]
    fn bad_bbox_is_dropped_but_bad_polygon_fails() {
        let plan = build_query_plan(&context(&[("bbox", "1,1,90")])).unwrap();
        assert!(plan.filter.is_empty());

        let err = build_query_plan(&context(&[("geometry", "CIRCLE(1 1, 5)")])).unwrap_err();
        assert!(matches!(err, SearchError::ClientQuery(_)));
    }

    #[test]
    fn temporal_filters() {
        let plan = build_query_plan(&context(&[("startDate", "2016-08-01"), ("endDate", "2016-08-20")])).unwrap();
        assert_eq!(
            plan.filter.iter().map(Clause::to_json).collect::<Vec<_>>(),
            vec![
                json!({"range": {"temporal.end_time": {"gte": "2016-08-01"}}}),
                json!({"range": {"temporal.start_time": {"lt": "2016-08-21"}}}),
            ]
        );

        let plan = build_query_plan(&context(&[("endDate", "2016-08-20T00:00:00.000Z")])).unwrap();
        assert_eq!(
            plan.filter[0].to_json(),
            json!({"range": {"temporal.start_time": {"lte": "2016-08-20T00:00:00.000Z"}}})
        );

        let err = build_query_plan(&context(&[("endDate", "20/08/2016")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid date format");
    }

    #[test]
    fn cloud_cover_bounds() {
        let plan = build_query_plan(&context(&[("minCloudCoverPercentage", "10"), ("maxCloudCoverPercentage", "20")])).unwrap();
        assert_eq!(
            plan.filter[0].to_json(),
            json!({"range": {CLOUD_COVER_FIELD: {"gte": 10.0, "lte": 20.0}}})
        );

        let plan = build_query_plan(&context(&[("maxCloudCoverPercentage", "40")])).unwrap();
        assert_eq!(plan.filter[0].to_json(), json!({"range": {CLOUD_COVER_FIELD: {"lte": 40.0}}}));

        assert!(build_query_plan(&context(&[("minCloudCoverPercentage", "cloudy")])).is_err());
        for value in ["NaN", "inf", "-infinity"] {
            let err = build_query_plan(&context(&[("maxCloudCoverPercentage", value)])).unwrap_err();
            assert_eq!(err.to_string(), "Invalid maxCloudCoverPercentage, it must be a number");
        }
    }

    #[test]
    fn windows_follow_the_requested_page() {
        let paging = context(&[("maximumRecords", "20"), ("startPage", "3")]).pagination();
        assert_eq!(result_window(&paging).unwrap(), ResultWindow { from: 40, size: 20 });

        let paging = context(&[("startRecord", "5")]).pagination();
        assert_eq!(result_window(&paging).unwrap(), ResultWindow { from: 4, size: 10 });
    }

    #[test]
    fn negative_bounds_are_clamped() {
        let paging = Pagination { count: 10, start_index: Some(-20), start_page: 1 };
        assert_eq!(result_window(&paging).unwrap(), ResultWindow { from: 0, size: 0 });
    }

    #[test]
    fn deep_pages_are_rejected() {
        let paging = context(&[("maximumRecords", "50"), ("startRecord", "9951")]).pagination();
        assert_eq!(result_window(&paging).unwrap(), ResultWindow { from: 9950, size: 50 });

        let paging = context(&[("maximumRecords", "50"), ("startRecord", "9952")]).pagination();
        assert!(matches!(result_window(&paging), Err(SearchError::ClientQuery(_))));

        let paging = context(&[("startPage", "1002")]).pagination();
        assert!(result_window(&paging).is_err());
    }

    #[test]
    fn extreme_paging_values_never_overflow() {
        for pairs in [
            [("startPage", "9223372036854775807"), ("maximumRecords", "10")],
            [("startRecord", "9223372036854775807"), ("maximumRecords", "10")],
            [("startRecord", "9223372036854775807"), ("maximumRecords", "-9223372036854775808")],
        ] {
            let paging = context(&pairs).pagination();
            assert!(matches!(result_window(&paging), Err(SearchError::ClientQuery(_))), "{:?}", pairs);
        }

        for pairs in [[("startRecord", "-9223372036854775808")], [("startPage", "-9223372036854775808")]] {
            let paging = context(&pairs).pagination();
            assert_eq!(result_window(&paging).unwrap(), ResultWindow { from: 0, size: 0 });
        }
    }

    #[test]
    fn search_body_sorts_newest_first_and_explains() {
        let body = build_search_body(&QueryPlan::default(), ResultWindow { from: 0, size: 10 });
        assert_eq!(body["sort"], json!([{"temporal.end_time": {"order": "desc"}}]));
        assert_eq!(body["explain"], json!(true));
        assert_eq!(body["from"], json!(0));
        assert_eq!(body["size"], json!(10));
    }
}
