//! Earth observation metadata document (`eop:EarthObservation`) for a single
//! record.
//!
//! Sections are only emitted when the record carries the fields they need;
//! the geometry, acquisition and result sections each log what they skip.

use common::search_context::SearchContext;
use common::search_result::{
    CatalogueDocument, FileLocation, RenderedResult, ResultRecord, SearchResults, StoredGeometry, value_to_string,
};
use serde_json::Value;

use crate::config::Settings;
use crate::render::links::{AccessProtocol, file_path, urljoin_path};
use crate::render::xml::Element;
use crate::render::{ResultRenderer, digest_page, feed_title};

const NAMESPACES: [(&str, &str); 7] = [
    ("eop", "http://www.opengis.net/eop/2.0"),
    ("gml", "http://www.opengis.net/gml/3.2"),
    ("om", "http://www.opengis.net/om/2.0"),
    ("ows", "http://www.opengis.net/ows/2.0"),
    ("sar", "http://www.opengis.net/sar/2.1"),
    ("xlink", "http://www.w3.org/1999/xlink"),
    ("xsi", "http://www.w3.org/2001/XMLSchema-instance"),
];
const SCHEMA_LOCATION: &str = "http://www.opengis.net/eop/2.0 \
    https://svn.opengeospatial.org/ogc-projects/cite/scripts/wcseo/1.0/tags/r1/resources/omeo/eop.xsd";

const POLYGON_ID_OFFSET: u32 = 10000;

/// Identifier counters of one document. A fresh value is created for every
/// render call.
#[derive(Debug)]
pub struct RenderIds {
    next_id: u32,
    polygon_count: u32,
}

impl Default for RenderIds {
    fn default() -> Self {
        Self { next_id: 0, polygon_count: POLYGON_ID_OFFSET }
    }
}

impl RenderIds {
    /// `ID01N10001`, `ID02N10001`, ...
    pub fn next_id(&mut self) -> String {
        self.next_id += 1;
        if self.next_id < 10 {
            format!("ID0{}N10001", self.next_id)
        } else {
            format!("ID{}N10001", self.next_id)
        }
    }

    /// `POLN10001`, `POLN10002`, ...
    pub fn next_polygon_id(&mut self) -> String {
        self.polygon_count += 1;
        format!("POLN{}", self.polygon_count)
    }
}

pub struct GeoMetadataRenderer<'a> {
    settings: &'a Settings,
}

impl<'a> GeoMetadataRenderer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn render_record(&self, record: &ResultRecord) -> String {
        let mut ids = RenderIds::default();
        let document = &record.document;

        let mut root = Element::new("eop:EarthObservation");
        for (prefix, namespace) in NAMESPACES {
            root.set_attr(format!("xmlns:{}", prefix), namespace);
        }
        root.set_attr("xsi:schemaLocation", SCHEMA_LOCATION);
        root.set_attr("gml:id", ids.next_id());

        if let Some(phenomenon_time) = phenomenon_time(document, &mut ids) {
            root.push(phenomenon_time);
        }
        root.push(Element::new("om:resultTime"));
        root.push(procedure(document, &mut ids));
        root.push(Element::new("om:observedProperty").attr("nilReason", "inapplicable"));
        if let Some(feature) = feature_of_interest(document, &mut ids) {
            root.push(feature);
        }
        if let Some(file) = &document.file {
            if let Some(result) = self.observation_result(file, &mut ids) {
                root.push(result);
            }
            if let Some(metadata) = metadata_property(file) {
                root.push(metadata);
            }
        }
        root.to_document()
    }

    fn observation_result(&self, file: &FileLocation, ids: &mut RenderIds) -> Option<Element> {
        if file.is_offline() {
            tracing::debug!("data is on tape");
            return None;
        }
        let data_files = file.data_file_list();
        if data_files.is_empty() {
            tracing::debug!("file.data_file not found");
            return None;
        }

        let mut eo_result = Element::new("eop:EarthObservationResult").attr("gml:id", ids.next_id());
        for data_file in data_files {
            let path = file_path(file.directory.as_deref(), &data_file.name);
            for protocol in AccessProtocol::ALL {
                eo_result.push(self.product(protocol, &path, data_file.size.as_deref()));
            }
        }
        Some(Element::new("om:result").child(eo_result))
    }

    fn product(&self, protocol: AccessProtocol, path: &str, size: Option<&str>) -> Element {
        let server = match protocol {
            AccessProtocol::Ftp => &self.settings.ftp_server,
            AccessProtocol::Pydap => &self.settings.pydap_server,
        };
        let reference = Element::new("ows:ServiceReference")
            .attr("xlink:href", urljoin_path(server, path))
            .attr("xlink:title", protocol.title())
            .child(Element::new("ows:RequestMessage"));

        let mut information = Element::new("eop:ProductInformation").child(Element::new("eop:fileName").child(reference));
        if let Some(size) = size {
            information.push(Element::with_text("eop:size", size).attr("uom", "byte"));
        }
        Element::new("eop:product").child(information)
    }
}

fn phenomenon_time(document: &CatalogueDocument, ids: &mut RenderIds) -> Option<Element> {
    let temporal = document.temporal.as_ref()?;
    if temporal.start_time.is_none() && temporal.end_time.is_none() {
        return None;
    }
    let mut period = Element::new("gml:TimePeriod").attr("gml:id", ids.next_id());
    if let Some(start) = &temporal.start_time {
        period.push(Element::with_text("gml:beginPosition", start.as_str()));
    }
    if let Some(end) = &temporal.end_time {
        period.push(Element::with_text("gml:endPosition", end.as_str()));
    }
    Some(Element::new("om:phenomenonTime").child(period))
}

fn procedure(document: &CatalogueDocument, ids: &mut RenderIds) -> Element {
    let mut equipment = Element::new("eop:EarthObservationEquipment").attr("gml:id", ids.next_id());
    let misc = document.misc.clone().unwrap_or_default();
    let lookup = |section: &std::collections::BTreeMap<String, Value>, key: &str| {
        let value = section.get(key).map(value_to_string);
        if value.is_none() {
            tracing::debug!("{} not found", key);
        }
        value
    };

    if let Some(satellite) = lookup(&misc.platform, "Satellite") {
        equipment.push(
            Element::new("eop:platform")
                .child(Element::new("eop:Platform").child(Element::with_text("eop:shortName", satellite))),
        );
    }
    if let Some(instrument) = lookup(&misc.platform, "Instrument Abbreviation") {
        equipment.push(
            Element::new("eop:instrument")
                .child(Element::new("eop:Instrument").child(Element::with_text("eop:shortName", instrument))),
        );
    }

    let orbit_number = lookup(&misc.orbit_info, "Start Orbit Number");
    let last_orbit_number = lookup(&misc.orbit_info, "Stop Orbit Number");
    let orbit_direction = lookup(&misc.orbit_info, "Pass Direction");
    let polarisation = lookup(&misc.product_info, "Polarisation");
    if orbit_number.is_none() && polarisation.is_none() {
        return Element::new("om:procedure").child(equipment);
    }

    let mut parameters = Element::new("eop:acquisitionParameters");
    if let Some(orbit_number) = orbit_number {
        let mut acquisition = Element::new("eop:Acquisition").child(Element::with_text("eop:orbitNumber", orbit_number));
        if let Some(last) = last_orbit_number {
            acquisition.push(Element::with_text("eop:lastOrbitNumber", last));
        }
        if let Some(direction) = orbit_direction {
            acquisition.push(Element::with_text("eop:orbitDirection", direction));
        }
        parameters.push(acquisition);
    }
    if let Some(polarisation) = polarisation {
        parameters.push(
            Element::new("sar:Acquisition").child(Element::with_text("sar:polarisationChannels", polarisation)),
        );
    }
    equipment.push(parameters);
    Element::new("om:procedure").child(equipment)
}

fn feature_of_interest(document: &CatalogueDocument, ids: &mut RenderIds) -> Option<Element> {
    let geometries = document.spatial.as_ref()?.geometries.as_ref()?;
    let Some(geometry) = geometries.display.as_ref().or(geometries.search.as_ref()) else {
        tracing::debug!("spatial.geometries.display not found");
        return None;
    };

    let footprint_id = ids.next_id();
    let surface_id = ids.next_id();
    let mut members = Element::new("gml:surfaceMembers");
    for polygon in footprint_polygons(geometry, ids) {
        members.push(polygon);
    }

    let surface = Element::new("gml:MultiSurface").attr("gml:id", surface_id).child(members);
    let footprint = Element::new("eop:Footprint")
        .attr("gml:id", footprint_id)
        .child(Element::new("eop:multiExtentOf").child(surface));
    Some(Element::new("om:featureOfInterest").child(footprint))
}

/// Polygons of a stored footprint; the first ring of each polygon is its
/// exterior, later rings are holes.
fn footprint_polygons(geometry: &StoredGeometry, ids: &mut RenderIds) -> Vec<Element> {
    let polygons: Vec<&Value> = match geometry.kind.to_lowercase().as_str() {
        "polygon" => vec![&geometry.coordinates],
        "multipolygon" => geometry.coordinates.as_array().map(|p| p.iter().collect()).unwrap_or_default(),
        "" => {
            tracing::debug!("footprint has no geometry type");
            return vec![];
        }
        "linestring" => {
            tracing::debug!("LineString footprints are not rendered");
            return vec![];
        }
        other => {
            tracing::error!("geometry type {}, found in result, is not currently supported", other);
            return vec![];
        }
    };

    polygons
        .into_iter()
        .filter_map(|rings| rings.as_array())
        .filter(|rings| !rings.is_empty())
        .map(|rings| {
            let mut polygon = Element::new("gml:Polygon").attr("gml:id", ids.next_polygon_id());
            for (i, ring) in rings.iter().enumerate() {
                let boundary = if i == 0 { "gml:exterior" } else { "gml:interior" };
                polygon.push(
                    Element::new(boundary)
                        .child(Element::new("gml:LinearRing").child(Element::with_text("gml:posList", pos_list(ring)))),
                );
            }
            polygon
        })
        .collect()
}

/// `lon lat lon lat ...` of a ring of `[lon, lat]` positions.
fn pos_list(ring: &Value) -> String {
    ring.as_array()
        .map(|positions| {
            positions
                .iter()
                .filter_map(|position| match position.as_array().map(|p| p.as_slice()) {
                    Some([lon, lat, ..]) => Some(format!("{} {}", value_to_string(lon), value_to_string(lat))),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn metadata_property(file: &FileLocation) -> Option<Element> {
    let Some(file_name) = &file.filename else {
        tracing::debug!("file.filename not found");
        return None;
    };
    let metadata = Element::new("eop:EarthObservationMetaData")
        .child(Element::with_text("eop:identifier", file_name.as_str()))
        .child(Element::with_text("eop:acquisitionType", "NOMINAL"))
        .child(Element::with_text("eop:status", "ARCHIVED"));
    Some(Element::new("eop:metaDataProperty").child(metadata))
}

impl ResultRenderer for GeoMetadataRenderer<'_> {
    fn digest(&self, results: SearchResults, context: &SearchContext) -> RenderedResult {
        digest_page(feed_title(self.settings), results, context)
    }

    /// Only the first record is rendered.
    fn render(&self, result: &RenderedResult) -> String {
        match result.records.first() {
            Some(record) => self.render_record(record),
            None => {
                tracing::debug!("no record to render");
                let mut ids = RenderIds::default();
                Element::new("eop:EarthObservation")
                    .attr("xmlns:eop", NAMESPACES[0].1)
                    .attr("xmlns:gml", NAMESPACES[1].1)
                    .attr("gml:id", ids.next_id())
                    .to_document()
            }
        }
    }
}
