//! Output formats for search results.
//!
//! Every format is produced in two steps: `digest` folds the engine results
//! and the request parameters into a [`RenderedResult`], `render` turns that
//! into the response body.

use chrono::Utc;
use common::search_context::SearchContext;
use common::search_result::{RenderedResult, SearchResults, TotalRelation};

use crate::config::Settings;

pub mod atom;
pub mod geo_metadata;
pub mod json;
pub mod links;
pub mod xml;

pub use atom::AtomRenderer;
pub use geo_metadata::GeoMetadataRenderer;
pub use json::JsonRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Atom,
    Json,
    GeoMetadata,
}

impl RenderFormat {
    /// Format named by the last path segment of a request.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "atom" => Some(RenderFormat::Atom),
            "json" => Some(RenderFormat::Json),
            "gml" => Some(RenderFormat::GeoMetadata),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            RenderFormat::Atom => "application/atom+xml; charset=utf-8",
            RenderFormat::Json => "application/json",
            RenderFormat::GeoMetadata => "application/gml+xml; charset=utf-8",
        }
    }

    pub fn renderer(self, settings: &Settings) -> Box<dyn ResultRenderer + '_> {
        match self {
            RenderFormat::Atom => Box::new(AtomRenderer::new(settings)),
            RenderFormat::Json => Box::new(JsonRenderer::new(settings)),
            RenderFormat::GeoMetadata => Box::new(GeoMetadataRenderer::new(settings)),
        }
    }

    /// Digest and render in one go.
    pub fn render(self, settings: &Settings, results: SearchResults, context: &SearchContext) -> String {
        let renderer = self.renderer(settings);
        let digested = renderer.digest(results, context);
        renderer.render(&digested)
    }
}

pub trait ResultRenderer {
    fn digest(&self, results: SearchResults, context: &SearchContext) -> RenderedResult;
    fn render(&self, result: &RenderedResult) -> String;
}

/// The paging fields and records shared by every format.
pub(crate) fn digest_page(title: String, results: SearchResults, context: &SearchContext) -> RenderedResult {
    let pagination = context.pagination();
    RenderedResult {
        title,
        subtitle: None,
        count: pagination.count,
        start_index: pagination.first_index(),
        start_page: pagination.start_page,
        total_results: results.total,
        relation: results.relation,
        records: results.records,
        query: context.clone(),
        generated_at: Utc::now(),
    }
}

pub(crate) fn feed_title(settings: &Settings) -> String {
    format!("Catalogue Search Feed for {}", settings.elasticsearch_index)
}

/// `Found N results.` followed by the displayed range and the parameters used.
pub fn subtitle(result: &RenderedResult) -> String {
    let shown = result.records.len();
    let mut subtitle = match result.relation {
        TotalRelation::Exact => format!("Found {} results.", result.total_results),
        TotalRelation::AtLeast => format!("Found at least {} results.", result.total_results),
    };
    if result.total_results > 0 {
        if result.start_index < 2 {
            let noun = if shown == 1 { "result" } else { "results" };
            subtitle.push_str(&format!(" Showing the first {} {}", shown, noun));
        } else {
            subtitle.push_str(&format!(
                " Showing from {} to {}",
                result.start_index,
                result.start_index.saturating_add(shown as i64 - 1)
            ));
        }
    }
    let params = result
        .query
        .iter()
        .map(|(param, value)| format!("{}={}", param.name(), value))
        .collect::<Vec<_>>()
        .join(",");
    subtitle.push_str(&format!(" <br/>Query Parameters used {} <br/>", params));
    subtitle
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::search_result::ResultRecord;
    use serde_json::json;

    fn results(n: usize, total: u64) -> SearchResults {
        SearchResults {
            records: (0..n).map(|i| ResultRecord::new(format!("r{}", i), json!({})).unwrap()).collect(),
            total,
            relation: TotalRelation::Exact,
        }
    }

    fn digested(n: usize, total: u64, pairs: &[(&str, &str)]) -> RenderedResult {
        let context = SearchContext::from_pairs(pairs.iter().copied());
        digest_page("t".to_string(), results(n, total), &context)
    }

    #[test]
    fn formats_by_name() {
        assert_eq!(RenderFormat::from_name("atom"), Some(RenderFormat::Atom));
        assert_eq!(RenderFormat::from_name("gml"), Some(RenderFormat::GeoMetadata));
        assert_eq!(RenderFormat::from_name("rss"), None);
    }

    #[test]
    fn empty_result_subtitle_lists_parameters() {
        let result = digested(0, 0, &[("platform", "Sentinel-1A")]);
        assert_eq!(
            subtitle(&result),
            "Found 0 results. <br/>Query Parameters used platform=Sentinel-1A,maximumRecords=10,startRecord=1 <br/>"
        );
    }

    #[test]
    fn first_page_subtitle() {
        let result = digested(1, 1, &[]);
        assert!(subtitle(&result).starts_with("Found 1 results. Showing the first 1 result <br/>"));

        let result = digested(10, 42, &[]);
        assert!(subtitle(&result).starts_with("Found 42 results. Showing the first 10 results <br/>"));
    }

    #[test]
    fn later_page_subtitle() {
        let result = digested(10, 42, &[("startPage", "2")]);
        assert_eq!(result.start_index, 11);
        assert!(subtitle(&result).starts_with("Found 42 results. Showing from 11 to 20 <br/>"));
    }

    #[test]
    fn lower_bound_totals_say_at_least() {
        let mut result = digested(10, 10000, &[]);
        result.relation = TotalRelation::AtLeast;
        assert!(subtitle(&result).starts_with("Found at least 10000 results."));
    }
}
