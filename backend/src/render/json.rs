//! Plain JSON projection of a result page.

use common::search_context::SearchContext;
use common::search_result::{RenderedResult, ResultRecord, SearchResults, TotalRelation};
use serde::Serialize;

use crate::config::Settings;
use crate::render::{ResultRenderer, digest_page, feed_title};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonFeed<'a> {
    title: &'a str,
    total_results: u64,
    relation: TotalRelation,
    count: i64,
    start_index: i64,
    start_page: i64,
    rows: Vec<&'a serde_json::Value>,
}

pub struct JsonRenderer<'a> {
    settings: &'a Settings,
}

impl<'a> JsonRenderer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }
}

impl ResultRenderer for JsonRenderer<'_> {
    fn digest(&self, results: SearchResults, context: &SearchContext) -> RenderedResult {
        digest_page(feed_title(self.settings), results, context)
    }

    fn render(&self, result: &RenderedResult) -> String {
        let feed = JsonFeed {
            title: &result.title,
            total_results: result.total_results,
            relation: result.relation,
            count: result.count,
            start_index: result.start_index,
            start_page: result.start_page,
            rows: result.records.iter().map(|record| &record.source).collect(),
        };
        serde_json::to_string(&feed).unwrap_or_else(|e| {
            tracing::error!("failed to serialize json feed: {}", e);
            "{}".to_string()
        })
    }
}

/// One stored record, pretty-printed.
pub fn render_record(record: &ResultRecord) -> String {
    serde_json::to_string_pretty(&record.source).unwrap_or_else(|e| {
        tracing::error!("failed to serialize record {}: {}", record.id, e);
        "{}".to_string()
    })
}
