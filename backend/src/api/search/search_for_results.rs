//! Search endpoint for result lists and single records.

use common::search_context::SearchContext;
use common::search_result::{CatalogueDocument, ResultRecord, SearchResults, TotalRelation};
use serde_json::Value;

use crate::api::search::query_builder::{ResultWindow, build_query_plan, build_search_body, result_window};
use crate::config::Settings;
use crate::db_utils::elastic_utils::ElasticClient;
use crate::error::{Result, SearchError};

/// Holds the settings and the engine client for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct SearchService {
    settings: Settings,
    client: ElasticClient,
}

impl SearchService {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = ElasticClient::new(&settings)?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the query described by `context` for its requested page.
    /// Validation errors are returned before the engine is contacted.
    pub async fn search_for_results(&self, context: &SearchContext) -> Result<SearchResults> {
        let plan = build_query_plan(context)?;
        let window = result_window(&context.pagination())?;
        self.execute(&build_search_body(&plan, window)).await
    }

    /// Look up one record by its uid.
    pub async fn find_record(&self, uid: &str) -> Result<ResultRecord> {
        let context = SearchContext::for_uid(uid);
        let plan = build_query_plan(&context)?;
        let body = build_search_body(&plan, ResultWindow { from: 0, size: 1 });
        let results = self.execute(&body).await?;
        results
            .records
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::NotFound(uid.to_string()))
    }

    async fn execute(&self, body: &Value) -> Result<SearchResults> {
        let response = self.client.search::<Value>(body).await?;
        let records = response
            .hits
            .hits
            .into_iter()
            .map(|hit| match ResultRecord::new(hit._id.clone(), hit._source.clone()) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("record {} has an unreadable source, rendering it without metadata: {}", hit._id, e);
                    ResultRecord { id: hit._id, document: CatalogueDocument::default(), source: hit._source }
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "search returned {} of {} ({}) in {}ms",
            records.len(),
            response.hits.total.value(),
            response.hits.total.relation(),
            response.took
        );
        Ok(SearchResults {
            records,
            total: response.hits.total.value(),
            relation: TotalRelation::from_engine(response.hits.total.relation()),
        })
    }
}
