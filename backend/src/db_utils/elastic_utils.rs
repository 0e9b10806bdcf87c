use std::time::Instant;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::config::Settings;
use crate::error::{Result, SearchError};

/// Engine error type raised for geo-shapes it cannot index or query.
const INVALID_SHAPE_EXCEPTION: &str = "invalid_shape_exception";

#[derive(Debug, Serialize, Deserialize)]
pub struct RawSearchResult<T> {
    pub hits: RawSearchResultHits<T>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub took: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawSearchResultHits<T> {
    pub hits: Vec<RawSearchResultHit<T>>,
    pub total: RawSearchResultTotal,
}

/// Older engines report the total as a bare number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSearchResultTotal {
    Counted { value: u64, relation: String },
    Bare(u64),
}

impl RawSearchResultTotal {
    pub fn value(&self) -> u64 {
        match self {
            RawSearchResultTotal::Counted { value, .. } => *value,
            RawSearchResultTotal::Bare(value) => *value,
        }
    }

    pub fn relation(&self) -> &str {
        match self {
            RawSearchResultTotal::Counted { relation, .. } => relation,
            RawSearchResultTotal::Bare(_) => "eq",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RawSearchResultHit<T> {
    pub _id: String,
    pub _source: T,
}

/// HTTP client for one search-engine index. Built once at start-up and
/// shared by all requests.
#[derive(Debug, Clone)]
pub struct ElasticClient {
    client: reqwest::Client,
    search_url: String,
}

impl ElasticClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.elasticsearch_timeout)
            .timeout(settings.elasticsearch_timeout)
            .build()?;
        let search_url = format!("{}/{}/_search", settings.elasticsearch_url, settings.elasticsearch_index);
        Ok(Self { client, search_url })
    }

    pub async fn search<T: DeserializeOwned + std::fmt::Debug>(&self, body: &Value) -> Result<RawSearchResult<T>> {
        let t0 = Instant::now();
        tracing::debug!("SEARCH REQUEST: {}", body);

        let response = self
            .client
            .post(&self.search_url)
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;
        let status = response.status();
        let response_txt = response.text().await.map_err(classify_transport_error)?;
        if status.is_client_error() || status.is_server_error() {
            return Err(classify_engine_error(status.as_u16(), response_txt));
        }

        let dt_ms = t0.elapsed().as_millis();
        tracing::debug!("SEARCH RESPONSE: len = {} ({}ms)", response_txt.len(), dt_ms);
        let response: RawSearchResult<T> = serde_json::from_str(&response_txt)?;
        Ok(response)
    }
}

fn classify_transport_error(e: reqwest::Error) -> SearchError {
    if e.is_connect() || e.is_timeout() {
        tracing::error!("search engine unreachable: {}", e);
        SearchError::BackendUnavailable(e.to_string())
    } else {
        SearchError::Http(e)
    }
}

/// Shape errors are the client's fault and keep the engine's reason; any
/// other failure is passed on as is.
fn classify_engine_error(status: u16, body: String) -> SearchError {
    if body.contains(INVALID_SHAPE_EXCEPTION) {
        let reason = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|error| find_exception_reason(&error, INVALID_SHAPE_EXCEPTION));
        return SearchError::ClientQuery(reason.unwrap_or(body));
    }
    SearchError::Transport { status, body }
}

/// Depth first search of an engine error tree for the `reason` of the first
/// cause of the given type.
fn find_exception_reason(error: &Value, exception: &str) -> Option<String> {
    match error {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some(exception) {
                if let Some(reason) = map.get("reason").and_then(Value::as_str) {
                    return Some(reason.to_string());
                }
            }
            map.values().find_map(|v| find_exception_reason(v, exception))
        }
        Value::Array(items) => items.iter().find_map(|v| find_exception_reason(v, exception)),
        _ => None,
    }
}
