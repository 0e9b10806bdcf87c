//! HTTP routes of the catalogue search service.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};
use common::search_context::SearchContext;
use common::search_result::{SearchResults, TotalRelation};
use serde_json::json;

use crate::api::search::SearchService;
use crate::error::{Result, SearchError};
use crate::render::{RenderFormat, json::render_record};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
}

pub fn router(service: Arc<SearchService>) -> Router {
    Router::new()
        .route("/opensearch/{format}", get(opensearch))
        .route("/resource/{format}", get(resource))
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(log_request))
        .with_state(AppState { service })
}

async fn log_request(request: Request, next: Next) -> Response {
    let t0 = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    tracing::info!("{} {} -> {} ({}ms)", method, uri, response.status(), t0.elapsed().as_millis());
    response
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Search and render one page of results as Atom or JSON.
async fn opensearch(
    State(state): State<AppState>,
    Path(format): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response> {
    let format = match RenderFormat::from_name(&format) {
        Some(format @ (RenderFormat::Atom | RenderFormat::Json)) => format,
        _ => return Err(SearchError::NotFound(format!("format {}", format))),
    };
    let context = SearchContext::from_pairs(pairs);
    let results = state.service.search_for_results(&context).await?;
    let body = format.render(state.service.settings(), results, &context);
    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}

/// A single record, by uid, as geo-metadata or as its stored JSON document.
async fn resource(
    State(state): State<AppState>,
    Path(format): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response> {
    let format = match RenderFormat::from_name(&format) {
        Some(format @ (RenderFormat::GeoMetadata | RenderFormat::Json)) => format,
        _ => return Err(SearchError::NotFound(format!("format {}", format))),
    };
    let uid = pairs
        .into_iter()
        .filter(|(key, value)| key == "uid" && !value.is_empty())
        .map(|(_, value)| value)
        .last()
        .ok_or_else(|| SearchError::client("Missing uid parameter"))?;

    let record = state.service.find_record(&uid).await?;
    let body = match format {
        RenderFormat::Json => render_record(&record),
        _ => {
            let context = SearchContext::for_uid(uid);
            let results = SearchResults { records: vec![record], total: 1, relation: TotalRelation::Exact };
            format.render(state.service.settings(), results, &context)
        }
    };
    Ok(([(header::CONTENT_TYPE, format.content_type())], body).into_response())
}

