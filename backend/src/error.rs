//! Error taxonomy of the search backend and its HTTP mapping.

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    /// The request itself is wrong; the message is returned to the client.
    #[error("{0}")]
    ClientQuery(String),

    /// The search engine could not be reached.
    #[error("Search service unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The engine answered with an error this service does not classify.
    #[error("Search engine error {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SearchError {
    pub fn client(message: impl Into<String>) -> Self {
        SearchError::ClientQuery(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SearchError::ClientQuery(_) => StatusCode::BAD_REQUEST,
            SearchError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SearchError::NotFound(_) => StatusCode::NOT_FOUND,
            SearchError::Transport { .. } | SearchError::Http(_) | SearchError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            SearchError::ClientQuery(message) => {
                tracing::debug!("rejected query: {}", message);
                message.clone()
            }
            SearchError::BackendUnavailable(_) => {
                "Error while connecting to the search service".to_string()
            }
            SearchError::NotFound(_) => self.to_string(),
            _ => {
                tracing::error!("search request failed: {:#?}", self);
                self.to_string()
            }
        };
        (status, Body::from(message)).into_response()
    }
}
