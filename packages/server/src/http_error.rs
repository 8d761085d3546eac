//! HTTP error handling
//!
//! Provides consistent JSON error bodies (`{message, code, details?}`) and
//! maps service errors onto status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use mindmap_core::services::NodeServiceError;
use serde::{Deserialize, Serialize};

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(message, "INVALID_INPUT")
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NODE_NOT_FOUND" => StatusCode::NOT_FOUND,
            "INVALID_INPUT" => StatusCode::BAD_REQUEST,
            "STORE_TIMEOUT" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<NodeServiceError> for HttpError {
    fn from(err: NodeServiceError) -> Self {
        if err.is_timeout() {
            return HttpError::with_details(
                "Storage did not respond in time",
                "STORE_TIMEOUT",
                err.to_string(),
            );
        }

        match err {
            NodeServiceError::NodeNotFound { id } => {
                HttpError::new(format!("Node not found: {}", id), "NODE_NOT_FOUND")
            }
            NodeServiceError::ValidationFailed(e) => HttpError::invalid_input(e.to_string()),
            NodeServiceError::InvalidInput(message) => HttpError::invalid_input(message),
            NodeServiceError::StoreUnavailable(e) => {
                tracing::error!("Canonical store error: {}", e);
                HttpError::with_details("Storage unavailable", "STORE_UNAVAILABLE", e.to_string())
            }
            NodeServiceError::SearchFailed(e) => {
                tracing::warn!("Search failed: {}", e);
                HttpError::with_details("Search unavailable", "SEARCH_UNAVAILABLE", e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindmap_core::db::DatabaseError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            HttpError::from(NodeServiceError::node_not_found(3)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HttpError::from(NodeServiceError::invalid_input("bad")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(NodeServiceError::StoreUnavailable(DatabaseError::sql_execution(
                "boom"
            )))
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            HttpError::from(NodeServiceError::StoreUnavailable(DatabaseError::timeout(
                "update_node",
                5000
            )))
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
