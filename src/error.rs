use rmcp::model::{ErrorCode, ErrorData};
use serde_json::json;
use std::borrow::Cow;

/// Result type for remote client and configuration operations
pub type NextcloudResult<T> = Result<T, NextcloudError>;

/// Failures raised by the Nextcloud client, its configuration, or the lifecycle around it
#[derive(Debug, thiserror::Error)]
pub enum NextcloudError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to load configuration: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("precondition failed for {url}: the resource was modified (etag mismatch)")]
    Conflict { url: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("the Nextcloud client has been closed")]
    Closed,

    #[error("the server is shutting down")]
    ShutDown,
}

impl NextcloudError {
    /// HTTP status reported by the server, when the failure carries one
    pub fn status(&self) -> Option<u16> {
        match self {
            NextcloudError::Status { status, .. } => Some(*status),
            NextcloudError::Conflict { .. } => Some(412),
            NextcloudError::NotFound(_) => Some(404),
            NextcloudError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<NextcloudError> for ErrorData {
    fn from(err: NextcloudError) -> Self {
        match &err {
            NextcloudError::InvalidArgument(_) => invalid_params(err.to_string()),
            NextcloudError::Conflict { .. } => ErrorData {
                data: Some(json!({ "kind": "conflict", "status": 412 })),
                ..internal_error(err.to_string())
            },
            _ => ErrorData {
                data: err.status().map(|status| json!({ "status": status })),
                ..internal_error(err.to_string())
            },
        }
    }
}

/// Creates a JSON-RPC error with a custom error code and message
pub fn json_error(code: i32, msg: impl Into<String>) -> ErrorData {
    ErrorData {
        code: ErrorCode(code),
        message: Cow::from(msg.into()),
        data: None,
    }
}

/// Creates a JSON-RPC internal error (-32603)
/// Use for remote failures, unexpected responses, closed clients, etc.
pub fn internal_error(msg: impl Into<String>) -> ErrorData {
    json_error(-32603, msg)
}

/// Creates a JSON-RPC invalid params error (-32602)
/// Use for payloads that fail validation before reaching the server
pub fn invalid_params(msg: impl Into<String>) -> ErrorData {
    json_error(-32602, msg)
}

/// Creates a JSON-RPC resource-not-found error (-32002)
pub fn resource_not_found(msg: impl Into<String>) -> ErrorData {
    json_error(-32002, msg)
}
