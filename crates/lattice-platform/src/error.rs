use lattice_core::ValidationError;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Request failed. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{detail} (HTTP {status})")]
    Status { status: StatusCode, detail: String },
    #[error("unexpected response body from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("only application/pdf uploads are accepted, got {content_type}")]
    UnsupportedFileType { content_type: String },
    #[error("invalid request: {0}")]
    Invalid(#[from] ValidationError),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Message fit for an inline error banner: the server's detail when it
    /// sent one, a generic sentence otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { detail, .. } => detail.clone(),
            Self::UnsupportedFileType { .. } | Self::Invalid(_) => self.to_string(),
            Self::Transport(_) | Self::Decode { .. } => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Pulls `detail` out of an error body. Validation failures carry a list
/// of `{loc, msg}` objects; their messages are joined.
pub(crate) fn extract_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let msg = item.get("msg")?.as_str()?;
                    let field = item
                        .get("loc")
                        .and_then(Value::as_array)
                        .and_then(|loc| loc.last())
                        .and_then(Value::as_str);
                    Some(match field {
                        Some(field) => format!("{field}: {msg}"),
                        None => msg.to_string(),
                    })
                })
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
