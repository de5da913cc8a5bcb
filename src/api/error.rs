use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const NETWORK_FALLBACK: &str =
    "Could not reach the server. Check your connection and try again.";
pub const DECODE_FALLBACK: &str = "The server sent a response we could not understand.";

/// Failures surfaced by [`super::ApiClient`].
///
/// Every variant renders to a user-facing toast through [`ApiError::toast_message`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 422 with field-level messages.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },
    /// Any other non-success status (authorization, not found, conflict, server error).
    #[error("request rejected with {status}: {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("could not read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid base URL {0}")]
    BaseUrl(String),
    #[error("request cancelled")]
    Cancelled,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, Value>>,
}

/// Field errors arrive either as `["msg", ...]` or as a bare string.
fn field_messages(value: Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn status_fallback(status: StatusCode) -> String {
    match status {
        StatusCode::UNAUTHORIZED => "Your session has expired. Please sign in again.".into(),
        StatusCode::FORBIDDEN => "You are not allowed to perform this action.".into(),
        StatusCode::NOT_FOUND => "The requested record could not be found.".into(),
        StatusCode::CONFLICT => {
            "This record was changed by someone else. Refresh and try again.".into()
        }
        StatusCode::UNPROCESSABLE_ENTITY => "Some fields are invalid.".into(),
        s if s.is_server_error() => {
            "The server encountered an error. Please try again later.".into()
        }
        s => format!("Request failed ({s})."),
    }
}

impl ApiError {
    /// Build an error from a non-success response.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
        let message = parsed
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let errors = parsed
                .errors
                .unwrap_or_default()
                .into_iter()
                .map(|(field, v)| (field, field_messages(v)))
                .filter(|(_, msgs)| !msgs.is_empty())
                .collect();
            return ApiError::Validation {
                message: message.unwrap_or_else(|| status_fallback(status)),
                errors,
            };
        }

        ApiError::Rejected {
            status,
            message: message.unwrap_or_else(|| status_fallback(status)),
        }
    }

    /// Text shown to the user. Server messages are passed through verbatim.
    pub fn toast_message(&self) -> String {
        match self {
            ApiError::Validation { message, errors } => {
                let fields: Vec<&str> = errors.values().flatten().map(String::as_str).collect();
                if fields.is_empty() {
                    message.clone()
                } else {
                    fields.join("\n")
                }
            }
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Network(_) | ApiError::Cancelled => NETWORK_FALLBACK.to_string(),
            ApiError::Decode(_) => DECODE_FALLBACK.to_string(),
            ApiError::File { path, .. } => format!("Could not read file {}.", path.display()),
            ApiError::BaseUrl(url) => format!("Invalid server address: {url}"),
        }
    }
}

/// Shared sink for failures caught at a call site.
pub fn log_error(context: &str, err: &ApiError) {
    match err {
        ApiError::Validation { errors, .. } => {
            tracing::warn!(context, fields = ?errors.keys().collect::<Vec<_>>(), "{err}")
        }
        ApiError::Cancelled => tracing::debug!(context, "{err}"),
        _ => tracing::error!(context, error = %err, "request failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(v: Value) -> Vec<u8> {
        serde_json::to_vec(&v).unwrap()
    }

    #[test]
    fn validation_errors_are_aggregated() {
        let err = ApiError::from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &body(json!({
                "message": "The given data was invalid.",
                "errors": {
                    "proposal_title": ["The proposal title field is required."],
                    "motivation": "The motivation must be at least 50 characters."
                }
            })),
        );
        assert!(matches!(err, ApiError::Validation { .. }));
        assert_eq!(
            err.toast_message(),
            "The motivation must be at least 50 characters.\nThe proposal title field is required."
        );
    }

    #[test]
    fn validation_without_fields_uses_message() {
        let err = ApiError::from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &body(json!({ "message": "You already have a pending request." })),
        );
        assert_eq!(err.toast_message(), "You already have a pending request.");
    }

    #[test]
    fn server_message_passes_through_verbatim() {
        let err = ApiError::from_response(
            StatusCode::FORBIDDEN,
            &body(json!({ "message": "Only the main supervisor may invite co-supervisors." })),
        );
        assert_eq!(err.toast_message(), "Only the main supervisor may invite co-supervisors.");
    }

    #[test]
    fn empty_or_html_body_falls_back_per_status() {
        let err = ApiError::from_response(StatusCode::NOT_FOUND, b"<html>Not Found</html>");
        assert_eq!(err.toast_message(), "The requested record could not be found.");
        let err = ApiError::from_response(StatusCode::BAD_GATEWAY, b"");
        assert_eq!(
            err.toast_message(),
            "The server encountered an error. Please try again later."
        );
        let err = ApiError::from_response(StatusCode::IM_A_TEAPOT, br#"{"message":"  "}"#);
        assert_eq!(err.toast_message(), "Request failed (418 I'm a teapot).");
    }
}
