//! Error types for the PetConnect client.
//!
//! # Design
//! `NotFound`, `Unauthorized` and `ValidationRejected` get dedicated variants
//! because call sites branch on them. Every other non-2xx response lands in
//! `Http` with the raw status and body for debugging. `SessionExpired` is
//! returned once the session has been torn down by the refresh protocol.

use thiserror::Error;

use crate::http::HttpResponse;

pub const MSG_INVALID_CREDENTIALS: &str =
    "Invalid username or password. Check your credentials or sign up first.";
pub const MSG_INVALID_REQUEST: &str = "Invalid request. Check the submitted data.";
pub const MSG_CONNECTION: &str = "Could not reach the server. Please try again.";
pub const MSG_SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

/// Errors returned by the client, the data sources and the facades.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested pet or tutor does not exist.
    #[error("resource not found")]
    NotFound,

    /// The backend answered 401 and the refresh protocol could not recover.
    #[error("unauthorized{}", suffix(.message))]
    Unauthorized { message: Option<String> },

    /// The backend rejected the request with a 4xx and an explanatory message.
    #[error("request rejected (HTTP {status}): {message}")]
    ValidationRejected { status: u16, message: String },

    /// Any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced an HTTP response.
    #[error("network failure: {0}")]
    Network(String),

    /// The token refresh failed or no refresh token was stored; the session
    /// has been cleared.
    #[error("session expired")]
    SessionExpired,

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

fn suffix(message: &Option<String>) -> String {
    message.as_ref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl ApiError {
    /// Map a non-success response to the matching variant.
    pub fn from_response(response: &HttpResponse) -> Self {
        let message = server_message(&response.body);
        match response.status {
            401 => ApiError::Unauthorized { message },
            404 => ApiError::NotFound,
            status @ 400..=499 => match message {
                Some(message) => ApiError::ValidationRejected { status, message },
                None => ApiError::Http {
                    status,
                    body: response.body.clone(),
                },
            },
            status => ApiError::Http {
                status,
                body: response.body.clone(),
            },
        }
    }

    /// HTTP status behind this error, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound => Some(404),
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::ValidationRejected { status, .. } | ApiError::Http { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Text suitable for showing to a user after a failed form submission.
    ///
    /// A message supplied by the server wins; otherwise the text is chosen by
    /// status code.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized { message: Some(m) } => m.clone(),
            ApiError::ValidationRejected { message, .. } => message.clone(),
            ApiError::SessionExpired => MSG_SESSION_EXPIRED.to_string(),
            other => match other.status() {
                Some(401) => MSG_INVALID_CREDENTIALS.to_string(),
                Some(400) => MSG_INVALID_REQUEST.to_string(),
                _ => MSG_CONNECTION.to_string(),
            },
        }
    }
}

/// Pull a human-readable message out of a JSON error body.
///
/// Looks at `message`, `error`, `detalhes`, then `erros` (joined with ", ").
pub fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    for key in ["message", "error", "detalhes"] {
        if let Some(text) = object.get(key).and_then(|v| v.as_str()) {
            if !text.trim().is_empty() {
                return Some(text.to_string());
            }
        }
    }
    let errors: Vec<String> = object
        .get("erros")?
        .as_array()?
        .iter()
        .map(|e| match e.as_str() {
            Some(s) => s.to_string(),
            None => e.to_string(),
        })
        .collect();
    (!errors.is_empty()).then(|| errors.join(", "))
}
