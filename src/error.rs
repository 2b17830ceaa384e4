//! # Error Handling
//!
//! Application-wide error type and its mapping onto HTTP responses.
//!
//! The gateway serves two very different consumers and the error policy
//! differs between them:
//!
//! - The **form route** never surfaces an `AppError` as an HTTP error; the
//!   router converts every failure into display text and answers 200 with a
//!   rendered page. Handlers on that route therefore only use this type
//!   internally.
//! - The **compatibility endpoint** is consumed by automated clients and
//!   keeps programmatic semantics: errors become JSON bodies of the shape
//!   `{"error": "..."}` with the matching status code, which is the error
//!   shape of the API being emulated.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Error taxonomy for the gateway.
///
/// - `Config`: a credential or setting required for the selected path is
///   missing or unusable (500).
/// - `Validation`: the client request is malformed — no file, empty
///   filename, bad multipart data (400).
/// - `Backend`: model load failure, inference failure, WAV decode failure,
///   or a malformed upstream response (500).
/// - `Auth`: bearer credential missing or mismatched on the compatibility
///   endpoint (401).
#[derive(Debug)]
pub enum AppError {
    Config(String),
    Validation(String),
    Backend(String),
    Auth(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Backend(msg) => write!(f, "Transcription error: {}", msg),
            AppError::Auth(msg) => write!(f, "Authorization error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, message) = match self {
            AppError::Config(msg) => {
                (actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Validation(msg) => (actix_web::http::StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Backend(msg) => {
                (actix_web::http::StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
            AppError::Auth(msg) => (actix_web::http::StatusCode::UNAUTHORIZED, msg.clone()),
        };

        // Flat error shape for compatibility with OpenAI-style clients.
        HttpResponse::build(status).json(json!({ "error": message }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Auth("bad token".into()).error_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Validation("no file".into()).error_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Backend("inference failed".into()).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Config("missing key".into()).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_prefixes() {
        let err = AppError::Backend("model load failed".into());
        assert_eq!(err.to_string(), "Transcription error: model load failed");
    }
}
