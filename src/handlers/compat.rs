//! # Compatibility Endpoint
//!
//! `POST /v1/audio/transcriptions`, shaped like OpenAI's transcription API
//! so existing client tooling can point at the local model unmodified. Only
//! the local backend is reachable from here; the cloud backend would make
//! this route a pointless proxy.
//!
//! Unlike the form route, this surface keeps programmatic error semantics:
//! 401 for credential mismatch, 400 for a missing file, 500 for backend
//! failures, all with the flat `{"error": "..."}` body.

use crate::error::AppError;
use crate::handlers::collect_multipart;
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::info;

/// The placeholder model name the emulated provider uses. Clients that ask
/// for it get the configured default local variant instead.
const PLACEHOLDER_MODEL: &str = "whisper-1";

/// Check the inbound bearer token when an API key is configured. No key
/// means the endpoint is open.
fn check_auth(req: &HttpRequest, state: &AppState) -> Result<(), AppError> {
    let Some(expected_key) = &state.credentials.local_api_key else {
        return Ok(());
    };

    let provided = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(header) if header == format!("Bearer {}", expected_key) => Ok(()),
        _ => Err(AppError::Auth("Invalid or missing API key".to_string())),
    }
}

/// Map a requested model name onto a local variant selector.
fn resolve_variant(requested: Option<&str>, state: &AppState) -> String {
    match requested {
        None => state.default_local_model(),
        Some(PLACEHOLDER_MODEL) => state.default_local_model(),
        Some(other) => other.to_string(),
    }
}

pub async fn transcriptions(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    check_auth(&req, &state)?;

    let max_bytes = state.get_config().limits.max_upload_bytes;
    let submission = collect_multipart(payload, "file", max_bytes).await?;

    let upload = submission
        .usable_file()
        .ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    let variant = resolve_variant(submission.field("model"), &state);

    info!(
        variant = %variant,
        filename = %upload.filename,
        "Compatibility transcription requested"
    );

    let text = state.backends.local.transcribe(upload, &variant).await?;

    Ok(HttpResponse::Ok().json(json!({ "text": text })))
}
