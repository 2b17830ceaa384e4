//! # Cloud Backend
//!
//! Delegates transcription to OpenAI's hosted API. Two deliberate
//! differences from the local backend's error behavior:
//!
//! - unrecognized model names are silently normalized to the canonical
//!   default instead of failing, so stale form submissions keep working;
//! - non-success upstream statuses are returned as *result strings*
//!   embedding the status and body, not as errors — the caller renders
//!   them like any other transcription outcome.

use crate::error::AppError;
use crate::transcription::{AudioUpload, TranscriptionBackend};
use async_trait::async_trait;

const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Model names accepted by the upstream API.
pub const CLOUD_MODELS: [&str; 3] = ["whisper-1", "gpt-4o-transcribe", "gpt-4o-mini-transcribe"];

/// Canonical fallback model.
pub const DEFAULT_CLOUD_MODEL: &str = "whisper-1";

pub struct CloudBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl CloudBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: TRANSCRIPTIONS_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(2))
                .build()
                .unwrap(),
            api_key,
            endpoint,
        }
    }
}

/// Clamp a requested model name to the upstream allow-list, falling back to
/// the canonical default rather than failing.
pub fn normalize_cloud_model(requested: &str) -> &str {
    if CLOUD_MODELS.contains(&requested) {
        requested
    } else {
        DEFAULT_CLOUD_MODEL
    }
}

/// Pull the `text` field out of an upstream success body.
fn extract_text(body: &serde_json::Value) -> String {
    body.get("text")
        .and_then(|v| v.as_str())
        .unwrap_or("No transcription returned.")
        .to_string()
}

#[async_trait]
impl TranscriptionBackend for CloudBackend {
    async fn transcribe(&self, upload: &AudioUpload, selector: &str) -> Result<String, AppError> {
        let model = normalize_cloud_model(selector);
        if model != selector {
            tracing::warn!(
                requested = %selector,
                substituted = %model,
                "Unrecognized cloud model name, using default"
            );
        }

        let mut file_part = reqwest::multipart::Part::bytes(upload.data.clone())
            .file_name(upload.filename.clone());
        if let Some(content_type) = &upload.content_type {
            file_part = file_part
                .mime_str(content_type)
                .map_err(|e| AppError::Backend(format!("Invalid content type: {}", e)))?;
        }

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", model.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Backend(format!("Cloud request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let body: serde_json::Value = response
                .json()
                .await
                .map_err(|e| AppError::Backend(format!("Malformed cloud response: {}", e)))?;
            Ok(extract_text(&body))
        } else {
            let body = response.text().await.unwrap_or_default();
            // Upstream failures are values here, not faults.
            Ok(format!(
                "Transcription failed: {} - {}",
                status.as_u16(),
                body
            ))
        }
    }

    fn name(&self) -> &'static str {
        "cloud"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_models_pass_through() {
        for model in CLOUD_MODELS {
            assert_eq!(normalize_cloud_model(model), model);
        }
    }

    #[test]
    fn test_unknown_model_falls_back_silently() {
        assert_eq!(normalize_cloud_model("gpt-5-transcribe"), DEFAULT_CLOUD_MODEL);
        assert_eq!(normalize_cloud_model(""), DEFAULT_CLOUD_MODEL);
        assert_eq!(normalize_cloud_model("base"), DEFAULT_CLOUD_MODEL);
    }

    #[test]
    fn test_extract_text() {
        let body = serde_json::json!({"text": "hello world"});
        assert_eq!(extract_text(&body), "hello world");

        let body = serde_json::json!({"task": "transcribe"});
        assert_eq!(extract_text(&body), "No transcription returned.");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_backend_error() {
        let backend = CloudBackend::with_endpoint(
            "sk-test".to_string(),
            // Reserved TEST-NET address, nothing listens here.
            "http://192.0.2.1:9/v1/audio/transcriptions".to_string(),
        );
        let upload = AudioUpload {
            data: vec![0u8; 8],
            filename: "clip.wav".to_string(),
            content_type: Some("audio/wav".to_string()),
        };

        let err = backend.transcribe(&upload, "whisper-1").await.unwrap_err();
        assert!(matches!(err, AppError::Backend(_)));
    }
}
