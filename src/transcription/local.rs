//! # Local Backend
//!
//! Runs transcription in-process: the upload is persisted to a scoped
//! temporary file, decoded to PCM, and fed through the cached Whisper
//! model. The temporary file is removed on every exit path, including
//! errors, by `tempfile`'s RAII guard.

use crate::audio;
use crate::error::AppError;
use crate::transcription::cache::ModelCache;
use crate::transcription::model::ModelSize;
use crate::transcription::{AudioUpload, TranscriptionBackend};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;

pub struct LocalBackend {
    cache: Arc<ModelCache>,
}

impl LocalBackend {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl TranscriptionBackend for LocalBackend {
    async fn transcribe(&self, upload: &AudioUpload, selector: &str) -> Result<String, AppError> {
        let size: ModelSize = selector
            .parse()
            .map_err(|e: anyhow::Error| AppError::Backend(e.to_string()))?;

        // Spool the upload to disk the way an external decoder would expect
        // it; deletion is guaranteed when `temp_file` drops.
        let mut temp_file = tempfile::NamedTempFile::new()
            .map_err(|e| AppError::Backend(format!("Could not create temporary file: {}", e)))?;
        temp_file
            .write_all(&upload.data)
            .map_err(|e| AppError::Backend(format!("Could not write temporary file: {}", e)))?;

        let bytes = std::fs::read(temp_file.path())
            .map_err(|e| AppError::Backend(format!("Could not read temporary file: {}", e)))?;
        let pcm = audio::decode_wav(&bytes).map_err(|e| AppError::Backend(e.to_string()))?;

        tracing::debug!(
            filename = %upload.filename,
            variant = %size,
            samples = pcm.len(),
            "Dispatching to local model"
        );

        self.cache
            .transcribe(size, &pcm)
            .await
            .map_err(|e| AppError::Backend(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[tokio::test]
    async fn test_unknown_variant_is_rejected_before_any_load() {
        let backend = LocalBackend::new(Arc::new(ModelCache::new(Device::Cpu)));
        let upload = AudioUpload {
            data: vec![1, 2, 3],
            filename: "clip.wav".to_string(),
            content_type: Some("audio/wav".to_string()),
        };

        let err = backend.transcribe(&upload, "whisper-1").await.unwrap_err();
        assert!(err.to_string().contains("Unknown model size"));
    }

    #[tokio::test]
    async fn test_malformed_audio_is_a_backend_error() {
        let backend = LocalBackend::new(Arc::new(ModelCache::new(Device::Cpu)));
        let upload = AudioUpload {
            data: b"not audio".to_vec(),
            filename: "clip.wav".to_string(),
            content_type: None,
        };

        let err = backend.transcribe(&upload, "base").await.unwrap_err();
        assert!(matches!(err, AppError::Backend(_)));
    }
}
