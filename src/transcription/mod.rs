//! # Transcription Module
//!
//! Speech-to-text behind one uniform contract. Two implementations of the
//! [`TranscriptionBackend`] trait exist:
//!
//! - **Local**: a Whisper model run in-process via candle-rs, with
//!   selectable size variants and a single-slot model cache.
//! - **Cloud**: OpenAI's hosted transcription API, with selectable model
//!   names and an allow-list fallback.
//!
//! The trait is the only polymorphism boundary in the system; the request
//! router dispatches on [`BackendKind`] without knowing which implementation
//! it is talking to.

pub mod cache;
pub mod cloud;
pub mod local;
pub mod model;

use crate::error::AppError;
use async_trait::async_trait;

pub use cache::ModelCache;
pub use cloud::CloudBackend;
pub use local::LocalBackend;
pub use model::ModelSize;

/// An uploaded audio payload, collected from a multipart field.
///
/// Ephemeral: created per request, never persisted beyond the scoped
/// temporary file the local backend writes during inference.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: Option<String>,
}

/// A speech-to-text backend.
///
/// `selector` names a model within the backend's own namespace: a size
/// variant ("tiny".."large") for the local backend, an API model name
/// ("whisper-1", ...) for the cloud backend. Implementations translate
/// their internal failures into [`AppError`] values; no raw transport or
/// inference errors cross this boundary.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    async fn transcribe(&self, upload: &AudioUpload, selector: &str) -> Result<String, AppError>;

    /// Short name for logging.
    fn name(&self) -> &'static str;
}

/// The two transcription execution paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Local,
    Cloud,
}

impl BackendKind {
    /// Resolve the form's `transcription_method` field. Anything that is
    /// not explicitly "cloud" selects the local path, which is also the
    /// default when the field is missing.
    pub fn from_form_value(value: Option<&str>) -> Self {
        match value {
            Some("cloud") => BackendKind::Cloud,
            _ => BackendKind::Local,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Cloud => "cloud",
        }
    }
}
