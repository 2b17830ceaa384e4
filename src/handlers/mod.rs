//! # HTTP Request Handlers
//!
//! Two surfaces share the multipart plumbing below:
//! - the web form (`form`): GET/POST `/`, always answers rendered HTML,
//! - the compatibility endpoint (`compat`): POST `/v1/audio/transcriptions`,
//!   OpenAI-shaped JSON with programmatic status codes.

pub mod compat;
pub mod form;

use crate::error::AppError;
use crate::transcription::AudioUpload;
use actix_web::web;
use actix_multipart::Multipart;
use futures_util::StreamExt;
use std::collections::HashMap;

/// Register all gateway routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(form::index))
        .route("/", web::post().to(form::submit))
        .route("/v1/audio/transcriptions", web::post().to(compat::transcriptions))
        .route("/health", web::get().to(crate::health::health_check));
}

/// A parsed multipart submission: plain text fields plus at most one file.
#[derive(Debug, Default)]
pub struct Submission {
    pub fields: HashMap<String, String>,
    pub file: Option<AudioUpload>,
}

impl Submission {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The uploaded file, treating an empty filename the way browsers
    /// produce it for an untouched file input: as no file at all.
    pub fn usable_file(&self) -> Option<&AudioUpload> {
        self.file.as_ref().filter(|f| !f.filename.is_empty())
    }
}

/// Drain a multipart stream into a [`Submission`].
///
/// ## Behavior
/// - The field named `file_field` is read as the file upload; its bytes
///   are capped at `max_bytes` and rejected past that
/// - Every other field is collected as UTF-8 text into `fields`
/// - Missing content disposition or field names are validation errors,
///   surfaced with the same wording on both routes
pub async fn collect_multipart(
    mut payload: Multipart,
    file_field: &str,
    max_bytes: usize,
) -> Result<Submission, AppError> {
    let mut submission = Submission::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::Validation(format!("Multipart error: {}", e)))?;

        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| AppError::Validation("Missing content disposition".to_string()))?;
        let field_name = content_disposition
            .get_name()
            .ok_or_else(|| AppError::Validation("Missing field name".to_string()))?
            .to_string();

        if field_name == file_field {
            let filename = content_disposition
                .get_filename()
                .unwrap_or("")
                .to_string();
            let content_type = field.content_type().map(|mime| mime.to_string());

            let mut data = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk =
                    chunk.map_err(|e| AppError::Validation(format!("Upload error: {}", e)))?;
                if data.len() + chunk.len() > max_bytes {
                    return Err(AppError::Validation(format!(
                        "File too large (max {} bytes)",
                        max_bytes
                    )));
                }
                data.extend_from_slice(&chunk);
            }

            submission.file = Some(AudioUpload {
                data,
                filename,
                content_type,
            });
        } else {
            let mut bytes = Vec::new();
            while let Some(chunk) = field.next().await {
                let chunk =
                    chunk.map_err(|e| AppError::Validation(format!("Field error: {}", e)))?;
                bytes.extend_from_slice(&chunk);
            }
            let value = String::from_utf8(bytes)
                .map_err(|_| AppError::Validation(format!("Field {} is not UTF-8", field_name)))?;
            submission.fields.insert(field_name, value);
        }
    }

    Ok(submission)
}

#[cfg(test)]
pub mod testing {
    //! Multipart request assembly for handler tests.

    const BOUNDARY: &str = "----GatewayTestBoundary";

    /// Build a multipart body from text fields and an optional file part.
    /// Returns the content-type header value and the body bytes.
    pub fn multipart_body(
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> (String, Vec<u8>) {
        let mut body: Vec<u8> = Vec::new();

        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }

        if let Some((field_name, filename, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field_name}\"; filename=\"{filename}\"\r\nContent-Type: audio/wav\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }

        if body.is_empty() {
            // actix-multipart's first-boundary scan never matches a standard
            // `--boundary--` close delimiter, so a zero-part body must use the
            // bare `boundary--` form it does accept to parse as empty.
            body.extend_from_slice(format!("{BOUNDARY}--\r\n").as_bytes());
        } else {
            body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        }

        (
            format!("multipart/form-data; boundary={BOUNDARY}"),
            body,
        )
    }
}
