//! # Request Router (web form)
//!
//! The form route is the human-facing surface. Its error policy is the
//! inverse of the compatibility endpoint's: every failure — validation,
//! missing configuration, backend fault — becomes display text on a
//! rendered page, and the route always answers HTTP 200. This handler is
//! the single place where backend errors turn into user-visible text.

use crate::handlers::collect_multipart;
use crate::render::{index_page, PageView};
use crate::state::AppState;
use crate::transcription::cloud::normalize_cloud_model;
use crate::transcription::BackendKind;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use tracing::{info, warn};

const NO_FILE_MESSAGE: &str = "No file selected!";
const NO_CLOUD_KEY_MESSAGE: &str = "Error: No API key configured for cloud transcription!";

fn html(page: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(page)
}

/// `GET /` — the empty form with current process defaults.
pub async fn index(state: web::Data<AppState>) -> HttpResponse {
    let view = PageView::with_defaults(
        state.default_local_model(),
        state.default_cloud_model(),
        state.cloud_available(),
    );
    html(index_page(&view))
}

/// `POST /` — settings update or transcription request.
pub async fn submit(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    let max_bytes = state.get_config().limits.max_upload_bytes;

    let submission = match collect_multipart(payload, "audio_file", max_bytes).await {
        Ok(submission) => submission,
        Err(e) => {
            warn!("Rejected form submission: {}", e);
            let view = PageView {
                transcription: Some(e.to_string()),
                ..defaults(&state)
            };
            return html(index_page(&view));
        }
    };

    // Settings action short-circuits the transcription pipeline entirely:
    // mutate the default API model and re-render, even if a file came along.
    if submission.field("action") == Some("save_settings") {
        if let Some(requested) = submission.field("api_model") {
            let model = normalize_cloud_model(requested).to_string();
            info!("Default cloud model set to {}", model);
            state.update_default_cloud_model(model);
        }
        return html(index_page(&defaults(&state)));
    }

    let method = BackendKind::from_form_value(submission.field("transcription_method"));
    let local_model = submission
        .field("local_model_size")
        .map(str::to_string)
        .unwrap_or_else(|| state.default_local_model());
    let cloud_model = submission
        .field("cloud_model")
        .map(str::to_string)
        .unwrap_or_else(|| state.default_cloud_model());

    let transcription = match submission.usable_file() {
        None => NO_FILE_MESSAGE.to_string(),
        Some(upload) => {
            let selector = match method {
                BackendKind::Local => local_model.as_str(),
                BackendKind::Cloud => cloud_model.as_str(),
            };

            match state.backends.get(method) {
                None => NO_CLOUD_KEY_MESSAGE.to_string(),
                Some(backend) => {
                    info!(
                        backend = backend.name(),
                        selector = %selector,
                        filename = %upload.filename,
                        "Transcription requested"
                    );
                    // Backend faults become display text here; nothing
                    // propagates past this route.
                    match backend.transcribe(upload, selector).await {
                        Ok(text) => text,
                        Err(e) => e.to_string(),
                    }
                }
            }
        }
    };

    let view = PageView {
        transcription: Some(transcription),
        selected_method: method,
        selected_local_model: local_model,
        selected_cloud_model: cloud_model,
        default_cloud_model: state.default_cloud_model(),
        cloud_available: state.cloud_available(),
    };
    html(index_page(&view))
}

fn defaults(state: &AppState) -> PageView {
    PageView::with_defaults(
        state.default_local_model(),
        state.default_cloud_model(),
        state.cloud_available(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::handlers::testing::multipart_body;
    use crate::state::testing::{local_only_state, state_with_backends};
    use crate::transcription::testing::{FailingBackend, RecordingBackend};
    use actix_web::{http::header, test, App};
    use std::sync::Arc;

    async fn post_form(
        state: crate::state::AppState,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> String {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(crate::handlers::configure),
        )
        .await;

        let (content_type, body) = multipart_body(fields, file);
        let req = test::TestRequest::post()
            .uri("/")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success(), "form route must answer 200");
        let bytes = test::read_body(resp).await;
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[actix_web::test]
    async fn test_get_renders_empty_form() {
        let state = local_only_state(Arc::new(RecordingBackend::new("ok")));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(crate::handlers::configure),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(resp.status().is_success());
        let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(body.contains("audio_file"));
        assert!(body.contains("no API key configured"));
    }

    #[actix_web::test]
    async fn test_missing_file_never_reaches_a_backend() {
        let local = Arc::new(RecordingBackend::new("ok"));
        let state = local_only_state(local.clone());

        let page = post_form(state, &[("transcription_method", "local")], None).await;
        assert!(page.contains("No file selected!"));
        assert_eq!(local.call_count(), 0);
    }

    #[actix_web::test]
    async fn test_empty_filename_counts_as_no_file() {
        let local = Arc::new(RecordingBackend::new("ok"));
        let state = local_only_state(local.clone());

        let page = post_form(
            state,
            &[("transcription_method", "local")],
            Some(("audio_file", "", b"RIFFdata")),
        )
        .await;
        assert!(page.contains("No file selected!"));
        assert_eq!(local.call_count(), 0);
    }

    #[actix_web::test]
    async fn test_local_dispatch_uses_selected_variant() {
        let local = Arc::new(RecordingBackend::new("hello from whisper"));
        let state = local_only_state(local.clone());

        let page = post_form(
            state,
            &[
                ("transcription_method", "local"),
                ("local_model_size", "small"),
            ],
            Some(("audio_file", "clip.wav", b"RIFFdata")),
        )
        .await;

        assert!(page.contains("hello from whisper"));
        assert_eq!(local.call_count(), 1);
        assert_eq!(local.recorded_selectors(), vec!["small".to_string()]);
        // Selection round-trips into the rendered page.
        assert!(page.contains(r#"<option value="small" selected>"#));
    }

    #[actix_web::test]
    async fn test_cloud_without_credential_short_circuits() {
        let local = Arc::new(RecordingBackend::new("ok"));
        let state = local_only_state(local.clone());

        let page = post_form(
            state,
            &[("transcription_method", "cloud")],
            Some(("audio_file", "clip.wav", b"RIFFdata")),
        )
        .await;

        assert!(page.contains("No API key configured for cloud transcription"));
        assert_eq!(local.call_count(), 0);
    }

    #[actix_web::test]
    async fn test_cloud_dispatch_with_credential() {
        let local = Arc::new(RecordingBackend::new("local"));
        let cloud = Arc::new(RecordingBackend::new("cloud transcription"));
        let state = state_with_backends(
            Credentials {
                openai_api_key: Some("sk-test".to_string()),
                local_api_key: None,
            },
            local.clone(),
            Some(cloud.clone() as Arc<dyn crate::transcription::TranscriptionBackend>),
        );

        let page = post_form(
            state,
            &[
                ("transcription_method", "cloud"),
                ("cloud_model", "gpt-4o-transcribe"),
            ],
            Some(("audio_file", "clip.wav", b"RIFFdata")),
        )
        .await;

        assert!(page.contains("cloud transcription"));
        assert_eq!(cloud.call_count(), 1);
        assert_eq!(local.call_count(), 0);
        assert_eq!(cloud.recorded_selectors(), vec!["gpt-4o-transcribe".to_string()]);
        assert!(page.contains(r#"<option value="cloud" selected>"#));
    }

    #[actix_web::test]
    async fn test_backend_fault_becomes_page_text_not_500() {
        let state = local_only_state(Arc::new(RecordingBackend::new("unused")));
        let state = crate::state::AppState {
            backends: crate::state::Backends {
                local: Arc::new(FailingBackend),
                cloud: None,
            },
            ..state
        };

        let page = post_form(
            state,
            &[("transcription_method", "local")],
            Some(("audio_file", "clip.wav", b"RIFFdata")),
        )
        .await;

        assert!(page.contains("inference exploded"));
    }

    #[actix_web::test]
    async fn test_save_settings_never_transcribes() {
        let local = Arc::new(RecordingBackend::new("ok"));
        let state = local_only_state(local.clone());
        let state_check = state.clone();

        let page = post_form(
            state,
            &[
                ("action", "save_settings"),
                ("api_model", "gpt-4o-mini-transcribe"),
                ("transcription_method", "local"),
            ],
            // A file rides along; it must be ignored.
            Some(("audio_file", "clip.wav", b"RIFFdata")),
        )
        .await;

        assert_eq!(local.call_count(), 0);
        assert_eq!(state_check.default_cloud_model(), "gpt-4o-mini-transcribe");
        assert!(page.contains(r#"<option value="gpt-4o-mini-transcribe" selected>"#));
    }

    #[actix_web::test]
    async fn test_save_settings_normalizes_unknown_model() {
        let state = local_only_state(Arc::new(RecordingBackend::new("ok")));
        let state_check = state.clone();

        post_form(
            state,
            &[("action", "save_settings"), ("api_model", "bogus-model")],
            None,
        )
        .await;

        assert_eq!(state_check.default_cloud_model(), "whisper-1");
    }
}
