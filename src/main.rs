//! # Whisper Gateway Backend
//!
//! HTTP gateway exposing speech-to-text through two surfaces:
//!
//! - a web form at `/` for interactive use,
//! - an OpenAI-compatible endpoint at `/v1/audio/transcriptions` for
//!   existing client tooling.
//!
//! Each request is dispatched to one of two backends behind a shared
//! `TranscriptionBackend` contract: a locally-run Whisper model (candle-rs,
//! selectable size variant, single-slot cache) or OpenAI's hosted
//! transcription API (selectable model name). The cloud path only exists
//! when `OPENAI_API_KEY` is set; `LOCAL_API_KEY`, when set, gates the
//! compatibility endpoint with a bearer check.

mod audio;
mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod render;
mod state;
mod transcription;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use candle_core::Device;
use config::{AppConfig, Credentials};
use state::{AppState, Backends};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcription::{CloudBackend, LocalBackend, ModelCache};

static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    let credentials = Credentials::from_env();
    if !credentials.cloud_available() {
        warn!("No OPENAI_API_KEY found; cloud transcription will be unavailable");
    }
    if credentials.local_api_key.is_none() {
        info!("No LOCAL_API_KEY configured; the compatibility endpoint is open");
    }

    info!("Starting whisper-gateway-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);

    let cache = Arc::new(ModelCache::new(Device::Cpu));
    let backends = Backends {
        local: Arc::new(LocalBackend::new(cache.clone())),
        cloud: credentials
            .openai_api_key
            .clone()
            .map(|key| Arc::new(CloudBackend::new(key)) as Arc<dyn transcription::TranscriptionBackend>),
    };

    let app_state = AppState::new(config.clone(), credentials, backends, cache);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::RequestTelemetry)
            .configure(handlers::configure)
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whisper_gateway_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
