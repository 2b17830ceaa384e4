//! # Application State
//!
//! Shared state handed to every request handler. Everything mutable hides
//! behind `Arc<RwLock<...>>`; the credentials and the backend map are fixed
//! at startup and shared immutably. This is the dependency-injection seam:
//! handlers never reach for globals, and tests swap in recording backends
//! through [`Backends`].

use crate::config::{AppConfig, Credentials};
use crate::transcription::{BackendKind, ModelCache, TranscriptionBackend};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The backend map the router dispatches through. Cloud is only present
/// when its credential was configured, which is what makes "cloud selected
/// but not configured" detectable without invoking anything.
#[derive(Clone)]
pub struct Backends {
    pub local: Arc<dyn TranscriptionBackend>,
    pub cloud: Option<Arc<dyn TranscriptionBackend>>,
}

impl Backends {
    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn TranscriptionBackend>> {
        match kind {
            BackendKind::Local => Some(self.local.clone()),
            BackendKind::Cloud => self.cloud.clone(),
        }
    }
}

/// Shared state cloned into every worker.
///
/// ## Key Responsibilities
/// - Hold the runtime-mutable configuration behind `Arc<RwLock<AppConfig>>`
///   (the settings form updates the default cloud model at runtime)
/// - Carry the startup-fixed [`Credentials`] and [`Backends`] dispatch table
/// - Track request/error counts and per-endpoint latency for `/health`
///
/// ## Locking
/// - `config` and `metrics` use `std::sync::RwLock`: every access is a short
///   synchronous critical section, never held across an `.await`
/// - The model cache has its own async mutex (see
///   [`crate::transcription::ModelCache`]) because inference runs under it
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<AppConfig>>,
    pub credentials: Credentials,
    pub backends: Backends,
    pub cache: Arc<ModelCache>,
    pub metrics: Arc<RwLock<AppMetrics>>,
    pub start_time: Instant,
}

#[derive(Debug, Default)]
pub struct AppMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        credentials: Credentials,
        backends: Backends,
        cache: Arc<ModelCache>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            credentials,
            backends,
            cache,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Whether the cloud path can be offered at all. Derived once from
    /// credential presence, never re-evaluated per request.
    pub fn cloud_available(&self) -> bool {
        self.backends.cloud.is_some()
    }

    pub fn default_local_model(&self) -> String {
        self.config.read().unwrap().models.default_local_model.clone()
    }

    pub fn default_cloud_model(&self) -> String {
        self.config.read().unwrap().models.default_cloud_model.clone()
    }

    /// The form's settings action: update the process-wide default cloud
    /// model. A pure settings mutation, independent of any audio path.
    pub fn update_default_cloud_model(&self, model: String) {
        let mut config = self.config.write().unwrap();
        config.models.default_cloud_model = model;
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
