//! # Local Model Cache
//!
//! Memoizes at most one loaded Whisper model, keyed by size variant. The
//! first request for a variant pays the download/initialization cost;
//! subsequent requests for the same variant reuse the instance. Requesting a
//! *different* variant evicts the current model and loads the new one —
//! there is no LRU and no multi-variant retention. The eviction-on-switch
//! policy is intentional: the model is the dominant memory cost of the
//! process, so the cache never holds more instances than the most recent
//! request needs.
//!
//! A `tokio::sync::Mutex` guards the slot for the whole load-and-infer
//! sequence, so concurrent first-requests for different variants serialize
//! instead of clobbering each other's loads.

use crate::transcription::model::{ModelSize, WhisperModel};
use anyhow::Result;
use candle_core::Device;
use tokio::sync::Mutex;

/// Single-slot variant-keyed cache state, generic so the hit/evict policy
/// can be tested without loading real models.
#[derive(Debug, Default)]
pub struct Slot<M> {
    current: Option<(ModelSize, M)>,
}

impl<M> Slot<M> {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Whether a request for `size` requires a load (empty slot or a
    /// different variant cached).
    pub fn needs_load(&self, size: ModelSize) -> bool {
        !matches!(&self.current, Some((cached, _)) if *cached == size)
    }

    /// Install a freshly loaded model, evicting whatever was cached.
    pub fn install(&mut self, size: ModelSize, model: M) {
        self.current = Some((size, model));
    }

    pub fn loaded_variant(&self) -> Option<ModelSize> {
        self.current.as_ref().map(|(size, _)| *size)
    }

    /// Mutable access to the cached model, if it matches `size`.
    pub fn get_mut(&mut self, size: ModelSize) -> Option<&mut M> {
        match &mut self.current {
            Some((cached, model)) if *cached == size => Some(model),
            _ => None,
        }
    }
}

/// Process-wide cache of the currently loaded local model.
pub struct ModelCache {
    slot: Mutex<Slot<WhisperModel>>,
    device: Device,
}

impl ModelCache {
    pub fn new(device: Device) -> Self {
        Self {
            slot: Mutex::new(Slot::new()),
            device,
        }
    }

    /// Transcribe PCM audio with the requested variant, loading (and
    /// evicting the previous model) if necessary.
    ///
    /// The slot lock is held across both load and inference; whisper decode
    /// needs exclusive access to the model anyway, so transcriptions with
    /// the local backend serialize here.
    pub async fn transcribe(&self, size: ModelSize, pcm: &[f32]) -> Result<String> {
        let mut slot = self.slot.lock().await;

        if slot.needs_load(size) {
            if let Some(evicted) = slot.loaded_variant() {
                tracing::info!("Evicting {} model to load {}", evicted, size);
            }
            let model = WhisperModel::load(size, self.device.clone()).await?;
            slot.install(size, model);
        }

        let model = slot
            .get_mut(size)
            .expect("model installed above must be present");
        model.transcribe(pcm)
    }

    /// The variant currently held, if any. Used by the health endpoint.
    pub async fn loaded_variant(&self) -> Option<ModelSize> {
        self.slot.lock().await.loaded_variant()
    }
}
