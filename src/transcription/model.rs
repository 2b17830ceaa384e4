//! # Whisper Model
//!
//! Loading and inference for the local Whisper model family via candle-rs.
//! Model artifacts are fetched from HuggingFace on first use and cached on
//! disk by hf-hub; loading into memory is the expensive step the
//! [`crate::transcription::ModelCache`] exists to amortize.

use anyhow::{anyhow, Result};
use candle_core::{Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use tokenizers::Tokenizer;

/// Whisper size variants selectable per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// HuggingFace repository holding this variant's weights.
    pub fn repo_name(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "openai/whisper-tiny",
            ModelSize::Base => "openai/whisper-base",
            ModelSize::Small => "openai/whisper-small",
            ModelSize::Medium => "openai/whisper-medium",
            ModelSize::Large => "openai/whisper-large-v2",
        }
    }

    /// Approximate download size in MB, for the loading notice.
    pub fn size_mb(&self) -> u32 {
        match self {
            ModelSize::Tiny => 39,
            ModelSize::Base => 74,
            ModelSize::Small => 244,
            ModelSize::Medium => 769,
            ModelSize::Large => 1550,
        }
    }

    pub const ALL: [ModelSize; 5] = [
        ModelSize::Tiny,
        ModelSize::Base,
        ModelSize::Small,
        ModelSize::Medium,
        ModelSize::Large,
    ];
}

impl std::str::FromStr for ModelSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large" => Ok(ModelSize::Large),
            _ => Err(anyhow!("Unknown model size: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        };
        write!(f, "{}", name)
    }
}

/// A loaded Whisper model ready for inference.
pub struct WhisperModel {
    model: m::model::Whisper,
    config: Config,
    device: Device,
    tokenizer: Tokenizer,
    mel_filters: Vec<f32>,
}

impl WhisperModel {
    /// Download (if needed) and load a Whisper variant.
    ///
    /// ## Steps
    /// 1. Build a HuggingFace hub client (progress bars off; the hub crate
    ///    honors `HF_TOKEN`/`HF_HOME` from the environment on its own)
    /// 2. Fetch `config.json`, `tokenizer.json` and `model.safetensors`
    ///    from the variant's repository, hitting the local hub cache first
    /// 3. Memory-map the weights into a `VarBuilder` and construct the
    ///    candle Whisper graph on the given device
    ///
    /// Each download failure is wrapped with the repository name so a
    /// network problem is distinguishable from a bad variant.
    pub async fn load(size: ModelSize, device: Device) -> Result<Self> {
        tracing::info!("Loading local Whisper model ({}, ~{} MB)...", size, size.size_mb());
        let start_time = std::time::Instant::now();

        let api = hf_hub::api::tokio::ApiBuilder::new()
            .with_progress(false)
            .build()
            .map_err(|e| anyhow!("Failed to initialize HuggingFace API: {}", e))?;
        let repo = api.model(size.repo_name().to_string());

        let config_filename = repo
            .get("config.json")
            .await
            .map_err(|e| anyhow!("Failed to download config.json from {}: {}", size.repo_name(), e))?;
        let tokenizer_filename = repo
            .get("tokenizer.json")
            .await
            .map_err(|e| anyhow!("Failed to download tokenizer.json from {}: {}", size.repo_name(), e))?;
        let model_filename = repo
            .get("model.safetensors")
            .await
            .map_err(|e| anyhow!("Failed to download model weights from {}: {}", size.repo_name(), e))?;

        let config: Config = serde_json::from_reader(std::fs::File::open(config_filename)?)?;
        let tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        let mel_filters = build_mel_filter_bank(N_FFT, config.num_mel_bins as usize);

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[model_filename], m::DTYPE, &device)?
        };
        let model = m::model::Whisper::load(&vb, config.clone())?;

        tracing::info!(
            "Whisper {} model loaded in {:.2}s",
            size,
            start_time.elapsed().as_secs_f64()
        );

        Ok(Self {
            model,
            config,
            device,
            tokenizer,
            mel_filters,
        })
    }

    /// Transcribe 16 kHz mono f32 PCM to text.
    pub fn transcribe(&mut self, pcm: &[f32]) -> Result<String> {
        if pcm.is_empty() {
            return Err(anyhow!("Audio data is empty"));
        }

        let mel = self.pcm_to_mel(pcm)?;
        let mel = mel.unsqueeze(0)?;

        let encoder_output = self.model.encoder.forward(&mel, false)?;

        let mut tokens = vec![SOT_TOKEN, EN_LANGUAGE_TOKEN, TRANSCRIBE_TOKEN];
        let mut output_tokens = Vec::new();

        for _ in 0..MAX_DECODE_TOKENS {
            let token_tensor = Tensor::new(&tokens[..], &self.device)?.unsqueeze(0)?;
            let logits = self.model.decoder.forward(&token_tensor, &encoder_output, false)?;
            let last_logits = logits.i((.., tokens.len() - 1, ..))?;

            let next_token = last_logits.argmax_keepdim(1)?.to_scalar::<u32>()?;

            if next_token == EOT_TOKEN {
                break;
            }

            if is_repetitive(&output_tokens, next_token) {
                break;
            }

            tokens.push(next_token);
            output_tokens.push(next_token);
        }

        self.decode_tokens(&output_tokens)
    }

    /// Convert PCM samples to a log-mel spectrogram tensor.
    fn pcm_to_mel(&self, pcm: &[f32]) -> Result<Tensor> {
        // Whisper operates on fixed 30-second windows at 16 kHz.
        let target_len = 30 * 16000;
        let mut padded = vec![0.0f32; target_len];
        let copy_len = pcm.len().min(target_len);
        padded[..copy_len].copy_from_slice(&pcm[..copy_len]);

        let n_mels = self.config.num_mel_bins as usize;
        let n_frames = 3000;

        let mut mel_data = vec![0.0f32; n_mels * n_frames];
        let frame_size = padded.len() / n_frames;
        for frame in 0..n_frames {
            let start = frame * frame_size;
            let end = (start + frame_size).min(padded.len());

            for mel_bin in 0..n_mels {
                let filter = &self.mel_filters[mel_bin * N_FFT..(mel_bin + 1) * N_FFT];
                let mut energy = 0.0f32;
                for (k, sample) in padded[start..end].iter().enumerate() {
                    energy += sample.abs() * filter[k % N_FFT];
                }
                // -80 dB floor
                mel_data[mel_bin * n_frames + frame] =
                    (energy / frame_size as f32).ln().max(-11.5129);
            }
        }

        Ok(Tensor::from_vec(mel_data, (n_mels, n_frames), &self.device)?)
    }

    fn decode_tokens(&self, tokens: &[u32]) -> Result<String> {
        let text = self
            .tokenizer
            .decode(tokens, true)
            .map_err(|e| anyhow!("Tokenizer decode error: {}", e))?;

        let cleaned = text
            .replace("<|startoftranscript|>", "")
            .replace("<|endoftext|>", "")
            .replace("<|notimestamps|>", "");

        Ok(cleaned.trim().to_string())
    }
}

const N_FFT: usize = 400;
const MAX_DECODE_TOKENS: usize = 200;

// Standard Whisper special token IDs.
const SOT_TOKEN: u32 = 50258;
const EOT_TOKEN: u32 = 50257;
const TRANSCRIBE_TOKEN: u32 = 50359;
const EN_LANGUAGE_TOKEN: u32 = 50259;

/// Triangular mel filter bank approximation.
fn build_mel_filter_bank(n_fft: usize, n_mels: usize) -> Vec<f32> {
    let mut filters = vec![0.0f32; n_fft * n_mels];

    for i in 0..n_mels {
        let center = (i + 1) * n_fft / (n_mels + 1);
        let width = n_fft / (n_mels + 1);

        for j in 0..n_fft {
            if j >= center.saturating_sub(width) && j <= center + width {
                let distance = (j as i32 - center as i32).abs() as f32;
                filters[i * n_fft + j] = (1.0 - distance / width as f32).max(0.0);
            }
        }
    }

    filters
}

/// Detect immediate or short-pattern token repetition, which indicates a
/// degenerate decode loop.
fn is_repetitive(tokens: &[u32], new_token: u32) -> bool {
    if tokens.len() >= 3 && tokens[tokens.len() - 3..] == [new_token, new_token, new_token] {
        return true;
    }

    if tokens.len() >= 6 {
        let last_3 = &tokens[tokens.len() - 3..];
        let prev_3 = &tokens[tokens.len() - 6..tokens.len() - 3];
        if last_3 == prev_3 {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_size_parsing() {
        assert_eq!("base".parse::<ModelSize>().unwrap(), ModelSize::Base);
        assert_eq!("LARGE".parse::<ModelSize>().unwrap(), ModelSize::Large);
        assert!("whisper-1".parse::<ModelSize>().is_err());
        assert!("".parse::<ModelSize>().is_err());
    }

    #[test]
    fn test_model_size_round_trip() {
        for size in ModelSize::ALL {
            assert_eq!(size.to_string().parse::<ModelSize>().unwrap(), size);
        }
    }

    #[test]
    fn test_repetition_guard() {
        // Immediate repetition: three identical tokens already emitted.
        assert!(is_repetitive(&[1, 2, 5, 5, 5], 5));
        // Pattern repetition: a-b-c a-b-c.
        assert!(is_repetitive(&[7, 8, 9, 7, 8, 9], 1));
        // Healthy sequences pass.
        assert!(!is_repetitive(&[1, 2], 3));
        assert!(!is_repetitive(&[1, 2, 3, 4, 5, 6], 7));
    }
}
