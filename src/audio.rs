//! # Audio Upload Decoding
//!
//! Converts uploaded WAV payloads into the 16 kHz mono f32 PCM the local
//! Whisper model consumes. Multi-channel input is downmixed by averaging;
//! resampling is not performed, so uploads must already be 16 kHz.

use anyhow::{anyhow, Result};
use std::io::Cursor;

/// Sample rate the Whisper models expect.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Decode a WAV payload to 16 kHz mono f32 samples in [-1.0, 1.0].
pub fn decode_wav(data: &[u8]) -> Result<Vec<f32>> {
    let mut cursor = Cursor::new(data);
    let (header, bit_depth) = wav::read(&mut cursor)
        .map_err(|e| anyhow!("Could not parse WAV file: {}", e))?;

    if header.sampling_rate != WHISPER_SAMPLE_RATE {
        return Err(anyhow!(
            "Unsupported sample rate: {} Hz (expected {} Hz)",
            header.sampling_rate,
            WHISPER_SAMPLE_RATE
        ));
    }

    if header.channel_count == 0 {
        return Err(anyhow!("WAV file reports zero channels"));
    }

    let samples: Vec<f32> = match bit_depth {
        wav::BitDepth::Eight(samples) => samples
            .into_iter()
            .map(|s| (s as f32 - 128.0) / 128.0)
            .collect(),
        wav::BitDepth::Sixteen(samples) => {
            samples.into_iter().map(|s| s as f32 / 32768.0).collect()
        }
        wav::BitDepth::TwentyFour(samples) => samples
            .into_iter()
            .map(|s| s as f32 / 8_388_608.0)
            .collect(),
        wav::BitDepth::ThirtyTwoFloat(samples) => samples,
        wav::BitDepth::Empty => Vec::new(),
    };

    if samples.is_empty() {
        return Err(anyhow!("WAV file contains no audio data"));
    }

    Ok(downmix(&samples, header.channel_count as usize))
}

/// Average interleaved channels down to mono.
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: u16, sample_rate: u32, samples: Vec<i16>) -> Vec<u8> {
        // Format tag 1 is integer PCM.
        let header = wav::Header::new(1, channels, sample_rate, 16);
        let mut out = Cursor::new(Vec::new());
        wav::write(header, &wav::BitDepth::Sixteen(samples), &mut out).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_mono_16k() {
        let bytes = wav_bytes(1, 16_000, vec![0, 16384, -16384, 32767]);
        let pcm = decode_wav(&bytes).unwrap();
        assert_eq!(pcm.len(), 4);
        assert!((pcm[1] - 0.5).abs() < 0.001);
        assert!((pcm[2] + 0.5).abs() < 0.001);
    }

    #[test]
    fn test_decode_downmixes_stereo() {
        let bytes = wav_bytes(2, 16_000, vec![16384, -16384, 8192, 8192]);
        let pcm = decode_wav(&bytes).unwrap();
        assert_eq!(pcm.len(), 2);
        // L and R cancel in the first frame, average in the second.
        assert!(pcm[0].abs() < 0.001);
        assert!((pcm[1] - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_decode_rejects_wrong_sample_rate() {
        let bytes = wav_bytes(1, 44_100, vec![0, 1, 2, 3]);
        let err = decode_wav(&bytes).unwrap_err();
        assert!(err.to_string().contains("sample rate"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_wav(b"definitely not a wav file").is_err());
        assert!(decode_wav(&[]).is_err());
    }
}
