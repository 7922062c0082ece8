//! Text-to-speech payload and PCM decoding
//!
//! Speech arrives as base64-encoded raw 16-bit little-endian PCM. Decoding
//! de-interleaves the samples per channel and normalizes them to `[-1, 1)`
//! by dividing by 32768.

use crate::error::{CliExpertError, Result};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Sample rate Azure Speech produces for `raw-24khz-16bit-mono-pcm`
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Wire shape of a speech response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechPayload {
    /// Base64-encoded 16-bit little-endian PCM
    pub audio_base64: String,
    /// Samples per second
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Interleaved channel count
    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_channels() -> u16 {
    1
}

impl SpeechPayload {
    /// Wrap raw PCM bytes as mono audio at the default sample rate
    pub fn from_pcm_bytes(bytes: &[u8]) -> Self {
        Self {
            audio_base64: BASE64_STANDARD.encode(bytes),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
        }
    }

    /// The raw PCM bytes
    pub fn pcm_bytes(&self) -> Result<Vec<u8>> {
        if self.audio_base64.is_empty() {
            return Err(CliExpertError::Audio("No audio data received".to_string()).into());
        }
        Ok(BASE64_STANDARD.decode(self.audio_base64.trim())?)
    }

    /// Decode into per-channel normalized samples
    pub fn decode(&self) -> Result<DecodedAudio> {
        let bytes = self.pcm_bytes()?;
        let channels = decode_pcm16(&bytes, self.channels)?;
        Ok(DecodedAudio {
            sample_rate: self.sample_rate,
            channels,
        })
    }
}

/// Decoded audio, one sample vector per channel
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Samples per second
    pub sample_rate: u32,
    /// Normalized samples, indexed by channel
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    /// Number of frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Playback length
    pub fn duration(&self) -> std::time::Duration {
        if self.sample_rate == 0 {
            return std::time::Duration::ZERO;
        }
        std::time::Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }
}

/// De-interleave 16-bit little-endian PCM into normalized channels
///
/// A trailing partial frame is dropped.
///
/// # Errors
///
/// Returns `CliExpertError::Audio` when `channels` is zero
///
/// # Examples
///
/// ```
/// use cliexpert::audio::decode_pcm16;
///
/// // Two stereo frames: (16384, -32768), (0, 32767)
/// let bytes = [0x00, 0x40, 0x00, 0x80, 0x00, 0x00, 0xff, 0x7f];
/// let channels = decode_pcm16(&bytes, 2).unwrap();
/// assert_eq!(channels[0], vec![0.5, 0.0]);
/// assert_eq!(channels[1][0], -1.0);
/// ```
pub fn decode_pcm16(bytes: &[u8], channels: u16) -> Result<Vec<Vec<f32>>> {
    if channels == 0 {
        return Err(CliExpertError::Audio("channel count must be at least 1".to_string()).into());
    }
    let channel_count = usize::from(channels);

    let samples: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    let frame_count = samples.len() / channel_count;
    let mut output = vec![Vec::with_capacity(frame_count); channel_count];

    for frame in samples.chunks_exact(channel_count) {
        for (channel, sample) in frame.iter().enumerate() {
            output[channel].push(f32::from(*sample) / 32768.0);
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_mono_normalizes() {
        let bytes = [0x00, 0x80, 0x00, 0x00, 0x00, 0x40];
        let channels = decode_pcm16(&bytes, 1).unwrap();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0], vec![-1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_decode_drops_partial_frame() {
        // Three samples for two channels leaves one dangling sample
        let bytes = [0x00, 0x40, 0x00, 0x40, 0x00, 0x40, 0x01];
        let channels = decode_pcm16(&bytes, 2).unwrap();
        assert_eq!(channels[0].len(), 1);
        assert_eq!(channels[1].len(), 1);
    }

    #[test]
    fn test_decode_zero_channels_is_error() {
        assert!(decode_pcm16(&[0, 0], 0).is_err());
    }

    #[test]
    fn test_payload_decode_and_duration() {
        let pcm: Vec<u8> = std::iter::repeat([0x00u8, 0x40u8])
            .take(24_000)
            .flatten()
            .collect();
        let payload = SpeechPayload::from_pcm_bytes(&pcm);
        let audio = payload.decode().unwrap();
        assert_eq!(audio.frame_count(), 24_000);
        assert_eq!(audio.duration(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_payload_empty_audio_is_error() {
        let payload = SpeechPayload {
            audio_base64: String::new(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
        };
        let err = payload.decode().unwrap_err();
        assert!(err.to_string().contains("No audio data"));
    }

    #[test]
    fn test_payload_wire_defaults() {
        let payload: SpeechPayload = serde_json::from_str(r#"{"audioBase64": "AAA="}"#).unwrap();
        assert_eq!(payload.sample_rate, 24_000);
        assert_eq!(payload.channels, 1);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["audioBase64"], "AAA=");
        assert_eq!(json["sampleRate"], 24_000);
    }
}
