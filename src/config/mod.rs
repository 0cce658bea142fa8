//! Module: config
//!
//! Purpose: Configuration for the voice satellite.
//!
//! Architecture:
//! - `AudioFormat`: the fixed audio contract shared with the hub
//! - `SatelliteConfig`: tunables, network settings and pin map
//! - Compile-time defaults from `SATELLITE_*` environment variables
//! - `nvs`: network settings overrides persisted in flash
//!
//! The audio format is not negotiated. Both ends must be built with the
//! same values; a mismatch is a deployment error.

pub mod nvs;

use thiserror::Error;

/// WAV header size in bytes.
pub const HEADER_SIZE: usize = 44;

/// Default hub endpoint.
pub const DEFAULT_SERVER_URL: &str = "http://192.168.1.100:8000/api/voice";

/// PCM audio contract: sample rate, bit depth, channel count.
///
/// Samples are always little-endian signed integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl AudioFormat {
    /// 16 kHz, 16-bit, mono. What the hub's speech-to-text expects.
    pub const SPEECH: Self = Self {
        sample_rate: 16_000,
        bits_per_sample: 16,
        channels: 1,
    };

    #[inline]
    pub const fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Bytes per sample frame (all channels).
    #[inline]
    pub const fn block_align(&self) -> u16 {
        self.channels * self.bytes_per_sample()
    }

    /// Bytes per second of audio.
    #[inline]
    pub const fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// Duration of `bytes` of PCM in whole milliseconds (rounded down).
    pub fn duration_ms(&self, bytes: usize) -> u32 {
        let rate = self.byte_rate() as u64;
        if rate == 0 {
            return 0;
        }
        ((bytes as u64 * 1000) / rate) as u32
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::SPEECH
    }
}

/// GPIO assignment.
///
/// Defaults match the reference wiring: INMP441 mic on I2S0,
/// PCM5102A DAC on I2S1, PTT button on the BOOT pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub mic_sck: u8,
    pub mic_ws: u8,
    pub mic_sd: u8,
    pub dac_bck: u8,
    pub dac_lrck: u8,
    pub dac_din: u8,
    /// Active low, internal pull-up.
    pub ptt_button: u8,
    /// High = busy.
    pub status_led: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            mic_sck: 4,
            mic_ws: 5,
            mic_sd: 6,
            dac_bck: 15,
            dac_lrck: 16,
            dac_din: 17,
            ptt_button: 0,
            status_led: 2,
        }
    }
}

/// Wi-Fi credentials and hub endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub server_url: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            wifi_ssid: option_env!("SATELLITE_WIFI_SSID").unwrap_or("").to_string(),
            wifi_password: option_env!("SATELLITE_WIFI_PASSWORD").unwrap_or("").to_string(),
            server_url: option_env!("SATELLITE_SERVER_URL")
                .unwrap_or(DEFAULT_SERVER_URL)
                .to_string(),
        }
    }
}

/// Full satellite configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteConfig {
    pub format: AudioFormat,
    /// Longest utterance the shared buffer can hold.
    pub max_recording_secs: u32,
    /// Bytes pulled from the microphone per loop iteration.
    pub capture_chunk_bytes: usize,
    /// Bytes pushed to the speaker per write.
    pub playback_chunk_bytes: usize,
    /// Utterances shorter than this are discarded without sending.
    pub min_utterance_ms: u32,
    /// Delay at the end of every loop iteration; bounds the PTT sample rate.
    pub loop_delay_ms: u32,
    /// Minimum spacing between accepted PTT edges.
    pub debounce_ms: u32,
    /// Whole-exchange HTTP timeout. Remote processing dominates.
    pub http_timeout_ms: u32,
    /// Sleep between polls of a response stream with nothing available.
    pub receive_poll_ms: u32,
    /// Text responses are truncated to this many bytes.
    pub text_limit_bytes: usize,
    pub wifi_connect_attempts: u32,
    pub wifi_retry_delay_ms: u32,
    pub network: NetworkSettings,
    pub pins: PinConfig,
}

impl Default for SatelliteConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::SPEECH,
            max_recording_secs: 15,
            capture_chunk_bytes: 1024,
            playback_chunk_bytes: 1024,
            min_utterance_ms: 300,
            loop_delay_ms: 10,
            debounce_ms: 50,
            http_timeout_ms: 30_000,
            receive_poll_ms: 1,
            text_limit_bytes: 2048,
            wifi_connect_attempts: 30,
            wifi_retry_delay_ms: 500,
            network: NetworkSettings::default(),
            pins: PinConfig::default(),
        }
    }
}

impl SatelliteConfig {
    /// PCM bytes the buffer can hold after the header.
    ///
    /// `None` if the product overflows `usize` (32 bits on the target).
    pub fn max_payload_bytes(&self) -> Option<usize> {
        (self.format.byte_rate() as usize).checked_mul(self.max_recording_secs as usize)
    }

    /// Total shared buffer size: header plus maximum payload.
    pub fn buffer_capacity(&self) -> Option<usize> {
        self.max_payload_bytes()?.checked_add(HEADER_SIZE)
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let f = &self.format;
        if f.sample_rate == 0 || f.channels == 0 || f.bits_per_sample == 0 || f.bits_per_sample % 8 != 0 {
            return Err(ConfigError::InvalidFormat(*f));
        }
        if self.max_recording_secs == 0 {
            return Err(ConfigError::OutOfRange { field: "max_recording_secs", value: 0 });
        }

        let align = f.block_align() as usize;
        for (field, value) in [
            ("capture_chunk_bytes", self.capture_chunk_bytes),
            ("playback_chunk_bytes", self.playback_chunk_bytes),
        ] {
            if value == 0 {
                return Err(ConfigError::OutOfRange { field, value: 0 });
            }
            if value % align != 0 {
                return Err(ConfigError::Misaligned { field, value, align });
            }
        }

        if self.http_timeout_ms == 0 {
            return Err(ConfigError::OutOfRange { field: "http_timeout_ms", value: 0 });
        }

        // Header size field is 32 bits.
        if !matches!(self.buffer_capacity(), Some(c) if c <= u32::MAX as usize) {
            return Err(ConfigError::OutOfRange {
                field: "max_recording_secs",
                value: self.max_recording_secs as usize,
            });
        }

        let url = &self.network.server_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(url.clone()));
        }

        Ok(())
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported audio format: {0:?}")]
    InvalidFormat(AudioFormat),
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: usize },
    #[error("{field} = {value} is not a multiple of the {align}-byte frame")]
    Misaligned {
        field: &'static str,
        value: usize,
        align: usize,
    },
    #[error("server URL must start with http:// or https://, got {0:?}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_format_derivations() {
        let f = AudioFormat::SPEECH;
        assert_eq!(f.bytes_per_sample(), 2);
        assert_eq!(f.block_align(), 2);
        assert_eq!(f.byte_rate(), 32_000);
        assert_eq!(f.duration_ms(32_000), 1000);
        assert_eq!(f.duration_ms(1600), 50);
    }
}
