//! WAV container codec.
//!
//! Canonical 44-byte RIFF/WAVE header around raw little-endian PCM:
//!
//! ```text
//! offset  size  field
//!  0      4     "RIFF"
//!  4      4     total size - 8
//!  8      4     "WAVE"
//! 12      4     "fmt "
//! 16      4     16 (fmt chunk size)
//! 20      2     1 (PCM)
//! 22      2     channels
//! 24      4     sample rate
//! 28      4     byte rate   = sample_rate * channels * bytes_per_sample
//! 32      2     block align = channels * bytes_per_sample
//! 34      2     bits per sample
//! 36      4     "data"
//! 40      4     payload length
//! ```
//!
//! The header is written last, into space reserved before the payload was
//! captured, so the payload never moves.

use core::ops::Range;

use log::warn;
use thiserror::Error;

use crate::config::AudioFormat;

pub use crate::config::HEADER_SIZE;

const RIFF: &[u8; 4] = b"RIFF";
const WAVE: &[u8; 4] = b"WAVE";
const FMT: &[u8; 4] = b"fmt ";
const DATA: &[u8; 4] = b"data";

/// fmt chunk body length for plain PCM
const FMT_CHUNK_SIZE: u32 = 16;
/// WAVE_FORMAT_PCM
pub const PCM_FORMAT: u16 = 1;

/// Header decode error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("header needs 44 bytes, got {0}")]
    TooShort(usize),
    #[error("bad {expected} tag at offset {offset}")]
    BadTag { offset: usize, expected: &'static str },
}

/// Declared vs. actually present payload length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthMismatch {
    pub declared: u32,
    pub actual: usize,
}

/// Decoded header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub format_code: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Payload length from the `data` chunk
    pub data_len: u32,
    /// Set when the bytes following the header disagree with `data_len`
    pub length_mismatch: Option<LengthMismatch>,
}

impl WavHeader {
    /// Format described by this header
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            channels: self.channels,
        }
    }

    /// Whether the header describes PCM in exactly `format`
    pub fn matches(&self, format: &AudioFormat) -> bool {
        self.format_code == PCM_FORMAT && self.format() == *format
    }

    /// Duration of the declared payload
    pub fn duration_ms(&self) -> u32 {
        self.format().duration_ms(self.data_len as usize)
    }
}

/// Encode a header for `data_size` payload bytes.
pub fn encode_header(data_size: u32, format: &AudioFormat) -> [u8; HEADER_SIZE] {
    let mut h = [0u8; HEADER_SIZE];
    let riff_size = data_size.wrapping_add(HEADER_SIZE as u32 - 8);

    h[0..4].copy_from_slice(RIFF);
    h[4..8].copy_from_slice(&riff_size.to_le_bytes());
    h[8..12].copy_from_slice(WAVE);

    h[12..16].copy_from_slice(FMT);
    h[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    h[20..22].copy_from_slice(&PCM_FORMAT.to_le_bytes());
    h[22..24].copy_from_slice(&format.channels.to_le_bytes());
    h[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    h[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    h[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    h[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    h[36..40].copy_from_slice(DATA);
    h[40..44].copy_from_slice(&data_size.to_le_bytes());
    h
}

/// Write the header into the first [`HEADER_SIZE`] bytes of `buf` in place.
///
/// Bytes after the header are not touched.
pub fn write_header(buf: &mut [u8], data_size: u32, format: &AudioFormat) -> Result<(), HeaderError> {
    let len = buf.len();
    let dst = buf.get_mut(..HEADER_SIZE).ok_or(HeaderError::TooShort(len))?;
    dst.copy_from_slice(&encode_header(data_size, format));
    Ok(())
}

/// Validate a header and extract its fields.
///
/// `bytes` is the whole container as received. Tag mismatches are errors; a
/// declared payload length that disagrees with the bytes present is only
/// logged and reported in [`WavHeader::length_mismatch`], since the transport
/// already bounded what was delivered.
pub fn validate_header(bytes: &[u8]) -> Result<WavHeader, HeaderError> {
    if bytes.len() < HEADER_SIZE {
        return Err(HeaderError::TooShort(bytes.len()));
    }

    for (offset, tag, name) in [
        (0, RIFF, "RIFF"),
        (8, WAVE, "WAVE"),
        (12, FMT, "fmt "),
        (36, DATA, "data"),
    ] {
        if &bytes[offset..offset + 4] != tag {
            return Err(HeaderError::BadTag { offset, expected: name });
        }
    }

    let mut header = WavHeader {
        riff_size: u32_at(bytes, 4),
        format_code: u16_at(bytes, 20),
        channels: u16_at(bytes, 22),
        sample_rate: u32_at(bytes, 24),
        byte_rate: u32_at(bytes, 28),
        block_align: u16_at(bytes, 32),
        bits_per_sample: u16_at(bytes, 34),
        data_len: u32_at(bytes, 40),
        length_mismatch: None,
    };

    let actual = bytes.len() - HEADER_SIZE;
    if header.data_len as usize != actual {
        warn!(
            "[WAV] declared payload {} bytes, {} present",
            header.data_len, actual
        );
        header.length_mismatch = Some(LengthMismatch {
            declared: header.data_len,
            actual,
        });
    }

    Ok(header)
}

/// Locate the `data` chunk payload by walking the RIFF chunk list.
///
/// For containers whose header is not the canonical 44 bytes, e.g. with a
/// `LIST` chunk between `fmt ` and `data`. The range is clamped to the bytes
/// present. `None` if the outer RIFF/WAVE tags are wrong or no `data` chunk
/// starts inside `bytes`.
pub fn find_data_chunk(bytes: &[u8]) -> Option<Range<usize>> {
    if bytes.len() < 12 || &bytes[0..4] != RIFF || &bytes[8..12] != WAVE {
        return None;
    }

    let mut offset = 12usize;
    while offset.checked_add(8)? <= bytes.len() {
        let size = u32_at(bytes, offset + 4) as usize;
        let body = offset + 8;
        if &bytes[offset..offset + 4] == DATA {
            let end = body.saturating_add(size).min(bytes.len());
            return Some(body..end);
        }
        // Chunks are padded to even length
        offset = body.checked_add(size)?.checked_add(size & 1)?;
    }
    None
}

#[inline]
fn u16_at(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

#[inline]
fn u32_at(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}
