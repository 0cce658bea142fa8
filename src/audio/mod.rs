//! Audio subsystem: capture into and playback out of the shared arena
//!
//! Architecture:
//! - Capture: I2S microphone → scratch chunk → arena after the header slot
//! - Playback: arena after the header → I2S DAC in fixed chunks, then flush
//! - Both are blocking and only run in their own arena phase

pub mod capture;
pub mod playback;

pub use capture::{Capture, ChunkOutcome, Utterance};
pub use playback::{Playback, PlaybackReport};
