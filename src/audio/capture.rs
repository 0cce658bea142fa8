//! Capture: microphone PCM into the shared arena.
//!
//! Chunks are pulled through a small scratch buffer and appended whole. A
//! chunk that would overflow the arena is dropped and capture stops; what
//! was captured before it is kept and sent.

use log::{info, warn};

use crate::arena::AudioArena;
use crate::config::{AudioFormat, HEADER_SIZE};
use crate::error::SatelliteError;
use crate::hal::Microphone;

/// Result of one capture step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Capture is not running
    Inactive,
    /// `n` bytes appended (may be zero)
    Appended(usize),
    /// Arena is full; capture has stopped
    BufferFull,
    /// Microphone read failed; chunk skipped
    ReadFailed,
}

/// A finalized recording sitting in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utterance {
    /// PCM bytes after the header
    pub payload_bytes: usize,
    /// Header plus payload
    pub total_bytes: usize,
    pub duration_ms: u32,
}

pub struct Capture<M: Microphone> {
    mic: M,
    scratch: Vec<u8>,
    format: AudioFormat,
    active: bool,
}

impl<M: Microphone> Capture<M> {
    /// `chunk_bytes` is the most read from the microphone per step.
    pub fn new(mic: M, chunk_bytes: usize, format: AudioFormat) -> Self {
        Self {
            mic,
            scratch: vec![0; chunk_bytes.max(1)],
            format,
            active: false,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn microphone(&self) -> &M {
        &self.mic
    }

    /// Claim the arena and reserve the header slot.
    pub fn start(&mut self, arena: &mut AudioArena) -> Result<(), SatelliteError> {
        arena.begin_capture()?;
        self.active = true;
        info!("[REC] Recording started...");
        Ok(())
    }

    /// Pull one chunk from the microphone and append it.
    pub fn capture_chunk(&mut self, arena: &mut AudioArena) -> ChunkOutcome {
        if !self.active {
            return ChunkOutcome::Inactive;
        }

        let n = match self.mic.read(&mut self.scratch) {
            Ok(n) => n.min(self.scratch.len()),
            Err(e) => {
                warn!("[REC] {}", e);
                return ChunkOutcome::ReadFailed;
            }
        };

        match arena.append(&self.scratch[..n]) {
            Ok(()) => ChunkOutcome::Appended(n),
            Err(SatelliteError::BufferExhausted { .. }) => {
                info!("[REC] Buffer full, stopping.");
                self.active = false;
                ChunkOutcome::BufferFull
            }
            Err(e) => {
                warn!("[REC] {}", e);
                self.active = false;
                ChunkOutcome::Inactive
            }
        }
    }

    /// Stop capturing and finalize the header over the captured payload.
    ///
    /// Valid after a forced stop too, as long as the arena still holds the
    /// recording.
    pub fn stop(&mut self, arena: &mut AudioArena) -> Result<Utterance, SatelliteError> {
        self.active = false;
        let payload_bytes = arena.finish_capture(&self.format)?;
        let duration_ms = self.format.duration_ms(payload_bytes);

        info!(
            "[REC] Stopped. Recorded {}.{} seconds ({} bytes)",
            duration_ms / 1000,
            (duration_ms % 1000) / 100,
            payload_bytes
        );

        Ok(Utterance {
            payload_bytes,
            total_bytes: payload_bytes + HEADER_SIZE,
            duration_ms,
        })
    }
}
