//! Shared audio arena
//!
//! One fixed-capacity byte region, reused for every phase of an utterance:
//!
//! ```text
//! Free ──begin_capture──▶ Capturing ──finish_capture──▶ Sending
//!  ▲                                                      │
//!  │                                            begin_receive
//!  │                                                      ▼
//!  └──────────── release ◀── Playing ◀──finish_receive── Receiving
//! ```
//!
//! Every accessor checks the phase it belongs to, so a stray reader or
//! writer gets a [`SatelliteError::PhaseViolation`] instead of bytes from
//! another phase. `release` is valid from any phase.

use crate::config::{AudioFormat, HEADER_SIZE};
use crate::error::SatelliteError;
use crate::wav;

/// Current logical owner of the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nobody holds the buffer
    Free,
    /// Microphone writes PCM after the reserved header
    Capturing,
    /// Finalized container is being uploaded
    Sending,
    /// Response bytes are written from offset 0
    Receiving,
    /// Speaker reads the received container
    Playing,
}

/// Single owned byte arena with a write cursor and phase tag
pub struct AudioArena {
    buf: Vec<u8>,
    cursor: usize,
    phase: Phase,
}

impl AudioArena {
    /// Reserve `capacity` bytes up front.
    ///
    /// This is the only allocation the pipeline makes for audio. Failure is
    /// reported rather than aborting so boot can report it and halt.
    pub fn allocate(capacity: usize) -> Result<Self, SatelliteError> {
        let capacity = capacity.max(HEADER_SIZE);
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| SatelliteError::BufferAllocation { requested: capacity })?;
        buf.resize(capacity, 0);

        Ok(Self {
            buf,
            cursor: 0,
            phase: Phase::Free,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Next free offset
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes left before the arena is full
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.cursor
    }

    fn require(&self, expected: Phase) -> Result<(), SatelliteError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SatelliteError::PhaseViolation {
                expected,
                actual: self.phase,
            })
        }
    }

    fn transition(&mut self, from: Phase, to: Phase) -> Result<(), SatelliteError> {
        self.require(from)?;
        self.phase = to;
        Ok(())
    }

    // ---- capture ----

    /// Claim the arena for a recording. The header slot is reserved.
    pub fn begin_capture(&mut self) -> Result<(), SatelliteError> {
        self.transition(Phase::Free, Phase::Capturing)?;
        self.cursor = HEADER_SIZE;
        Ok(())
    }

    /// PCM bytes captured so far
    pub fn payload_len(&self) -> usize {
        self.cursor.saturating_sub(HEADER_SIZE)
    }

    /// Append captured PCM at the cursor.
    ///
    /// All or nothing: if `bytes` does not fit, nothing is written and
    /// [`SatelliteError::BufferExhausted`] is returned.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), SatelliteError> {
        self.require(Phase::Capturing)?;
        let end = self.cursor + bytes.len();
        if end > self.capacity() {
            return Err(SatelliteError::BufferExhausted {
                capacity: self.capacity(),
            });
        }
        self.buf[self.cursor..end].copy_from_slice(bytes);
        self.cursor = end;
        Ok(())
    }

    /// Patch the header in front of the captured payload and hand the
    /// container to the sender. Returns the payload length.
    pub fn finish_capture(&mut self, format: &AudioFormat) -> Result<usize, SatelliteError> {
        self.require(Phase::Capturing)?;
        let payload = self.payload_len();
        let capacity = self.capacity();
        // SatelliteConfig::validate keeps capacity within u32
        wav::write_header(&mut self.buf, payload as u32, format)
            .map_err(|_| SatelliteError::BufferExhausted { capacity })?;
        self.phase = Phase::Sending;
        Ok(payload)
    }

    // ---- send ----

    /// Finalized container (header + payload)
    pub fn outbound(&self) -> Result<&[u8], SatelliteError> {
        self.require(Phase::Sending)?;
        Ok(&self.buf[..self.cursor])
    }

    // ---- receive ----

    /// Switch from the uploaded request to the response. Cursor goes to 0.
    pub fn begin_receive(&mut self) -> Result<(), SatelliteError> {
        self.transition(Phase::Sending, Phase::Receiving)?;
        self.cursor = 0;
        Ok(())
    }

    /// Writable region from the cursor up to `end` (clamped to capacity).
    pub fn receive_slot(&mut self, end: usize) -> Result<&mut [u8], SatelliteError> {
        self.require(Phase::Receiving)?;
        let end = end.min(self.capacity()).max(self.cursor);
        Ok(&mut self.buf[self.cursor..end])
    }

    /// Account for `n` bytes written into the last receive slot.
    pub fn commit(&mut self, n: usize) -> Result<(), SatelliteError> {
        self.require(Phase::Receiving)?;
        self.cursor = (self.cursor + n).min(self.capacity());
        Ok(())
    }

    /// Hand the received container to playback. Returns its length.
    pub fn finish_receive(&mut self) -> Result<usize, SatelliteError> {
        self.transition(Phase::Receiving, Phase::Playing)?;
        Ok(self.cursor)
    }

    // ---- playback ----

    /// Received container (header + PCM)
    pub fn playable(&self) -> Result<&[u8], SatelliteError> {
        self.require(Phase::Playing)?;
        Ok(&self.buf[..self.cursor])
    }

    /// Return the arena to `Free` from any phase.
    pub fn release(&mut self) {
        self.phase = Phase::Free;
        self.cursor = 0;
    }
}

impl core::fmt::Debug for AudioArena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AudioArena")
            .field("capacity", &self.capacity())
            .field("cursor", &self.cursor)
            .field("phase", &self.phase)
            .finish()
    }
}
