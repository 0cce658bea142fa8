//! Session statistics since boot.
//!
//! Plain counters owned by the controller. Never cleared; logged after each
//! cycle.

use crate::error::SatelliteError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Idle → Recording transitions
    pub recordings: u32,
    /// Utterances dropped as too short
    pub discarded: u32,
    /// Recordings ended by a full buffer
    pub forced_stops: u32,
    /// Exchanges attempted (request sent)
    pub exchanges: u32,
    pub audio_responses: u32,
    pub text_responses: u32,
    pub playbacks: u32,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub link_unavailable: u32,
    pub transport_errors: u32,
    pub oversize_responses: u32,
    pub malformed_responses: u32,
    pub other_errors: u32,
}

impl SessionStats {
    /// Count a reported error by kind.
    pub fn record_error(&mut self, error: &SatelliteError) {
        let counter = match error {
            SatelliteError::LinkUnavailable => &mut self.link_unavailable,
            SatelliteError::Transport { .. } => &mut self.transport_errors,
            SatelliteError::ResponseTooLarge { .. } => &mut self.oversize_responses,
            SatelliteError::MalformedResponse(_) => &mut self.malformed_responses,
            SatelliteError::BufferExhausted { .. }
            | SatelliteError::PhaseViolation { .. }
            | SatelliteError::BufferAllocation { .. }
            | SatelliteError::Peripheral(_) => &mut self.other_errors,
        };
        *counter = counter.saturating_add(1);
    }

    /// Total errors of every kind
    pub fn errors(&self) -> u32 {
        self.link_unavailable
            + self.transport_errors
            + self.oversize_responses
            + self.malformed_responses
            + self.other_errors
    }
}

impl core::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "rec={} discarded={} forced={} exch={} audio={} text={} played={} tx={}B rx={}B errors={}",
            self.recordings,
            self.discarded,
            self.forced_stops,
            self.exchanges,
            self.audio_responses,
            self.text_responses,
            self.playbacks,
            self.bytes_sent,
            self.bytes_received,
            self.errors()
        )
    }
}
