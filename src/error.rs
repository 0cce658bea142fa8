//! Error taxonomy for the satellite pipeline.
//!
//! Every variant except [`SatelliteError::BufferAllocation`] is recovered by
//! the controller: the state machine returns to `Idle`, the busy indicator
//! clears and the error is logged. Nothing is propagated past the controller
//! because there is nothing above it.

use thiserror::Error;

use crate::arena::Phase;
use crate::wav::HeaderError;

/// Pipeline error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SatelliteError {
    /// Network link was down when an exchange was due.
    #[error("network link unavailable")]
    LinkUnavailable,

    /// Hub answered with a non-success status, or the request never completed.
    #[error("{}", transport_message(.status, .reason))]
    Transport { status: Option<u16>, reason: String },

    /// Audio response would not fit the shared buffer.
    #[error("audio response of {declared} bytes exceeds buffer capacity {capacity}")]
    ResponseTooLarge { declared: usize, capacity: usize },

    /// Audio response did not carry a usable WAV header.
    #[error("malformed audio response: {0}")]
    MalformedResponse(HeaderError),

    /// Capture filled the buffer.
    #[error("capture buffer exhausted at {capacity} bytes")]
    BufferExhausted { capacity: usize },

    /// Shared buffer accessed outside the phase that owns it.
    #[error("buffer phase violation: expected {expected:?}, found {actual:?}")]
    PhaseViolation { expected: Phase, actual: Phase },

    /// Backing memory for the shared buffer could not be reserved.
    #[error("could not allocate {requested} bytes for the audio buffer")]
    BufferAllocation { requested: usize },

    /// Peripheral driver failure.
    #[error("peripheral error: {0}")]
    Peripheral(String),
}

fn transport_message(status: &Option<u16>, reason: &str) -> String {
    match status {
        Some(code) => format!("transport error: HTTP {} - {}", code, reason),
        None => format!("transport error: {}", reason),
    }
}

impl SatelliteError {
    /// Shorthand for a failure with no HTTP status.
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display() {
        let e = SatelliteError::Transport {
            status: Some(500),
            reason: "Internal Server Error".into(),
        };
        assert_eq!(e.to_string(), "transport error: HTTP 500 - Internal Server Error");

        let e = SatelliteError::connection("connection refused");
        assert_eq!(e.to_string(), "transport error: connection refused");
    }
}
