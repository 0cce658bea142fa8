//! # VoiceSatellite
//!
//! Push-to-talk voice satellite: record while the button is held, send the
//! utterance to the hub as WAV, play back the spoken answer.
//!
//! ## Architecture
//!
//! One owner, one buffer, one loop:
//! - [`Controller`] is the only component with state transitions
//! - [`AudioArena`] is the only audio memory, reused by capture, send,
//!   receive and playback in turn; its phase tag says who may touch it
//! - Peripherals sit behind the [`hal`] traits so the whole pipeline runs on
//!   the host against fakes
//!
//! Nothing runs concurrently. Every blocking call happens inside a
//! controller transition.

pub mod arena;
pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod hal;
pub mod ptt;
pub mod stats;
pub mod transport;
pub mod wav;

pub use arena::{AudioArena, Phase};
pub use config::{AudioFormat, SatelliteConfig};
pub use controller::{Controller, Outcome, State, TickReport};
pub use error::SatelliteError;
pub use hal::{Board, Peripherals};
pub use stats::SessionStats;
pub use transport::{HttpConnection, ResponseKind, TransportClient};
