//! Hardware Abstraction Layer for the voice satellite.
//!
//! Thin traits over the peripherals the controller touches. Business logic
//! stays in the core modules and only ever sees these traits; the ESP-IDF
//! drivers behind them are compiled for the device only. Host tests plug in
//! in-memory fakes.
//!
//! All calls are blocking. The capture read is bounded by the I2S DMA
//! cadence, speaker writes by DMA drain, and HTTP by the exchange timeout.

use crate::error::SatelliteError;
use crate::transport::HttpConnection;

#[cfg(target_os = "espidf")]
pub mod clock;
#[cfg(target_os = "espidf")]
pub mod gpio;
#[cfg(target_os = "espidf")]
pub mod http;
#[cfg(target_os = "espidf")]
pub mod i2s;
#[cfg(target_os = "espidf")]
pub mod wifi;

/// PCM source (I2S microphone).
pub trait Microphone {
    /// Read up to `buf.len()` bytes of little-endian PCM.
    ///
    /// Blocks no longer than the peripheral's own read latency. May return
    /// fewer bytes than requested, including zero.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SatelliteError>;
}

/// PCM sink (I2S DAC).
pub trait Speaker {
    /// Queue PCM for output. Returns the number of bytes accepted.
    fn write(&mut self, pcm: &[u8]) -> Result<usize, SatelliteError>;

    /// Drain peripheral-side buffering so nothing stale plays next time.
    fn flush(&mut self) -> Result<(), SatelliteError>;
}

/// Raw push-to-talk level.
pub trait PttInput {
    /// `true` while the button is held. Not debounced.
    fn is_pressed(&mut self) -> bool;
}

/// Operator-visible idle/busy signal.
pub trait StatusIndicator {
    fn set_busy(&mut self, busy: bool);
}

/// Network association state.
pub trait NetworkLink {
    fn is_connected(&self) -> bool;

    /// Called before each exchange. Links that can re-associate make one
    /// attempt here when down; the default only reports the current state.
    fn ensure_connected(&mut self) -> bool {
        self.is_connected()
    }
}

/// Monotonic time and blocking delay.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed point.
    fn now_ms(&self) -> u64;

    fn delay_ms(&mut self, ms: u32);
}

/// Peripheral set the controller is built from.
pub trait Board {
    type Mic: Microphone;
    type Speaker: Speaker;
    type Ptt: PttInput;
    type Indicator: StatusIndicator;
    type Link: NetworkLink;
    type Http: HttpConnection;
    type Clock: Clock;
}

/// Concrete peripherals, created once at boot and owned by the controller
/// for the rest of the program.
pub struct Peripherals<B: Board> {
    pub mic: B::Mic,
    pub speaker: B::Speaker,
    pub ptt: B::Ptt,
    pub indicator: B::Indicator,
    pub link: B::Link,
    pub http: B::Http,
    pub clock: B::Clock,
}
