//! I2S HAL: INMP441 microphone in, PCM5102A DAC out.
//!
//! Both run I2S standard (Philips) mode, mono, at the configured format.
//! The microphone's L/R pin is tied to ground so it drives the left slot.

use esp_idf_svc::hal::delay::TickType;
use esp_idf_svc::hal::gpio::AnyIOPin;
use esp_idf_svc::hal::i2s::config::{
    Config, DataBitWidth, SlotMode, StdClkConfig, StdConfig, StdGpioConfig, StdSlotConfig,
};
use esp_idf_svc::hal::i2s::{I2sDriver, I2sRx, I2sTx, I2S0, I2S1};
use esp_idf_svc::sys::EspError;
use log::info;

use super::{Microphone, Speaker};
use crate::config::AudioFormat;
use crate::error::SatelliteError;

/// Upper bound on one DMA read; a frame arrives every few milliseconds.
const READ_TIMEOUT_MS: u64 = 100;
/// Silence written after playback to push out the DMA ring.
const FLUSH_BYTES: usize = 2048;

fn bit_width(format: &AudioFormat) -> DataBitWidth {
    match format.bits_per_sample {
        8 => DataBitWidth::Bits8,
        24 => DataBitWidth::Bits24,
        32 => DataBitWidth::Bits32,
        _ => DataBitWidth::Bits16,
    }
}

fn std_config(format: &AudioFormat, auto_clear: bool) -> StdConfig {
    StdConfig::new(
        Config::default().auto_clear(auto_clear),
        StdClkConfig::from_sample_rate_hz(format.sample_rate),
        StdSlotConfig::philips_slot_default(bit_width(format), SlotMode::Mono),
        StdGpioConfig::default(),
    )
}

fn peripheral_err(context: &str, e: EspError) -> SatelliteError {
    SatelliteError::Peripheral(format!("{}: {}", context, e))
}

/// Microphone on I2S0.
pub struct I2sMicrophone {
    driver: I2sDriver<'static, I2sRx>,
}

impl I2sMicrophone {
    pub fn new(
        i2s: I2S0,
        sck: AnyIOPin,
        ws: AnyIOPin,
        sd: AnyIOPin,
        format: &AudioFormat,
    ) -> Result<Self, EspError> {
        let config = std_config(format, false);
        let mut driver =
            I2sDriver::new_std_rx(i2s, &config, sck, sd, Option::<AnyIOPin>::None, ws)?;
        driver.rx_enable()?;
        info!("[I2S] Microphone initialized on I2S0");
        Ok(Self { driver })
    }
}

impl Microphone for I2sMicrophone {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SatelliteError> {
        self.driver
            .read(buf, TickType::new_millis(READ_TIMEOUT_MS).ticks())
            .map_err(|e| peripheral_err("i2s read", e))
    }
}

/// DAC on I2S1.
pub struct I2sSpeaker {
    driver: I2sDriver<'static, I2sTx>,
}

impl I2sSpeaker {
    pub fn new(
        i2s: I2S1,
        bck: AnyIOPin,
        lrck: AnyIOPin,
        din: AnyIOPin,
        format: &AudioFormat,
    ) -> Result<Self, EspError> {
        // auto_clear: underflow outputs silence instead of repeating the ring
        let config = std_config(format, true);
        let mut driver =
            I2sDriver::new_std_tx(i2s, &config, bck, din, Option::<AnyIOPin>::None, lrck)?;
        driver.tx_enable()?;
        info!("[I2S] DAC initialized on I2S1");
        Ok(Self { driver })
    }
}

impl Speaker for I2sSpeaker {
    fn write(&mut self, pcm: &[u8]) -> Result<usize, SatelliteError> {
        self.driver
            .write(pcm, esp_idf_svc::hal::delay::BLOCK)
            .map_err(|e| peripheral_err("i2s write", e))
    }

    fn flush(&mut self) -> Result<(), SatelliteError> {
        let silence = [0u8; FLUSH_BYTES];
        self.driver
            .write_all(&silence, esp_idf_svc::hal::delay::BLOCK)
            .map_err(|e| peripheral_err("i2s flush", e))
    }
}
