//! GPIO HAL for the PTT button and status LED.

use esp_idf_svc::hal::gpio::{AnyIOPin, Input, Output, PinDriver, Pull};
use esp_idf_svc::sys::EspError;
use log::warn;

use super::{PttInput, StatusIndicator};

/// Momentary button to ground, internal pull-up. Pressed reads low.
pub struct PttButton {
    pin: PinDriver<'static, AnyIOPin, Input>,
}

impl PttButton {
    pub fn new(pin: AnyIOPin) -> Result<Self, EspError> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Up)?;
        Ok(Self { pin })
    }
}

impl PttInput for PttButton {
    fn is_pressed(&mut self) -> bool {
        self.pin.is_low()
    }
}

/// Status LED, on while busy.
pub struct StatusLed {
    pin: PinDriver<'static, AnyIOPin, Output>,
}

impl StatusLed {
    pub fn new(pin: AnyIOPin) -> Result<Self, EspError> {
        let mut pin = PinDriver::output(pin)?;
        pin.set_low()?;
        Ok(Self { pin })
    }
}

impl StatusIndicator for StatusLed {
    fn set_busy(&mut self, busy: bool) {
        let result = if busy { self.pin.set_high() } else { self.pin.set_low() };
        if let Err(e) = result {
            warn!("[LED] set failed: {}", e);
        }
    }
}
