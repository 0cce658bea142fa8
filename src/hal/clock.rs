//! ESP timer clock and FreeRTOS delay.

use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::sys as esp_idf_sys;

use super::Clock;

/// Microsecond ESP timer, reported in milliseconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct EspClock;

impl Clock for EspClock {
    fn now_ms(&self) -> u64 {
        // SAFETY: esp_timer_get_time is callable from any task after boot
        let us = unsafe { esp_idf_sys::esp_timer_get_time() };
        (us / 1000) as u64
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }
}
