//! VoiceSatellite firmware entry point
//!
//! Boot order:
//! 1. Logger and banner
//! 2. Network settings from NVS over the compile-time defaults; a fresh
//!    install stores the defaults
//! 3. Audio buffer (fatal on failure), before any peripheral is claimed
//! 4. I2S, GPIO, Wi-Fi, HTTP
//! 5. Controller loop, forever

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio::AnyIOPin;
    use esp_idf_svc::hal::peripherals::Peripherals as EspPeripherals;
    use esp_idf_svc::log::EspLogger;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use log::{error, info, warn};

    use voice_satellite::config::nvs::{self, LoadResult};
    use voice_satellite::hal::clock::EspClock;
    use voice_satellite::hal::gpio::{PttButton, StatusLed};
    use voice_satellite::hal::http::EspHttp;
    use voice_satellite::hal::i2s::{I2sMicrophone, I2sSpeaker};
    use voice_satellite::hal::wifi::WifiLink;
    use voice_satellite::{AudioArena, Board, Controller, Peripherals, SatelliteConfig};

    struct EspBoard;

    impl Board for EspBoard {
        type Mic = I2sMicrophone;
        type Speaker = I2sSpeaker;
        type Ptt = PttButton;
        type Indicator = StatusLed;
        type Link = WifiLink;
        type Http = EspHttp;
        type Clock = EspClock;
    }

    fn pin(num: u8) -> AnyIOPin {
        // SAFETY: every GPIO in PinConfig is claimed exactly once, here at boot
        unsafe { AnyIOPin::new(num as i32) }
    }

    /// Stop here with the reason on the console.
    fn halt(reason: &str) -> ! {
        error!("{}", reason);
        loop {
            FreeRtos::delay_ms(1000);
        }
    }

    pub fn run() -> ! {
        esp_idf_svc::sys::link_patches();
        EspLogger::initialize_default();

        info!("========================================");
        info!("{}", env!("VERSION_STRING"));
        info!("========================================");

        let mut config = SatelliteConfig::default();

        let nvs_partition = match EspDefaultNvsPartition::take() {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("[NVS] partition unavailable: {}", e);
                None
            }
        };
        if let Some(partition) = nvs_partition.clone() {
            match nvs::load_network_settings(partition.clone(), &mut config.network) {
                Ok(LoadResult::UpToDate) => info!("[NVS] Network settings loaded"),
                Ok(LoadResult::FreshInstall) => {
                    info!("[NVS] No stored settings, using defaults");
                    if !config.network.wifi_ssid.is_empty() {
                        match nvs::save_network_settings(partition, &config.network) {
                            Ok(()) => info!("[NVS] Defaults stored"),
                            Err(e) => warn!("[NVS] Could not store defaults: {}", e),
                        }
                    }
                }
                Err(e) => warn!("[NVS] {}; using defaults", e),
            }
        }

        if let Err(e) = config.validate() {
            halt(&format!("[CONFIG] FATAL: {}", e));
        }

        let Some(capacity) = config.buffer_capacity() else {
            halt("[MEM] FATAL: buffer size overflows");
        };
        let arena = AudioArena::allocate(capacity)
            .unwrap_or_else(|e| halt(&format!("[MEM] FATAL: {}", e)));
        info!("[MEM] Allocated {} bytes for the audio buffer", arena.capacity());

        let Ok(esp) = EspPeripherals::take() else {
            halt("[BOOT] FATAL: peripherals already taken");
        };
        let Ok(sysloop) = EspSystemEventLoop::take() else {
            halt("[BOOT] FATAL: system event loop unavailable");
        };

        let pins = config.pins;
        let format = config.format;

        let mic = I2sMicrophone::new(
            esp.i2s0,
            pin(pins.mic_sck),
            pin(pins.mic_ws),
            pin(pins.mic_sd),
            &format,
        )
        .unwrap_or_else(|e| halt(&format!("[I2S] FATAL: microphone: {}", e)));
        let speaker = I2sSpeaker::new(
            esp.i2s1,
            pin(pins.dac_bck),
            pin(pins.dac_lrck),
            pin(pins.dac_din),
            &format,
        )
        .unwrap_or_else(|e| halt(&format!("[I2S] FATAL: DAC: {}", e)));
        let ptt = PttButton::new(pin(pins.ptt_button))
            .unwrap_or_else(|e| halt(&format!("[GPIO] FATAL: PTT: {}", e)));
        let indicator = StatusLed::new(pin(pins.status_led))
            .unwrap_or_else(|e| halt(&format!("[GPIO] FATAL: LED: {}", e)));

        let link = WifiLink::start(esp.modem, sysloop, nvs_partition, &config)
            .unwrap_or_else(|e| halt(&format!("[WIFI] FATAL: {}", e)));

        let peripherals = Peripherals::<EspBoard> {
            mic,
            speaker,
            ptt,
            indicator,
            link,
            http: EspHttp::new(),
            clock: EspClock,
        };

        let mut controller = Controller::new(config, arena, peripherals);
        info!("[HTTP] Server: {}", controller.transport().url());
        controller.run()
    }
}

#[cfg(target_os = "espidf")]
fn main() {
    firmware::run();
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!(
        "voice-satellite firmware targets ESP-IDF; build with --target xtensa-esp32s3-espidf"
    );
}
