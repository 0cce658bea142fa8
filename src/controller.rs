//! Recording controller: the PTT state machine
//!
//! ```text
//!          press                 release / buffer full
//!  Idle ──────────▶ Recording ───────────────────────▶ Exchanging
//!   ▲                  │ held: capture one chunk          │    │
//!   │                  ◀──┘                        Audio │    │ Text / error /
//!   │                                                    ▼    │ too short /
//!   └──────────────── done ─────────────────────── Playing    │ link down
//!   └─────────────────────────────────────────────────────────┘
//! ```
//!
//! One PTT sample per [`Controller::tick`]. `Exchanging` and `Playing` run to
//! completion inside the tick that entered them, so PTT activity during those
//! phases is never seen; the next tick starts from `Idle` with whatever level
//! the button has by then.
//!
//! The controller owns every resource: the arena, the peripherals, the
//! stats. Errors stop here. Each one is logged, counted, and the machine
//! returns to `Idle` with the indicator off.

use core::ops::Range;

use log::{debug, error, info, warn};

use crate::arena::AudioArena;
use crate::audio::{Capture, ChunkOutcome, Playback, PlaybackReport};
use crate::config::{AudioFormat, SatelliteConfig};
use crate::error::SatelliteError;
use crate::hal::{Board, Clock, NetworkLink, Peripherals, PttInput, StatusIndicator};
use crate::ptt::{PttDebouncer, PttEdge};
use crate::stats::SessionStats;
use crate::transport::{ResponseKind, TextResponse, TransportClient};
use crate::wav::{self, HeaderError, HEADER_SIZE};

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Recording,
    Exchanging,
    Playing,
}

/// What a tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to do
    NoChange,
    /// Capture began (and took its first chunk)
    RecordingStarted,
    /// One capture step while held
    Captured(ChunkOutcome),
    /// Utterance below the minimum duration, not sent
    Discarded { duration_ms: u32 },
    /// Audio response played
    Played(PlaybackReport),
    /// Text response shown
    Text(TextResponse),
    /// Cycle ended with an error
    Failed(SatelliteError),
}

/// Result of one loop iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Debounced PTT edge seen this tick
    pub edge: Option<PttEdge>,
    pub from: State,
    pub to: State,
    pub outcome: Outcome,
}

pub struct Controller<B: Board> {
    config: SatelliteConfig,
    arena: AudioArena,
    capture: Capture<B::Mic>,
    playback: Playback<B::Speaker>,
    transport: TransportClient<B::Http>,
    ptt: B::Ptt,
    debouncer: PttDebouncer,
    indicator: B::Indicator,
    link: B::Link,
    clock: B::Clock,
    state: State,
    stats: SessionStats,
}

impl<B: Board> Controller<B> {
    /// Take ownership of the arena and the peripherals.
    ///
    /// The arena is allocated by the caller before any peripheral is
    /// brought up, so a failed allocation halts boot early.
    pub fn new(config: SatelliteConfig, arena: AudioArena, peripherals: Peripherals<B>) -> Self {

        let Peripherals {
            mic,
            speaker,
            ptt,
            mut indicator,
            link,
            http,
            clock,
        } = peripherals;
        indicator.set_busy(false);

        Self {
            capture: Capture::new(mic, config.capture_chunk_bytes, config.format),
            playback: Playback::new(speaker, config.playback_chunk_bytes, config.format),
            transport: TransportClient::new(http, &config),
            debouncer: PttDebouncer::new(config.debounce_ms),
            ptt,
            indicator,
            link,
            clock,
            arena,
            config,
            state: State::Idle,
            stats: SessionStats::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn config(&self) -> &SatelliteConfig {
        &self.config
    }

    pub fn arena(&self) -> &AudioArena {
        &self.arena
    }

    pub fn capture(&self) -> &Capture<B::Mic> {
        &self.capture
    }

    pub fn playback(&self) -> &Playback<B::Speaker> {
        &self.playback
    }

    pub fn transport(&self) -> &TransportClient<B::Http> {
        &self.transport
    }

    pub fn indicator(&self) -> &B::Indicator {
        &self.indicator
    }

    pub fn link(&self) -> &B::Link {
        &self.link
    }

    /// Audio captured so far in the current recording
    pub fn recorded_ms(&self) -> u32 {
        match self.state {
            State::Recording => self.config.format.duration_ms(self.arena.payload_len()),
            _ => 0,
        }
    }

    /// Operating loop. Never returns.
    pub fn run(&mut self) -> ! {
        info!("[READY] Press and hold the button to record.");
        info!("[READY] Release to send audio to server.");
        loop {
            self.tick();
        }
    }

    /// One loop iteration: sample PTT, act on it, then wait the loop delay.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now_ms();
        let raw = self.ptt.is_pressed();
        let edge = self.debouncer.update(raw, now);
        let from = self.state;

        let mut outcome = match (self.state, edge) {
            (State::Idle, Some(PttEdge::Pressed)) => self.begin_recording(),
            (State::Recording, Some(PttEdge::Released)) => self.end_recording(),
            _ => Outcome::NoChange,
        };

        // Held (including the tick that pressed): capture one chunk
        if self.state == State::Recording {
            match self.capture.capture_chunk(&mut self.arena) {
                ChunkOutcome::BufferFull => {
                    self.stats.forced_stops += 1;
                    outcome = self.end_recording();
                }
                ChunkOutcome::Inactive => outcome = self.end_recording(),
                step => {
                    if outcome == Outcome::NoChange {
                        outcome = Outcome::Captured(step);
                    }
                }
            }
        }

        self.clock.delay_ms(self.config.loop_delay_ms);

        TickReport {
            edge,
            from,
            to: self.state,
            outcome,
        }
    }

    fn begin_recording(&mut self) -> Outcome {
        if let Err(e) = self.capture.start(&mut self.arena) {
            self.arena.release();
            return self.fail(e);
        }
        self.indicator.set_busy(true);
        self.state = State::Recording;
        self.stats.recordings += 1;
        Outcome::RecordingStarted
    }

    /// Recording → Exchanging → (Playing) → Idle, all in this call.
    fn end_recording(&mut self) -> Outcome {
        self.state = State::Exchanging;
        self.indicator.set_busy(false);

        let outcome = self.finish_utterance();

        self.arena.release();
        self.indicator.set_busy(false);
        self.state = State::Idle;
        info!("[STATS] {}", self.stats);
        outcome
    }

    fn finish_utterance(&mut self) -> Outcome {
        let utterance = match self.capture.stop(&mut self.arena) {
            Ok(u) => u,
            Err(e) => return self.fail(e),
        };

        if utterance.duration_ms < self.config.min_utterance_ms {
            info!("[REC] Too short ({} ms), discarding.", utterance.duration_ms);
            self.stats.discarded += 1;
            return Outcome::Discarded {
                duration_ms: utterance.duration_ms,
            };
        }

        if !self.link.ensure_connected() {
            warn!("[HTTP] Network not connected, skipping send.");
            return self.fail(SatelliteError::LinkUnavailable);
        }

        self.indicator.set_busy(true);
        self.stats.exchanges += 1;
        self.stats.bytes_sent += utterance.total_bytes as u64;

        let response = self
            .transport
            .exchange(&mut self.arena, utterance.total_bytes, &mut self.clock);

        match response {
            Ok(ResponseKind::Audio { len }) => {
                self.stats.audio_responses += 1;
                self.stats.bytes_received += len as u64;
                self.play_response(len)
            }
            Ok(ResponseKind::Text(text)) => {
                self.stats.text_responses += 1;
                self.stats.bytes_received += text.body.len() as u64;
                info!("[HTTP] Server response: {}", text.summary());
                if text.truncated {
                    warn!("[HTTP] Response truncated to {} bytes", text.body.len());
                }
                Outcome::Text(text)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Play an `Audio` reply. A header that cannot be parsed is counted as
    /// malformed but the bytes after the canonical header are played anyway.
    fn play_response(&mut self, len: usize) -> Outcome {
        let located = match self.arena.playable() {
            Ok(bytes) => locate_pcm(&bytes[..len.min(bytes.len())], &self.config.format),
            Err(e) => return self.fail(e),
        };
        let pcm = match located {
            Ok(range) => range,
            Err(e) => {
                let e = SatelliteError::MalformedResponse(e);
                warn!("[PLAY] {}; playing anyway", e);
                self.stats.record_error(&e);
                HEADER_SIZE..len
            }
        };

        self.state = State::Playing;
        match self.playback.play_range(&self.arena, pcm) {
            Ok(report) => {
                self.stats.playbacks += 1;
                Outcome::Played(report)
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, e: SatelliteError) -> Outcome {
        error!("{}", e);
        self.stats.record_error(&e);
        Outcome::Failed(e)
    }
}

/// PCM span of a received container.
///
/// Canonical headers are checked against `format`; anything else falls back
/// to a chunk walk for the `data` chunk.
fn locate_pcm(bytes: &[u8], format: &AudioFormat) -> Result<Range<usize>, HeaderError> {
    match wav::validate_header(bytes) {
        Ok(header) => {
            if !header.matches(format) {
                warn!(
                    "[PLAY] Response format {:?} differs from {:?}",
                    header.format(),
                    format
                );
            }
            Ok(HEADER_SIZE..bytes.len())
        }
        Err(e) => match wav::find_data_chunk(bytes) {
            Some(range) => {
                debug!("[PLAY] {}; data chunk at {}..{}", e, range.start, range.end);
                Ok(range)
            }
            None => Err(e),
        },
    }
}
