//! In-memory peripherals shared by the integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use voice_satellite::config::{AudioFormat, SatelliteConfig};
use voice_satellite::hal::{
    Board, Clock, Microphone, NetworkLink, Peripherals, PttInput, Speaker, StatusIndicator,
};
use voice_satellite::transport::{HttpConnection, ResponseHead};
use voice_satellite::wav;
use voice_satellite::arena::AudioArena;
use voice_satellite::{Controller, SatelliteError};

// ---- microphone ----

/// Produces a counting byte pattern, `per_read` bytes per call.
pub struct ToneMic {
    pub per_read: usize,
    pub reads: usize,
    /// Read numbers (0-based) that fail
    pub fail_on: Vec<usize>,
    next: u8,
}

impl ToneMic {
    pub fn new(per_read: usize) -> Self {
        Self {
            per_read,
            reads: 0,
            fail_on: Vec::new(),
            next: 0,
        }
    }
}

impl Microphone for ToneMic {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SatelliteError> {
        let call = self.reads;
        self.reads += 1;
        if self.fail_on.contains(&call) {
            return Err(SatelliteError::Peripheral("i2s read: timeout".into()));
        }
        let n = self.per_read.min(buf.len());
        for b in &mut buf[..n] {
            *b = self.next;
            self.next = self.next.wrapping_add(1);
        }
        Ok(n)
    }
}

// ---- speaker ----

#[derive(Default)]
pub struct RecordingSpeaker {
    pub played: Vec<u8>,
    /// Length of every write call, as requested
    pub writes: Vec<usize>,
    pub flushes: usize,
    /// Accept at most this many bytes per write
    pub max_accept: Option<usize>,
    /// Fail the write with this index (0-based)
    pub fail_on: Option<usize>,
}

impl Speaker for RecordingSpeaker {
    fn write(&mut self, pcm: &[u8]) -> Result<usize, SatelliteError> {
        let call = self.writes.len();
        self.writes.push(pcm.len());
        if self.fail_on == Some(call) {
            return Err(SatelliteError::Peripheral("i2s write: failed".into()));
        }
        let n = self.max_accept.map_or(pcm.len(), |max| max.min(pcm.len()));
        self.played.extend_from_slice(&pcm[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), SatelliteError> {
        self.flushes += 1;
        Ok(())
    }
}

// ---- PTT, LED, link ----

/// Button level shared with the test body.
#[derive(Clone, Default)]
pub struct SharedPtt(Rc<Cell<bool>>);

impl SharedPtt {
    pub fn set(&self, pressed: bool) {
        self.0.set(pressed);
    }
}

impl PttInput for SharedPtt {
    fn is_pressed(&mut self) -> bool {
        self.0.get()
    }
}

#[derive(Default)]
pub struct FakeLed {
    pub busy: bool,
    pub history: Vec<bool>,
}

impl StatusIndicator for FakeLed {
    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        self.history.push(busy);
    }
}

/// Link that is up or down; a down link may come back on the first rejoin.
pub struct FakeLink {
    pub up: bool,
    pub comes_back: bool,
    pub reconnects: usize,
}

impl FakeLink {
    pub fn new(up: bool) -> Self {
        Self {
            up,
            comes_back: false,
            reconnects: 0,
        }
    }
}

impl NetworkLink for FakeLink {
    fn is_connected(&self) -> bool {
        self.up
    }

    fn ensure_connected(&mut self) -> bool {
        if !self.up {
            self.reconnects += 1;
            self.up = self.comes_back;
        }
        self.up
    }
}

// ---- clock ----

/// Time only moves when someone delays.
#[derive(Clone, Default)]
pub struct FakeClock(Rc<Cell<u64>>);

impl FakeClock {
    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms as u64);
    }
}

// ---- HTTP ----

#[derive(Debug, Clone)]
pub enum BodyStep {
    Data(Vec<u8>),
    /// One poll with nothing available
    Pause,
}

pub struct ScriptedResponse {
    pub head: Result<ResponseHead, SatelliteError>,
    pub body: Vec<BodyStep>,
}

impl ScriptedResponse {
    pub fn status(status: u16) -> Self {
        Self {
            head: Ok(ResponseHead {
                status,
                ..Default::default()
            }),
            body: Vec::new(),
        }
    }

    pub fn text(content_type: &str, body: &str) -> Self {
        Self {
            head: Ok(ResponseHead {
                status: 200,
                content_type: Some(content_type.into()),
                content_length: Some(body.len()),
                ..Default::default()
            }),
            body: vec![BodyStep::Data(body.as_bytes().to_vec())],
        }
    }

    /// `audio/wav` response carrying `pcm_len` bytes of PCM in the speech format.
    pub fn wav(pcm_len: usize) -> Self {
        Self::wav_bytes(wav_container(pcm_len))
    }

    pub fn wav_bytes(bytes: Vec<u8>) -> Self {
        Self {
            head: Ok(ResponseHead {
                status: 200,
                content_type: Some("audio/wav".into()),
                content_length: Some(bytes.len()),
                ..Default::default()
            }),
            body: vec![BodyStep::Data(bytes)],
        }
    }

    pub fn failure(reason: &str) -> Self {
        Self {
            head: Err(SatelliteError::connection(reason)),
            body: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub content_type: String,
    pub body: Vec<u8>,
    pub timeout_ms: u32,
}

#[derive(Default)]
pub struct ScriptedHttp {
    pub responses: VecDeque<ScriptedResponse>,
    pub requests: Vec<Request>,
    pub finishes: usize,
    pending: VecDeque<BodyStep>,
}

impl ScriptedHttp {
    pub fn with(responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl HttpConnection for ScriptedHttp {
    fn post(
        &mut self,
        url: &str,
        content_type: &str,
        body: &[u8],
        timeout_ms: u32,
    ) -> Result<ResponseHead, SatelliteError> {
        self.requests.push(Request {
            url: url.to_string(),
            content_type: content_type.to_string(),
            body: body.to_vec(),
            timeout_ms,
        });
        let response = self
            .responses
            .pop_front()
            .unwrap_or_else(|| ScriptedResponse::failure("no response scripted"));
        self.pending = response.body.into_iter().collect();
        response.head
    }

    fn available(&mut self) -> usize {
        match self.pending.front() {
            Some(BodyStep::Pause) => {
                self.pending.pop_front();
                0
            }
            Some(BodyStep::Data(d)) => d.len(),
            None => 0,
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SatelliteError> {
        while let Some(BodyStep::Pause) = self.pending.front() {
            self.pending.pop_front();
        }
        let Some(BodyStep::Data(data)) = self.pending.front_mut() else {
            return Ok(0);
        };
        let n = buf.len().min(data.len());
        buf[..n].copy_from_slice(&data[..n]);
        data.drain(..n);
        if data.is_empty() {
            self.pending.pop_front();
        }
        Ok(n)
    }

    fn finish(&mut self) {
        self.finishes += 1;
        self.pending.clear();
    }
}

// ---- board ----

pub struct MockBoard;

impl Board for MockBoard {
    type Mic = ToneMic;
    type Speaker = RecordingSpeaker;
    type Ptt = SharedPtt;
    type Indicator = FakeLed;
    type Link = FakeLink;
    type Http = ScriptedHttp;
    type Clock = FakeClock;
}

/// Speech format WAV: header plus `pcm_len` bytes of a counting pattern.
pub fn wav_container(pcm_len: usize) -> Vec<u8> {
    let mut bytes = wav::encode_header(pcm_len as u32, &AudioFormat::SPEECH).to_vec();
    bytes.extend((0..pcm_len).map(|i| (i % 251) as u8));
    bytes
}

/// Test configuration: default tunables, local hub URL.
pub fn test_config() -> SatelliteConfig {
    let mut config = SatelliteConfig::default();
    config.network.server_url = "http://hub.local:8000/api/voice".into();
    config
}

/// A controller on mock peripherals plus the handles the test drives.
pub struct Rig {
    pub controller: Controller<MockBoard>,
    pub ptt: SharedPtt,
    pub clock: FakeClock,
}

impl Rig {
    pub fn new(config: SatelliteConfig, http: ScriptedHttp, link_up: bool) -> Self {
        Self::with_link(config, http, FakeLink::new(link_up))
    }

    pub fn with_link(config: SatelliteConfig, http: ScriptedHttp, link: FakeLink) -> Self {
        let ptt = SharedPtt::default();
        let clock = FakeClock::default();
        let peripherals = Peripherals::<MockBoard> {
            mic: ToneMic::new(config.capture_chunk_bytes),
            speaker: RecordingSpeaker::default(),
            ptt: ptt.clone(),
            indicator: FakeLed::default(),
            link,
            http,
            clock: clock.clone(),
        };
        let capacity = config.buffer_capacity().expect("buffer capacity");
        let arena = AudioArena::allocate(capacity).expect("arena allocation");
        let controller = Controller::new(config, arena, peripherals);
        Self {
            controller,
            ptt,
            clock,
        }
    }

    pub fn with_responses(responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        Self::new(test_config(), ScriptedHttp::with(responses), true)
    }

    pub fn http(&self) -> &ScriptedHttp {
        self.controller.transport().connection()
    }

    pub fn speaker(&self) -> &RecordingSpeaker {
        self.controller.playback().speaker()
    }

    pub fn led(&self) -> &FakeLed {
        self.controller.indicator()
    }
}
