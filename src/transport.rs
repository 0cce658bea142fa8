//! Transport client: one blocking HTTP exchange per utterance.
//!
//! The request body is the finalized WAV container straight out of the
//! shared arena. The response is classified by its declared content type:
//!
//! - `audio/wav` with a body longer than the header: streamed back into the
//!   arena from offset 0, to be played
//! - anything else: drained into a short string for the log
//!
//! No retry. A failed exchange is reported and the operator presses PTT again.

use log::{debug, info, warn};
use serde::Deserialize;

use crate::arena::AudioArena;
use crate::config::{SatelliteConfig, HEADER_SIZE};
use crate::error::SatelliteError;
use crate::hal::Clock;

/// Content type of the audio container, both directions.
pub const WAV_CONTENT_TYPE: &str = "audio/wav";

/// Text body read granularity
const TEXT_CHUNK: usize = 256;

/// Status line and headers of a response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub status_message: Option<String>,
    pub content_type: Option<String>,
    /// Declared body length, `None` for chunked or unknown
    pub content_length: Option<usize>,
    /// `X-Processing-Time` (advisory)
    pub processing_time: Option<String>,
    /// `X-Pipeline-Mode` (advisory)
    pub pipeline_mode: Option<String>,
}

impl ResponseHead {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Status message from the server, or the standard reason phrase.
    pub fn reason(&self) -> String {
        match &self.status_message {
            Some(m) if !m.is_empty() => m.clone(),
            _ => canonical_reason(self.status).to_string(),
        }
    }
}

/// HTTP client seam.
///
/// One exchange is `post`, any number of `available`/`read` calls, then
/// `finish`.
pub trait HttpConnection {
    /// Send `body` as a POST and block until the response head arrives or
    /// `timeout_ms` elapses.
    fn post(
        &mut self,
        url: &str,
        content_type: &str,
        body: &[u8],
        timeout_ms: u32,
    ) -> Result<ResponseHead, SatelliteError>;

    /// Body bytes readable right now without waiting. May be zero while more
    /// is still on the way.
    fn available(&mut self) -> usize;

    /// Read body bytes. `Ok(0)` means end of body.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SatelliteError>;

    /// Release the connection. Safe to call after a failed `post`.
    fn finish(&mut self);
}

/// Summary fields the hub puts in its JSON replies
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HubReply {
    pub transcript: Option<String>,
    pub duration: Option<f64>,
    pub pipeline: Option<String>,
    pub processing_time: Option<f64>,
    pub error: Option<String>,
}

/// Non-audio response body, kept for display only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResponse {
    pub content_type: Option<String>,
    pub body: String,
    /// Body was longer than the text limit
    pub truncated: bool,
}

impl TextResponse {
    /// Parse the body as a hub JSON reply.
    pub fn hub_reply(&self) -> Option<HubReply> {
        serde_json::from_str(&self.body).ok()
    }

    /// One line for the serial console.
    pub fn summary(&self) -> String {
        match self.hub_reply() {
            Some(HubReply { error: Some(e), .. }) => format!("hub error: {}", e),
            Some(HubReply {
                transcript: Some(t),
                pipeline,
                ..
            }) => format!(
                "transcript [{}]: \"{}\"",
                pipeline.as_deref().unwrap_or("unknown"),
                t
            ),
            _ => self.body.clone(),
        }
    }
}

/// Response classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    /// WAV container of `len` bytes now in the arena, which is in `Playing`
    Audio { len: usize },
    /// Diagnostic text; the arena was not touched
    Text(TextResponse),
}

/// Whether a content type names the WAV container.
pub fn is_wav_content_type(content_type: &str) -> bool {
    let ct = content_type.trim_start().to_ascii_lowercase();
    ct.starts_with(WAV_CONTENT_TYPE) || ct.starts_with("audio/x-wav") || ct.starts_with("audio/wave")
}

/// Request/response client bound to one hub URL.
pub struct TransportClient<C: HttpConnection> {
    conn: C,
    url: String,
    timeout_ms: u32,
    poll_ms: u32,
    text_limit: usize,
}

impl<C: HttpConnection> TransportClient<C> {
    pub fn new(conn: C, config: &SatelliteConfig) -> Self {
        Self {
            conn,
            url: config.network.server_url.clone(),
            timeout_ms: config.http_timeout_ms,
            poll_ms: config.receive_poll_ms.max(1),
            text_limit: config.text_limit_bytes,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Upload the first `total_bytes` of the arena and classify the reply.
    ///
    /// The arena must be in `Sending`. On `Audio` it is left in `Playing`
    /// holding the response; on `Text` or error it is left as it was.
    pub fn exchange<K: Clock>(
        &mut self,
        arena: &mut AudioArena,
        total_bytes: usize,
        clock: &mut K,
    ) -> Result<ResponseKind, SatelliteError> {
        let result = self.run_exchange(arena, total_bytes, clock);
        self.conn.finish();
        result
    }

    fn run_exchange<K: Clock>(
        &mut self,
        arena: &mut AudioArena,
        total_bytes: usize,
        clock: &mut K,
    ) -> Result<ResponseKind, SatelliteError> {
        let capacity = arena.capacity();
        let body = arena
            .outbound()?
            .get(..total_bytes)
            .ok_or(SatelliteError::BufferExhausted { capacity })?;

        info!("[HTTP] Sending {} bytes to {}", body.len(), self.url);
        let started = clock.now_ms();
        let head = self
            .conn
            .post(&self.url, WAV_CONTENT_TYPE, body, self.timeout_ms)?;

        if !head.is_success() {
            return Err(SatelliteError::Transport {
                status: Some(head.status),
                reason: head.reason(),
            });
        }

        info!(
            "[HTTP] Response {} after {} ms",
            head.status,
            clock.now_ms().saturating_sub(started)
        );
        if let Some(t) = &head.processing_time {
            info!("[HTTP] Hub processing time: {}s", t);
        }
        if let Some(mode) = &head.pipeline_mode {
            debug!("[HTTP] Hub pipeline: {}", mode);
        }

        let is_wav = head.content_type.as_deref().is_some_and(is_wav_content_type);
        match head.content_length {
            Some(declared) if is_wav && declared > HEADER_SIZE => {
                if declared > capacity {
                    warn!("[HTTP] Audio response too large for buffer: {} > {}", declared, capacity);
                    return Err(SatelliteError::ResponseTooLarge { declared, capacity });
                }
                info!("[HTTP] Audio response: {} bytes", declared);
                arena.begin_receive()?;
                self.receive_audio(arena, declared, clock)?;
                let len = arena.finish_receive()?;
                Ok(ResponseKind::Audio { len })
            }
            _ => {
                let text = self.read_text(&head)?;
                Ok(ResponseKind::Text(text))
            }
        }
    }

    /// Read exactly `declared` bytes into the arena.
    ///
    /// Polls with nothing available are normal while the hub is still
    /// streaming; only a stretch with no progress longer than the exchange
    /// timeout ends the loop early.
    fn receive_audio<K: Clock>(
        &mut self,
        arena: &mut AudioArena,
        declared: usize,
        clock: &mut K,
    ) -> Result<(), SatelliteError> {
        let mut last_progress = clock.now_ms();

        while arena.cursor() < declared {
            let available = self.conn.available();
            if available > 0 {
                let slot = arena.receive_slot(declared)?;
                let want = available.min(slot.len());
                let got = self.conn.read(&mut slot[..want])?;
                arena.commit(got)?;
                if got > 0 {
                    last_progress = clock.now_ms();
                    continue;
                }
            }

            if clock.now_ms().saturating_sub(last_progress) >= self.timeout_ms as u64 {
                return Err(SatelliteError::connection(format!(
                    "response stalled at {} of {} bytes",
                    arena.cursor(),
                    declared
                )));
            }
            clock.delay_ms(self.poll_ms);
        }

        Ok(())
    }

    /// Drain a non-audio body, keeping at most `text_limit` bytes.
    fn read_text(&mut self, head: &ResponseHead) -> Result<TextResponse, SatelliteError> {
        let want = head
            .content_length
            .map_or(self.text_limit, |len| len.min(self.text_limit));
        let mut body = Vec::with_capacity(want.min(TEXT_CHUNK * 4));
        let mut chunk = [0u8; TEXT_CHUNK];
        let mut truncated = false;

        loop {
            let n = self.conn.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            let room = self.text_limit - body.len();
            if n > room {
                body.extend_from_slice(&chunk[..room]);
                truncated = true;
                break;
            }
            body.extend_from_slice(&chunk[..n]);
            if head.content_length.is_some_and(|len| body.len() >= len) {
                break;
            }
        }

        Ok(TextResponse {
            content_type: head.content_type.clone(),
            body: String::from_utf8_lossy(&body).into_owned(),
            truncated,
        })
    }
}

/// Standard reason phrase for common statuses.
pub fn canonical_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown Status",
    }
}
