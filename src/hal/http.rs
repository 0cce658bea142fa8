//! HTTP client over the ESP-IDF `esp_http_client`.
//!
//! A fresh connection per exchange: the timeout is a connection setting and
//! exchanges are minutes apart at most.

use core::time::Duration;

use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::http::Method;
use esp_idf_svc::io::{Read, Write};

use crate::error::SatelliteError;
use crate::transport::{HttpConnection, ResponseHead};

/// Reads block on the socket, so "available" is simply what is left.
const UNKNOWN_LENGTH_CHUNK: usize = 1024;

fn http_err(context: &str, e: impl core::fmt::Debug) -> SatelliteError {
    SatelliteError::connection(format!("{}: {:?}", context, e))
}

#[derive(Default)]
pub struct EspHttp {
    conn: Option<EspHttpConnection>,
    remaining: Option<usize>,
}

impl EspHttp {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HttpConnection for EspHttp {
    fn post(
        &mut self,
        url: &str,
        content_type: &str,
        body: &[u8],
        timeout_ms: u32,
    ) -> Result<ResponseHead, SatelliteError> {
        let config = Configuration {
            timeout: Some(Duration::from_millis(timeout_ms as u64)),
            ..Default::default()
        };
        let mut conn = EspHttpConnection::new(&config).map_err(|e| http_err("client init", e))?;

        let content_length = body.len().to_string();
        let headers = [
            ("Content-Type", content_type),
            ("Content-Length", content_length.as_str()),
        ];
        conn.initiate_request(Method::Post, url, &headers)
            .map_err(|e| http_err("connect", e))?;
        conn.write_all(body).map_err(|e| http_err("send", e))?;
        conn.initiate_response()
            .map_err(|e| http_err("response", e))?;

        let header = |name: &str| conn.header(name).map(str::to_string);
        let head = ResponseHead {
            status: conn.status(),
            status_message: conn.status_message().map(str::to_string),
            content_type: header("Content-Type"),
            content_length: header("Content-Length").and_then(|v| v.trim().parse().ok()),
            processing_time: header("X-Processing-Time"),
            pipeline_mode: header("X-Pipeline-Mode"),
        };

        self.remaining = head.content_length;
        self.conn = Some(conn);
        Ok(head)
    }

    fn available(&mut self) -> usize {
        match (&self.conn, self.remaining) {
            (None, _) => 0,
            (Some(_), Some(n)) => n,
            (Some(_), None) => UNKNOWN_LENGTH_CHUNK,
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SatelliteError> {
        let Some(conn) = self.conn.as_mut() else {
            return Ok(0);
        };
        let n = conn.read(buf).map_err(|e| http_err("receive", e))?;
        if let Some(rem) = self.remaining.as_mut() {
            *rem = rem.saturating_sub(n);
        }
        Ok(n)
    }

    fn finish(&mut self) {
        self.conn = None;
        self.remaining = None;
    }
}
