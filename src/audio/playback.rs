//! Playback: received WAV from the arena to the speaker.

use core::ops::Range;

use log::info;

use crate::arena::AudioArena;
use crate::config::{AudioFormat, HEADER_SIZE};
use crate::error::SatelliteError;
use crate::hal::Speaker;

/// What a playback pushed out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackReport {
    pub bytes_played: usize,
    pub duration_ms: u32,
}

pub struct Playback<S: Speaker> {
    speaker: S,
    chunk_bytes: usize,
    format: AudioFormat,
}

impl<S: Speaker> Playback<S> {
    pub fn new(speaker: S, chunk_bytes: usize, format: AudioFormat) -> Self {
        Self {
            speaker,
            chunk_bytes: chunk_bytes.max(1),
            format,
        }
    }

    pub fn speaker(&self) -> &S {
        &self.speaker
    }

    /// Play `arena[HEADER_SIZE..total_bytes]`, then flush the speaker.
    ///
    /// The header itself is skipped, not interpreted. Partial writes are
    /// resumed until every byte is out.
    pub fn play(
        &mut self,
        arena: &AudioArena,
        total_bytes: usize,
    ) -> Result<PlaybackReport, SatelliteError> {
        self.play_range(arena, HEADER_SIZE..total_bytes)
    }

    /// Play the PCM at `range` of the received container, then flush.
    ///
    /// The range is clamped to what the arena holds.
    pub fn play_range(
        &mut self,
        arena: &AudioArena,
        range: Range<usize>,
    ) -> Result<PlaybackReport, SatelliteError> {
        let container = arena.playable()?;
        let end = range.end.min(container.len());
        let pcm = container.get(range.start..end).unwrap_or(&[]);

        info!("[PLAY] Playing {} bytes of audio...", pcm.len());

        let mut offset = 0;
        let result = loop {
            if offset >= pcm.len() {
                break Ok(());
            }
            let to_write = self.chunk_bytes.min(pcm.len() - offset);
            match self.speaker.write(&pcm[offset..offset + to_write]) {
                Ok(0) => {
                    break Err(SatelliteError::Peripheral(
                        "speaker accepted no data".into(),
                    ))
                }
                Ok(written) => offset += written.min(to_write),
                Err(e) => break Err(e),
            }
        };

        // Flush even after a failed write so the next playback starts clean
        let flushed = self.speaker.flush();
        result?;
        flushed?;

        let duration_ms = self.format.duration_ms(offset);
        info!(
            "[PLAY] Done. Played {}.{:03} seconds",
            duration_ms / 1000,
            duration_ms % 1000
        );

        Ok(PlaybackReport {
            bytes_played: offset,
            duration_ms,
        })
    }
}
