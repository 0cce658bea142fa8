//! PTT (Push-To-Talk) edge debouncer
//!
//! The button is sampled once per loop iteration. Only level changes are
//! reported, and a change is accepted only if at least `interval_ms` has
//! passed since the previous accepted edge. Contact bounce inside that
//! window is ignored.

/// Debounced PTT transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PttEdge {
    Pressed,
    Released,
}

/// Edge debouncer
pub struct PttDebouncer {
    /// Last accepted level
    pressed: bool,
    /// Timestamp of last accepted edge (milliseconds)
    last_edge_ms: Option<u64>,
    /// Lockout after an accepted edge
    interval_ms: u64,
}

impl PttDebouncer {
    /// Create debouncer, starting released
    pub fn new(interval_ms: u32) -> Self {
        Self {
            pressed: false,
            last_edge_ms: None,
            interval_ms: interval_ms as u64,
        }
    }

    /// Debounced level
    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feed one raw sample taken at `now_ms`.
    ///
    /// Returns the edge if the sample changes the debounced level.
    pub fn update(&mut self, raw_pressed: bool, now_ms: u64) -> Option<PttEdge> {
        if raw_pressed == self.pressed {
            return None;
        }

        if let Some(last) = self.last_edge_ms {
            if now_ms.saturating_sub(last) < self.interval_ms {
                return None;
            }
        }

        self.pressed = raw_pressed;
        self.last_edge_ms = Some(now_ms);
        Some(if raw_pressed {
            PttEdge::Pressed
        } else {
            PttEdge::Released
        })
    }
}
