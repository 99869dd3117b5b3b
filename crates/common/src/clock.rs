//! Refresh clock for coalescing interactive edits.
//!
//! Pointer handlers may fire many times between two display refreshes.
//! The editor applies at most one timeline mutation per refresh; this
//! module decides when a refresh tick has elapsed.

/// Gate that opens at most once per display refresh interval.
#[derive(Debug, Clone)]
pub struct RefreshClock {
    interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RefreshClock {
    /// Create a clock targeting the given refresh rate in Hz.
    pub fn new(refresh_hz: u32) -> Self {
        Self {
            interval_ns: 1_000_000_000 / refresh_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next refresh.
    /// Returns true and records the tick if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, now_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(now_ns);
                true
            }
            Some(last) if now_ns >= last.saturating_add(self.interval_ns) => {
                self.last_tick_ns = Some(now_ns);
                true
            }
            _ => false,
        }
    }

    /// Forget the last tick so the next call fires immediately.
    pub fn reset(&mut self) {
        self.last_tick_ns = None;
    }

    /// Refresh interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.interval_ns
    }
}

impl Default for RefreshClock {
    fn default() -> Self {
        Self::new(60)
    }
}
