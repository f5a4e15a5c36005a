use serde::{Deserialize, Serialize};
use std::fmt;

/// Virtual milliseconds since the orchestrator was created.
/// Advanced only by the driver; never read from the wall clock inside the kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    pub ms: u64,
}

/// Default driver cadence.
pub const TICK_MS: u64 = 20;

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { ms: 0 };

    pub fn new(ms: u64) -> Self {
        Timestamp { ms }
    }

    pub fn plus(&self, delta_ms: u64) -> Self {
        Timestamp { ms: self.ms.saturating_add(delta_ms) }
    }

    /// Milliseconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn since(&self, earlier: Timestamp) -> u64 {
        self.ms.saturating_sub(earlier.ms)
    }

    /// `HH:MM`, used for chat stamps.
    pub fn short_clock(&self) -> String {
        let secs = self.ms / 1000;
        format!("{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60)
    }
}

impl fmt::Display for Timestamp {
    /// `HH:MM:SS`, used for pipeline log stamps.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.ms / 1000;
        write!(f, "{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats() {
        let t = Timestamp::new(3_725_400); // 1h 2m 5.4s
        assert_eq!(t.to_string(), "01:02:05");
        assert_eq!(t.short_clock(), "01:02");
    }

    #[test]
    fn since_saturates() {
        let a = Timestamp::new(100);
        let b = Timestamp::new(250);
        assert_eq!(b.since(a), 150);
        assert_eq!(a.since(b), 0);
    }
}
