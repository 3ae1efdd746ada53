//! Wall-clock abstraction so deadline arithmetic can be driven by tests.

use parking_lot::Mutex;

/// Source of the current time in seconds since the Unix epoch.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> f64;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualTime {
    now: Mutex<f64>,
}

impl ManualTime {
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock() += secs;
    }

    pub fn set(&self, now: f64) {
        *self.now.lock() = now;
    }
}

impl Default for ManualTime {
    fn default() -> Self {
        Self::new(1_000.0)
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_time_moves_only_when_advanced() {
        let t = ManualTime::new(50.0);
        assert_eq!(t.now(), 50.0);
        t.advance(2.5);
        assert_eq!(t.now(), 52.5);
        t.set(10.0);
        assert_eq!(t.now(), 10.0);
    }

    #[test]
    fn system_time_is_after_2020() {
        assert!(SystemTime.now() > 1_577_836_800.0);
    }
}
