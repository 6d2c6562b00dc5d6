// Minimum-interval suppression shared across all alert kinds
// A candidate alert inside the window is dropped outright, never queued

use crate::debug;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Gate enforcing a minimum interval between accepted alerts
///
/// The recorded timestamp is the only piece of alert state shared between
/// execution contexts, so it lives behind a mutex. It is monotonically
/// non-decreasing: `record` never moves it backwards.
pub struct CooldownGate {
    cooldown: Duration,
    last_alert: Mutex<Option<Instant>>,
}

impl CooldownGate {
    /// Create a gate with the given minimum interval
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert: Mutex::new(None),
        }
    }

    /// Check whether a candidate alert would currently pass the gate
    ///
    /// Does not record anything; pair with `record` when the alert is
    /// committed, or use `try_accept` for check-and-record in one step.
    pub fn check(&self) -> bool {
        match *self.last_alert.lock() {
            Some(last) => last.elapsed() >= self.cooldown,
            None => true,
        }
    }

    /// Record an accepted alert at the current instant
    pub fn record(&self) {
        let now = Instant::now();
        let mut last = self.last_alert.lock();
        match *last {
            // Instant is monotonic, but never move the stamp backwards even
            // if callers race
            Some(prev) if prev > now => {}
            _ => *last = Some(now),
        }
    }

    /// Check and record in one step
    ///
    /// Returns true if the alert was accepted; a suppressed alert leaves the
    /// recorded timestamp untouched.
    pub fn try_accept(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last_alert.lock();
        let accepted = match *last {
            Some(prev) => now.duration_since(prev) >= self.cooldown,
            None => true,
        };
        if accepted {
            *last = Some(now);
        } else {
            debug!("[cooldown] alert suppressed inside {:?} window", self.cooldown);
        }
        accepted
    }

    /// Instant of the last accepted alert, if any
    #[allow(dead_code)] // Utility accessor for status checks
    pub fn last_alert(&self) -> Option<Instant> {
        *self.last_alert.lock()
    }
}
