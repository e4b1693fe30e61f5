//! Token-bucket throttle for relayed inbound frames.
//!
//! Each relaying connection refills an allowance of `rate` frames per `per`
//! seconds. The first frame over budget is replaced by a warning line so the
//! channel's readers learn why output thinned out; further frames are
//! silently dropped until the allowance recovers.

use std::time::Instant;

/// Warning line relayed once when a connection first exceeds its allowance.
pub const THROTTLE_WARNING: &str = "[WARNING] Logging too frequent";

/// Verdict for one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Within budget; relay the frame as-is.
    Relay,
    /// First frame over budget; relay [`THROTTLE_WARNING`] instead.
    Warn,
    /// Still over budget; drop the frame.
    Drop,
}

/// Per-connection token bucket.
#[derive(Debug)]
pub struct Throttle {
    rate: f64,
    per_secs: f64,
    allowance: f64,
    last_check: Instant,
    warned: bool,
}

impl Throttle {
    /// Creates a full bucket refilling `rate` frames per `per_secs` seconds.
    ///
    /// A non-positive `rate` disables throttling entirely.
    #[must_use]
    pub fn new(rate: f64, per_secs: f64) -> Self {
        Self {
            rate,
            per_secs,
            allowance: rate,
            last_check: Instant::now(),
            warned: false,
        }
    }

    /// Charges one frame against the bucket at time `now`.
    pub fn check(&mut self, now: Instant) -> ThrottleDecision {
        if self.rate <= 0.0 {
            return ThrottleDecision::Relay;
        }

        let elapsed = now.duration_since(self.last_check).as_secs_f64();
        self.last_check = now;
        self.allowance = (self.allowance + elapsed * (self.rate / self.per_secs)).min(self.rate);

        if self.allowance < 1.0 {
            if self.warned {
                ThrottleDecision::Drop
            } else {
                self.warned = true;
                ThrottleDecision::Warn
            }
        } else {
            self.warned = false;
            self.allowance -= 1.0;
            ThrottleDecision::Relay
        }
    }
}
