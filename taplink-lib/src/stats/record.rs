//! Events recorded for every request attempt.
//!
//! Each attempt against a host ends in exactly one of these events. They
//! are appended to the host's log and never modified afterwards.

use std::time::{Duration, Instant};

/// An attempt which got a 2xx or 3xx response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Success {
    pub(crate) at: Instant,
    pub(crate) latency: Duration,
}

/// An attempt which failed with a status code, or with
/// [`crate::UNKNOWN_STATUS_CODE`] when no status was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Failure {
    pub(crate) at: Instant,
    pub(crate) code: u16,
}

/// An attempt which exceeded the transport timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timeout {
    pub(crate) at: Instant,
}

/// Something which happened at a point in time
pub(crate) trait Event {
    fn at(&self) -> Instant;
}

impl Event for Success {
    fn at(&self) -> Instant {
        self.at
    }
}

impl Event for Failure {
    fn at(&self) -> Instant {
        self.at
    }
}

impl Event for Timeout {
    fn at(&self) -> Instant {
        self.at
    }
}

/// Copy the events which happened at or after `cutoff`
pub(crate) fn since<E: Event + Copy>(events: &[E], cutoff: Instant) -> Vec<E> {
    events
        .iter()
        .filter(|event| event.at() >= cutoff)
        .copied()
        .collect()
}
