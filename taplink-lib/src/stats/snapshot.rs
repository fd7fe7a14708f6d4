use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde::ser::SerializeStruct;

use super::HostKey;
use super::record::{self, Failure, Success, Timeout};

/// Latencies of successful requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Latency(Vec<Duration>);

impl Latency {
    /// Average latency, or zero when nothing was recorded
    #[must_use]
    pub fn avg(&self) -> Duration {
        self.average().unwrap_or_default()
    }

    /// Average latency, `None` when nothing was recorded
    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        if self.0.is_empty() {
            return None;
        }

        let total: Duration = self.0.iter().sum();
        #[allow(clippy::cast_possible_truncation)]
        Some(total / (self.0.len() as u32))
    }

    /// Get median latency
    #[must_use]
    pub fn median(&self) -> Option<Duration> {
        if self.0.is_empty() {
            return None;
        }

        let mut times = self.0.clone();
        times.sort();
        let mid = times.len() / 2;

        if times.len().is_multiple_of(2) {
            // Average of two middle values
            Some((times[mid - 1] + times[mid]) / 2)
        } else {
            Some(times[mid])
        }
    }

    /// Number of recorded latencies
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no latency was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the recorded latencies, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Duration> {
        self.0.iter()
    }
}

/// Number of errors per status code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Errors(HashMap<u16, usize>);

impl Errors {
    /// Total number of errors, over all status codes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.values().sum()
    }

    /// Whether no error was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of errors recorded with the given status code
    #[must_use]
    pub fn count(&self, code: u16) -> usize {
        self.0.get(&code).copied().unwrap_or(0)
    }

    /// Iterate over `(status code, count)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&u16, &usize)> {
        self.0.iter()
    }
}

/// Event log of a single host.
///
/// The [`crate::stats::Statistics`] store keeps the live log of each host
/// behind a lock and only ever hands out copies of it, so a `HostStats` value
/// is a consistent snapshot: later requests never change it.
#[derive(Debug, Clone)]
pub struct HostStats {
    host: HostKey,
    successes: Vec<Success>,
    errors: Vec<Failure>,
    timeouts: Vec<Timeout>,
}

impl HostStats {
    /// Create an empty log for the given host
    #[must_use]
    pub fn new(host: HostKey) -> Self {
        Self {
            host,
            successes: Vec::new(),
            errors: Vec::new(),
            timeouts: Vec::new(),
        }
    }

    pub(crate) fn record_success(&mut self, latency: Duration, at: Instant) {
        self.successes.push(Success { at, latency });
    }

    pub(crate) fn record_error(&mut self, code: u16, at: Instant) {
        self.errors.push(Failure { at, code });
    }

    pub(crate) fn record_timeout(&mut self, at: Instant) {
        self.timeouts.push(Timeout { at });
    }

    /// The host these statistics belong to
    #[must_use]
    pub const fn host(&self) -> &HostKey {
        &self.host
    }

    /// Errors grouped by status code
    #[must_use]
    pub fn errors(&self) -> Errors {
        let mut errors = HashMap::new();
        for failure in &self.errors {
            *errors.entry(failure.code).or_insert(0) += 1;
        }
        Errors(errors)
    }

    /// Number of successful requests
    #[must_use]
    pub fn requests(&self) -> usize {
        self.successes.len()
    }

    /// Number of timed out requests
    #[must_use]
    pub fn timeouts(&self) -> usize {
        self.timeouts.len()
    }

    /// Latencies of the successful requests
    #[must_use]
    pub fn latency(&self) -> Latency {
        Latency(self.successes.iter().map(|s| s.latency).collect())
    }

    /// Number of recorded events of any kind
    #[must_use]
    pub fn total_events(&self) -> usize {
        self.successes.len() + self.errors.len() + self.timeouts.len()
    }

    /// Whether nothing was recorded for this host
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_events() == 0
    }

    /// Share of failed requests (errors and timeouts), between 0.0 and 1.0.
    /// Zero when nothing was recorded.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        let failed = self.errors.len() + self.timeouts.len();
        if failed == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let error_rate = failed as f64 / self.total_events() as f64;
        error_rate
    }

    /// Statistics restricted to the events within the trailing `window`
    #[must_use]
    pub fn last(&self, window: Duration) -> Self {
        match Instant::now().checked_sub(window) {
            Some(cutoff) => self.since(cutoff),
            // The window reaches back before anything could have been recorded
            None => self.clone(),
        }
    }

    /// Statistics restricted to the events which happened at or after `cutoff`
    #[must_use]
    pub fn since(&self, cutoff: Instant) -> Self {
        Self {
            host: self.host.clone(),
            successes: record::since(&self.successes, cutoff),
            errors: record::since(&self.errors, cutoff),
            timeouts: record::since(&self.timeouts, cutoff),
        }
    }

    /// Get human-readable summary of the stats
    #[must_use]
    pub fn summary(&self) -> String {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let error_pct = (self.error_rate() * 100.0) as u64;

        let avg_time = self
            .latency()
            .average()
            .map_or_else(|| "N/A".to_string(), |d| format!("{:.0}ms", d.as_millis()));

        format!(
            "{}: {} requests, {} errors, {} timeouts ({}% failed), avg: {}",
            self.host,
            self.requests(),
            self.errors.len(),
            self.timeouts(),
            error_pct,
            avg_time
        )
    }
}

impl Serialize for HostStats {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let latency = self.latency();
        let average_latency_ms = latency.average().map(|d| d.as_millis());
        let median_latency_ms = latency.median().map(|d| d.as_millis());

        let mut s = serializer.serialize_struct("HostStats", 7)?;
        s.serialize_field("host", &self.host)?;
        s.serialize_field("requests", &self.requests())?;
        s.serialize_field("timeouts", &self.timeouts())?;
        s.serialize_field("errors", &self.errors())?;
        s.serialize_field("error_rate", &self.error_rate())?;
        s.serialize_field("average_latency_ms", &average_latency_ms)?;
        s.serialize_field("median_latency_ms", &median_latency_ms)?;
        s.end()
    }
}
