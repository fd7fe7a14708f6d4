use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{HostKey, HostStats};
use crate::selector;

/// Per-host request statistics, shared by every request of a client.
///
/// Each host gets its own append-only event log guarded by its own lock.
/// Readers never see the live log: [`Statistics::get`] and
/// [`Statistics::last`] return copies, so concurrent requests can keep
/// recording while a caller inspects or ranks a snapshot.
///
/// While disabled, nothing is recorded but reads keep working.
#[derive(Debug)]
pub struct Statistics {
    enabled: AtomicBool,
    hosts: DashMap<HostKey, Arc<Mutex<HostStats>>>,
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Statistics {
    /// Create an empty store, recording events only if `enabled`
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            hosts: DashMap::new(),
        }
    }

    /// Start recording events
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Stop recording events. Already recorded events are kept.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Whether events are currently recorded
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Record a successful request and its latency
    pub fn add_success(&self, host: &HostKey, latency: Duration) {
        self.record(host, |stats, now| stats.record_success(latency, now));
    }

    /// Record a failed request with the status code it failed with
    pub fn add_error(&self, host: &HostKey, code: u16) {
        self.record(host, |stats, now| stats.record_error(code, now));
    }

    /// Record a timed out request
    pub fn add_timeout(&self, host: &HostKey) {
        self.record(host, |stats, now| stats.record_timeout(now));
    }

    /// Snapshot of all events recorded for `host`.
    /// Unknown hosts are registered with an empty log.
    #[must_use]
    pub fn get(&self, host: &HostKey) -> HostStats {
        lock(&self.entry(host)).clone()
    }

    /// Snapshot of the events recorded for `host` within the trailing `window`
    #[must_use]
    pub fn last(&self, host: &HostKey, window: Duration) -> HostStats {
        lock(&self.entry(host)).last(window)
    }

    /// All known hosts, best first, ranked on the events within the
    /// trailing `window`. Hosts which rank equally are ordered by name.
    #[must_use]
    pub fn hosts(&self, window: Duration) -> Vec<HostKey> {
        let mut snapshots: Vec<HostStats> = self
            .hosts
            .iter()
            .map(|entry| lock(entry.value()).last(window))
            .collect();
        snapshots.sort_by(|a, b| a.host().cmp(b.host()));
        selector::rank(&snapshots)
    }

    /// Snapshots of every known host, ordered by name
    #[must_use]
    pub fn all(&self) -> Vec<HostStats> {
        let mut all: Vec<HostStats> = self
            .hosts
            .iter()
            .map(|entry| lock(entry.value()).clone())
            .collect();
        all.sort_by(|a, b| a.host().cmp(b.host()));
        all
    }

    /// Number of successful requests over all hosts
    #[must_use]
    pub fn total_requests(&self) -> usize {
        self.all().iter().map(HostStats::requests).sum()
    }

    /// Number of failed requests (errors and timeouts) over all hosts
    #[must_use]
    pub fn total_errors(&self) -> usize {
        self.all()
            .iter()
            .map(|stats| stats.errors().len() + stats.timeouts())
            .sum()
    }

    /// Average latency of successful requests over all hosts, zero when
    /// nothing succeeded yet
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let latencies: Vec<Duration> = self
            .all()
            .iter()
            .flat_map(|stats| stats.latency().iter().copied().collect::<Vec<_>>())
            .collect();
        if latencies.is_empty() {
            return Duration::ZERO;
        }
        #[allow(clippy::cast_possible_truncation)]
        let average = latencies.iter().sum::<Duration>() / latencies.len() as u32;
        average
    }

    /// Percentage (0 to 100) of failed requests over all hosts
    #[must_use]
    pub fn error_percentage(&self) -> f64 {
        let errors = self.total_errors();
        if errors == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let percentage = errors as f64 * 100.0 / (errors + self.total_requests()) as f64;
        percentage
    }

    fn record<F>(&self, host: &HostKey, f: F)
    where
        F: FnOnce(&mut HostStats, Instant),
    {
        if !self.is_enabled() {
            return;
        }
        let entry = self.entry(host);
        let mut stats = lock(&entry);
        f(&mut *stats, Instant::now());
    }

    /// Get the log of an existing host or register a new one
    fn entry(&self, host: &HostKey) -> Arc<Mutex<HostStats>> {
        if let Some(stats) = self.hosts.get(host) {
            return stats.clone();
        }
        self.hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(Mutex::new(HostStats::new(host.clone()))))
            .clone()
    }
}

/// Event logs are append-only, so a log whose lock was poisoned is
/// still consistent and can be used as is.
fn lock(stats: &Mutex<HostStats>) -> std::sync::MutexGuard<'_, HostStats> {
    stats.lock().unwrap_or_else(PoisonError::into_inner)
}
