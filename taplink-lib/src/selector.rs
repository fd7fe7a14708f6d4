//! Choosing which API server to send an attempt to.
//!
//! A logical operation is planned once, before its first attempt: the
//! [`HostSelector`] turns the current server list and a statistics snapshot
//! into a [`HostPlan`], and attempt `i` of the operation goes to
//! `plan.host(i)`. Retries therefore walk through the plan instead of
//! hammering the same server.
//!
//! With [`HostSelection::Ranked`] the plan is ordered by recent health
//! (see [`rank`]), so a failing primary is skipped as soon as its error rate
//! rises and becomes preferred again once its errors age out of the ranking
//! window. As long as no statistics exist for any server, the cold start
//! policy is used instead.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strum::{Display, EnumString, VariantNames};

use crate::stats::{HostKey, HostStats, Statistics};

/// Default trailing window over which hosts are ranked, one minute
pub const DEFAULT_RANKING_WINDOW: Duration = Duration::from_secs(60);

/// Algorithm used to order the API servers for an operation
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HostSelection {
    /// Healthiest server first, by error rate and then average latency
    #[default]
    Ranked,
    /// Rotate the first server between operations, in configured order
    RoundRobin,
    /// Start at a random server, in configured order
    Random,
}

/// Order hosts from healthiest to least healthy.
///
/// Hosts are sorted by ascending error rate, then by ascending average
/// latency. Hosts without any latency sample rank after measured hosts with
/// the same error rate. The sort is stable: equally ranked hosts keep the
/// order in which they were given, which makes the ranking deterministic for
/// identical snapshots.
#[must_use]
pub fn rank(snapshots: &[HostStats]) -> Vec<HostKey> {
    let mut ranked: Vec<(&HostKey, f64, Option<Duration>)> = snapshots
        .iter()
        .map(|stats| (stats.host(), stats.error_rate(), stats.latency().average()))
        .collect();

    ranked.sort_by(|(_, rate_a, latency_a), (_, rate_b, latency_b)| {
        rate_a
            .total_cmp(rate_b)
            .then_with(|| compare_latency(*latency_a, *latency_b))
    });

    ranked.into_iter().map(|(host, _, _)| host.clone()).collect()
}

fn compare_latency(a: Option<Duration>, b: Option<Duration>) -> CmpOrdering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}

/// The order in which the attempts of one operation visit the servers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlan {
    hosts: Vec<HostKey>,
    offset: usize,
}

impl HostPlan {
    /// Plan which tries `hosts` in the given order, starting at `offset`
    ///
    /// # Panics
    ///
    /// Panics if `hosts` is empty
    #[must_use]
    pub fn new(hosts: Vec<HostKey>, offset: usize) -> Self {
        assert!(!hosts.is_empty(), "a host plan needs at least one host");
        let offset = offset % hosts.len();
        Self { hosts, offset }
    }

    /// The host to use for the given attempt, starting at 0
    #[must_use]
    pub fn host(&self, attempt: usize) -> &HostKey {
        &self.hosts[(self.offset + attempt) % self.hosts.len()]
    }

    /// Number of distinct hosts in the plan
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Always `false`: a plan has at least one host
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Plans the hosts of each operation of a single client.
///
/// The only state is the round-robin cursor, which belongs to the client
/// owning this selector and is advanced atomically once per operation.
#[derive(Debug)]
pub struct HostSelector {
    selection: HostSelection,
    cold_start: HostSelection,
    window: Duration,
    default_host: HostKey,
    cursor: AtomicUsize,
}

impl HostSelector {
    /// Create a selector.
    ///
    /// `default_host` is used whenever the server list is empty.
    #[must_use]
    pub fn new(
        selection: HostSelection,
        cold_start: HostSelection,
        window: Duration,
        default_host: HostKey,
    ) -> Self {
        Self {
            selection,
            cold_start,
            window,
            default_host,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Plan the hosts of one operation
    #[must_use]
    pub fn plan(&self, servers: &[HostKey], stats: &Statistics) -> HostPlan {
        match servers {
            [] => return HostPlan::new(vec![self.default_host.clone()], 0),
            [server] => return HostPlan::new(vec![server.clone()], 0),
            _ => {}
        }

        let mut selection = self.selection;
        let mut snapshots = Vec::new();
        if selection == HostSelection::Ranked {
            snapshots = servers
                .iter()
                .map(|server| stats.last(server, self.window))
                .collect();
            if snapshots.iter().all(HostStats::is_empty) {
                selection = self.cold_start;
            }
        }

        match selection {
            HostSelection::Ranked => HostPlan::new(rank(&snapshots), 0),
            HostSelection::RoundRobin => {
                let ticket = self.cursor.fetch_add(1, Ordering::Relaxed);
                HostPlan::new(servers.to_vec(), ticket)
            }
            HostSelection::Random => {
                let start = rand::thread_rng().gen_range(0..servers.len());
                HostPlan::new(servers.to_vec(), start)
            }
        }
    }

    /// The host used when no servers are configured
    #[must_use]
    pub const fn default_host(&self) -> &HostKey {
        &self.default_host
    }

    /// Window over which hosts are ranked
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}
