//! Per-host request statistics.
//!
//! Every request attempt made by the [`crate::Client`] ends up as one event
//! in the log of the host it was sent to. The logs drive the ranking of
//! hosts for failover, see [`crate::selector`].
//!
//! - [`HostKey`]: Normalized name of an API server
//! - [`HostStats`]: Snapshot of the event log of one host
//! - [`Statistics`]: Thread-safe store of all event logs

mod key;
mod record;
mod snapshot;
mod store;

pub use key::HostKey;
pub use snapshot::{Errors, HostStats, Latency};
pub use store::Statistics;
