use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the data pool settings a salt was derived with.
///
/// Version `0` is not a real version: requesting it asks the API for the
/// latest settings. It is rendered as an empty path segment.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(pub u64);

impl Version {
    /// Placeholder asking for the latest settings
    pub const LATEST: Version = Version(0);

    /// Whether this is the placeholder for the latest settings
    #[must_use]
    pub const fn is_latest(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Version {
    fn from(id: u64) -> Self {
        Version(id)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_latest() {
            return Ok(());
        }
        write!(f, "{}", self.0)
    }
}
