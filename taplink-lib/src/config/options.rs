use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::stats::HostKey;

/// Server options of an application, as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    /// Last change of the options, in seconds since the Unix epoch
    #[serde(default)]
    pub last_modified: i64,
    /// API servers available to the application
    #[serde(default)]
    pub servers: Vec<HostKey>,
}

impl Options {
    /// Options with the given servers
    #[must_use]
    pub fn with_servers<I, H>(servers: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: Into<HostKey>,
    {
        Self {
            last_modified: 0,
            servers: servers.into_iter().map(Into::into).collect(),
        }
    }

    /// Time of the last change, `None` if unknown
    #[must_use]
    pub fn last_modified(&self) -> Option<SystemTime> {
        let seconds = u64::try_from(self.last_modified).ok().filter(|s| *s > 0)?;
        UNIX_EPOCH.checked_add(Duration::from_secs(seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_options() {
        let options: Options = serde_json::from_str(
            r#"{"lastModified": 1475000000, "servers": ["API.taplink.co", "eu.taplink.co"]}"#,
        )
        .unwrap();

        assert_eq!(
            options.servers,
            vec![HostKey::from("api.taplink.co"), HostKey::from("eu.taplink.co")]
        );
        assert_eq!(
            options.last_modified(),
            Some(UNIX_EPOCH + Duration::from_secs(1_475_000_000))
        );
    }

    #[test]
    fn test_missing_fields() {
        let options: Options = serde_json::from_str("{}").unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.last_modified(), None);
    }
}
