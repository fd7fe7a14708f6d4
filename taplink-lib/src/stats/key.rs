use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A type-safe representation of an API server, as listed in the server
/// options: a hostname with an optional port.
///
/// Hostnames are normalized to lowercase so that statistics recorded for
/// `API.TAPLINK.CO` and `api.taplink.co` end up in the same record.
///
/// # Examples
///
/// ```
/// use taplink_lib::stats::HostKey;
///
/// let host_key = HostKey::from("API.TapLink.co:8443");
/// assert_eq!(host_key.as_str(), "api.taplink.co:8443");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct HostKey(String);

impl HostKey {
    /// Get the host as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the host as an owned String
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for HostKey {
    fn from(host: String) -> Self {
        HostKey(host.trim().to_lowercase())
    }
}

impl From<&str> for HostKey {
    fn from(host: &str) -> Self {
        HostKey(host.trim().to_lowercase())
    }
}

impl From<HostKey> for String {
    fn from(key: HostKey) -> Self {
        key.0
    }
}

impl Borrow<str> for HostKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_key_normalization() {
        let host_key = HostKey::from("API.TAPLINK.CO");
        assert_eq!(host_key.as_str(), "api.taplink.co");

        let host_key = HostKey::from(String::from(" api.taplink.co "));
        assert_eq!(host_key.as_str(), "api.taplink.co");
    }

    #[test]
    fn test_host_key_keeps_port() {
        let host_key = HostKey::from("127.0.0.1:8080");
        assert_eq!(host_key.as_str(), "127.0.0.1:8080");
        assert_ne!(host_key, HostKey::from("127.0.0.1:8081"));
    }

    #[test]
    fn test_host_key_display() {
        let host_key = HostKey::from("api.taplink.co");
        assert_eq!(format!("{host_key}"), "api.taplink.co");
    }

    #[test]
    fn test_host_key_hash_equality() {
        use std::collections::HashMap;

        let key1 = HostKey::from("api.taplink.co");
        let key2 = HostKey::from("API.TAPLINK.CO");

        let mut map = HashMap::new();
        map.insert(key1, "value");

        // Should find the value with normalized key
        assert_eq!(map.get(&key2), Some(&"value"));
        assert_eq!(map.get("api.taplink.co"), Some(&"value"));
    }

    #[test]
    fn test_host_key_serde() {
        let key: HostKey = serde_json::from_str(r#""EU.TAPLINK.CO""#).unwrap();
        assert_eq!(key.as_str(), "eu.taplink.co");
        assert_eq!(serde_json::to_string(&key).unwrap(), r#""eu.taplink.co""#);
    }
}
