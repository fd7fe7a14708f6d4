use http::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::selector::HostSelection;
use crate::{ErrorKind, Result};

/// Default number of attempts per operation
pub const DEFAULT_RETRY_LIMIT: usize = 3;

/// Default pause between two attempts of an operation
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default transport timeout of a single attempt
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit for the size of a response body, 512 KiB
pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 512 * 1024;

/// Tuning of the request layer, as read from a TOML file.
///
/// Every field is optional. Only the settings present in the file override
/// those of the [`crate::ClientBuilder`] when applied with
/// [`crate::ClientBuilder::with_request_config`].
///
/// ```toml
/// retry_limit = 5
/// retry_delay = "250ms"
/// timeout = "10s"
/// host_selection = "round_robin"
///
/// [headers]
/// X-Request-Source = "billing"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    /// Maximum number of attempts per operation
    #[serde(default)]
    pub retry_limit: Option<usize>,

    /// Pause before every attempt but the first
    #[serde(default, with = "humantime_serde")]
    pub retry_delay: Option<Duration>,

    /// Transport timeout of a single attempt
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// Window of statistics used to rank hosts
    #[serde(default, with = "humantime_serde")]
    pub ranking_window: Option<Duration>,

    /// How hosts are ordered for each operation
    #[serde(default)]
    pub host_selection: Option<HostSelection>,

    /// How hosts are ordered while no statistics exist
    #[serde(default)]
    pub cold_start_selection: Option<HostSelection>,

    /// Responses are cut off after this many bytes
    #[serde(default)]
    pub max_response_size: Option<usize>,

    /// Additional headers sent with every request
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_headers")]
    pub headers: HeaderMap,
}

impl RequestConfig {
    /// Parse a request config from TOML
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not valid TOML, or contains unknown
    /// keys or invalid values.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Read a request config from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ErrorKind::ConfigFile(path.to_path_buf(), e))?;
        Self::from_toml(&contents)
    }
}

/// Custom deserializer for headers from TOML config format
fn deserialize_headers<'de, D>(deserializer: D) -> std::result::Result<HeaderMap, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let map = HashMap::<String, String>::deserialize(deserializer)?;
    let mut header_map = HeaderMap::new();

    for (name, value) in map {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| serde::de::Error::custom(format!("Invalid header name '{name}': {e}")))?;
        let header_value = HeaderValue::from_str(&value).map_err(|e| {
            serde::de::Error::custom(format!("Invalid header value '{value}': {e}"))
        })?;
        header_map.insert(header_name, header_value);
    }

    Ok(header_map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_config_sets_nothing() {
        let config = RequestConfig::from_toml("").unwrap();
        assert_eq!(config, RequestConfig::default());
        assert_eq!(config.retry_limit, None);
        assert_eq!(config.timeout, None);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let config = RequestConfig::from_toml(
            r#"
            retry_limit = 5
            retry_delay = "250ms"
            timeout = "10s"
            ranking_window = "2m"
            host_selection = "round_robin"
            cold_start_selection = "ranked"
            max_response_size = 4096

            [headers]
            X-Request-Source = "billing"
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            RequestConfig {
                retry_limit: Some(5),
                retry_delay: Some(Duration::from_millis(250)),
                timeout: Some(Duration::from_secs(10)),
                ranking_window: Some(Duration::from_secs(120)),
                host_selection: Some(HostSelection::RoundRobin),
                cold_start_selection: Some(HostSelection::Ranked),
                max_response_size: Some(4096),
                headers: config.headers.clone(),
            }
        );
        assert_eq!(config.headers.get("x-request-source").unwrap(), "billing");
    }

    #[test]
    fn test_invalid_duration_is_rejected() {
        let err = RequestConfig::from_toml(r#"timeout = "soon""#).unwrap_err();
        assert!(matches!(err, ErrorKind::ParseConfig(_)));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = RequestConfig::from_toml("retries = 5").unwrap_err();
        assert!(matches!(err, ErrorKind::ParseConfig(_)));
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let err = RequestConfig::from_toml("[headers]\n\"in valid\" = \"x\"").unwrap_err();
        assert!(err.to_string().contains("Invalid header name"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retry_delay = \"2s\"").unwrap();

        let config = RequestConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.retry_delay, Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taplink.toml");
        let err = RequestConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ErrorKind::ConfigFile(p, _) if p == path));
    }
}
