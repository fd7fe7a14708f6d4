//! Handler of blind hashing operations.
//!
//! This module defines two structs, [`Client`] and [`ClientBuilder`].
//! `Client` talks to the TapLink API on behalf of an application.
//! `ClientBuilder` exposes a finer level of granularity for building
//! a `Client`.
#![allow(clippy::module_name_repetitions, clippy::struct_excessive_bools)]
use std::sync::Arc;
use std::time::Duration;

use http::header::{self, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tokio_util::sync::CancellationToken;
use typed_builder::TypedBuilder;

use crate::config::{
    Configuration, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_RETRY_DELAY, DEFAULT_RETRY_LIMIT,
    DEFAULT_TIMEOUT, Options, RequestConfig,
};
use crate::executor::Executor;
use crate::selector::{DEFAULT_RANKING_WINDOW, HostSelection, HostSelector};
use crate::stats::{HostKey, Statistics};
use crate::types::SaltResponse;
use crate::{ErrorKind, NewPasswordResult, Result, Salt, VerifyResult, Version, crypto};

/// Default API host, used to load the server list and whenever it is empty
pub const DEFAULT_HOST: &str = "api.taplink.co";
/// Default user agent, `taplink-rs/<PKG_VERSION>`.
pub const DEFAULT_USER_AGENT: &str = concat!("taplink-rs/", env!("CARGO_PKG_VERSION"));

/// Builder for [`Client`].
///
/// See crate-level documentation for usage example.
#[derive(TypedBuilder, Debug, Clone)]
#[builder(field_defaults(default, setter(into)))]
#[builder(builder_method(doc = "
Create a builder for building `ClientBuilder`.

On the builder call, call methods with same name as its fields to set their values.

Finally, call `.build()` to create the instance of `ClientBuilder`.
"))]
pub struct ClientBuilder {
    /// ID of the application, scoping every request to its data pool.
    ///
    /// Required: building a client without it fails.
    #[builder(default_code = "SecretString::from(String::new())")]
    app_id: SecretString,
    /// Host to load the server list from, and to send requests to as long
    /// as the server list is empty.
    #[builder(default_code = "HostKey::from(DEFAULT_HOST)")]
    default_host: HostKey,
    /// Initial server list.
    ///
    /// Can be replaced later, either by hand through
    /// [`Configuration::replace_options`] or with [`Client::load_config`].
    servers: Vec<HostKey>,
    /// User-agent sent with every request.
    #[builder(default_code = "String::from(DEFAULT_USER_AGENT)")]
    user_agent: String,
    /// Additional headers sent with every request.
    custom_headers: HeaderMap,
    /// Transport timeout of a single attempt, including reading the body.
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout: Duration,
    /// Timeout for establishing a connection, bounded by `timeout`.
    connect_timeout: Option<Duration>,
    /// Maximum number of attempts per operation.
    /// At least one attempt is made even if this is zero.
    #[builder(default = DEFAULT_RETRY_LIMIT)]
    retry_limit: usize,
    /// Pause before every attempt but the first.
    #[builder(default = DEFAULT_RETRY_DELAY)]
    retry_delay: Duration,
    /// How hosts are ordered for each operation.
    host_selection: HostSelection,
    /// How hosts are ordered while no statistics exist for any of them.
    /// Only used with [`HostSelection::Ranked`].
    #[builder(default = HostSelection::Random)]
    cold_start_selection: HostSelection,
    /// Trailing window of statistics used to rank hosts.
    #[builder(default = DEFAULT_RANKING_WINDOW)]
    ranking_window: Duration,
    /// When `false`, no statistics are recorded until
    /// [`Statistics::enable`] is called.
    #[builder(default = true)]
    stats_enabled: bool,
    /// URL scheme of API requests.
    #[builder(default_code = "String::from(\"https\")")]
    scheme: String,
    /// Treat responses which were not delivered over HTTPS as errors.
    ///
    /// Only disable this to talk to a local test server.
    #[builder(default = true)]
    require_https: bool,
    /// Responses are cut off after this many bytes.
    #[builder(default = DEFAULT_MAX_RESPONSE_SIZE)]
    max_response_size: usize,
}

impl Default for ClientBuilder {
    #[must_use]
    #[inline]
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientBuilder {
    /// Apply the settings of a [`RequestConfig`], e.g. one read from a file.
    ///
    /// Only the settings present in `config` replace those of the builder.
    /// Its headers are added to the custom headers.
    #[must_use]
    pub fn with_request_config(mut self, config: RequestConfig) -> Self {
        let RequestConfig {
            retry_limit,
            retry_delay,
            timeout,
            ranking_window,
            host_selection,
            cold_start_selection,
            max_response_size,
            headers,
        } = config;

        self.retry_limit = retry_limit.unwrap_or(self.retry_limit);
        self.retry_delay = retry_delay.unwrap_or(self.retry_delay);
        self.timeout = timeout.unwrap_or(self.timeout);
        self.ranking_window = ranking_window.unwrap_or(self.ranking_window);
        self.host_selection = host_selection.unwrap_or(self.host_selection);
        self.cold_start_selection = cold_start_selection.unwrap_or(self.cold_start_selection);
        self.max_response_size = max_response_size.unwrap_or(self.max_response_size);
        self.custom_headers.extend(headers);
        self
    }

    /// Instantiates a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an `Err` if:
    /// - The application ID is empty.
    /// - The user-agent is invalid.
    /// - The request client cannot be created.
    ///   See [here](https://docs.rs/reqwest/latest/reqwest/struct.ClientBuilder.html#errors).
    pub fn client(self) -> Result<Client> {
        let Self {
            app_id,
            default_host,
            servers,
            user_agent,
            custom_headers: mut headers,
            ..
        } = self;

        if app_id.expose_secret().trim().is_empty() {
            return Err(ErrorKind::MissingAppId);
        }

        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&user_agent).map_err(ErrorKind::InvalidHeader)?,
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );

        let builder = reqwest::ClientBuilder::new()
            .gzip(true)
            .timeout(self.timeout);
        let reqwest_client = (match self.connect_timeout {
            Some(t) => builder.connect_timeout(t),
            None => builder,
        })
        .build()
        .map_err(ErrorKind::BuildRequestClient)?;

        let config = Configuration::new(app_id, default_host.clone(), headers);
        if !servers.is_empty() {
            config.replace_options(Options {
                last_modified: 0,
                servers,
            });
        }

        let executor = Executor {
            reqwest_client,
            selector: HostSelector::new(
                self.host_selection,
                self.cold_start_selection,
                self.ranking_window,
                default_host,
            ),
            stats: Arc::new(Statistics::new(self.stats_enabled)),
            retry_limit: self.retry_limit,
            retry_delay: self.retry_delay,
            scheme: self.scheme,
            require_https: self.require_https,
            max_response_size: self.max_response_size,
        };

        Ok(Client {
            config: Arc::new(config),
            executor: Arc::new(executor),
        })
    }
}

/// Client of the TapLink API.
///
/// Cheap to clone: clones share the configuration, the statistics and the
/// host rotation of the client they were cloned from.
///
/// Every network operation comes in two flavors. The `_cancellable` one takes
/// a [`CancellationToken`] and returns [`ErrorKind::Cancelled`] as soon as the
/// token is cancelled, even in the middle of an attempt or of the pause
/// between two attempts.
#[derive(Debug, Clone)]
pub struct Client {
    config: Arc<Configuration>,
    executor: Arc<Executor>,
}

impl Client {
    /// The configuration the client sends requests with
    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Statistics of all requests made by this client
    #[must_use]
    pub fn stats(&self) -> &Statistics {
        &self.executor.stats
    }

    /// Load the server list of the application from the default host.
    ///
    /// The response is held to the same size limit and HTTPS requirement as
    /// every other response. The request is neither retried nor recorded in
    /// the statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the host does not answer with
    /// `200 OK`, or the response cannot be decoded. The current server list
    /// is kept in that case.
    pub async fn load_config(&self) -> Result<()> {
        self.load_config_cancellable(&CancellationToken::new())
            .await
    }

    /// Cancellable version of [`Client::load_config`]
    ///
    /// # Errors
    ///
    /// See [`Client::load_config`].
    pub async fn load_config_cancellable(&self, token: &CancellationToken) -> Result<()> {
        self.config.load(&self.executor, token).await
    }

    /// Get the salt of a first round hash.
    ///
    /// Pass [`Version::LATEST`] to get the salt of the latest data pool
    /// settings. For any other version the API also reports the latest
    /// version and its salt, if they differ.
    ///
    /// # Errors
    ///
    /// Returns an error if the API cannot be reached, rejects the request,
    /// or answers with a malformed document.
    pub async fn get_salt(&self, hash1: &[u8], version: Version) -> Result<Salt> {
        self.get_salt_cancellable(hash1, version, &CancellationToken::new())
            .await
    }

    /// Cancellable version of [`Client::get_salt`]
    ///
    /// # Errors
    ///
    /// See [`Client::get_salt`].
    pub async fn get_salt_cancellable(
        &self,
        hash1: &[u8],
        version: Version,
        token: &CancellationToken,
    ) -> Result<Salt> {
        let path = format!(
            "{}/{}/{}",
            self.config.app_id(),
            hex::encode(hash1),
            version
        );
        let body = self.executor.get(&self.config, &path, token).await?;
        SaltResponse::parse(&body)
    }

    /// Hash a new password with the latest data pool settings.
    ///
    /// `hash1` is a hash of the password, computed by the application.
    /// Store the returned hash together with its version.
    ///
    /// # Errors
    ///
    /// See [`Client::get_salt`].
    pub async fn new_password(&self, hash1: &[u8]) -> Result<NewPasswordResult> {
        self.new_password_cancellable(hash1, &CancellationToken::new())
            .await
    }

    /// Cancellable version of [`Client::new_password`]
    ///
    /// # Errors
    ///
    /// See [`Client::get_salt`].
    pub async fn new_password_cancellable(
        &self,
        hash1: &[u8],
        token: &CancellationToken,
    ) -> Result<NewPasswordResult> {
        let salt = self
            .get_salt_cancellable(hash1, Version::LATEST, token)
            .await?;
        Ok(NewPasswordResult {
            hash: crypto::hash2(&salt.salt, hash1),
            version_id: salt.version_id,
        })
    }

    /// Check a password against the hash stored for it.
    ///
    /// `hash1` is a hash of the password, `expected` the stored hash and
    /// `version` the version it was created with. The comparison runs in
    /// constant time.
    ///
    /// If the password matches and newer settings are available, the result
    /// also carries the hash for the newer settings. Storing it together with
    /// the new version moves the user to the new settings, see
    /// [`VerifyResult::upgrade`].
    ///
    /// # Errors
    ///
    /// See [`Client::get_salt`]. A wrong password is not an error.
    pub async fn verify_password(
        &self,
        hash1: &[u8],
        expected: &[u8],
        version: Version,
    ) -> Result<VerifyResult> {
        self.verify_password_cancellable(hash1, expected, version, &CancellationToken::new())
            .await
    }

    /// Cancellable version of [`Client::verify_password`]
    ///
    /// # Errors
    ///
    /// See [`Client::get_salt`].
    pub async fn verify_password_cancellable(
        &self,
        hash1: &[u8],
        expected: &[u8],
        version: Version,
        token: &CancellationToken,
    ) -> Result<VerifyResult> {
        let salt = self.get_salt_cancellable(hash1, version, token).await?;

        let hash = crypto::hash2(&salt.salt, hash1);
        let matched = crypto::hashes_equal(&hash, expected);
        let new_hash = match &salt.new_salt {
            Some(new_salt) if matched && salt.has_upgrade() => {
                Some(crypto::hash2(new_salt, hash1))
            }
            _ => None,
        };

        Ok(VerifyResult {
            matched,
            version_id: salt.version_id,
            new_version_id: salt.new_version_id,
            hash,
            new_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{APP_ID, get_mock_client, host_of};
    use http::StatusCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_utils::{hex, mock_server, mount_salt, salt_server, vectors};
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn latest_salt() -> serde_json::Value {
        json!({ "s2": vectors::SALT_V3, "vid": 3 })
    }

    #[test]
    fn test_missing_app_id() {
        let err = ClientBuilder::default().client().unwrap_err();
        assert_eq!(err, ErrorKind::MissingAppId);
    }

    #[test]
    fn test_invalid_user_agent() {
        let err = ClientBuilder::builder()
            .app_id(SecretString::from(APP_ID.to_string()))
            .user_agent("taplink\n")
            .build()
            .client()
            .unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidHeader(_)));
    }

    #[test]
    fn test_request_config_is_applied() {
        let config = RequestConfig::from_toml(
            r#"
            retry_limit = 7
            retry_delay = "10ms"
            host_selection = "random"

            [headers]
            X-Team = "auth"
            "#,
        )
        .unwrap();
        let builder = ClientBuilder::builder()
            .app_id(SecretString::from(APP_ID.to_string()))
            .build()
            .with_request_config(config);

        assert_eq!(builder.retry_limit, 7);
        assert_eq!(builder.retry_delay, Duration::from_millis(10));
        assert_eq!(builder.host_selection, HostSelection::Random);

        let client = builder.client().unwrap();
        assert_eq!(client.config().headers().get("x-team").unwrap(), "auth");
    }

    #[test]
    fn test_request_config_keeps_unset_settings() {
        let builder = ClientBuilder::builder()
            .app_id(SecretString::from(APP_ID.to_string()))
            .timeout(Duration::from_secs(5))
            .host_selection(HostSelection::RoundRobin)
            .max_response_size(2048_usize)
            .build()
            .with_request_config(RequestConfig::from_toml("retry_limit = 1").unwrap());

        assert_eq!(builder.retry_limit, 1);
        assert_eq!(builder.timeout, Duration::from_secs(5));
        assert_eq!(builder.host_selection, HostSelection::RoundRobin);
        assert_eq!(builder.max_response_size, 2048);
        assert_eq!(builder.retry_delay, DEFAULT_RETRY_DELAY);
    }

    #[tokio::test]
    async fn test_load_config_respects_response_size_limit() {
        let servers: Vec<String> = (0..100_000).map(|i| format!("s{i}.taplink.co")).collect();
        let api = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lastModified": 0,
                "servers": servers,
            })))
            .mount(&api)
            .await;

        let client = ClientBuilder::builder()
            .app_id(SecretString::from(APP_ID.to_string()))
            .default_host(host_of(&api))
            .scheme("http")
            .require_https(false)
            .max_response_size(1024_usize)
            .build()
            .client()
            .unwrap();
        let err = client.load_config().await.unwrap_err();

        assert!(matches!(err, ErrorKind::Decode(_)));
        assert!(client.config().servers().is_empty());
    }

    #[tokio::test]
    async fn test_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("accept", "application/json"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(latest_salt()))
            .expect(1)
            .mount(&server)
            .await;

        let client = get_mock_client(&[&server]);
        client
            .get_salt(&hex!(vectors::HASH1), Version::LATEST)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_get_latest_salt() {
        let hash1 = hex!(vectors::HASH1);
        let server = salt_server!(APP_ID, &hash1, "", latest_salt());

        let client = get_mock_client(&[&server]);
        let salt = client.get_salt(&hash1, Version::LATEST).await.unwrap();

        assert_eq!(salt.salt, hex!(vectors::SALT_V3));
        assert_eq!(salt.version_id, Version(3));
        assert_eq!(salt.new_version_id, salt.version_id);
        assert_eq!(salt.new_salt, None);
        assert_eq!(salt.to_string(), vectors::SALT_V3);
    }

    #[tokio::test]
    async fn test_new_password_golden_vector() {
        let hash1 = hex!(vectors::HASH1);
        let server = salt_server!(APP_ID, &hash1, "", latest_salt());

        let client = get_mock_client(&[&server]);
        let password = client.new_password(&hash1).await.unwrap();

        assert_eq!(password.hash, hex!(vectors::HASH2_V3));
        assert_eq!(password.version_id, Version(3));
        assert_eq!(password.to_string(), vectors::HASH2_V3);
    }

    #[tokio::test]
    async fn test_verify_new_password() {
        let hash1 = hex!(vectors::HASH1);
        let server = salt_server!(APP_ID, &hash1, "", latest_salt());
        mount_salt!(&server, APP_ID, &hash1, "3", latest_salt());

        let client = get_mock_client(&[&server]);
        let password = client.new_password(&hash1).await.unwrap();
        let result = client
            .verify_password(&hash1, &password.hash, password.version_id)
            .await
            .unwrap();

        assert!(result.matched);
        assert_eq!(result.version_id, Version(3));
        assert_eq!(result.new_version_id, Version(3));
        assert_eq!(result.new_hash, None);
    }

    #[tokio::test]
    async fn test_verify_with_upgrade() {
        let hash1 = hex!(vectors::HASH1);
        let server = salt_server!(
            APP_ID,
            &hash1,
            "2",
            json!({
                "s2": vectors::SALT_V2,
                "vid": 2,
                "new_s2": vectors::SALT_V3,
                "new_vid": 3,
            })
        );

        let client = get_mock_client(&[&server]);
        let result = client
            .verify_password(&hash1, &hex!(vectors::HASH2_V2), Version(2))
            .await
            .unwrap();

        assert!(result.matched);
        assert_eq!(result.hash, hex!(vectors::HASH2_V2));
        assert_eq!(result.version_id, Version(2));
        assert_eq!(result.new_version_id, Version(3));
        assert_eq!(result.new_hash, Some(hex!(vectors::HASH2_V3)));
        assert_eq!(
            result.upgrade(),
            Some((hex!(vectors::HASH2_V3).as_slice(), Version(3)))
        );
    }

    #[tokio::test]
    async fn test_wrong_password_is_not_upgraded() {
        let hash1 = hex!(vectors::HASH1);
        let server = salt_server!(
            APP_ID,
            &hash1,
            "2",
            json!({
                "s2": vectors::SALT_V2,
                "vid": 2,
                "new_s2": vectors::SALT_V3,
                "new_vid": 3,
            })
        );

        let client = get_mock_client(&[&server]);
        let result = client
            .verify_password(&hash1, &hex!(vectors::HASH2_V3), Version(2))
            .await
            .unwrap();

        assert!(!result.matched);
        assert_eq!(result.hash, hex!(vectors::HASH2_V2));
        assert_eq!(result.new_hash, None);
    }

    #[tokio::test]
    async fn test_invalid_hex_is_not_retried() {
        let server = mock_server!(
            StatusCode::OK,
            set_body_string(r#"{"s2":"---invalid hex string here---","vid":3}"#)
        );

        let client = get_mock_client(&[&server]);
        let err = client
            .get_salt(&hex!(vectors::HASH1), Version::LATEST)
            .await
            .unwrap_err();

        assert!(matches!(err, ErrorKind::InvalidHex { field: "s2", .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        // The transport worked, so the attempt counts as a success
        assert_eq!(client.stats().get(&host_of(&server)).requests(), 1);
    }

    #[tokio::test]
    async fn test_load_config() {
        let api = MockServer::start().await;
        let salt = mock_server!(StatusCode::OK, set_body_json(latest_salt()));
        Mock::given(method("GET"))
            .and(wiremock::matchers::path(format!("/{APP_ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "lastModified": 1_475_000_000,
                "servers": [host_of(&salt).as_str()],
            })))
            .expect(1)
            .mount(&api)
            .await;

        let client = ClientBuilder::builder()
            .app_id(SecretString::from(APP_ID.to_string()))
            .default_host(host_of(&api))
            .scheme("http")
            .require_https(false)
            .build()
            .client()
            .unwrap();
        client.load_config().await.unwrap();
        assert_eq!(client.config().servers(), vec![host_of(&salt)]);

        client.new_password(&hex!(vectors::HASH1)).await.unwrap();
        assert_eq!(client.stats().get(&host_of(&salt)).requests(), 1);
        assert!(client.stats().get(&host_of(&api)).is_empty());
    }
}
