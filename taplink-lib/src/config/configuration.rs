use http::{HeaderMap, StatusCode};
use log::info;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

use super::Options;
use crate::executor::Executor;
use crate::stats::HostKey;
use crate::{ErrorKind, Result};

/// Connection settings shared by all operations of a [`crate::Client`].
///
/// The server list is read for every operation and replaced rarely.
/// Replacements publish a complete [`Options`] value at once, so an
/// operation sees either the old or the new list, never a mix of both.
#[derive(Debug)]
pub struct Configuration {
    app_id: SecretString,
    default_host: HostKey,
    headers: HeaderMap,
    options: RwLock<Arc<Options>>,
}

impl Configuration {
    /// Create a configuration without any servers.
    /// Until servers are set, all requests go to `default_host`.
    #[must_use]
    pub fn new(app_id: SecretString, default_host: HostKey, headers: HeaderMap) -> Self {
        Self {
            app_id,
            default_host,
            headers,
            options: RwLock::new(Arc::new(Options::default())),
        }
    }

    /// The application ID which scopes every request
    #[must_use]
    pub fn app_id(&self) -> &str {
        self.app_id.expose_secret()
    }

    /// Host used to load the options, and for requests while no servers are known
    #[must_use]
    pub const fn default_host(&self) -> &HostKey {
        &self.default_host
    }

    /// Headers sent with every request
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The current options
    #[must_use]
    pub fn options(&self) -> Arc<Options> {
        Arc::clone(&*self.options.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// The current server list
    #[must_use]
    pub fn servers(&self) -> Vec<HostKey> {
        self.options().servers.clone()
    }

    /// Time of the last change of the options, `None` if unknown
    #[must_use]
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.options().last_modified()
    }

    /// Publish new options. Running operations keep the server list they
    /// started with.
    pub fn replace_options(&self, options: Options) {
        info!(
            "Using {} API server(s): {}",
            options.servers.len(),
            options
                .servers
                .iter()
                .map(HostKey::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        let options = Arc::new(options);
        *self.options.write().unwrap_or_else(PoisonError::into_inner) = options;
    }

    /// Load the options of the application from the default host and
    /// publish them. Gives up with [`ErrorKind::Cancelled`] as soon as
    /// `token` is cancelled.
    ///
    /// The request is subject to the same response size limit and HTTPS
    /// requirement as API calls, but it is not retried and not recorded in
    /// the statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the host does not answer with
    /// `200 OK`, or the response cannot be decoded. The current options are
    /// kept in that case.
    pub(crate) async fn load(&self, executor: &Executor, token: &CancellationToken) -> Result<()> {
        if token.is_cancelled() {
            return Err(ErrorKind::Cancelled);
        }

        let options = tokio::select! {
            biased;
            () = token.cancelled() => return Err(ErrorKind::Cancelled),
            options = self.fetch(executor) => options?,
        };
        self.replace_options(options);
        Ok(())
    }

    async fn fetch(&self, executor: &Executor) -> Result<Options> {
        let response = executor
            .send(&self.default_host, self.app_id(), &self.headers)
            .await?;
        if response.status != StatusCode::OK {
            return Err(ErrorKind::LoadConfiguration {
                status: response.status,
            });
        }
        Ok(serde_json::from_slice(&response.body)?)
    }
}
