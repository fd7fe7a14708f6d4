//! The retry and failover loop behind every API call.
//!
//! An operation is a `GET` of a path relative to the API root. It is tried up
//! to `retry_limit` times, each attempt against the host the
//! [`HostSelector`] planned for it. The outcome of every attempt is recorded
//! in the [`Statistics`], which makes this the only place statistics are
//! produced.

use http::{HeaderMap, StatusCode};
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::Configuration;
use crate::retry::{self, RetryExt};
use crate::selector::HostSelector;
use crate::stats::{HostKey, Statistics};
use crate::{ErrorKind, Result};

/// Issues API calls with retries across hosts
#[derive(Debug)]
pub(crate) struct Executor {
    pub(crate) reqwest_client: reqwest::Client,
    pub(crate) selector: HostSelector,
    pub(crate) stats: Arc<Statistics>,
    pub(crate) retry_limit: usize,
    pub(crate) retry_delay: Duration,
    pub(crate) scheme: String,
    pub(crate) require_https: bool,
    pub(crate) max_response_size: usize,
}

/// Body and latency of a successful attempt
struct Success {
    body: Vec<u8>,
    latency: Duration,
}

/// A response as received, before its status is looked at
pub(crate) struct Response {
    pub(crate) status: StatusCode,
    pub(crate) body: Vec<u8>,
    pub(crate) latency: Duration,
}

impl Executor {
    /// Get `path` from the API and return the response body.
    ///
    /// The server list is read once from `config`, so all attempts follow
    /// the same plan even if the list is replaced in the meantime.
    ///
    /// # Errors
    ///
    /// Returns the error of the first non-retryable attempt, the error of the
    /// last attempt once all attempts failed, or [`ErrorKind::Cancelled`]
    /// as soon as `token` is cancelled.
    pub(crate) async fn get(
        &self,
        config: &Configuration,
        path: &str,
        token: &CancellationToken,
    ) -> Result<Vec<u8>> {
        if token.is_cancelled() {
            return Err(ErrorKind::Cancelled);
        }

        let path = path.trim_start_matches('/');
        let plan = self.selector.plan(&config.servers(), &self.stats);
        let attempts = self.retry_limit.max(1);

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return Err(ErrorKind::Cancelled),
                    () = sleep(self.retry_delay) => {}
                }
            }

            let host = plan.host(attempt);
            attempt += 1;

            // A cancelled attempt is dropped as is and leaves no trace in the statistics
            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => return Err(ErrorKind::Cancelled),
                outcome = self.attempt(host, path, config.headers()) => outcome,
            };

            match outcome {
                Ok(Success { body, latency }) => {
                    debug!(
                        "Attempt {attempt}/{attempts} to {host} succeeded in {}ms",
                        latency.as_millis()
                    );
                    self.stats.add_success(host, latency);
                    return Ok(body);
                }
                Err(err) => {
                    self.record_failure(host, &err);
                    if !err.should_retry() {
                        debug!("Attempt {attempt}/{attempts} to {host} failed for good: {err}");
                        return Err(err);
                    }
                    if attempt >= attempts {
                        warn!("Giving up after {attempts} attempt(s), last error from {host}: {err}");
                        return Err(err);
                    }
                    warn!("Attempt {attempt}/{attempts} to {host} failed, retrying: {err}");
                }
            }
        }
    }

    /// A single request, classified but not yet recorded
    async fn attempt(&self, host: &HostKey, path: &str, headers: &HeaderMap) -> Result<Success> {
        let Response {
            status,
            body,
            latency,
        } = self.send(host, path, headers).await?;
        if body.is_empty() {
            return Err(ErrorKind::ReadResponseBody { host: host.clone() });
        }

        if status.is_client_error() || status.is_server_error() {
            let message = String::from_utf8_lossy(&body).trim().to_string();
            let host = host.clone();
            return Err(if status.should_retry() {
                ErrorKind::ServerError {
                    host,
                    status,
                    message,
                }
            } else {
                ErrorKind::ClientError {
                    host,
                    status,
                    message,
                }
            });
        }

        Ok(Success { body, latency })
    }

    /// Send a `GET` request to `host` and read the response, whatever its
    /// status.
    ///
    /// The body is cut off after `max_response_size` bytes. Responses not
    /// delivered over HTTPS are rejected if `require_https` is set.
    pub(crate) async fn send(
        &self,
        host: &HostKey,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<Response> {
        let url = format!("{}://{host}/{path}", self.scheme);
        let url = reqwest::Url::parse(&url).map_err(|source| ErrorKind::InvalidUrl {
            host: host.clone(),
            url: url.clone(),
            source,
        })?;

        let start = Instant::now();
        let response = self
            .reqwest_client
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| retry::classify(host, e))?;
        let latency = start.elapsed();

        if self.require_https && response.url().scheme() != "https" {
            return Err(ErrorKind::UnencryptedResponse { host: host.clone() });
        }

        let status = response.status();
        let body = read_body(response, self.max_response_size)
            .await
            .map_err(|_| ErrorKind::ReadResponseBody { host: host.clone() })?;

        Ok(Response {
            status,
            body,
            latency,
        })
    }

    fn record_failure(&self, host: &HostKey, err: &ErrorKind) {
        if matches!(err, ErrorKind::Timeout { .. }) {
            self.stats.add_timeout(host);
        } else if let Some(code) = err.status_code() {
            self.stats.add_error(host, code);
        }
    }
}

/// Read at most `limit` bytes of the body. Anything beyond is discarded.
async fn read_body(
    mut response: reqwest::Response,
    limit: usize,
) -> std::result::Result<Vec<u8>, reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let remaining = limit - body.len();
        if chunk.len() >= remaining {
            body.extend_from_slice(&chunk[..remaining]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}
