use async_trait::async_trait;
use std::time::Duration;

use crate::config::Configuration;
use crate::stats::Statistics;
use crate::{Client, NewPasswordResult, Result, VerifyResult, Version};

/// What an application needs from the TapLink API.
///
/// [`Client`] is the implementation talking to the real service. Code which
/// only depends on this trait can be tested against a stand-in.
#[async_trait]
pub trait Api: Send + Sync {
    /// The configuration requests are sent with
    fn config(&self) -> &Configuration;

    /// Statistics of the requests made so far
    fn stats(&self) -> &Statistics;

    /// See [`Client::verify_password`]
    async fn verify_password(
        &self,
        hash1: &[u8],
        expected: &[u8],
        version: Version,
    ) -> Result<VerifyResult>;

    /// See [`Client::new_password`]
    async fn new_password(&self, hash1: &[u8]) -> Result<NewPasswordResult>;

    /// Number of successful requests to any host
    fn requests(&self) -> usize {
        self.stats().total_requests()
    }

    /// Number of failed requests to any host
    fn errors(&self) -> usize {
        self.stats().total_errors()
    }

    /// Average latency of successful requests
    fn latency(&self) -> Duration {
        self.stats().average_latency()
    }

    /// Percentage of failed requests
    fn error_percentage(&self) -> f64 {
        self.stats().error_percentage()
    }

    /// Start recording statistics
    fn enable_stats(&self) {
        self.stats().enable();
    }

    /// Stop recording statistics
    fn disable_stats(&self) {
        self.stats().disable();
    }
}

#[async_trait]
impl Api for Client {
    fn config(&self) -> &Configuration {
        Client::config(self)
    }

    fn stats(&self) -> &Statistics {
        Client::stats(self)
    }

    async fn verify_password(
        &self,
        hash1: &[u8],
        expected: &[u8],
        version: Version,
    ) -> Result<VerifyResult> {
        Client::verify_password(self, hash1, expected, version).await
    }

    async fn new_password(&self, hash1: &[u8]) -> Result<NewPasswordResult> {
        Client::new_password(self, hash1).await
    }
}
