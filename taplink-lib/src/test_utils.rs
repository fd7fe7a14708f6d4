use http::HeaderMap;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

use crate::config::{Configuration, Options};
use crate::executor::Executor;
use crate::selector::{DEFAULT_RANKING_WINDOW, HostSelection, HostSelector};
use crate::stats::{HostKey, Statistics};
use crate::{Client, ClientBuilder};

pub(crate) const APP_ID: &str = "a1b2c3";

/// The host key under which requests to a mock server are recorded
pub(crate) fn host_of(server: &MockServer) -> HostKey {
    HostKey::from(server.address().to_string())
}

/// A configuration which sends requests to the given mock servers
pub(crate) fn configuration(servers: &[&MockServer]) -> Configuration {
    init_logger();
    let config = Configuration::new(
        SecretString::from(APP_ID.to_string()),
        HostKey::from("api.taplink.co"),
        HeaderMap::new(),
    );
    config.replace_options(Options {
        last_modified: 0,
        servers: servers.iter().map(|server| host_of(server)).collect(),
    });
    config
}

/// Show the log of the client in the output of failed tests
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A client for the given mock servers which does not wait between attempts
pub(crate) fn get_mock_client(servers: &[&MockServer]) -> Client {
    init_logger();
    ClientBuilder::builder()
        .app_id(SecretString::from(APP_ID.to_string()))
        .servers(servers.iter().map(|server| host_of(server)).collect::<Vec<_>>())
        .scheme("http")
        .require_https(false)
        .retry_delay(Duration::ZERO)
        .timeout(Duration::from_secs(2))
        .build()
        .client()
        .unwrap()
}

/// An executor for plain-http mock servers which cuts bodies off after 1 KiB
pub(crate) fn mock_executor(retry_limit: usize, retry_delay: Duration) -> Executor {
    init_logger();
    Executor {
        reqwest_client: reqwest::Client::builder()
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap(),
        selector: HostSelector::new(
            HostSelection::Ranked,
            HostSelection::RoundRobin,
            DEFAULT_RANKING_WINDOW,
            HostKey::from("api.taplink.co"),
        ),
        stats: Arc::new(Statistics::default()),
        retry_limit,
        retry_delay,
        scheme: "http".to_string(),
        require_https: false,
        max_response_size: 1024,
    }
}
