//! Settings of a client.
//!
//! [`Configuration`] holds what identifies the application to the API and
//! where requests go. [`RequestConfig`] holds the tuning of the request layer
//! and can be read from a TOML file.

mod configuration;
mod options;
mod request;

pub use configuration::Configuration;
pub use options::Options;
pub use request::{
    DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_RETRY_DELAY, DEFAULT_RETRY_LIMIT, DEFAULT_TIMEOUT,
    RequestConfig,
};
