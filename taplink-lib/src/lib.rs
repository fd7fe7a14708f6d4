//! `taplink` is a client library for the TapLink blind hashing service.
//!
//! Blind hashing turns a password hash computed by the application (`hash1`)
//! into the value to store (`hash2`) with the help of a secret salt held by
//! the API. Neither the password nor a reversible hash leaves the
//! application.
//!
//! Hashing a new password and checking it later:
//!
//! ```no_run
//! use secrecy::SecretString;
//! use taplink_lib::{ClientBuilder, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!   let client = ClientBuilder::builder()
//!       .app_id(SecretString::from(String::from("<your app id>")))
//!       .build()
//!       .client()?;
//!   client.load_config().await?;
//!
//!   let hash1 = [0u8; 64]; // e.g. an HMAC-SHA512 of the password
//!   let stored = client.new_password(&hash1).await?;
//!
//!   let result = client
//!       .verify_password(&hash1, &stored.hash, stored.version_id)
//!       .await?;
//!   assert!(result.matched);
//!   Ok(())
//! }
//! ```
//!
//! Requests are spread over the servers of the application. Failing servers
//! are skipped based on the statistics the client keeps about every request,
//! see [`selector`] and [`stats`].
#![warn(missing_docs)]

#[cfg(doctest)]
doc_comment::doctest!("../../README.md");

mod api;
mod client;
mod crypto;
mod executor;
mod retry;
mod types;

pub mod config;
pub mod selector;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::Api;
pub use client::{Client, ClientBuilder, DEFAULT_HOST, DEFAULT_USER_AGENT};
pub use crypto::{hash2, verify_hash2};
pub use types::*;
