use http::StatusCode;
use serde::{Serialize, Serializer};
use std::hash::Hash;
use std::path::PathBuf;
use thiserror::Error;

use crate::stats::HostKey;

/// Status code recorded for failures which never produced an HTTP status,
/// e.g. refused connections, DNS failures or unreadable bodies.
pub const UNKNOWN_STATUS_CODE: u16 = 999;

/// Possible errors when talking to the TapLink API
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The attempt exceeded the transport timeout
    #[error("Request to {host} timed out")]
    Timeout {
        /// The host which did not answer in time
        host: HostKey,
    },

    /// No response could be obtained from the host
    #[error("Network error while trying to connect to {host}: {source}")]
    Transport {
        /// The host which could not be reached
        host: HostKey,
        /// The underlying network error
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be read, or it was empty
    #[error("unexpected EOF while reading the response from {host}")]
    ReadResponseBody {
        /// The host which sent the broken response
        host: HostKey,
    },

    /// The host answered with a 5xx status code.
    /// Displays the message sent by the server.
    #[error("{message}")]
    ServerError {
        /// The host which sent the error
        host: HostKey,
        /// Status code of the response
        status: StatusCode,
        /// Trimmed response body
        message: String,
    },

    /// The host answered with a 4xx status code.
    /// Displays the message sent by the server.
    #[error("{message}")]
    ClientError {
        /// The host which sent the error
        host: HostKey,
        /// Status code of the response
        status: StatusCode,
        /// Trimmed response body
        message: String,
    },

    /// A successful response did not contain the expected JSON document
    #[error("Cannot decode API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A hex encoded field of a successful response was malformed
    #[error("Field `{field}` is not valid hex: {source}")]
    InvalidHex {
        /// Name of the JSON field
        field: &'static str,
        /// The underlying decoding error
        #[source]
        source: hex::FromHexError,
    },

    /// The response was not delivered over an encrypted connection
    #[error("Response from {host} was not encrypted")]
    UnencryptedResponse {
        /// The host which sent the plaintext response
        host: HostKey,
    },

    /// The operation was cancelled by the caller
    #[error("Request was cancelled")]
    Cancelled,

    /// The given header could not be parsed.
    /// A possible error when converting a `HeaderValue` from a string or byte
    /// slice.
    #[error("Header could not be parsed.")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    /// The request client could not be created
    #[error("Error creating request client: {0}")]
    BuildRequestClient(#[source] reqwest::Error),

    /// No valid request URL could be built for the host, e.g. because of a
    /// malformed server entry
    #[error("Cannot build request URL `{url}` for {host}: {source}")]
    InvalidUrl {
        /// The host the URL was built for
        host: HostKey,
        /// The rejected URL
        url: String,
        /// The underlying parse error
        #[source]
        source: url::ParseError,
    },

    /// The configuration file could not be read
    #[error("Failed to read configuration file `{}`: {}", .0.display(), .1)]
    ConfigFile(PathBuf, #[source] std::io::Error),

    /// The configuration file is not valid TOML or contains unknown keys
    #[error("Cannot parse configuration: {0}")]
    ParseConfig(#[from] toml::de::Error),

    /// The server options could not be loaded from the default host
    #[error("Could not get configuration: {status}")]
    LoadConfiguration {
        /// Status code of the response
        status: StatusCode,
    },

    /// The client was built without an application ID
    #[error("An application ID is required")]
    MissingAppId,
}

impl ErrorKind {
    /// Whether another attempt against a (possibly different) host may
    /// succeed where this one failed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Transport { .. }
                | Self::ReadResponseBody { .. }
                | Self::ServerError { .. }
                | Self::InvalidUrl { .. }
        )
    }

    /// The host which produced this error, for errors tied to a request attempt
    #[must_use]
    pub const fn host(&self) -> Option<&HostKey> {
        match self {
            Self::Timeout { host }
            | Self::Transport { host, .. }
            | Self::ReadResponseBody { host }
            | Self::ServerError { host, .. }
            | Self::ClientError { host, .. }
            | Self::InvalidUrl { host, .. }
            | Self::UnencryptedResponse { host } => Some(host),
            _ => None,
        }
    }

    /// The status code under which this error is recorded in the host
    /// statistics. Returns `None` for errors which are not network
    /// failures, and for timeouts which are tracked separately.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { .. } | Self::ReadResponseBody { .. } | Self::InvalidUrl { .. } => {
                Some(UNKNOWN_STATUS_CODE)
            }
            Self::ServerError { status, .. } | Self::ClientError { status, .. } => {
                Some(status.as_u16())
            }
            _ => None,
        }
    }
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Timeout { host: h1 }, Self::Timeout { host: h2 })
            | (Self::ReadResponseBody { host: h1 }, Self::ReadResponseBody { host: h2 })
            | (Self::UnencryptedResponse { host: h1 }, Self::UnencryptedResponse { host: h2 }) => {
                h1 == h2
            }
            (Self::Transport { host: h1, source: e1 }, Self::Transport { host: h2, source: e2 }) => {
                h1 == h2 && e1.to_string() == e2.to_string()
            }
            (
                Self::ServerError {
                    host: h1,
                    status: s1,
                    message: m1,
                },
                Self::ServerError {
                    host: h2,
                    status: s2,
                    message: m2,
                },
            )
            | (
                Self::ClientError {
                    host: h1,
                    status: s1,
                    message: m1,
                },
                Self::ClientError {
                    host: h2,
                    status: s2,
                    message: m2,
                },
            ) => h1 == h2 && s1 == s2 && m1 == m2,
            (Self::Decode(e1), Self::Decode(e2)) => e1.to_string() == e2.to_string(),
            (
                Self::InvalidHex {
                    field: f1,
                    source: e1,
                },
                Self::InvalidHex {
                    field: f2,
                    source: e2,
                },
            ) => f1 == f2 && e1 == e2,
            (Self::LoadConfiguration { status: s1 }, Self::LoadConfiguration { status: s2 }) => {
                s1 == s2
            }
            (
                Self::InvalidUrl {
                    host: h1,
                    url: u1,
                    source: e1,
                },
                Self::InvalidUrl {
                    host: h2,
                    url: u2,
                    source: e2,
                },
            ) => h1 == h2 && u1 == u2 && e1 == e2,
            (Self::Cancelled, Self::Cancelled)
            | (Self::MissingAppId, Self::MissingAppId)
            | (Self::InvalidHeader(_), Self::InvalidHeader(_)) => true,
            _ => false,
        }
    }
}

impl Eq for ErrorKind {}

impl Hash for ErrorKind {
    fn hash<H>(&self, state: &mut H)
    where
        H: std::hash::Hasher,
    {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Timeout { host }
            | Self::ReadResponseBody { host }
            | Self::UnencryptedResponse { host } => host.hash(state),
            Self::Transport { host, source } => (host, source.to_string()).hash(state),
            Self::ServerError {
                host,
                status,
                message,
            }
            | Self::ClientError {
                host,
                status,
                message,
            } => (host, status, message).hash(state),
            Self::InvalidHex { field, .. } => field.hash(state),
            Self::LoadConfiguration { status } => status.hash(state),
            Self::InvalidUrl { host, url, .. } => (host, url).hash(state),
            Self::ConfigFile(path, e) => (path, e.kind()).hash(state),
            Self::Decode(e) => e.to_string().hash(state),
            Self::ParseConfig(e) => e.to_string().hash(state),
            Self::BuildRequestClient(e) => e.to_string().hash(state),
            Self::InvalidHeader(e) => e.to_string().hash(state),
            Self::Cancelled | Self::MissingAppId => {}
        }
    }
}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
