use std::io;

use http::StatusCode;

use crate::{ErrorKind, stats::HostKey};

/// An extension trait to help determine if a failed attempt
/// is worth repeating against the next host.
pub(crate) trait RetryExt {
    fn should_retry(&self) -> bool;
}

impl RetryExt for StatusCode {
    /// Server errors are transient, everything else is final.
    ///
    /// Client errors in particular are never retried: the same request would
    /// be rejected by every host.
    fn should_retry(&self) -> bool {
        self.is_server_error()
    }
}

impl RetryExt for ErrorKind {
    fn should_retry(&self) -> bool {
        self.is_retryable()
    }
}

/// Map a transport error of an attempt against `host` to the matching
/// [`ErrorKind`].
///
/// A timeout is reported as such even when it is buried in the source chain,
/// e.g. as an `io::Error` wrapped by hyper. Any other failure to obtain a
/// response is a generic transport error.
pub(crate) fn classify(host: &HostKey, error: reqwest::Error) -> ErrorKind {
    if is_timeout(&error) {
        ErrorKind::Timeout { host: host.clone() }
    } else {
        ErrorKind::Transport {
            host: host.clone(),
            source: error,
        }
    }
}

fn is_timeout(error: &reqwest::Error) -> bool {
    if error.is_timeout() {
        return true;
    }
    // Timeouts from the connector surface as `io::Error`s, sometimes wrapped
    // into a `hyper::Error` first.
    if let Some(io_error) = get_source_error_type::<io::Error>(error) {
        return io_error.kind() == io::ErrorKind::TimedOut;
    }
    get_source_error_type::<hyper::Error>(error).is_some_and(hyper::Error::is_timeout)
}

/// Downcasts the given err source into T.
fn get_source_error_type<T: std::error::Error + 'static>(
    err: &dyn std::error::Error,
) -> Option<&T> {
    let mut source = err.source();

    while let Some(err) = source {
        if let Some(typed) = err.downcast_ref::<T>() {
            return Some(typed);
        }

        source = err.source();
    }
    None
}
