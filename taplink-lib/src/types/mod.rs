mod error;
mod password;
mod salt;
mod version;

pub use error::{ErrorKind, UNKNOWN_STATUS_CODE};
pub use password::{NewPasswordResult, VerifyResult};
pub(crate) use salt::SaltResponse;
pub use salt::Salt;
pub use version::Version;

/// The taplink `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
