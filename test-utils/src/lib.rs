//! `test-utils` is used for testing `taplink-lib`.
//! This crate does not depend on `taplink-lib`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Reference values of the blind hashing protocol.
///
/// `HASH1` is `HMAC-SHA512(key = PASSWORD_KEY, message = "secret")`.
/// The API hands out `SALT_V2` and `SALT_V3` for it, which turn it into
/// `HASH2_V2` and `HASH2_V3` respectively.
pub mod vectors {
    /// Key used to derive `HASH1` from the password `secret`
    pub const PASSWORD_KEY: &str = "4cb78a1a60599df9c3bd9e4ac741a5f15feec1812b22a5f15bbad978039f2765f00dd82d97272eb3674cd164a0cc7024bbfd3704c6df6e2cb17a6562bd96ecb7";
    /// First round hash of the password `secret`
    pub const HASH1: &str = "31245069633cbdded0b3e6e20a71228e2f4244db2b4a078f47e65b8a397643c32347d5d3f8575744dd2af1be7e96bb1d8f2e8437ecccd3e5ba80dde8d32133a3";
    /// Salt of `HASH1` for version 2
    pub const SALT_V2: &str = "6190928f03b4ca59aed71614876857679e1edcf9b03ce3443a006713bcb2a305d33ee250c327df00f946041ca435a2cf72dd421e02f1e0d8de3efd5406674f6f";
    /// Salt of `HASH1` for version 3
    pub const SALT_V3: &str = "080b64a980fe49664e6e29e7532ce4dab19a070da0618e32b20d7d0578e120458c1fcf7f3de0a9da7bbf7ba49cacabc05230c605f7032ab51323992ff3c35895";
    /// Second round hash for version 2
    pub const HASH2_V2: &str = "d883c376526904dd90bd69709d259e7d4ac4fe1ee3ff65a2b6ed2920c8baad326b0c2043c6bb7750c6ad02284c2365d3c61298649107924cc44e60450031fbd2";
    /// Second round hash for version 3
    pub const HASH2_V3: &str = "9a4893d65a8eec23e520d0c7abe9c170ba61548c754b4805226e48d7519c55ed7f0daec920c5a99019042745007b99822e6853b8620be67955610b6d25f4b2f9";
}

/// Create a mock web server, which responds with a predefined status when
/// handling a matching request
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// Make a mock server answer salt requests for one hash and version.
///
/// `$version` is the last path segment: the version number, or `""` for
/// the latest version. `$body` is the JSON document to respond with.
#[macro_export]
macro_rules! mount_salt {
    ($mock_server:expr, $app_id:expr, $hash1:expr, $version:expr, $body:expr $(,)?) => {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path(format!(
                "/{}/{}/{}",
                $app_id,
                hex::encode($hash1),
                $version
            )))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json($body))
            .mount($mock_server)
            .await
    };
}

/// Create a mock server which answers salt requests for one hash and version,
/// see [`mount_salt`]
#[macro_export]
macro_rules! salt_server {
    ($app_id:expr, $hash1:expr, $version:expr, $body:expr $(,)?) => {{
        let mock_server = wiremock::MockServer::start().await;
        $crate::mount_salt!(&mock_server, $app_id, $hash1, $version, $body);
        mock_server
    }};
}

/// Decode a hex string into bytes
///
/// # Panic
///
/// This panics on invalid input, so it should only be used for testing
#[macro_export]
macro_rules! hex {
    ($hex:expr) => {
        hex::decode($hex).expect("Expected valid hex string")
    };
}
