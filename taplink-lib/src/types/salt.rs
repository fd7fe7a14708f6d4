use serde::Deserialize;
use std::fmt;

use super::Version;
use crate::{ErrorKind, Result};

/// The secret value handed out by the API for one password hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt {
    /// Salt for the requested version
    pub salt: Vec<u8>,
    /// Version of `salt`
    pub version_id: Version,
    /// Salt for newer data pool settings, if the API offers an upgrade
    pub new_salt: Option<Vec<u8>>,
    /// Latest version. Equal to `version_id` when no upgrade is pending.
    pub new_version_id: Version,
}

impl Salt {
    /// Whether newer settings are available together with their salt
    #[must_use]
    pub fn has_upgrade(&self) -> bool {
        self.new_version_id != self.version_id && self.new_salt.is_some()
    }
}

/// Renders the salt as lowercase hex
impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.salt))
    }
}

/// Body of a salt response. Salts are hex encoded on the wire.
#[derive(Debug, Deserialize)]
pub(crate) struct SaltResponse {
    s2: String,
    vid: u64,
    #[serde(default)]
    new_s2: Option<String>,
    #[serde(default)]
    new_vid: Option<u64>,
}

impl TryFrom<SaltResponse> for Salt {
    type Error = ErrorKind;

    fn try_from(response: SaltResponse) -> Result<Self> {
        let salt = hex::decode(&response.s2)
            .map_err(|source| ErrorKind::InvalidHex { field: "s2", source })?;

        let new_salt = match response.new_s2.as_deref() {
            None | Some("") => None,
            Some(new_s2) => Some(hex::decode(new_s2).map_err(|source| ErrorKind::InvalidHex {
                field: "new_s2",
                source,
            })?),
        };

        let version_id = Version(response.vid);
        let new_version_id = response.new_vid.map_or(version_id, Version);

        Ok(Salt {
            salt,
            version_id,
            new_salt,
            new_version_id,
        })
    }
}

impl SaltResponse {
    pub(crate) fn parse(body: &[u8]) -> Result<Salt> {
        let response: SaltResponse = serde_json::from_slice(body)?;
        Salt::try_from(response)
    }
}
