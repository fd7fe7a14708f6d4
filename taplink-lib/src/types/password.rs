use std::fmt;

use super::Version;

/// Outcome of checking a password hash against its stored value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    /// Whether the computed hash equals the stored one
    pub matched: bool,
    /// Version the hash was computed with
    pub version_id: Version,
    /// Latest version known to the API
    pub new_version_id: Version,
    /// The computed hash
    pub hash: Vec<u8>,
    /// Hash for the latest version.
    ///
    /// Only set for matching passwords with a pending upgrade. Store it
    /// together with `new_version_id` to move the user to the new settings.
    pub new_hash: Option<Vec<u8>>,
}

impl VerifyResult {
    /// The hash and version to store if the user should be upgraded
    #[must_use]
    pub fn upgrade(&self) -> Option<(&[u8], Version)> {
        self.new_hash
            .as_deref()
            .map(|hash| (hash, self.new_version_id))
    }
}

/// Renders the computed hash as lowercase hex
impl fmt::Display for VerifyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.hash))
    }
}

/// Hash of a new password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPasswordResult {
    /// The hash to store
    pub hash: Vec<u8>,
    /// Version the hash was computed with, needed to verify it later
    pub version_id: Version,
}

/// Renders the hash as lowercase hex
impl fmt::Display for NewPasswordResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_as_hex() {
        let password = NewPasswordResult {
            hash: vec![0xde, 0xad, 0xbe, 0xef],
            version_id: Version(3),
        };
        assert_eq!(password.to_string(), "deadbeef");
    }

    #[test]
    fn test_upgrade() {
        let mut result = VerifyResult {
            matched: true,
            version_id: Version(2),
            new_version_id: Version(3),
            hash: vec![1],
            new_hash: None,
        };
        assert_eq!(result.upgrade(), None);

        result.new_hash = Some(vec![2]);
        assert_eq!(result.upgrade(), Some((&[2u8][..], Version(3))));
        assert_eq!(result.to_string(), "01");
    }
}
