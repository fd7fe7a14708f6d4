use ring::hmac;
use subtle::ConstantTimeEq;

/// Second round hash of a password: `HMAC-SHA512(key = salt, message = hash1)`
#[must_use]
pub fn hash2(salt: &[u8], hash1: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac::HMAC_SHA512, salt);
    hmac::sign(&key, hash1).as_ref().to_vec()
}

/// Check in constant time whether `expected` is the second round hash of
/// `hash1` for the given salt
#[must_use]
pub fn verify_hash2(salt: &[u8], hash1: &[u8], expected: &[u8]) -> bool {
    let key = hmac::Key::new(hmac::HMAC_SHA512, salt);
    hmac::verify(&key, hash1, expected).is_ok()
}

/// Compare two hashes in constant time
pub(crate) fn hashes_equal(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
