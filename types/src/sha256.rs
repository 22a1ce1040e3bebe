//! SHA-256 digest helpers.

use sha2::{Digest, Sha256};

/// Length of a full digest in bytes.
pub const DIGEST_LENGTH: usize = 32;
/// Length of a validator address (truncated digest) in bytes.
pub const ADDRESS_LENGTH: usize = 20;

/// Hashes the given bytes with SHA-256.
pub fn hash(bytes: &[u8]) -> [u8; DIGEST_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Hashes the given bytes with SHA-256 and truncates to address length.
pub fn address_hash(bytes: &[u8]) -> [u8; ADDRESS_LENGTH] {
    let digest = hash(bytes);
    let mut out = [0u8; ADDRESS_LENGTH];
    out.copy_from_slice(&digest[..ADDRESS_LENGTH]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use valharness_codec::hex;

    #[test]
    fn test_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            hex(&hash(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_address_is_prefix() {
        let digest = hash(b"addr");
        assert_eq!(address_hash(b"addr"), digest[..ADDRESS_LENGTH]);
    }
}
