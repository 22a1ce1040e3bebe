//! Ed25519 keys and signatures.
//!
//! Backed by the `ed25519-consensus` crate, which enforces a strict set of
//! validation rules necessary for stability when signatures are checked by
//! many independent validators.

use bytes::{Buf, BufMut};
use rand::{CryptoRng, RngCore};
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use valharness_codec::{hex, EncodeSize, Error as CodecError, Read, Write};

/// Length of an Ed25519 private key in bytes.
pub const PRIVATE_KEY_LENGTH: usize = 32;
/// Length of an Ed25519 public key in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;
/// Length of an Ed25519 signature in bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Ed25519 private key.
#[derive(Clone)]
pub struct PrivateKey {
    raw: [u8; PRIVATE_KEY_LENGTH],
    key: ed25519_consensus::SigningKey,
}

impl PrivateKey {
    pub fn from_bytes(raw: [u8; PRIVATE_KEY_LENGTH]) -> Self {
        let key = ed25519_consensus::SigningKey::from(raw);
        Self { raw, key }
    }

    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LENGTH] {
        &self.raw
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Never log key material.
        write!(f, "PrivateKey(<redacted>)")
    }
}

/// Ed25519 public key.
#[derive(Clone)]
pub struct PublicKey {
    raw: [u8; PUBLIC_KEY_LENGTH],
    key: ed25519_consensus::VerificationKey,
}

impl PublicKey {
    /// Parses a public key, rejecting bytes that are not a valid curve point.
    pub fn from_bytes(raw: [u8; PUBLIC_KEY_LENGTH]) -> Option<Self> {
        let key = ed25519_consensus::VerificationKey::try_from(raw).ok()?;
        Some(Self { raw, key })
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.raw
    }

    /// Verifies `signature` over `message` against this key.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let signature = ed25519_consensus::Signature::from(signature.raw);
        self.key.verify(&signature, message).is_ok()
    }

    /// The validator address derived from this key (truncated digest of the
    /// raw key bytes).
    pub fn address(&self) -> [u8; crate::sha256::ADDRESS_LENGTH] {
        crate::sha256::address_hash(&self.raw)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

impl Write for PublicKey {
    fn write(&self, buf: &mut impl BufMut) {
        self.raw.write(buf);
    }
}

impl EncodeSize for PublicKey {
    fn encode_size(&self) -> usize {
        PUBLIC_KEY_LENGTH
    }
}

impl Read for PublicKey {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let raw = <[u8; PUBLIC_KEY_LENGTH]>::read(buf)?;
        Self::from_bytes(raw).ok_or(CodecError::Invalid("PublicKey", "invalid curve point"))
    }
}

/// Ed25519 signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    raw: [u8; SIGNATURE_LENGTH],
}

impl Signature {
    pub fn from_bytes(raw: [u8; SIGNATURE_LENGTH]) -> Self {
        Self { raw }
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.raw
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex(&self.raw))
    }
}

impl Write for Signature {
    fn write(&self, buf: &mut impl BufMut) {
        self.raw.write(buf);
    }
}

impl EncodeSize for Signature {
    fn encode_size(&self) -> usize {
        SIGNATURE_LENGTH
    }
}

impl Read for Signature {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let raw = <[u8; SIGNATURE_LENGTH]>::read(buf)?;
        Ok(Self { raw })
    }
}

/// Ed25519 signer.
#[derive(Clone)]
pub struct Ed25519 {
    signer: ed25519_consensus::SigningKey,
    public: PublicKey,
}

impl Ed25519 {
    /// Generates a new keypair from the given randomness source.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let signer = ed25519_consensus::SigningKey::new(rng);
        Self::from_signing_key(signer)
    }

    /// Builds a signer from an existing private key.
    pub fn from_private_key(private_key: &PrivateKey) -> Self {
        Self::from_signing_key(private_key.key.clone())
    }

    fn from_signing_key(signer: ed25519_consensus::SigningKey) -> Self {
        let verifier = signer.verification_key();
        let public = PublicKey {
            raw: verifier.to_bytes(),
            key: verifier,
        };
        Self { signer, public }
    }

    pub fn private_key(&self) -> PrivateKey {
        PrivateKey::from_bytes(self.signer.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        self.public.clone()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            raw: self.signer.sign(message).to_bytes(),
        }
    }
}

impl Debug for Ed25519 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519({})", self.public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use valharness_codec::{Decode, Encode};

    #[test]
    fn test_sign_and_verify() {
        let signer = Ed25519::generate(&mut StdRng::seed_from_u64(0));
        let message = b"hello, world!";
        let signature = signer.sign(message);
        assert!(signer.public_key().verify(message, &signature));
        assert!(!signer.public_key().verify(b"hello, world?", &signature));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let signer = Ed25519::generate(&mut StdRng::seed_from_u64(1));
        let message = b"payload";
        let signature = signer.sign(message);
        let mut raw = *signature.as_bytes();
        raw[0] ^= 0x01;
        assert!(!signer
            .public_key()
            .verify(message, &Signature::from_bytes(raw)));
    }

    #[test]
    fn test_private_key_roundtrip() {
        let signer = Ed25519::generate(&mut StdRng::seed_from_u64(2));
        let restored = Ed25519::from_private_key(&signer.private_key());
        assert_eq!(signer.public_key(), restored.public_key());
    }

    #[test]
    fn test_public_key_codec() {
        let signer = Ed25519::generate(&mut StdRng::seed_from_u64(3));
        let public = signer.public_key();
        let decoded = PublicKey::decode(&public.encode()[..]).unwrap();
        assert_eq!(public, decoded);
    }

    #[test]
    fn test_public_key_rejects_invalid_point() {
        // All-0xFF is not a valid encoding of a curve point.
        let raw = [0xFFu8; PUBLIC_KEY_LENGTH];
        assert!(PublicKey::from_bytes(raw).is_none());
    }
}
