//! On-disk validator key material and signing state.
//!
//! Both files are JSON. The key file holds the validator's keypair with
//! hex-encoded values; the state file records the last height/round/step the
//! validator signed at (double-sign protection state, parsed here for
//! well-formedness even when unused).

use crate::ed25519::{Ed25519, PrivateKey, PRIVATE_KEY_LENGTH};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use valharness_codec::{from_hex_formatted, hex};

const KEY_TYPE_ED25519: &str = "tendermint/ed25519";

/// Errors loading or interpreting key material.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),
    #[error("malformed {0}")]
    Malformed(&'static str),
    #[error("stored public key does not match private key")]
    PublicKeyMismatch,
    #[error("stored address does not match public key")]
    AddressMismatch,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct KeyPart {
    #[serde(rename = "type")]
    key_type: String,
    value: String,
}

/// The validator key file.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct KeyFile {
    pub address: String,
    pub_key: KeyPart,
    priv_key: KeyPart,
}

impl KeyFile {
    /// Generates a fresh keypair.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let signer = Ed25519::generate(rng);
        let public_key = signer.public_key();
        Self {
            address: hex(&public_key.address()),
            pub_key: KeyPart {
                key_type: KEY_TYPE_ED25519.into(),
                value: hex(public_key.as_bytes()),
            },
            priv_key: KeyPart {
                key_type: KEY_TYPE_ED25519.into(),
                value: hex(signer.private_key().as_bytes()),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), KeyError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reconstructs the signer, cross-checking the stored public key and
    /// address against the private key.
    pub fn signer(&self) -> Result<Ed25519, KeyError> {
        if self.priv_key.key_type != KEY_TYPE_ED25519 {
            return Err(KeyError::UnsupportedKeyType(self.priv_key.key_type.clone()));
        }
        let raw = from_hex_formatted(&self.priv_key.value)
            .ok_or(KeyError::Malformed("private key"))?;
        let raw: [u8; PRIVATE_KEY_LENGTH] = raw
            .try_into()
            .map_err(|_| KeyError::Malformed("private key"))?;
        let signer = Ed25519::from_private_key(&PrivateKey::from_bytes(raw));
        let public_key = signer.public_key();

        let stored = from_hex_formatted(&self.pub_key.value)
            .ok_or(KeyError::Malformed("public key"))?;
        if stored != public_key.as_bytes() {
            return Err(KeyError::PublicKeyMismatch);
        }
        let address =
            from_hex_formatted(&self.address).ok_or(KeyError::Malformed("address"))?;
        if address != public_key.address() {
            return Err(KeyError::AddressMismatch);
        }
        Ok(signer)
    }
}

/// The last signing state recorded by the validator.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LastSignState {
    pub height: i64,
    pub round: i32,
    pub step: u8,
}

impl LastSignState {
    pub fn load(path: &Path) -> Result<Self, KeyError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), KeyError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
