//! Local copy of the validator's key material.
//!
//! The harness loads the same key files a validator would so it can check
//! that the remote signer reports the matching public key. It never signs
//! with the private key itself; the last-sign-state file is parsed only to
//! prove it is well formed.

use std::path::Path;
use valharness_types::keys::{KeyError, KeyFile, LastSignState};
use valharness_types::{Ed25519, PublicKey};

#[derive(Debug)]
pub struct LocalSigner {
    signer: Ed25519,
}

impl LocalSigner {
    pub fn new(signer: Ed25519) -> Self {
        Self { signer }
    }

    /// Loads and cross-checks the key file, and validates the state file.
    pub fn load(key_file: &Path, state_file: &Path) -> Result<Self, KeyError> {
        let signer = KeyFile::load(key_file)?.signer()?;
        let _ = LastSignState::load(state_file)?;
        Ok(Self::new(signer))
    }

    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }
}
