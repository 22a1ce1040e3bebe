//! Message model, key material, and wire protocol shared by the remote
//! signer harness.
//!
//! The types here mirror what a validator asks an external signer to sign: a
//! consensus [Proposal] and [Vote], each producing canonical
//! chain-scoped sign-bytes and each able to check its own basic validity.
//! The crate also defines the request/response [wire] messages exchanged with
//! a remote signer and the on-disk formats for validator keys, signing state,
//! and the genesis document.

use thiserror::Error;

pub mod ed25519;
pub use ed25519::{Ed25519, PrivateKey, PublicKey, Signature};
pub mod sha256;
mod timestamp;
pub use timestamp::Timestamp;
mod block;
pub use block::{BlockId, PartSetHeader};
mod proposal;
pub use proposal::Proposal;
mod vote;
pub use vote::{Vote, VoteType};
pub mod wire;
pub mod keys;
pub use keys::{KeyFile, LastSignState};
pub mod genesis;

/// Failures surfaced by `validate_basic` on signable messages.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("negative height: {0}")]
    NegativeHeight(i64),
    #[error("negative round: {0}")]
    NegativeRound(i32),
    #[error("pol round must be >= -1, got {0}")]
    InvalidPolRound(i32),
    #[error("invalid hash length: expected {expected}, got {got}")]
    InvalidHashLength { expected: usize, got: usize },
    #[error("negative part total: {0}")]
    NegativePartTotal(i32),
    #[error("invalid validator address length: expected {expected}, got {got}")]
    InvalidAddressLength { expected: usize, got: usize },
    #[error("negative validator index: {0}")]
    NegativeValidatorIndex(i32),
    #[error("missing signature")]
    MissingSignature,
}
