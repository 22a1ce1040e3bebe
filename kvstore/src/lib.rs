//! In-memory key/value application with configurable latency injection.
//!
//! [KvStore] is a minimal application storing `key=value` transactions.
//! [SlowKvStore] wraps any [Application] and injects per-phase latency,
//! reconfigured at runtime through control transactions, so a network's
//! tolerance for slow applications can be probed.

use std::future::Future;

mod slow;
pub use slow::{Latency, Phase, SlowKvStore};
mod store;
pub use store::KvStore;

/// Result code for a successful transaction.
pub const CODE_OK: u32 = 0;
/// Result code for a transaction that could not be parsed.
pub const CODE_ENCODING_ERROR: u32 = 1;

/// Outcome of checking or delivering a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxResult {
    pub code: u32,
    pub log: String,
}

impl TxResult {
    pub fn ok(log: impl Into<String>) -> Self {
        Self {
            code: CODE_OK,
            log: log.into(),
        }
    }

    pub fn encoding_error(log: impl Into<String>) -> Self {
        Self {
            code: CODE_ENCODING_ERROR,
            log: log.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }
}

/// The phases of the application lifecycle a transaction flows through.
pub trait Application: Send + Sync {
    /// Validates a transaction without mutating state.
    fn check_tx(&self, tx: &[u8]) -> impl Future<Output = TxResult> + Send;

    /// Executes a transaction against state.
    fn deliver_tx(&self, tx: &[u8]) -> impl Future<Output = TxResult> + Send;

    /// Finalizes delivered transactions, returning the application hash.
    fn commit(&self) -> impl Future<Output = Vec<u8>> + Send;

    /// Reads the value stored under `key`.
    fn query(&self, key: &[u8]) -> impl Future<Output = Option<Vec<u8>>> + Send;
}

/// Splits a transaction into key and value. A transaction without exactly
/// one `=` separator is treated as both key and value.
pub(crate) fn split_tx(tx: &[u8]) -> (&[u8], &[u8]) {
    let parts: Vec<&[u8]> = tx.split(|b| *b == b'=').collect();
    match parts.as_slice() {
        [key, value] => (key, value),
        _ => (tx, tx),
    }
}
