//! The in-memory key/value store delegate.

use crate::{split_tx, Application, TxResult};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Minimal key/value application. Transactions of the form `key=value` store
/// `value` under `key`; a bare transaction stores itself under itself.
#[derive(Default)]
pub struct KvStore {
    state: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Application for KvStore {
    async fn check_tx(&self, _tx: &[u8]) -> TxResult {
        // Every well-formed byte string is an acceptable transaction.
        TxResult::ok("")
    }

    async fn deliver_tx(&self, tx: &[u8]) -> TxResult {
        let (key, value) = split_tx(tx);
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_vec(), value.to_vec());
        TxResult::ok("")
    }

    async fn commit(&self) -> Vec<u8> {
        let size = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len() as u64;
        size.to_be_bytes().to_vec()
    }

    async fn query(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let app = KvStore::new();
        assert!(app.check_tx(b"name=satoshi").await.is_ok());
        assert!(app.deliver_tx(b"name=satoshi").await.is_ok());
        assert_eq!(app.query(b"name").await, Some(b"satoshi".to_vec()));
        assert_eq!(app.query(b"missing").await, None);
    }

    #[tokio::test]
    async fn test_bare_tx_stores_itself() {
        let app = KvStore::new();
        app.deliver_tx(b"solo").await;
        assert_eq!(app.query(b"solo").await, Some(b"solo".to_vec()));
    }

    #[tokio::test]
    async fn test_commit_hash_tracks_size() {
        let app = KvStore::new();
        assert_eq!(app.commit().await, 0u64.to_be_bytes().to_vec());
        app.deliver_tx(b"a=1").await;
        app.deliver_tx(b"b=2").await;
        app.deliver_tx(b"a=3").await;
        assert_eq!(app.commit().await, 2u64.to_be_bytes().to_vec());
    }
}
