//! Genesis document loading.
//!
//! The harness only needs the chain identifier; the rest of the document is
//! accepted and ignored.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenesisError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("genesis has an empty chain id")]
    EmptyChainId,
}

#[derive(Deserialize, Debug)]
pub struct Genesis {
    pub chain_id: String,
    #[serde(default)]
    pub genesis_time: Option<String>,
}

impl Genesis {
    pub fn load(path: &Path) -> Result<Self, GenesisError> {
        let contents = fs::read_to_string(path)?;
        let genesis: Genesis = serde_json::from_str(&contents)?;
        if genesis.chain_id.is_empty() {
            return Err(GenesisError::EmptyChainId);
        }
        Ok(genesis)
    }
}
