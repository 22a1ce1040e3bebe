//! Harness configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;
use valharness_types::PrivateKey;

/// Configuration for a harness run.
#[derive(Debug)]
pub struct HarnessConfig {
    /// Address the harness listens on for the remote signer to dial, either
    /// `unix:///path/to.sock` or `tcp://host:port`.
    pub bind_addr: String,
    /// Path to the validator key file (`~` is expanded).
    pub key_file: PathBuf,
    /// Path to the validator last-sign-state file (`~` is expanded).
    pub state_file: PathBuf,
    /// Path to the genesis file from which the chain id is read (`~` is
    /// expanded).
    pub genesis_file: PathBuf,
    /// How long a single accept attempt waits for an inbound connection.
    pub accept_deadline: Duration,
    /// How long each request waits for a response once connected.
    pub conn_deadline: Duration,
    /// Total accept attempts before giving up.
    pub accept_retries: u32,
    /// Optional transport identity key for TCP endpoints.
    pub identity_key: Option<PrivateKey>,
    /// Arm a failsafe that forcibly terminates the process if graceful
    /// teardown stalls. Disabled when the harness is embedded in a larger
    /// program.
    pub exit_when_complete: bool,
}

/// Expands a leading `~` to the user's home directory. Returns `None` when
/// the home directory cannot be determined.
pub fn expand_path(path: &Path) -> Option<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Some(path.to_path_buf());
    };
    let home = dirs::home_dir()?;
    Some(home.join(rest))
}
