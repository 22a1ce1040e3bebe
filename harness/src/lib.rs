//! Compliance test harness for remote signer implementations.
//!
//! A validator can delegate signing of consensus messages to an external
//! process reachable over a unix or tcp socket. This crate drives such a
//! signer through a fixed test sequence and reports the outcome as a
//! distinct process exit code: the signer must present the expected public
//! key, then produce verifiable signatures over a proposal and over each
//! vote subtype.
//!
//! The harness is the passive side of the transport. It binds a listener at
//! the configured address and waits for the signer to dial in, retrying
//! accept timeouts up to a configured budget.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use valharness::{Harness, HarnessConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = HarnessConfig {
//!         bind_addr: "tcp://127.0.0.1:26659".into(),
//!         key_file: "~/.valharness/priv_validator_key.json".into(),
//!         state_file: "~/.valharness/priv_validator_state.json".into(),
//!         genesis_file: "~/.valharness/genesis.json".into(),
//!         accept_deadline: Duration::from_secs(3),
//!         conn_deadline: Duration::from_secs(3),
//!         accept_retries: 100,
//!         identity_key: None,
//!         exit_when_complete: false,
//!     };
//!     let harness = match Harness::new(cfg).await {
//!         Ok(harness) => harness,
//!         Err(err) => std::process::exit(err.code()),
//!     };
//!     std::process::exit(harness.run().await);
//! }
//! ```

pub mod acceptor;
pub use acceptor::{BindAddr, MAX_FRAME_SIZE};
mod client;
pub use client::{RemoteSigner, SocketClient};
mod config;
pub use config::{expand_path, HarnessConfig};
mod error;
pub use error::{ClientError, HarnessError, EXIT_SUCCESS};
mod harness;
pub use harness::{Harness, SHUTDOWN_GRACE};
mod local;
pub use local::LocalSigner;
