//! Error types and process exit codes.

use thiserror::Error;
use valharness_types::genesis::GenesisError;
use valharness_types::VoteType;

/// Exit code reported when every test passes.
pub const EXIT_SUCCESS: i32 = 0;

/// Failures of the remote signer transport.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("timed out waiting for a remote signer connection")]
    AcceptTimeout,
    #[error("timed out waiting for a response from the remote signer")]
    RequestTimeout,
    #[error("not connected to a remote signer")]
    NotConnected,
    #[error("listener already closed")]
    ListenerClosed,
    #[error("invalid bind address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),
    #[error("remote signer reported an error: {0}")]
    Remote(String),
    #[error("remote signer sent an unexpected response")]
    UnexpectedResponse,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec: {0}")]
    Codec(#[from] valharness_codec::Error),
}

impl ClientError {
    /// Whether this failure is an accept timeout, the only failure worth
    /// retrying when waiting for a remote signer to dial in.
    pub fn is_accept_timeout(&self) -> bool {
        matches!(self, ClientError::AcceptTimeout)
    }
}

/// Top-level harness failures. Each variant maps to a distinct process exit
/// code so scripts driving the harness can tell failures apart.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("maximum accept retries reached")]
    MaxAcceptRetries { last: Option<ClientError> },
    #[error("failed to expand path: {path}")]
    ExpandPath { path: String },
    #[error("failed to load genesis file {path}: {source}")]
    GenesisLoad {
        path: String,
        #[source]
        source: GenesisError,
    },
    #[error("failed to create listener: {0}")]
    CreateListener(#[source] ClientError),
    #[error("failed to start listener: {0}")]
    StartListener(#[source] ClientError),
    #[error("interrupted")]
    Interrupted,
    #[error("{0}")]
    Other(String),
    #[error("public key test failed: {0}")]
    PublicKeyTest(String),
    #[error("proposal signing test failed: {0}")]
    SignProposalTest(String),
    #[error("{vote_type} signing test failed: {reason}")]
    SignVoteTest { vote_type: VoteType, reason: String },
}

impl HarnessError {
    /// The process exit code for this failure.
    pub fn code(&self) -> i32 {
        match self {
            HarnessError::MaxAcceptRetries { .. } => 1,
            HarnessError::ExpandPath { .. } => 2,
            HarnessError::GenesisLoad { .. } => 3,
            HarnessError::CreateListener(_) => 4,
            HarnessError::StartListener(_) => 5,
            HarnessError::Interrupted => 6,
            HarnessError::Other(_) => 7,
            HarnessError::PublicKeyTest(_) => 8,
            HarnessError::SignProposalTest(_) => 9,
            HarnessError::SignVoteTest { .. } => 10,
        }
    }
}
