use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;
use valharness::{Harness, HarnessConfig, HarnessError};
use valharness_codec::from_hex_formatted;
use valharness_types::ed25519::PRIVATE_KEY_LENGTH;
use valharness_types::PrivateKey;

/// Compliance test harness for remote signer implementations.
///
/// Binds a listener, waits for the remote signer to dial in, and checks
/// that it presents the expected public key and produces verifiable
/// signatures over proposals and votes.
#[derive(Parser, Debug)]
#[command(name = "valharness", version)]
struct Args {
    /// Address to listen on (unix:///path/to.sock or tcp://host:port).
    #[arg(long, default_value = "tcp://127.0.0.1:26659")]
    addr: String,

    /// Path to the validator key file.
    #[arg(long, default_value = "~/.valharness/priv_validator_key.json")]
    key_file: PathBuf,

    /// Path to the validator last-sign-state file.
    #[arg(long, default_value = "~/.valharness/priv_validator_state.json")]
    state_file: PathBuf,

    /// Path to the genesis file (source of the chain id).
    #[arg(long, default_value = "~/.valharness/genesis.json")]
    genesis_file: PathBuf,

    /// Seconds a single accept attempt waits for the remote signer.
    #[arg(long, default_value_t = 3)]
    accept_deadline: u64,

    /// Seconds each request waits for a response.
    #[arg(long, default_value_t = 3)]
    conn_deadline: u64,

    /// Total accept attempts before giving up.
    #[arg(long, default_value_t = 100)]
    accept_retries: u32,

    /// Hex-encoded ed25519 transport identity key for tcp endpoints.
    #[arg(long)]
    identity_key: Option<String>,
}

fn parse_identity_key(hex: &str) -> Option<PrivateKey> {
    let raw = from_hex_formatted(hex)?;
    let raw: [u8; PRIVATE_KEY_LENGTH] = raw.try_into().ok()?;
    Some(PrivateKey::from_bytes(raw))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let identity_key = match &args.identity_key {
        Some(hex) => match parse_identity_key(hex) {
            Some(key) => Some(key),
            None => {
                let err = HarnessError::Other("malformed identity key".into());
                error!(%err, "failed to parse identity key");
                std::process::exit(err.code());
            }
        },
        None => None,
    };

    let cfg = HarnessConfig {
        bind_addr: args.addr,
        key_file: args.key_file,
        state_file: args.state_file,
        genesis_file: args.genesis_file,
        accept_deadline: Duration::from_secs(args.accept_deadline),
        conn_deadline: Duration::from_secs(args.conn_deadline),
        accept_retries: args.accept_retries,
        identity_key,
        exit_when_complete: true,
    };
    let harness = match Harness::new(cfg).await {
        Ok(harness) => harness,
        Err(err) => {
            error!(%err, "failed to construct test harness");
            std::process::exit(err.code());
        }
    };
    std::process::exit(harness.run().await);
}
