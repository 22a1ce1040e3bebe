//! End-to-end runs of the harness against an in-process remote signer
//! speaking the real wire protocol over a unix socket.
#![cfg(unix)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::UnixStream;
use valharness::acceptor::{read_frame, write_frame};
use valharness::{Harness, HarnessConfig};
use valharness_codec::{Decode, Encode};
use valharness_types::wire::{Request, Response};
use valharness_types::{Ed25519, KeyFile, LastSignState};

const CHAIN_ID: &str = "test-chain";

/// Writes the key, state, and genesis files the harness expects.
fn write_validator_files(dir: &Path, seed: u64) -> Ed25519 {
    let key_file = KeyFile::generate(&mut StdRng::seed_from_u64(seed));
    key_file.save(&dir.join("priv_validator_key.json")).unwrap();
    LastSignState::default()
        .save(&dir.join("priv_validator_state.json"))
        .unwrap();
    std::fs::write(
        dir.join("genesis.json"),
        format!(r#"{{"chain_id":"{CHAIN_ID}","validators":[]}}"#),
    )
    .unwrap();
    key_file.signer().unwrap()
}

fn config(dir: &Path, socket: &Path) -> HarnessConfig {
    HarnessConfig {
        bind_addr: format!("unix://{}", socket.display()),
        key_file: dir.join("priv_validator_key.json"),
        state_file: dir.join("priv_validator_state.json"),
        genesis_file: dir.join("genesis.json"),
        accept_deadline: Duration::from_secs(2),
        conn_deadline: Duration::from_secs(2),
        accept_retries: 5,
        identity_key: None,
        exit_when_complete: false,
    }
}

/// Dials the harness and serves signing requests until the stream closes or
/// a poison pill arrives.
async fn run_remote_signer(socket: PathBuf, signer: Ed25519) {
    let mut stream = loop {
        match UnixStream::connect(&socket).await {
            Ok(stream) => break stream,
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    };
    loop {
        let frame = match read_frame(&mut stream).await {
            Ok(frame) => frame,
            Err(_) => return,
        };
        let response = match Request::decode(&frame[..]).unwrap() {
            Request::PubKey => Response::PubKey(signer.public_key()),
            Request::SignProposal {
                chain_id,
                mut proposal,
            } => {
                proposal.signature = Some(signer.sign(&proposal.sign_bytes(&chain_id)));
                Response::SignedProposal(proposal)
            }
            Request::SignVote { chain_id, mut vote } => {
                vote.signature = Some(signer.sign(&vote.sign_bytes(&chain_id)));
                Response::SignedVote(vote)
            }
            Request::Ping => Response::Pong,
            Request::PoisonPill => return,
        };
        write_frame(&mut stream, &response.encode()).await.unwrap();
    }
}

#[tokio::test]
async fn test_compliant_signer_passes() {
    let dir = tempfile::tempdir().unwrap();
    let signer = write_validator_files(dir.path(), 0);
    let socket = dir.path().join("signer.sock");

    let harness = Harness::new(config(dir.path(), &socket)).await.unwrap();
    let remote = tokio::spawn(run_remote_signer(socket.clone(), signer));

    assert_eq!(harness.run().await, 0);
    remote.await.unwrap();
    // The socket file is unlinked on teardown.
    assert!(!socket.exists());
}

#[tokio::test]
async fn test_wrong_key_fails_public_key_test() {
    let dir = tempfile::tempdir().unwrap();
    write_validator_files(dir.path(), 1);
    let socket = dir.path().join("signer.sock");

    let harness = Harness::new(config(dir.path(), &socket)).await.unwrap();
    let imposter = Ed25519::generate(&mut StdRng::seed_from_u64(99));
    let remote = tokio::spawn(run_remote_signer(socket.clone(), imposter));

    assert_eq!(harness.run().await, 8);
    remote.abort();
}

#[tokio::test]
async fn test_no_signer_exhausts_accept_retries() {
    let dir = tempfile::tempdir().unwrap();
    write_validator_files(dir.path(), 2);
    let socket = dir.path().join("signer.sock");

    let mut cfg = config(dir.path(), &socket);
    cfg.accept_deadline = Duration::from_millis(50);
    cfg.accept_retries = 2;

    let harness = Harness::new(cfg).await.unwrap();
    assert_eq!(harness.run().await, 1);
}

#[tokio::test]
async fn test_missing_genesis_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    write_validator_files(dir.path(), 3);
    std::fs::remove_file(dir.path().join("genesis.json")).unwrap();
    let socket = dir.path().join("signer.sock");

    let err = Harness::new(config(dir.path(), &socket)).await.unwrap_err();
    assert_eq!(err.code(), 3);
}
