//! The compliance test driver.
//!
//! A [Harness] binds a listener, waits for a remote signer to dial in, and
//! runs the test sequence against it: public key agreement, proposal
//! signing, then vote signing for each vote subtype. The first failure
//! aborts the run and determines the process exit code.

use crate::acceptor::BindAddr;
use crate::client::{RemoteSigner, SocketClient};
use crate::config::{expand_path, HarnessConfig};
use crate::error::{HarnessError, EXIT_SUCCESS};
use crate::local::LocalSigner;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use valharness_types::genesis::Genesis;
use valharness_types::{sha256, BlockId, Ed25519, Proposal, Timestamp, Vote, VoteType};

/// How long graceful teardown may take before the failsafe forcibly
/// terminates the process.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// Arbitrary but fixed field values for the messages sent to the remote
// signer.
const TEST_HEIGHT: i64 = 12_345;
const TEST_ROUND: i32 = 23_456;
const TEST_POL_ROUND: i32 = -1;
const TEST_PART_TOTAL: i32 = 1_000_000;

#[derive(Debug)]
pub struct Harness<S: RemoteSigner> {
    addr: String,
    chain_id: String,
    signer: S,
    local: LocalSigner,
    accept_retries: u32,
    exit_when_complete: bool,
    exit_code: OnceLock<i32>,
    teardown_done: Mutex<bool>,
}

impl Harness<SocketClient> {
    /// Builds a harness from configuration: loads key material, reads the
    /// chain id from the genesis file, and binds the listener.
    pub async fn new(cfg: HarnessConfig) -> Result<Self, HarnessError> {
        let key_file = expand_path(&cfg.key_file).ok_or_else(|| HarnessError::ExpandPath {
            path: cfg.key_file.display().to_string(),
        })?;
        let state_file = expand_path(&cfg.state_file).ok_or_else(|| HarnessError::ExpandPath {
            path: cfg.state_file.display().to_string(),
        })?;
        let genesis_file =
            expand_path(&cfg.genesis_file).ok_or_else(|| HarnessError::ExpandPath {
                path: cfg.genesis_file.display().to_string(),
            })?;

        info!(key_file = %key_file.display(), state_file = %state_file.display(), "loading validator key material");
        let local = LocalSigner::load(&key_file, &state_file).map_err(|err| {
            HarnessError::Other(format!("failed to load validator key material: {err}"))
        })?;

        let genesis = Genesis::load(&genesis_file).map_err(|source| HarnessError::GenesisLoad {
            path: genesis_file.display().to_string(),
            source,
        })?;
        info!(genesis_file = %genesis_file.display(), chain_id = %genesis.chain_id, "loaded genesis file");

        let bind = BindAddr::parse(&cfg.bind_addr).map_err(HarnessError::CreateListener)?;
        if let (BindAddr::Tcp(_), Some(identity_key)) = (&bind, &cfg.identity_key) {
            let identity = Ed25519::from_private_key(identity_key);
            info!(public_key = %identity.public_key(), "using transport identity");
        }
        let signer = SocketClient::bind(bind, cfg.accept_deadline, cfg.conn_deadline)
            .await
            .map_err(HarnessError::CreateListener)?;

        Ok(Self::with_signer(
            cfg.bind_addr,
            genesis.chain_id,
            signer,
            local,
            cfg.accept_retries,
            cfg.exit_when_complete,
        ))
    }
}

impl<S: RemoteSigner> Harness<S> {
    /// Builds a harness around an already constructed signer client.
    pub fn with_signer(
        addr: String,
        chain_id: String,
        signer: S,
        local: LocalSigner,
        accept_retries: u32,
        exit_when_complete: bool,
    ) -> Self {
        Self {
            addr,
            chain_id,
            signer,
            local,
            accept_retries,
            exit_when_complete,
            exit_code: OnceLock::new(),
            teardown_done: Mutex::new(false),
        }
    }

    /// The exit code recorded by the first shutdown trigger.
    pub fn exit_code(&self) -> i32 {
        self.exit_code.get().copied().unwrap_or(EXIT_SUCCESS)
    }

    /// Runs the full test sequence, returning the process exit code. An
    /// interrupt aborts the run with its own exit code.
    pub async fn run(&self) -> i32 {
        info!(addr = %self.addr, chain_id = %self.chain_id, "starting remote signer test harness");
        let result = tokio::select! {
            result = self.execute() => result,
            result = wait_for_interrupt() => result,
        };
        match result {
            Ok(()) => {
                info!("SUCCESS! all tests passed");
                self.shutdown(None).await;
            }
            Err(err) => self.shutdown(Some(err)).await,
        }
        self.exit_code()
    }

    async fn execute(&self) -> Result<(), HarnessError> {
        self.accept().await?;
        self.test_public_key().await?;
        self.test_sign_proposal().await?;
        self.test_sign_votes().await?;
        Ok(())
    }

    /// Waits for the remote signer to connect, retrying accept timeouts up
    /// to the configured attempt budget. Any other failure aborts
    /// immediately.
    async fn accept(&self) -> Result<(), HarnessError> {
        let mut last = None;
        for attempt in 1..=self.accept_retries {
            info!(attempt, max = self.accept_retries, "waiting for remote signer to connect");
            match self.signer.start().await {
                Ok(()) => {
                    info!("remote signer connected");
                    return Ok(());
                }
                Err(err) if err.is_accept_timeout() => {
                    info!("timed out waiting for remote signer, retrying");
                    last = Some(err);
                }
                Err(err) => {
                    error!(%err, "failed to start listening for the remote signer");
                    return Err(HarnessError::StartListener(err));
                }
            }
        }
        error!(retries = self.accept_retries, "maximum accept retries reached");
        Err(HarnessError::MaxAcceptRetries { last })
    }

    async fn test_public_key(&self) -> Result<(), HarnessError> {
        info!("TEST: public key of remote signer");
        let local = self.local.public_key();
        let remote = self.signer.get_pub_key().await.map_err(|err| {
            error!(%err, "FAILED: could not fetch the remote signer's public key");
            HarnessError::PublicKeyTest(err.to_string())
        })?;
        info!(public_key = %local, "local");
        info!(public_key = %remote, "remote");
        if local != remote {
            error!("FAILED: local and remote public keys do not match");
            return Err(HarnessError::PublicKeyTest("public key mismatch".into()));
        }
        Ok(())
    }

    async fn test_sign_proposal(&self) -> Result<(), HarnessError> {
        info!("TEST: signing of proposals");
        let proposal = Proposal::new(
            TEST_HEIGHT,
            TEST_ROUND,
            TEST_POL_ROUND,
            BlockId::from_digest(sha256::hash(b"hash"), TEST_PART_TOTAL),
            Timestamp::now(),
        );
        let sign_bytes = proposal.sign_bytes(&self.chain_id);
        let signed = self
            .signer
            .sign_proposal(&self.chain_id, proposal)
            .await
            .map_err(|err| {
                error!(%err, "FAILED: remote signer failed to sign the proposal");
                HarnessError::SignProposalTest(err.to_string())
            })?;
        debug!(?signed, "received signed proposal");
        if let Err(err) = signed.validate_basic() {
            error!(%err, "FAILED: signed proposal is invalid");
            return Err(HarnessError::SignProposalTest(format!(
                "invalid signed proposal: {err}"
            )));
        }
        let Some(signature) = &signed.signature else {
            error!("FAILED: signed proposal carries no signature");
            return Err(HarnessError::SignProposalTest("missing signature".into()));
        };
        let remote = self.signer.get_pub_key().await.map_err(|err| {
            error!(%err, "FAILED: could not fetch the remote signer's public key");
            HarnessError::SignProposalTest(err.to_string())
        })?;
        if !remote.verify(&sign_bytes, signature) {
            error!("FAILED: proposal signature does not verify");
            return Err(HarnessError::SignProposalTest(
                "signature verification failed".into(),
            ));
        }
        info!("successfully verified the proposal signature");
        Ok(())
    }

    async fn test_sign_votes(&self) -> Result<(), HarnessError> {
        info!("TEST: signing of votes");
        for vote_type in VoteType::ALL {
            self.test_sign_vote(vote_type).await?;
        }
        Ok(())
    }

    async fn test_sign_vote(&self, vote_type: VoteType) -> Result<(), HarnessError> {
        info!(%vote_type, "testing vote subtype");
        let vote = Vote::new(
            vote_type,
            TEST_HEIGHT,
            TEST_ROUND,
            BlockId::from_digest(sha256::hash(b"hash"), TEST_PART_TOTAL),
            Timestamp::now(),
            sha256::address_hash(b"addr").to_vec(),
            0,
        );
        let sign_bytes = vote.sign_bytes(&self.chain_id);
        let signed = self
            .signer
            .sign_vote(&self.chain_id, vote)
            .await
            .map_err(|err| {
                error!(%vote_type, %err, "FAILED: remote signer failed to sign the vote");
                HarnessError::SignVoteTest {
                    vote_type,
                    reason: err.to_string(),
                }
            })?;
        debug!(?signed, "received signed vote");
        if let Err(err) = signed.validate_basic() {
            error!(%vote_type, %err, "FAILED: signed vote is invalid");
            return Err(HarnessError::SignVoteTest {
                vote_type,
                reason: format!("invalid signed vote: {err}"),
            });
        }
        let Some(signature) = &signed.signature else {
            error!(%vote_type, "FAILED: signed vote carries no signature");
            return Err(HarnessError::SignVoteTest {
                vote_type,
                reason: "missing signature".into(),
            });
        };
        let remote = self.signer.get_pub_key().await.map_err(|err| {
            error!(%vote_type, %err, "FAILED: could not fetch the remote signer's public key");
            HarnessError::SignVoteTest {
                vote_type,
                reason: err.to_string(),
            }
        })?;
        if !remote.verify(&sign_bytes, signature) {
            error!(%vote_type, "FAILED: vote signature does not verify");
            return Err(HarnessError::SignVoteTest {
                vote_type,
                reason: "signature verification failed".into(),
            });
        }
        info!(%vote_type, "successfully verified the vote signature");
        Ok(())
    }

    /// Records the exit code and tears the transport down. The first caller's
    /// exit code wins and teardown runs at most once; later calls return
    /// after teardown has completed.
    pub async fn shutdown(&self, error: Option<HarnessError>) {
        let code = error.as_ref().map_or(EXIT_SUCCESS, HarnessError::code);
        if self.exit_code.set(code).is_ok() {
            match &error {
                Some(err) => error!(code, %err, "shutting down after failure"),
                None => info!("shutting down"),
            }
        }

        let mut done = self.teardown_done.lock().await;
        if *done {
            return;
        }
        *done = true;

        // The failsafe guarantees the process dies with the recorded code
        // even if teardown stalls. It is disarmed once teardown completes.
        let code = self.exit_code();
        let failsafe = self
            .exit_when_complete
            .then(|| tokio::spawn(force_exit(code)));

        if self.signer.is_running() {
            info!("stopping remote signer session");
            if let Err(err) = self.signer.send_poison_pill().await {
                info!(%err, "failed to deliver poison pill to remote signer");
            }
            if let Err(err) = self.signer.stop().await {
                error!(%err, "failed to cleanly stop the listener");
            }
        }

        if let Some(failsafe) = failsafe {
            failsafe.abort();
        }
    }
}

async fn wait_for_interrupt() -> Result<(), HarnessError> {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("caught interrupt, terminating");
            Err(HarnessError::Interrupted)
        }
        Err(err) => {
            // Without signal delivery the run can only end via the tests.
            error!(%err, "failed to install interrupt handler");
            std::future::pending::<Result<(), HarnessError>>().await
        }
    }
}

async fn force_exit(code: i32) {
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    error!(code, "teardown did not complete in time, exiting forcibly");
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use valharness_types::PublicKey;

    const CHAIN_ID: &str = "test-chain";

    #[derive(Default)]
    struct Counts {
        start: AtomicU32,
        pub_key: AtomicU32,
        sign_proposal: AtomicU32,
        sign_vote: AtomicU32,
        stop: AtomicU32,
        poison: AtomicU32,
    }

    struct FakeSigner {
        signer: Ed25519,
        reported_key: PublicKey,
        start_errors: StdMutex<VecDeque<ClientError>>,
        fail_vote_type: Option<VoteType>,
        running: AtomicBool,
        counts: Arc<Counts>,
    }

    impl FakeSigner {
        fn honest(seed: u64) -> Self {
            let signer = Ed25519::generate(&mut StdRng::seed_from_u64(seed));
            let reported_key = signer.public_key();
            Self {
                signer,
                reported_key,
                start_errors: StdMutex::new(VecDeque::new()),
                fail_vote_type: None,
                running: AtomicBool::new(false),
                counts: Arc::new(Counts::default()),
            }
        }

        fn with_start_errors(mut self, errors: Vec<ClientError>) -> Self {
            self.start_errors = StdMutex::new(errors.into());
            self
        }

        fn local(&self) -> LocalSigner {
            LocalSigner::new(self.signer.clone())
        }
    }

    impl RemoteSigner for FakeSigner {
        async fn start(&self) -> Result<(), ClientError> {
            self.counts.start.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.start_errors.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self) -> Result<(), ClientError> {
            self.counts.stop.fetch_add(1, Ordering::SeqCst);
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        async fn get_pub_key(&self) -> Result<PublicKey, ClientError> {
            self.counts.pub_key.fetch_add(1, Ordering::SeqCst);
            Ok(self.reported_key.clone())
        }

        async fn sign_proposal(
            &self,
            chain_id: &str,
            mut proposal: Proposal,
        ) -> Result<Proposal, ClientError> {
            self.counts.sign_proposal.fetch_add(1, Ordering::SeqCst);
            proposal.signature = Some(self.signer.sign(&proposal.sign_bytes(chain_id)));
            Ok(proposal)
        }

        async fn sign_vote(&self, chain_id: &str, mut vote: Vote) -> Result<Vote, ClientError> {
            self.counts.sign_vote.fetch_add(1, Ordering::SeqCst);
            if self.fail_vote_type == Some(vote.vote_type) {
                return Err(ClientError::Remote("refusing to sign".into()));
            }
            vote.signature = Some(self.signer.sign(&vote.sign_bytes(chain_id)));
            Ok(vote)
        }

        async fn send_poison_pill(&self) -> Result<(), ClientError> {
            self.counts.poison.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn harness(fake: FakeSigner, retries: u32) -> (Harness<FakeSigner>, Arc<Counts>) {
        let counts = fake.counts.clone();
        let local = fake.local();
        let harness = Harness::with_signer(
            "fake://signer".into(),
            CHAIN_ID.into(),
            fake,
            local,
            retries,
            false,
        );
        (harness, counts)
    }

    #[tokio::test]
    async fn test_run_success() {
        let (harness, counts) = harness(FakeSigner::honest(0), 3);
        assert_eq!(harness.run().await, EXIT_SUCCESS);
        assert_eq!(counts.start.load(Ordering::SeqCst), 1);
        assert_eq!(counts.sign_proposal.load(Ordering::SeqCst), 1);
        assert_eq!(counts.sign_vote.load(Ordering::SeqCst), 2);
        // Successful runs still tear the session down.
        assert_eq!(counts.poison.load(Ordering::SeqCst), 1);
        assert_eq!(counts.stop.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_accept_retry_budget_is_exact() {
        let fake = FakeSigner::honest(1).with_start_errors(vec![
            ClientError::AcceptTimeout,
            ClientError::AcceptTimeout,
            ClientError::AcceptTimeout,
        ]);
        let (harness, counts) = harness(fake, 3);
        assert_eq!(harness.run().await, 1);
        assert_eq!(counts.start.load(Ordering::SeqCst), 3);
        assert_eq!(counts.pub_key.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_accept_recovers_within_budget() {
        let fake = FakeSigner::honest(2).with_start_errors(vec![ClientError::AcceptTimeout]);
        let (harness, counts) = harness(fake, 3);
        assert_eq!(harness.run().await, EXIT_SUCCESS);
        assert_eq!(counts.start.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_accept_fails_fast_on_non_timeout() {
        let fake = FakeSigner::honest(3).with_start_errors(vec![ClientError::Io(
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        )]);
        let (harness, counts) = harness(fake, 5);
        assert_eq!(harness.run().await, 5);
        // The budget is not consumed by non-retryable failures.
        assert_eq!(counts.start.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_public_key_mismatch_short_circuits() {
        let mut fake = FakeSigner::honest(4);
        fake.reported_key = Ed25519::generate(&mut StdRng::seed_from_u64(5)).public_key();
        let (harness, counts) = harness(fake, 3);
        assert_eq!(harness.run().await, 8);
        // No signing requests are issued after the identity check fails.
        assert_eq!(counts.sign_proposal.load(Ordering::SeqCst), 0);
        assert_eq!(counts.sign_vote.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_vote_failure_names_failing_subtype() {
        let mut fake = FakeSigner::honest(6);
        fake.fail_vote_type = Some(VoteType::Precommit);
        let (harness, counts) = harness(fake, 3);
        let err = harness.execute().await.unwrap_err();
        assert!(matches!(
            err,
            HarnessError::SignVoteTest {
                vote_type: VoteType::Precommit,
                ..
            }
        ));
        assert_eq!(err.code(), 10);
        // The prevote passed before the precommit failed.
        assert_eq!(counts.sign_vote.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_first_code_wins() {
        let (harness, counts) = harness(FakeSigner::honest(7), 3);
        harness.signer.start().await.unwrap();
        harness
            .shutdown(Some(HarnessError::PublicKeyTest("mismatch".into())))
            .await;
        harness.shutdown(Some(HarnessError::Interrupted)).await;
        harness.shutdown(None).await;
        assert_eq!(harness.exit_code(), 8);
        assert_eq!(counts.poison.load(Ordering::SeqCst), 1);
        assert_eq!(counts.stop.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_concurrent_teardown_once() {
        let (harness, counts) = harness(FakeSigner::honest(8), 3);
        harness.signer.start().await.unwrap();
        let harness = Arc::new(harness);
        let a = {
            let harness = harness.clone();
            tokio::spawn(async move {
                harness
                    .shutdown(Some(HarnessError::PublicKeyTest("mismatch".into())))
                    .await
            })
        };
        let b = {
            let harness = harness.clone();
            tokio::spawn(
                async move { harness.shutdown(Some(HarnessError::Interrupted)).await },
            )
        };
        a.await.unwrap();
        b.await.unwrap();
        let code = harness.exit_code();
        assert!(code == 8 || code == 6, "unexpected exit code {code}");
        assert_eq!(counts.stop.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_skips_idle_session() {
        let (harness, counts) = harness(FakeSigner::honest(9), 3);
        harness
            .shutdown(Some(HarnessError::MaxAcceptRetries { last: None }))
            .await;
        assert_eq!(harness.exit_code(), 1);
        assert_eq!(counts.poison.load(Ordering::SeqCst), 0);
        assert_eq!(counts.stop.load(Ordering::SeqCst), 0);
    }
}
