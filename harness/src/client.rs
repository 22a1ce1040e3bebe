//! Remote signer client.
//!
//! [RemoteSigner] is the seam the harness tests through; [SocketClient] is
//! the production implementation speaking the length-prefixed wire protocol
//! over a unix or tcp socket.

use crate::acceptor::{Acceptor, BindAddr, Connection};
use crate::error::ClientError;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};
use valharness_codec::{Decode, Encode};
use valharness_types::wire::{Request, Response};
use valharness_types::{Proposal, PublicKey, Vote};

/// A connection to a remote signer.
pub trait RemoteSigner: Send + Sync + 'static {
    /// Waits for the remote signer to establish a session. Fails with a
    /// retryable error when no signer dials in before the accept deadline.
    fn start(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Tears the session down. Safe to call more than once.
    fn stop(&self) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Whether a session is currently established.
    fn is_running(&self) -> bool;

    /// Fetches the signer's public key.
    fn get_pub_key(&self) -> impl Future<Output = Result<PublicKey, ClientError>> + Send;

    /// Asks the signer to sign `proposal` for `chain_id`.
    fn sign_proposal(
        &self,
        chain_id: &str,
        proposal: Proposal,
    ) -> impl Future<Output = Result<Proposal, ClientError>> + Send;

    /// Asks the signer to sign `vote` for `chain_id`.
    fn sign_vote(
        &self,
        chain_id: &str,
        vote: Vote,
    ) -> impl Future<Output = Result<Vote, ClientError>> + Send;

    /// Best-effort request that the remote signer terminate itself. No
    /// response is expected.
    fn send_poison_pill(&self) -> impl Future<Output = Result<(), ClientError>> + Send;
}

/// [RemoteSigner] over a unix or tcp socket, with the harness as the
/// listening side.
#[derive(Debug)]
pub struct SocketClient {
    addr: BindAddr,
    accept_deadline: Duration,
    conn_deadline: Duration,
    listener: Mutex<Option<Acceptor>>,
    conn: Mutex<Option<Connection>>,
    running: AtomicBool,
}

impl SocketClient {
    /// Binds the listener immediately so a misconfigured address fails fast;
    /// the remote signer may dial in any time before [RemoteSigner::start] is
    /// awaited.
    pub async fn bind(
        addr: BindAddr,
        accept_deadline: Duration,
        conn_deadline: Duration,
    ) -> Result<Self, ClientError> {
        let listener = Acceptor::bind(&addr).await?;
        info!(addr = %addr, "listening for remote signer");
        Ok(Self {
            addr,
            accept_deadline,
            conn_deadline,
            listener: Mutex::new(Some(listener)),
            conn: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }

    async fn request(&self, request: Request) -> Result<Response, ClientError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(ClientError::NotConnected)?;
        conn.send_frame(&request.encode()).await?;
        match timeout(self.conn_deadline, conn.recv_frame()).await {
            Ok(payload) => Ok(Response::decode(&payload?[..])?),
            Err(_) => Err(ClientError::RequestTimeout),
        }
    }
}

impl RemoteSigner for SocketClient {
    async fn start(&self) -> Result<(), ClientError> {
        let guard = self.listener.lock().await;
        let listener = guard.as_ref().ok_or(ClientError::ListenerClosed)?;
        debug!(deadline = ?self.accept_deadline, "waiting for remote signer connection");
        match timeout(self.accept_deadline, listener.accept()).await {
            Ok(conn) => {
                *self.conn.lock().await = Some(conn?);
                self.running.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(_) => Err(ClientError::AcceptTimeout),
        }
    }

    async fn stop(&self) -> Result<(), ClientError> {
        self.running.store(false, Ordering::SeqCst);
        self.conn.lock().await.take();
        if self.listener.lock().await.take().is_some() {
            info!(addr = %self.addr, "listener stopped");
        }
        #[cfg(unix)]
        if let BindAddr::Unix(path) = &self.addr {
            // Dropping the listener does not unlink the socket file.
            let _ = std::fs::remove_file(path);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn get_pub_key(&self) -> Result<PublicKey, ClientError> {
        match self.request(Request::PubKey).await? {
            Response::PubKey(public_key) => Ok(public_key),
            Response::Error(reason) => Err(ClientError::Remote(reason)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    async fn sign_proposal(
        &self,
        chain_id: &str,
        proposal: Proposal,
    ) -> Result<Proposal, ClientError> {
        let request = Request::SignProposal {
            chain_id: chain_id.into(),
            proposal,
        };
        match self.request(request).await? {
            Response::SignedProposal(proposal) => Ok(proposal),
            Response::Error(reason) => Err(ClientError::Remote(reason)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    async fn sign_vote(&self, chain_id: &str, vote: Vote) -> Result<Vote, ClientError> {
        let request = Request::SignVote {
            chain_id: chain_id.into(),
            vote,
        };
        match self.request(request).await? {
            Response::SignedVote(vote) => Ok(vote),
            Response::Error(reason) => Err(ClientError::Remote(reason)),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    async fn send_poison_pill(&self) -> Result<(), ClientError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(ClientError::NotConnected)?;
        conn.send_frame(&Request::PoisonPill.encode()).await
    }
}
