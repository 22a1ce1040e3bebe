//! Listener and connection plumbing for the remote signer transport.
//!
//! The harness is the passive side: it binds a listener and waits for the
//! remote signer to dial in. Messages travel in frames of a 4-byte big-endian
//! length prefix followed by the encoded payload.

use crate::error::ClientError;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tracing::info;

/// Maximum frame payload size. Signing requests and responses are tiny, so
/// anything larger indicates a confused or malicious peer.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// A parsed bind address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindAddr {
    /// `unix:///path/to.sock`
    #[cfg(unix)]
    Unix(PathBuf),
    /// `tcp://host:port`
    Tcp(String),
}

impl BindAddr {
    pub fn parse(addr: &str) -> Result<Self, ClientError> {
        if let Some(path) = addr.strip_prefix("unix://") {
            #[cfg(unix)]
            {
                if path.is_empty() {
                    return Err(ClientError::InvalidAddress {
                        address: addr.into(),
                        reason: "empty socket path".into(),
                    });
                }
                return Ok(BindAddr::Unix(PathBuf::from(path)));
            }
            #[cfg(not(unix))]
            {
                let _ = path;
                return Err(ClientError::InvalidAddress {
                    address: addr.into(),
                    reason: "unix sockets are not supported on this platform".into(),
                });
            }
        }
        // A bare host:port is treated as tcp.
        let host = addr.strip_prefix("tcp://").unwrap_or(addr);
        if host.is_empty() || host.contains("://") {
            return Err(ClientError::InvalidAddress {
                address: addr.into(),
                reason: "expected a unix:// or tcp:// scheme".into(),
            });
        }
        Ok(BindAddr::Tcp(host.into()))
    }
}

impl Display for BindAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(unix)]
            BindAddr::Unix(path) => write!(f, "unix://{}", path.display()),
            BindAddr::Tcp(host) => write!(f, "tcp://{host}"),
        }
    }
}

/// A bound listener awaiting the remote signer.
#[derive(Debug)]
pub(crate) enum Acceptor {
    #[cfg(unix)]
    Unix(UnixListener),
    Tcp(TcpListener),
}

impl Acceptor {
    /// Binds a listener on `addr`. A stale unix socket file left over from a
    /// previous run is removed first.
    pub async fn bind(addr: &BindAddr) -> Result<Self, ClientError> {
        match addr {
            #[cfg(unix)]
            BindAddr::Unix(path) => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
                Ok(Acceptor::Unix(UnixListener::bind(path)?))
            }
            BindAddr::Tcp(host) => Ok(Acceptor::Tcp(TcpListener::bind(host.as_str()).await?)),
        }
    }

    /// Waits for the remote signer to connect.
    pub async fn accept(&self) -> Result<Connection, ClientError> {
        match self {
            #[cfg(unix)]
            Acceptor::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                info!("accepted unix connection from remote signer");
                Ok(Connection::Unix(stream))
            }
            Acceptor::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                info!(%peer, "accepted tcp connection from remote signer");
                Ok(Connection::Tcp(stream))
            }
        }
    }
}

/// An established connection to the remote signer.
#[derive(Debug)]
pub(crate) enum Connection {
    #[cfg(unix)]
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl Connection {
    pub async fn send_frame(&mut self, payload: &[u8]) -> Result<(), ClientError> {
        match self {
            #[cfg(unix)]
            Connection::Unix(stream) => write_frame(stream, payload).await,
            Connection::Tcp(stream) => write_frame(stream, payload).await,
        }
    }

    pub async fn recv_frame(&mut self) -> Result<Vec<u8>, ClientError> {
        match self {
            #[cfg(unix)]
            Connection::Unix(stream) => read_frame(stream).await,
            Connection::Tcp(stream) => read_frame(stream).await,
        }
    }
}

/// Writes one length-prefixed frame to `stream`.
pub async fn write_frame<S: AsyncWrite + Unpin>(
    stream: &mut S,
    payload: &[u8],
) -> Result<(), ClientError> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ClientError::FrameTooLarge(payload.len()));
    }
    stream.write_u32(payload.len() as u32).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame from `stream`.
pub async fn read_frame<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Vec<u8>, ClientError> {
    let len = stream.read_u32().await? as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ClientError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    Ok(payload)
}
