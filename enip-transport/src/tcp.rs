//! TCP transport implementation

use crate::error::{EnipError, EnipResult};
use crate::metadata::{Protocol, TransportMetadata};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Registered EtherNet/IP port for encapsulated explicit messaging
pub const DEFAULT_EXPLICIT_PORT: u16 = 44818;

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub address: SocketAddr,
    /// Connection establishment timeout. None waits for the OS.
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            timeout: Some(Duration::from_secs(3)),
        }
    }

    /// Create TCP settings with timeout
    pub fn with_timeout(address: SocketAddr, timeout: Duration) -> Self {
        Self {
            address,
            timeout: Some(timeout),
        }
    }
}

/// A connected byte stream together with its endpoint addresses
///
/// Generic over the stream so the session worker can be driven by an
/// in-memory stream as well as a real socket.
pub struct TcpTransport<S = TcpStream> {
    io: S,
    local: Option<SocketAddr>,
    peer: Option<SocketAddr>,
}

impl<S> fmt::Debug for TcpTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpTransport")
            .field("local", &self.local)
            .field("peer", &self.peer)
            .finish()
    }
}

impl TcpTransport<TcpStream> {
    /// Connect to the target
    pub async fn connect(settings: &TcpSettings) -> EnipResult<Self> {
        let stream = if let Some(timeout) = settings.timeout {
            tokio::time::timeout(timeout, TcpStream::connect(settings.address))
                .await
                .map_err(|_| EnipError::Timeout(timeout))??
        } else {
            TcpStream::connect(settings.address).await?
        };
        // frames are small request/response units
        stream.set_nodelay(true)?;

        let local = stream.local_addr().ok();
        let peer = stream.peer_addr().ok();
        log::debug!("TCP connected {:?} -> {:?}", local, peer);
        Ok(Self { io: stream, local, peer })
    }

    /// Create TCP transport from address string
    pub async fn connect_address(address: &str) -> EnipResult<Self> {
        let addr: SocketAddr = address.parse().map_err(|e| {
            EnipError::InvalidData(format!("Invalid TCP address: {}", e))
        })?;
        Self::connect(&TcpSettings::new(addr)).await
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> TcpTransport<S> {
    /// Wrap an already-connected stream
    pub fn from_stream(io: S, local: Option<SocketAddr>, peer: Option<SocketAddr>) -> Self {
        Self { io, local, peer }
    }
}

impl<S> TcpTransport<S> {
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Metadata for a frame received now
    pub fn metadata(&self) -> TransportMetadata {
        TransportMetadata::now(self.local, self.peer, Protocol::Tcp)
    }

    pub fn io_mut(&mut self) -> &mut S {
        &mut self.io
    }

    pub fn into_inner(self) -> S {
        self.io
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_settings() {
        let addr: SocketAddr = "127.0.0.1:44818".parse().unwrap();
        let settings = TcpSettings::new(addr);
        assert_eq!(settings.address, addr);
        assert!(settings.timeout.is_some());
    }

    #[tokio::test]
    async fn test_connect_records_addresses() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });

        let transport = TcpTransport::connect(&TcpSettings::new(addr)).await.unwrap();
        assert_eq!(transport.peer_addr(), Some(addr));
        assert_eq!(transport.metadata().protocol, Protocol::Tcp);
        accept.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_address_rejected() {
        let result = TcpTransport::connect_address("not an address").await;
        assert!(matches!(result, Err(EnipError::InvalidData(_))));
    }
}
