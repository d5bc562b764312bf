//! UDP transport implementation

use crate::error::{EnipError, EnipResult};
use crate::metadata::{Protocol, TransportMetadata};
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Maximum UDP payload size
pub const MAX_UDP_PAYLOAD_SIZE: usize = 65507;

/// Registered EtherNet/IP port for implicit I/O datagrams
pub const DEFAULT_IO_PORT: u16 = 2222;

/// UDP transport layer settings
#[derive(Debug, Clone)]
pub struct UdpSettings {
    pub remote_address: SocketAddr,
    pub local_address: SocketAddr,
}

impl UdpSettings {
    /// Create new UDP settings bound to an ephemeral local port
    pub fn new(remote_address: SocketAddr) -> Self {
        let local_address = if remote_address.is_ipv4() {
            SocketAddr::from(([0u8, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        Self {
            remote_address,
            local_address,
        }
    }
}

/// Datagram socket connected to a single peer
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    local: Option<SocketAddr>,
    peer: SocketAddr,
}

impl UdpTransport {
    /// Bind a socket and connect it to the remote address
    ///
    /// Connecting filters inbound datagrams to the configured peer.
    pub async fn connect(settings: &UdpSettings) -> EnipResult<Self> {
        let socket = UdpSocket::bind(settings.local_address).await?;
        socket.connect(settings.remote_address).await?;
        let local = socket.local_addr().ok();
        log::debug!("UDP socket {:?} connected to {}", local, settings.remote_address);
        Ok(Self {
            socket,
            local,
            peer: settings.remote_address,
        })
    }

    /// Create UDP transport from address string
    pub async fn connect_address(address: &str) -> EnipResult<Self> {
        let addr: SocketAddr = address.parse().map_err(|e| {
            EnipError::InvalidData(format!("Invalid UDP address: {}", e))
        })?;
        Self::connect(&UdpSettings::new(addr)).await
    }

    pub fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Metadata for a datagram received now
    pub fn metadata(&self) -> TransportMetadata {
        TransportMetadata::now(self.local, Some(self.peer), Protocol::Udp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_udp_settings() {
        let addr: SocketAddr = "127.0.0.1:2222".parse().unwrap();
        let settings = UdpSettings::new(addr);
        assert_eq!(settings.remote_address, addr);
        assert!(settings.local_address.is_ipv4());
    }

    #[tokio::test]
    async fn test_connected_socket_exchanges_datagrams() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer.local_addr().unwrap();

        let mut settings = UdpSettings::new(peer_addr);
        settings.local_address = "127.0.0.1:0".parse().unwrap();
        let transport = UdpTransport::connect(&settings).await.unwrap();

        transport.socket().send(&[1, 2, 3]).await.unwrap();
        let mut buf = [0u8; 16];
        let (n, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[1, 2, 3]);
        assert_eq!(Some(from), transport.local_addr());
        assert_eq!(transport.metadata().protocol, Protocol::Udp);
    }
}
