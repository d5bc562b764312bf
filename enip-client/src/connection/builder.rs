//! Connection builder
//!
//! ```rust,no_run
//! use enip_client::{ClientBuilder, Connection};
//! use enip_cip::ForwardOpenParams;
//!
//! # async fn run() -> enip_core::EnipResult<()> {
//! let mut client = ClientBuilder::new()
//!     .target([192, 168, 1, 20])
//!     .connected(ForwardOpenParams::default())
//!     .build()?;
//! client.open().await?;
//! let reply = client.get_attribute_single(0x01, 0x01, 0x07).await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

use super::CipClient;
use enip_cip::{ForwardOpenParams, MessengerConfig};
use enip_core::{EnipError, EnipResult};
use enip_session::SessionConfig;
use enip_transport::{DEFAULT_EXPLICIT_PORT, DEFAULT_IO_PORT};
use std::net::{IpAddr, SocketAddr};

/// How explicit messages reach the target
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessagingMode {
    /// SendRRData through the Message Router, no CIP connection
    #[default]
    Unconnected,
    /// SendUnitData over a connection made by forward open
    Connected(ForwardOpenParams),
}

/// Validated client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub address: SocketAddr,
    pub session: SessionConfig,
    pub mode: MessagingMode,
    /// Target port for the implicit I/O datagram socket, none if `None`
    pub datagram_port: Option<u16>,
    pub messenger: MessengerConfig,
}

/// Builder for [`CipClient`]
///
/// Defaults: port 44818, unconnected messaging, no datagram socket,
/// default session and messenger configuration.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    target: Option<IpAddr>,
    port: u16,
    session: SessionConfig,
    mode: MessagingMode,
    datagram_port: Option<u16>,
    messenger: MessengerConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            target: None,
            port: DEFAULT_EXPLICIT_PORT,
            session: SessionConfig::default(),
            mode: MessagingMode::Unconnected,
            datagram_port: None,
            messenger: MessengerConfig::default(),
        }
    }

    /// Target device IP address
    pub fn target(mut self, ip: impl Into<IpAddr>) -> Self {
        self.target = Some(ip.into());
        self
    }

    /// Explicit messaging TCP port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Target address and port in one go
    pub fn address(mut self, address: SocketAddr) -> Self {
        self.target = Some(address.ip());
        self.port = address.port();
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    pub fn messenger_config(mut self, config: MessengerConfig) -> Self {
        self.messenger = config;
        self
    }

    /// Message over a connection made with `params`
    pub fn connected(mut self, params: ForwardOpenParams) -> Self {
        self.mode = MessagingMode::Connected(params);
        self
    }

    /// Message without a CIP connection
    pub fn unconnected(mut self) -> Self {
        self.mode = MessagingMode::Unconnected;
        self
    }

    /// Also open an implicit I/O datagram socket to the target's port 2222
    pub fn with_datagrams(self) -> Self {
        self.datagram_port(DEFAULT_IO_PORT)
    }

    /// Also open an implicit I/O datagram socket to the target's `port`
    pub fn datagram_port(mut self, port: u16) -> Self {
        self.datagram_port = Some(port);
        self
    }

    /// Validate and produce the configuration
    ///
    /// # Errors
    /// `InvalidData` if no target was given or a nested configuration is invalid
    pub fn build_config(self) -> EnipResult<ClientConfig> {
        let target = self.target.ok_or_else(|| {
            EnipError::InvalidData("Target address must be configured".to_string())
        })?;
        self.session.validate()?;
        if let MessagingMode::Connected(params) = &self.mode {
            params.validate()?;
        }
        if self.messenger.response_timeout.is_zero() {
            return Err(EnipError::InvalidData(
                "response_timeout must be nonzero".to_string(),
            ));
        }
        if self.datagram_port == Some(0) {
            return Err(EnipError::InvalidData("datagram port must be nonzero".to_string()));
        }
        Ok(ClientConfig {
            address: SocketAddr::new(target, self.port),
            session: self.session,
            mode: self.mode,
            datagram_port: self.datagram_port,
            messenger: self.messenger,
        })
    }

    /// Build a client in the `Closed` state
    pub fn build(self) -> EnipResult<CipClient> {
        Ok(CipClient::new(self.build_config()?))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = ClientBuilder::new()
            .target(Ipv4Addr::new(10, 0, 0, 5))
            .build_config()
            .unwrap();
        assert_eq!(config.address, "10.0.0.5:44818".parse().unwrap());
        assert_eq!(config.mode, MessagingMode::Unconnected);
        assert_eq!(config.datagram_port, None);
        assert_eq!(config.messenger.response_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_connected_with_datagrams() {
        let config = ClientBuilder::new()
            .address("192.168.0.9:4000".parse().unwrap())
            .connected(ForwardOpenParams::default())
            .with_datagrams()
            .build_config()
            .unwrap();
        assert_eq!(config.address.port(), 4000);
        assert!(matches!(config.mode, MessagingMode::Connected(_)));
        assert_eq!(config.datagram_port, Some(2222));
    }

    #[test]
    fn test_missing_target_rejected() {
        assert!(matches!(
            ClientBuilder::new().build_config(),
            Err(EnipError::InvalidData(_))
        ));
    }

    #[test]
    fn test_invalid_nested_config_rejected() {
        let result = ClientBuilder::new()
            .target([127, 0, 0, 1])
            .session_config(SessionConfig {
                queue_capacity: 0,
                ..Default::default()
            })
            .build_config();
        assert!(result.is_err());

        let result = ClientBuilder::new()
            .target([127, 0, 0, 1])
            .connected(ForwardOpenParams {
                tick_time: 0x10,
                ..Default::default()
            })
            .build_config();
        assert!(result.is_err());
    }
}
