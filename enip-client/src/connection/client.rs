//! Explicit messaging client
//!
//! [`CipClient`] owns the session [`Originator`] and a [`CipMessenger`]
//! sharing it. State transitions:
//! - `Closed` -> `TransportOpen` (TCP connect, worker started)
//! - `TransportOpen` -> `SessionOpen` (RegisterSession)
//! - `SessionOpen` -> `Ready` (forward open in connected mode)
//! - any state -> `Closed` (`close()` or a failed `open()`)

use super::builder::{ClientConfig, MessagingMode};
use super::lifecycle::{Connection, ConnectionState};
use bytes::Bytes;
use enip_cip::{CipMessenger, CipReply, MessageRouterRequest, ServiceCode};
use enip_codec::EPath;
use enip_core::{EnipError, EnipResult};
use enip_interface::DlrObject;
use enip_session::{Originator, SessionStatistics};
use enip_transport::TcpTransport;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

type SharedMessenger = CipMessenger<Arc<Originator>>;

pub struct CipClient {
    config: ClientConfig,
    state: ConnectionState,
    originator: Option<Arc<Originator>>,
    messenger: Option<SharedMessenger>,
}

impl CipClient {
    /// Create a client in the `Closed` state
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Closed,
            originator: None,
            messenger: None,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Session manager of the open connection
    pub fn originator(&self) -> Option<&Originator> {
        self.originator.as_deref()
    }

    pub fn messenger(&self) -> Option<&SharedMessenger> {
        self.messenger.as_ref()
    }

    pub fn session_handle(&self) -> Option<u32> {
        self.originator.as_ref().and_then(|o| o.session_handle())
    }

    pub fn statistics(&self) -> Option<SessionStatistics> {
        self.originator.as_ref().map(|o| o.statistics())
    }

    /// Open over an already-connected stream instead of dialing the
    /// configured address
    pub async fn open_with<S>(&mut self, transport: TcpTransport<S>) -> EnipResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if self.state.can_close() {
            return Ok(());
        }
        let originator = Originator::start(transport, self.config.session.clone())?;
        self.establish(originator).await
    }

    async fn establish(&mut self, originator: Originator) -> EnipResult<()> {
        let originator = Arc::new(originator);
        self.state = ConnectionState::TransportOpen;
        match self.bring_up(&originator).await {
            Ok(messenger) => {
                self.originator = Some(originator);
                self.messenger = Some(messenger);
                self.state = ConnectionState::Ready;
                log::info!("Connection to {} ready", self.config.address);
                Ok(())
            }
            Err(e) => {
                log::warn!("Opening connection to {} failed: {}", self.config.address, e);
                if let Err(close_err) = originator.unregister_session().await {
                    log::debug!("Cleanup after failed open: {}", close_err);
                }
                self.state = ConnectionState::Closed;
                Err(e)
            }
        }
    }

    async fn bring_up(&mut self, originator: &Arc<Originator>) -> EnipResult<SharedMessenger> {
        let handle = originator.register_session().await?;
        self.state = ConnectionState::SessionOpen;
        log::debug!("Session 0x{:08X} registered", handle);

        if let Some(port) = self.config.datagram_port {
            originator.add_datagram_connection(port).await?;
        }

        let transport = Arc::clone(originator);
        let messenger_config = self.config.messenger.clone();
        match &self.config.mode {
            MessagingMode::Unconnected => {
                Ok(CipMessenger::unconnected(transport, messenger_config))
            }
            MessagingMode::Connected(params) => {
                CipMessenger::connected(transport, params, messenger_config).await
            }
        }
    }

    fn ready_messenger(&self) -> EnipResult<&SharedMessenger> {
        match (&self.messenger, self.state) {
            (Some(messenger), ConnectionState::Ready) => Ok(messenger),
            _ => Err(EnipError::SessionClosed(format!(
                "connection is not open ({:?})",
                self.state
            ))),
        }
    }

    /// Send a prepared request; `None` when `expect_reply` is false
    pub async fn send_request(
        &self,
        request: &MessageRouterRequest,
        expect_reply: bool,
    ) -> EnipResult<Option<CipReply>> {
        self.ready_messenger()?.send_request(request, expect_reply).await
    }

    /// Send a service without request data
    pub async fn explicit_message(
        &self,
        service: ServiceCode,
        path: &EPath,
        expect_reply: bool,
    ) -> EnipResult<Option<CipReply>> {
        self.ready_messenger()?
            .explicit_message(service, path, expect_reply)
            .await
    }

    /// Read the Device Level Ring object
    pub async fn read_dlr(&self) -> EnipResult<DlrObject> {
        DlrObject::read(self.ready_messenger()?).await
    }

    /// Queue an implicit I/O datagram on the datagram socket
    pub async fn send_io(&self, datagram: Bytes) -> EnipResult<()> {
        match &self.originator {
            Some(originator) if self.state.is_ready() => originator.send_io(datagram).await,
            _ => Err(EnipError::SessionClosed("connection is not open".to_string())),
        }
    }
}

#[async_trait::async_trait]
impl Connection for CipClient {
    async fn open(&mut self) -> EnipResult<()> {
        if self.state.can_close() {
            return Ok(());
        }
        let originator =
            Originator::connect(self.config.address, self.config.session.clone()).await?;
        self.establish(originator).await
    }

    async fn close(&mut self) -> EnipResult<()> {
        if !self.state.can_close() {
            return Ok(());
        }
        self.messenger = None;
        self.state = ConnectionState::Closed;
        if let Some(originator) = self.originator.take() {
            originator.unregister_session().await?;
        }
        log::info!("Connection to {} closed", self.config.address);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.is_ready()
            && self
                .originator
                .as_ref()
                .map(|o| o.is_active())
                .unwrap_or(false)
    }

    async fn request(&self, service: ServiceCode, path: &EPath, data: Bytes) -> EnipResult<CipReply> {
        let request = MessageRouterRequest::new(service, path.clone()).with_data(data);
        self.send_request(&request, true)
            .await?
            .ok_or_else(|| EnipError::InvalidData("reply expected but none registered".to_string()))
    }

    async fn get_attribute_single(
        &self,
        class: u8,
        instance: u8,
        attribute: u8,
    ) -> EnipResult<CipReply> {
        self.ready_messenger()?
            .get_attribute_single(class, instance, attribute)
            .await
    }

    async fn get_attribute_all(&self, class: u8, instance: u8) -> EnipResult<CipReply> {
        self.ready_messenger()?
            .get_attribute_all(class, instance)
            .await
    }
}
