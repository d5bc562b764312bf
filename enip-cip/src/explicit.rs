//! Explicit messaging
//!
//! [`CipMessenger`] sends Message Router requests over an
//! [`EncapsulationTransport`], either unconnected (each request correlated by
//! its own sender context) or over a connection opened with forward open
//! (each request prefixed with the connection's sequence count and correlated
//! by the T->O connection id together with that count).

use crate::connection::CipConnection;
use crate::error::{EnipError, EnipResult};
use crate::forward_open::{forward_open, ForwardOpenParams};
use crate::message_router::{MessageRouterRequest, MessageRouterResponse};
use crate::service::ServiceCode;
use bytes::{BufMut, Bytes, BytesMut};
use enip_codec::EPath;
use enip_session::{connected_response_id, EncapsulationTransport, TransportPacket};
use std::time::Duration;

/// Explicit messaging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessengerConfig {
    /// Upper bound on every reply wait
    pub response_timeout: Duration,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(5),
        }
    }
}

/// Reply to an explicit request
#[derive(Debug, Clone)]
pub struct CipReply {
    pub response: MessageRouterResponse,
    /// Reply data following the Message Router header
    pub data: Bytes,
    /// The frame the reply arrived in
    pub packet: TransportPacket,
}

impl CipReply {
    pub fn general_status(&self) -> u8 {
        self.response.general_status
    }

    pub fn is_success(&self) -> bool {
        self.response.is_success()
    }
}

/// Explicit message client over an encapsulation transport
#[derive(Debug)]
pub struct CipMessenger<T> {
    transport: T,
    connection: Option<CipConnection>,
    config: MessengerConfig,
}

impl<T: EncapsulationTransport> CipMessenger<T> {
    /// Messenger using unconnected exchanges
    pub fn unconnected(transport: T, config: MessengerConfig) -> Self {
        Self {
            transport,
            connection: None,
            config,
        }
    }

    /// Open a connection with forward open and message over it
    ///
    /// # Errors
    /// `HandshakeFailure` if forward open fails; no messenger is created.
    pub async fn connected(
        transport: T,
        params: &ForwardOpenParams,
        config: MessengerConfig,
    ) -> EnipResult<Self> {
        let reply = forward_open(&transport, params, config.response_timeout).await?;
        Ok(Self {
            transport,
            connection: Some(CipConnection::new(reply)),
            config,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connection(&self) -> Option<&CipConnection> {
        self.connection.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &MessengerConfig {
        &self.config
    }

    /// Send `service` to the object at `path`
    ///
    /// Returns `None` when `expect_reply` is false. A nonzero general status
    /// is returned inside the reply, not as an error.
    pub async fn explicit_message(
        &self,
        service: ServiceCode,
        path: &EPath,
        expect_reply: bool,
    ) -> EnipResult<Option<CipReply>> {
        let request = MessageRouterRequest::new(service, path.clone());
        self.send_request(&request, expect_reply).await
    }

    /// Send a prepared Message Router request
    ///
    /// On a connection the sequence count stays reserved until the message
    /// is queued, so concurrent callers reach the wire in count order and a
    /// failed send leaves its count for the next message. Connected replies
    /// are matched on both the T->O connection id and the sequence count.
    pub async fn send_request(
        &self,
        request: &MessageRouterRequest,
        expect_reply: bool,
    ) -> EnipResult<Option<CipReply>> {
        let mut payload = BytesMut::with_capacity(2 + request.encoded_len());
        let pending = match &self.connection {
            Some(connection) => {
                let slot = connection.reserve_sequence().await;
                let sequence = slot.count();
                payload.put_u16_le(sequence);
                request.encode(&mut payload)?;
                let receive_id = expect_reply
                    .then(|| connected_response_id(connection.to_connection_id(), sequence));
                let pending = self
                    .transport
                    .send_encap(
                        payload.freeze(),
                        Some(connection.ot_connection_id()),
                        receive_id,
                    )
                    .await?;
                slot.commit();
                pending.map(|pending| (pending, Some(sequence)))
            }
            None => {
                request.encode(&mut payload)?;
                let receive_id = expect_reply.then(|| self.transport.next_response_id());
                self.transport
                    .send_encap(payload.freeze(), None, receive_id)
                    .await?
                    .map(|pending| (pending, None))
            }
        };
        let Some((pending, sequence)) = pending else {
            return Ok(None);
        };

        let packet = pending.wait(self.config.response_timeout).await?;
        let (response, consumed) = match sequence {
            Some(sent) => {
                let decoded = MessageRouterResponse::decode_connected(&packet.data)?;
                if decoded.0.sequence_count != Some(sent) {
                    return Err(EnipError::Format(format!(
                        "connected reply sequence {:?} does not match request {}",
                        decoded.0.sequence_count, sent
                    )));
                }
                decoded
            }
            None => MessageRouterResponse::decode_unconnected(&packet.data)?,
        };
        log::trace!(
            "Reply to service 0x{:02X}: status 0x{:02X}",
            request.service.code(),
            response.general_status
        );
        let data = packet.data.slice(consumed..);
        Ok(Some(CipReply {
            response,
            data,
            packet,
        }))
    }

    async fn request_reply(&self, service: ServiceCode, path: EPath) -> EnipResult<CipReply> {
        self.explicit_message(service, &path, true)
            .await?
            .ok_or_else(|| EnipError::InvalidData("reply expected but none registered".to_string()))
    }

    /// Get_Attribute_Single on `class`/`instance`/`attribute`
    pub async fn get_attribute_single(
        &self,
        class: u8,
        instance: u8,
        attribute: u8,
    ) -> EnipResult<CipReply> {
        self.request_reply(
            ServiceCode::GetAttributeSingle,
            EPath::attribute(class, instance, attribute),
        )
        .await
    }

    /// Get_Attributes_All on `class`/`instance`
    pub async fn get_attribute_all(&self, class: u8, instance: u8) -> EnipResult<CipReply> {
        self.request_reply(
            ServiceCode::GetAttributeAll,
            EPath::class_instance(class, instance),
        )
        .await
    }
}
