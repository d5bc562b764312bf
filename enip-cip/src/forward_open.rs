//! Forward open handshake
//!
//! The request goes unconnected to the Connection Manager (class 0x06,
//! instance 0x01). Fields, little-endian, in order:
//! ```text
//! u8  priority / tick time
//! u8  time-out ticks
//! u32 O->T connection id
//! u32 T->O connection id
//! u16 connection serial number
//! u16 originator vendor id
//! u32 originator serial number
//! u8  connection timeout multiplier
//! [u8; 3] reserved
//! u32 O->T requested packet interval
//! u16 O->T connection parameters
//! u32 T->O requested packet interval
//! u16 T->O connection parameters
//! u8  transport type / trigger
//! u8  connection path size (words)
//! [u8] connection path
//! ```

use crate::error::{EnipError, EnipResult};
use crate::message_router::{MessageRouterRequest, MessageRouterResponse};
use crate::service::ServiceCode;
use bytes::{BufMut, Bytes, BytesMut};
use enip_codec::{ByteReader, EPath};
use enip_session::EncapsulationTransport;
use rand::Rng;
use std::time::Duration;

/// Connection Manager object class
pub const CONNECTION_MANAGER_CLASS: u8 = 0x06;

/// Largest randomly drawn O->T connection id
const MAX_RANDOM_CONNECTION_ID: u32 = 99_999;

/// Forward open parameters; ids left as `None` are generated per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOpenParams {
    pub tick_time: u8,
    pub timeout_ticks: u8,
    /// Random in 1..99 999 when `None`
    pub ot_connection_id: Option<u32>,
    /// Taken from the response id allocator when `None` so replies route back
    pub to_connection_id: Option<u32>,
    /// Random when `None`
    pub connection_serial: Option<u16>,
    pub vendor_id: u16,
    pub originator_serial: u32,
    pub timeout_multiplier: u8,
    pub ot_rpi: u32,
    pub ot_connection_params: u16,
    pub to_rpi: u32,
    pub to_connection_params: u16,
    pub transport_trigger: u8,
    /// Object the connection is made to
    pub target_path: EPath,
}

impl Default for ForwardOpenParams {
    fn default() -> Self {
        Self {
            tick_time: 6,
            timeout_ticks: 0x28,
            ot_connection_id: None,
            to_connection_id: None,
            connection_serial: None,
            vendor_id: 88,
            originator_serial: 12_345_678,
            timeout_multiplier: 0,
            ot_rpi: 0x03E7_FC18,
            ot_connection_params: 0x43FF,
            to_rpi: 0x03E7_FC18,
            to_connection_params: 0x43FF,
            transport_trigger: 0xA3,
            target_path: EPath::class_instance(0x02, 0x01),
        }
    }
}

impl ForwardOpenParams {
    pub fn validate(&self) -> EnipResult<()> {
        if self.tick_time > 0x0F {
            return Err(EnipError::InvalidData(format!(
                "tick_time must fit 4 bits, got {}",
                self.tick_time
            )));
        }
        if self.target_path.segment_count() == 0 {
            return Err(EnipError::InvalidData("target_path is empty".to_string()));
        }
        self.target_path.word_len()?;
        if self.ot_rpi == 0 || self.to_rpi == 0 {
            return Err(EnipError::InvalidData(
                "requested packet intervals must be nonzero".to_string(),
            ));
        }
        if self.ot_connection_id == Some(0) {
            return Err(EnipError::InvalidData("ot_connection_id must be nonzero".to_string()));
        }
        Ok(())
    }

    /// Fix the generated fields
    pub fn resolve(&self, to_connection_id: u32) -> ForwardOpenRequest {
        let mut rng = rand::thread_rng();
        ForwardOpenRequest {
            params: self.clone(),
            ot_connection_id: self
                .ot_connection_id
                .unwrap_or_else(|| rng.gen_range(1..MAX_RANDOM_CONNECTION_ID)),
            to_connection_id: self.to_connection_id.unwrap_or(to_connection_id),
            connection_serial: self.connection_serial.unwrap_or_else(|| rng.r#gen()),
        }
    }
}

/// Forward open request with every field fixed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOpenRequest {
    params: ForwardOpenParams,
    pub ot_connection_id: u32,
    pub to_connection_id: u32,
    pub connection_serial: u16,
}

impl ForwardOpenRequest {
    /// Message Router request addressed to the Connection Manager
    pub fn to_message(&self) -> EnipResult<MessageRouterRequest> {
        let p = &self.params;
        let path_words = p.target_path.word_len()?;
        let mut data = BytesMut::with_capacity(36 + p.target_path.byte_len());
        data.put_u8(p.tick_time);
        data.put_u8(p.timeout_ticks);
        data.put_u32_le(self.ot_connection_id);
        data.put_u32_le(self.to_connection_id);
        data.put_u16_le(self.connection_serial);
        data.put_u16_le(p.vendor_id);
        data.put_u32_le(p.originator_serial);
        data.put_u8(p.timeout_multiplier);
        data.put_slice(&[0x00; 3]);
        data.put_u32_le(p.ot_rpi);
        data.put_u16_le(p.ot_connection_params);
        data.put_u32_le(p.to_rpi);
        data.put_u16_le(p.to_connection_params);
        data.put_u8(p.transport_trigger);
        data.put_u8(path_words);
        p.target_path.encode(&mut data);

        Ok(MessageRouterRequest::new(
            ServiceCode::ForwardOpen,
            EPath::class_instance(CONNECTION_MANAGER_CLASS, 0x01),
        )
        .with_data(data.freeze()))
    }

    pub fn encode(&self) -> EnipResult<Bytes> {
        let message = self.to_message()?;
        let mut buf = BytesMut::with_capacity(message.encoded_len());
        message.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Successful forward open reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardOpenReply {
    pub ot_connection_id: u32,
    pub to_connection_id: u32,
    pub connection_serial: u16,
    pub vendor_id: u16,
    pub originator_serial: u32,
    /// Actual O->T packet interval, microseconds
    pub ot_api: u32,
    /// Actual T->O packet interval, microseconds
    pub to_api: u32,
    pub application_reply: Bytes,
}

impl ForwardOpenReply {
    /// Decode the reply data following the Message Router header
    pub fn decode(data: &[u8]) -> EnipResult<Self> {
        let mut reader = ByteReader::new(data);
        let ot_connection_id = reader.read_u32()?;
        let to_connection_id = reader.read_u32()?;
        let connection_serial = reader.read_u16()?;
        let vendor_id = reader.read_u16()?;
        let originator_serial = reader.read_u32()?;
        let ot_api = reader.read_u32()?;
        let to_api = reader.read_u32()?;
        let application_words = reader.read_u8()?;
        let _reserved = reader.read_u8()?;
        let application_reply =
            Bytes::copy_from_slice(reader.read_bytes(application_words as usize * 2)?);
        Ok(Self {
            ot_connection_id,
            to_connection_id,
            connection_serial,
            vendor_id,
            originator_serial,
            ot_api,
            to_api,
            application_reply,
        })
    }
}

/// Run the handshake over an unconnected exchange
///
/// # Errors
/// `HandshakeFailure` when no reply arrives in time, the reply is malformed,
/// or the target answers with a nonzero general status. Session errors
/// propagate unchanged.
pub async fn forward_open<T>(
    transport: &T,
    params: &ForwardOpenParams,
    timeout: Duration,
) -> EnipResult<ForwardOpenReply>
where
    T: EncapsulationTransport + ?Sized,
{
    params.validate()?;
    let to_connection_id = u32::try_from(transport.next_response_id())
        .map_err(|_| EnipError::InvalidData("response id exceeds 32 bits".to_string()))?;
    let request = params.resolve(to_connection_id);
    log::debug!(
        "Forward open: O->T 0x{:08X}, T->O 0x{:08X}, serial 0x{:04X}",
        request.ot_connection_id,
        request.to_connection_id,
        request.connection_serial
    );

    let response_id = transport.next_response_id();
    let pending = transport
        .send_encap(request.encode()?, None, Some(response_id))
        .await?
        .ok_or_else(|| EnipError::HandshakeFailure("no reply waiter registered".to_string()))?;

    let packet = pending.wait(timeout).await.map_err(|e| match e {
        EnipError::Timeout(elapsed) => {
            EnipError::HandshakeFailure(format!("no forward open reply within {:?}", elapsed))
        }
        other => other,
    })?;

    let (response, consumed) = MessageRouterResponse::decode_unconnected(&packet.data)
        .map_err(|e| EnipError::HandshakeFailure(format!("malformed reply: {}", e)))?;
    if let Err(e) = response.ensure_success() {
        log::warn!("Forward open rejected: {}", e);
        return Err(EnipError::HandshakeFailure(e.to_string()));
    }
    let reply = ForwardOpenReply::decode(&packet.data[consumed..])
        .map_err(|e| EnipError::HandshakeFailure(format!("malformed reply: {}", e)))?;
    log::info!(
        "Connection opened: O->T 0x{:08X}, T->O 0x{:08X}",
        reply.ot_connection_id,
        reply.to_connection_id
    );
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_layout_with_defaults() {
        let params = ForwardOpenParams {
            ot_connection_id: Some(0x11111111),
            connection_serial: Some(0x2222),
            ..Default::default()
        };
        let bytes = params.resolve(0x00000005).encode().unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x54, 0x02, 0x20, 0x06, 0x24, 0x01, // service, Connection Manager path
                0x06, 0x28, // tick, time-out ticks
                0x11, 0x11, 0x11, 0x11, // O->T id
                0x05, 0x00, 0x00, 0x00, // T->O id from allocator
                0x22, 0x22, // serial
                0x58, 0x00, // vendor 88
                0x4E, 0x61, 0xBC, 0x00, // originator serial 12345678
                0x00, 0x00, 0x00, 0x00, // multiplier, reserved
                0x18, 0xFC, 0xE7, 0x03, 0xFF, 0x43, // O->T RPI, params
                0x18, 0xFC, 0xE7, 0x03, 0xFF, 0x43, // T->O RPI, params
                0xA3, 0x02, 0x20, 0x02, 0x24, 0x01, // trigger, path
            ]
        );
    }

    #[test]
    fn test_generated_ids_in_range() {
        let params = ForwardOpenParams::default();
        for _ in 0..100 {
            let request = params.resolve(42);
            assert!((1..MAX_RANDOM_CONNECTION_ID).contains(&request.ot_connection_id));
            assert_eq!(request.to_connection_id, 42);
        }
    }

    #[test]
    fn test_validation() {
        assert!(ForwardOpenParams::default().validate().is_ok());
        let params = ForwardOpenParams {
            tick_time: 0x10,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        let params = ForwardOpenParams {
            target_path: EPath::new(),
            ..Default::default()
        };
        assert!(params.validate().is_err());
        let params = ForwardOpenParams {
            to_rpi: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_reply_decode() {
        let mut data = BytesMut::new();
        data.put_u32_le(0xAAAA0001);
        data.put_u32_le(0xBBBB0002);
        data.put_u16_le(0x2222);
        data.put_u16_le(88);
        data.put_u32_le(12_345_678);
        data.put_u32_le(10_000);
        data.put_u32_le(20_000);
        data.put_u8(1);
        data.put_u8(0);
        data.put_slice(&[0xDE, 0xAD]);

        let reply = ForwardOpenReply::decode(&data).unwrap();
        assert_eq!(reply.ot_connection_id, 0xAAAA0001);
        assert_eq!(reply.to_connection_id, 0xBBBB0002);
        assert_eq!(reply.to_api, 20_000);
        assert_eq!(reply.application_reply.as_ref(), &[0xDE, 0xAD]);

        assert!(ForwardOpenReply::decode(&data[..data.len() - 1]).is_err());
    }
}
