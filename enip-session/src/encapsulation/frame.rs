//! Builders for the frames the originator sends

use super::command_specific::CommandSpecific;
use super::header::{Command, EncapsulationHeader, ENCAPSULATION_HEADER_LENGTH};
use crate::error::{EnipError, EnipResult};
use bytes::{Bytes, BytesMut};
use enip_codec::{Item, ItemList};

/// Interface handle for CIP; the only one defined
const CIP_INTERFACE_HANDLE: u32 = 0;

fn body_length(len: usize) -> EnipResult<u16> {
    u16::try_from(len).map_err(|_| {
        EnipError::InvalidData(format!("Encapsulated body too long: {} bytes", len))
    })
}

/// RegisterSession request; the session handle is zero until the target assigns one
pub fn register_session(sender_context: u64, protocol_version: u16) -> Bytes {
    let data = CommandSpecific::RegisterSession {
        protocol_version,
        options_flags: 0,
    };
    let mut buf = BytesMut::with_capacity(ENCAPSULATION_HEADER_LENGTH + data.encoded_len());
    EncapsulationHeader::new(
        Command::RegisterSession,
        data.encoded_len() as u16,
        0,
        sender_context,
    )
    .encode(&mut buf);
    data.encode(&mut buf);
    buf.freeze()
}

/// UnRegisterSession request (header only)
pub fn unregister_session(session_handle: u32) -> Bytes {
    header_only(Command::UnRegisterSession, session_handle)
}

/// NOP keep-alive (header only, no reply expected)
pub fn nop(session_handle: u32) -> Bytes {
    header_only(Command::Nop, session_handle)
}

fn header_only(command: Command, session_handle: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(ENCAPSULATION_HEADER_LENGTH);
    EncapsulationHeader::new(command, 0, session_handle, 0).encode(&mut buf);
    buf.freeze()
}

/// Unconnected explicit message: SendRRData with a null address and an
/// unconnected data item
pub fn send_rr_data(session_handle: u32, sender_context: u64, payload: Bytes) -> EnipResult<Bytes> {
    let items = ItemList::new()
        .with(Item::null_address())
        .with(Item::unconnected_data(payload));
    send_data(Command::SendRRData, session_handle, sender_context, &items)
}

/// Connected explicit message: SendUnitData addressed to `connection_id`
pub fn send_unit_data(
    session_handle: u32,
    sender_context: u64,
    connection_id: u32,
    payload: Bytes,
) -> EnipResult<Bytes> {
    let items = ItemList::new()
        .with(Item::connected_address(connection_id))
        .with(Item::connected_data(payload));
    send_data(Command::SendUnitData, session_handle, sender_context, &items)
}

/// SendRRData / SendUnitData frame carrying `items`
pub fn send_data(
    command: Command,
    session_handle: u32,
    sender_context: u64,
    items: &ItemList,
) -> EnipResult<Bytes> {
    let data = CommandSpecific::SendData {
        interface_handle: CIP_INTERFACE_HANDLE,
        timeout: 0,
    };
    let length = body_length(data.encoded_len() + items.encoded_len())?;

    let mut buf = BytesMut::with_capacity(ENCAPSULATION_HEADER_LENGTH + length as usize);
    EncapsulationHeader::new(command, length, session_handle, sender_context).encode(&mut buf);
    data.encode(&mut buf);
    items.encode(&mut buf)?;
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_session_frame() {
        let frame = register_session(0, 1);
        assert_eq!(frame.len(), 28);
        let (header, _) = EncapsulationHeader::decode(&frame, 0).unwrap();
        assert_eq!(header.command, Command::RegisterSession);
        assert_eq!(header.length, 4);
        assert_eq!(header.session_handle, 0);
        assert_eq!(&frame[24..], &[0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_send_rr_data_frame() {
        let payload = Bytes::from_static(&[0x0E, 0x02, 0x20, 0x01, 0x24, 0x01]);
        let frame = send_rr_data(0x11223344, 7, payload).unwrap();

        let (header, offset) = EncapsulationHeader::decode(&frame, 0).unwrap();
        assert_eq!(header.command, Command::SendRRData);
        assert_eq!(header.session_handle, 0x11223344);
        assert_eq!(header.sender_context, 7);
        assert_eq!(header.frame_length(), frame.len());
        assert_eq!(
            &frame[offset..],
            &[
                0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // interface handle, timeout
                0x02, 0x00, // item count
                0x00, 0x00, 0x00, 0x00, // null address
                0xB2, 0x00, 0x06, 0x00, 0x0E, 0x02, 0x20, 0x01, 0x24, 0x01,
            ]
        );
    }

    #[test]
    fn test_send_unit_data_addresses_connection() {
        let frame = send_unit_data(1, 42, 0xAAAA0001, Bytes::from_static(&[0x01, 0x00])).unwrap();
        let (header, offset) = EncapsulationHeader::decode(&frame, 0).unwrap();
        assert_eq!(header.command, Command::SendUnitData);
        assert_eq!(header.sender_context, 42);

        let (items, _) = ItemList::decode(&frame[offset + 6..]).unwrap();
        assert_eq!(items[0].connection_identifier(), Some(0xAAAA0001));
        assert_eq!(items.payload().unwrap().as_ref(), &[0x01, 0x00]);
    }

    #[test]
    fn test_oversized_body_rejected() {
        let payload = Bytes::from(vec![0u8; 70_000]);
        assert!(send_rr_data(1, 2, payload).is_err());
    }
}
