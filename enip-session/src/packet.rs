//! Decoded inbound frames
//!
//! A [`TransportPacket`] is the unit handed to correlated waiters: the
//! decoded header layers of an encapsulated TCP frame or an implicit I/O
//! datagram together with its application payload and the identifier the
//! dispatcher routes it by.

use crate::encapsulation::{Command, CommandSpecific, EncapsulationHeader};
use crate::error::{EnipError, EnipResult};
use crate::identifiers::connected_response_id;
use bytes::Bytes;
use enip_codec::{ByteReader, ItemList, ItemType};
use enip_transport::TransportMetadata;

/// Datagrams of this size or smaller carry no usable item list
pub const MIN_DATAGRAM_LENGTH: usize = 6;

/// One inbound frame, decoded
#[derive(Debug, Clone)]
pub struct TransportPacket {
    /// Where and when the frame arrived
    pub transport: TransportMetadata,
    /// Absent for datagrams
    pub header: Option<EncapsulationHeader>,
    pub command_specific: Option<CommandSpecific>,
    pub items: Option<ItemList>,
    /// Application payload: the first data item, or any trailing bytes
    pub data: Bytes,
    /// Identifier used to match the frame with its requester
    pub response_id: u64,
}

impl TransportPacket {
    /// Decode one complete encapsulated frame (header plus declared body)
    ///
    /// For SendUnitData the response id combines the connection identifier
    /// of the first item with the sequence count leading the connected data
    /// (see [`connected_response_id`]); every other command is keyed by its
    /// sender context.
    pub fn decode_encapsulated(frame: &[u8], transport: TransportMetadata) -> EnipResult<Self> {
        let (header, offset) = EncapsulationHeader::decode(frame, 0)?;
        if frame.len() < header.frame_length() {
            return Err(EnipError::Format(format!(
                "Frame declares {} body bytes, {} present",
                header.length,
                frame.len() - offset
            )));
        }

        let body = &frame[offset..header.frame_length()];
        let mut reader = ByteReader::new(body);
        let command_specific = CommandSpecific::decode(header.command, &mut reader)?;

        let mut items = None;
        if header.command.carries_items() && !reader.is_empty() {
            let (list, consumed) = ItemList::decode(&body[reader.position()..])?;
            reader.read_bytes(consumed)?;
            items = Some(list);
        }

        let trailing = Bytes::copy_from_slice(reader.read_rest());
        let data = items
            .as_ref()
            .and_then(ItemList::payload)
            .cloned()
            .unwrap_or(trailing);

        let response_id = match header.command {
            Command::SendUnitData => {
                let connection_id = items
                    .as_ref()
                    .and_then(|list| list.get(0))
                    .and_then(|item| item.connection_identifier())
                    .ok_or_else(|| {
                        EnipError::Format(
                            "SendUnitData without a connected address item".to_string(),
                        )
                    })?;
                let sequence_count = ByteReader::new(&data).read_u16().map_err(|_| {
                    EnipError::Format("SendUnitData without a sequence count".to_string())
                })?;
                connected_response_id(connection_id, sequence_count)
            }
            _ => header.sender_context,
        };

        Ok(Self {
            transport,
            header: Some(header),
            command_specific,
            items,
            data,
            response_id,
        })
    }

    /// Decode an implicit I/O datagram
    ///
    /// Returns `Ok(None)` for datagrams that are too short or whose first item
    /// is not a sequenced address; both are dropped by the caller.
    pub fn decode_datagram(datagram: &[u8], transport: TransportMetadata) -> EnipResult<Option<Self>> {
        if datagram.len() <= MIN_DATAGRAM_LENGTH {
            return Ok(None);
        }
        let (items, consumed) = ItemList::decode(datagram)?;
        let connection_id = match items.get(0) {
            Some(item) if item.item_type() == ItemType::SequencedAddress => {
                match item.connection_identifier() {
                    Some(id) => id,
                    None => return Ok(None),
                }
            }
            _ => return Ok(None),
        };

        let data = items
            .payload()
            .cloned()
            .unwrap_or_else(|| Bytes::copy_from_slice(&datagram[consumed..]));
        Ok(Some(Self {
            transport,
            header: None,
            command_specific: None,
            items: Some(items),
            data,
            response_id: u64::from(connection_id),
        }))
    }

    /// Encapsulation command, `None` for datagrams
    pub fn command(&self) -> Option<Command> {
        self.header.map(|header| header.command)
    }

    /// Sequence number of an implicit I/O datagram
    pub fn sequence_number(&self) -> Option<u32> {
        self.items.as_ref()?.get(0)?.sequence_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encapsulation::frame;
    use enip_codec::Item;
    use enip_transport::Protocol;

    fn metadata(protocol: Protocol) -> TransportMetadata {
        TransportMetadata::now(None, None, protocol)
    }

    #[test]
    fn test_unconnected_reply_keyed_by_context() {
        let payload = Bytes::from_static(&[0x8E, 0x00, 0x00, 0x00, 0x02, 0x00]);
        let bytes = frame::send_rr_data(9, 1234, payload.clone()).unwrap();

        let packet = TransportPacket::decode_encapsulated(&bytes, metadata(Protocol::Tcp)).unwrap();
        assert_eq!(packet.command(), Some(Command::SendRRData));
        assert_eq!(packet.response_id, 1234);
        assert_eq!(packet.data, payload);
        assert_eq!(
            packet.command_specific,
            Some(CommandSpecific::SendData {
                interface_handle: 0,
                timeout: 0
            })
        );
    }

    #[test]
    fn test_connected_reply_keyed_by_connection_and_sequence() {
        let bytes =
            frame::send_unit_data(9, 1, 0xBBBB0002, Bytes::from_static(&[0x07, 0x00, 0x8E, 0x00]))
                .unwrap();
        let packet = TransportPacket::decode_encapsulated(&bytes, metadata(Protocol::Tcp)).unwrap();
        assert_eq!(packet.response_id, connected_response_id(0xBBBB0002, 7));
        assert_eq!(packet.data.as_ref(), &[0x07, 0x00, 0x8E, 0x00]);

        // same connection, another sequence count: another key
        let bytes =
            frame::send_unit_data(9, 1, 0xBBBB0002, Bytes::from_static(&[0x08, 0x00, 0x8E, 0x00]))
                .unwrap();
        let other = TransportPacket::decode_encapsulated(&bytes, metadata(Protocol::Tcp)).unwrap();
        assert_ne!(other.response_id, packet.response_id);
    }

    #[test]
    fn test_connected_reply_without_sequence_count() {
        let bytes =
            frame::send_unit_data(9, 1, 0xBBBB0002, Bytes::from_static(&[0x01])).unwrap();
        let result = TransportPacket::decode_encapsulated(&bytes, metadata(Protocol::Tcp));
        assert!(matches!(result, Err(EnipError::Format(_))));
    }

    #[test]
    fn test_register_reply_has_no_items() {
        let bytes = frame::register_session(0, 1);
        let packet = TransportPacket::decode_encapsulated(&bytes, metadata(Protocol::Tcp)).unwrap();
        assert!(packet.items.is_none());
        assert!(packet.data.is_empty());
        assert_eq!(packet.response_id, 0);
    }

    #[test]
    fn test_truncated_body_is_format_error() {
        let bytes = frame::send_rr_data(9, 1, Bytes::from_static(&[1, 2, 3])).unwrap();
        let result = TransportPacket::decode_encapsulated(&bytes[..bytes.len() - 1], metadata(Protocol::Tcp));
        assert!(matches!(result, Err(EnipError::Format(_))));
    }

    #[test]
    fn test_datagram_with_sequenced_address() {
        let datagram = ItemList::new()
            .with(Item::sequenced_address(0x00C0FFEE, 12))
            .with(Item::connected_data(vec![0x05, 0x00, 0xAB]))
            .to_bytes()
            .unwrap();
        let packet = TransportPacket::decode_datagram(&datagram, metadata(Protocol::Udp))
            .unwrap()
            .unwrap();
        assert_eq!(packet.response_id, 0x00C0FFEE);
        assert_eq!(packet.sequence_number(), Some(12));
        assert_eq!(packet.data.as_ref(), &[0x05, 0x00, 0xAB]);
        assert!(packet.header.is_none());
    }

    #[test]
    fn test_short_or_unsequenced_datagrams_dropped() {
        let short = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(TransportPacket::decode_datagram(&short, metadata(Protocol::Udp))
            .unwrap()
            .is_none());

        let unsequenced = ItemList::new()
            .with(Item::connected_address(5))
            .with(Item::connected_data(vec![0x00]))
            .to_bytes()
            .unwrap();
        assert!(TransportPacket::decode_datagram(&unsequenced, metadata(Protocol::Udp))
            .unwrap()
            .is_none());
    }
}
