//! Common packet format (CPF) item list
//!
//! Wire format (little-endian):
//! ```text
//! u16 item_count
//! repeated item_count times:
//!     u16 type_id
//!     u16 length
//!     [u8; length] value
//! ```
//!
//! Address items carry the routing information of an encapsulated message
//! (null address for unconnected traffic, connection identifier for connected
//! traffic, connection identifier plus sequence number for implicit I/O).
//! Data items carry the application payload.

use crate::error::{EnipError, EnipResult};
use crate::reader::ByteReader;
use bytes::{BufMut, Bytes, BytesMut};
use std::ops::Index;

/// Length of the item count field that starts every item list
pub const ITEM_LIST_HEADER_LENGTH: usize = 2;

/// Length of the type id + length fields preceding every item value
const ITEM_HEADER_LENGTH: usize = 4;

/// Item type identifier
///
/// Unknown identifiers are kept as [`ItemType::Unrecognized`] so that a
/// list containing vendor items still decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    NullAddress,
    ListIdentity,
    ConnectedAddress,
    ConnectedData,
    UnconnectedData,
    ListServices,
    SockaddrInfoOriginatorToTarget,
    SockaddrInfoTargetToOriginator,
    SequencedAddress,
    Unrecognized(u16),
}

impl ItemType {
    /// Wire value of this item type
    pub fn type_id(&self) -> u16 {
        match self {
            ItemType::NullAddress => 0x0000,
            ItemType::ListIdentity => 0x000C,
            ItemType::ConnectedAddress => 0x00A1,
            ItemType::ConnectedData => 0x00B1,
            ItemType::UnconnectedData => 0x00B2,
            ItemType::ListServices => 0x0100,
            ItemType::SockaddrInfoOriginatorToTarget => 0x8000,
            ItemType::SockaddrInfoTargetToOriginator => 0x8001,
            ItemType::SequencedAddress => 0x8002,
            ItemType::Unrecognized(id) => *id,
        }
    }

    /// Whether the item is an address item
    pub fn is_address(&self) -> bool {
        matches!(
            self,
            ItemType::NullAddress | ItemType::ConnectedAddress | ItemType::SequencedAddress
        )
    }

    /// Whether the item carries application data
    pub fn is_data(&self) -> bool {
        matches!(self, ItemType::ConnectedData | ItemType::UnconnectedData)
    }
}

impl From<u16> for ItemType {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => ItemType::NullAddress,
            0x000C => ItemType::ListIdentity,
            0x00A1 => ItemType::ConnectedAddress,
            0x00B1 => ItemType::ConnectedData,
            0x00B2 => ItemType::UnconnectedData,
            0x0100 => ItemType::ListServices,
            0x8000 => ItemType::SockaddrInfoOriginatorToTarget,
            0x8001 => ItemType::SockaddrInfoTargetToOriginator,
            0x8002 => ItemType::SequencedAddress,
            other => ItemType::Unrecognized(other),
        }
    }
}

/// A single typed item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    item_type: ItemType,
    data: Bytes,
}

impl Item {
    /// Create an item from its type and raw value
    pub fn new(item_type: ItemType, data: impl Into<Bytes>) -> Self {
        Self {
            item_type,
            data: data.into(),
        }
    }

    /// Null address item (unconnected messages)
    pub fn null_address() -> Self {
        Self::new(ItemType::NullAddress, Bytes::new())
    }

    /// Connected address item carrying a connection identifier
    pub fn connected_address(connection_id: u32) -> Self {
        Self::new(
            ItemType::ConnectedAddress,
            Bytes::copy_from_slice(&connection_id.to_le_bytes()),
        )
    }

    /// Sequenced address item carrying a connection identifier and sequence number
    pub fn sequenced_address(connection_id: u32, sequence_number: u32) -> Self {
        let mut data = BytesMut::with_capacity(8);
        data.put_u32_le(connection_id);
        data.put_u32_le(sequence_number);
        Self::new(ItemType::SequencedAddress, data.freeze())
    }

    /// Connected data item
    pub fn connected_data(payload: impl Into<Bytes>) -> Self {
        Self::new(ItemType::ConnectedData, payload)
    }

    /// Unconnected data item
    pub fn unconnected_data(payload: impl Into<Bytes>) -> Self {
        Self::new(ItemType::UnconnectedData, payload)
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    /// Raw wire type id
    pub fn type_id(&self) -> u16 {
        self.item_type.type_id()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Connection identifier of a connected or sequenced address item
    pub fn connection_identifier(&self) -> Option<u32> {
        match self.item_type {
            ItemType::ConnectedAddress | ItemType::SequencedAddress => {
                ByteReader::new(&self.data).read_u32().ok()
            }
            _ => None,
        }
    }

    /// Sequence number of a sequenced address item
    pub fn sequence_number(&self) -> Option<u32> {
        match self.item_type {
            ItemType::SequencedAddress => {
                let mut reader = ByteReader::new(&self.data);
                reader.read_u32().ok()?;
                reader.read_u32().ok()
            }
            _ => None,
        }
    }

    fn encoded_len(&self) -> usize {
        ITEM_HEADER_LENGTH + self.data.len()
    }
}

/// Ordered list of items
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemList {
    items: Vec<Item>,
}

impl ItemList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item at the end of the list
    pub fn append(&mut self, item: Item) {
        self.items.push(item);
    }

    /// Builder-style append
    pub fn with(mut self, item: Item) -> Self {
        self.append(item);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// Value of the first data item, if any
    pub fn payload(&self) -> Option<&Bytes> {
        self.items
            .iter()
            .find(|item| item.item_type().is_data())
            .map(Item::data)
    }

    /// Number of bytes [`ItemList::encode`] will produce
    pub fn encoded_len(&self) -> usize {
        ITEM_LIST_HEADER_LENGTH + self.items.iter().map(Item::encoded_len).sum::<usize>()
    }

    /// Encode the list into `buf`
    pub fn encode(&self, buf: &mut BytesMut) -> EnipResult<()> {
        let count = u16::try_from(self.items.len()).map_err(|_| {
            EnipError::InvalidData(format!("Too many items: {}", self.items.len()))
        })?;
        buf.reserve(self.encoded_len());
        buf.put_u16_le(count);
        for item in &self.items {
            let length = u16::try_from(item.data.len()).map_err(|_| {
                EnipError::InvalidData(format!(
                    "Item 0x{:04X} value too long: {} bytes",
                    item.type_id(),
                    item.data.len()
                ))
            })?;
            buf.put_u16_le(item.type_id());
            buf.put_u16_le(length);
            buf.put_slice(&item.data);
        }
        Ok(())
    }

    /// Encode the list into a fresh buffer
    pub fn to_bytes(&self) -> EnipResult<Bytes> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode a list from `data`
    ///
    /// # Returns
    /// The decoded list and the number of bytes consumed
    pub fn decode(data: &[u8]) -> EnipResult<(Self, usize)> {
        let mut reader = ByteReader::new(data);
        let count = reader.read_u16()?;
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let type_id = reader.read_u16()?;
            let length = reader.read_u16()? as usize;
            let value = reader.read_bytes(length)?;
            items.push(Item::new(
                ItemType::from(type_id),
                Bytes::copy_from_slice(value),
            ));
        }
        Ok((Self { items }, reader.position()))
    }
}

impl Index<usize> for ItemList {
    type Output = Item;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<'a> IntoIterator for &'a ItemList {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Item> for ItemList {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconnected_list_layout() {
        let list = ItemList::new()
            .with(Item::null_address())
            .with(Item::unconnected_data(vec![0x0E, 0x03]));
        let bytes = list.to_bytes().unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x02, 0x00, // count
                0x00, 0x00, 0x00, 0x00, // null address, empty
                0xB2, 0x00, 0x02, 0x00, 0x0E, 0x03, // unconnected data
            ]
        );
        assert_eq!(bytes.len(), list.encoded_len());
    }

    #[test]
    fn test_decode_connected_list() {
        let list = ItemList::new()
            .with(Item::connected_address(0xBBBB0002))
            .with(Item::connected_data(vec![0x01, 0x00, 0x8E, 0x00]));
        let mut bytes = list.to_bytes().unwrap().to_vec();
        bytes.extend_from_slice(&[0xAA, 0xBB]); // trailing bytes are not consumed

        let (decoded, consumed) = ItemList::decode(&bytes).unwrap();
        assert_eq!(consumed, bytes.len() - 2);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].item_type(), ItemType::ConnectedAddress);
        assert_eq!(decoded[0].connection_identifier(), Some(0xBBBB0002));
        assert_eq!(decoded.payload().unwrap().as_ref(), &[0x01, 0x00, 0x8E, 0x00]);
    }

    #[test]
    fn test_sequenced_address_fields() {
        let item = Item::sequenced_address(0x11223344, 7);
        assert_eq!(item.type_id(), 0x8002);
        assert_eq!(item.connection_identifier(), Some(0x11223344));
        assert_eq!(item.sequence_number(), Some(7));
        assert_eq!(Item::null_address().connection_identifier(), None);
    }

    #[test]
    fn test_unrecognized_item_type_is_kept() {
        let data = [0x01, 0x00, 0x34, 0x12, 0x01, 0x00, 0xFF];
        let (list, _) = ItemList::decode(&data).unwrap();
        assert_eq!(list[0].item_type(), ItemType::Unrecognized(0x1234));
        assert_eq!(list[0].type_id(), 0x1234);
    }

    #[test]
    fn test_truncated_item_is_format_error() {
        // declares a 4 byte value but carries 2
        let data = [0x01, 0x00, 0xB1, 0x00, 0x04, 0x00, 0x01, 0x02];
        assert!(matches!(ItemList::decode(&data), Err(EnipError::Format(_))));
    }
}
