//! Encapsulation header
//!
//! Wire format (little-endian, 24 bytes):
//! ```text
//! u16 command
//! u16 length          bytes following the header
//! u32 session_handle
//! u32 status
//! u64 sender_context  echoed unchanged by the target
//! u32 options
//! ```

use crate::error::{EnipError, EnipResult};
use bytes::{BufMut, BytesMut};
use enip_codec::ByteReader;

/// Encapsulation header length
pub const ENCAPSULATION_HEADER_LENGTH: usize = 24;

/// Encapsulation command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Nop,
    ListServices,
    ListIdentity,
    ListInterfaces,
    RegisterSession,
    UnRegisterSession,
    SendRRData,
    SendUnitData,
    Unrecognized(u16),
}

impl Command {
    /// Wire value of the command
    pub fn code(&self) -> u16 {
        match self {
            Command::Nop => 0x0000,
            Command::ListServices => 0x0004,
            Command::ListIdentity => 0x0063,
            Command::ListInterfaces => 0x0064,
            Command::RegisterSession => 0x0065,
            Command::UnRegisterSession => 0x0066,
            Command::SendRRData => 0x006F,
            Command::SendUnitData => 0x0070,
            Command::Unrecognized(code) => *code,
        }
    }

    /// Whether the command carries an item list after its command-specific data
    pub fn carries_items(&self) -> bool {
        matches!(
            self,
            Command::SendRRData
                | Command::SendUnitData
                | Command::ListIdentity
                | Command::ListServices
                | Command::ListInterfaces
        )
    }
}

impl From<u16> for Command {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => Command::Nop,
            0x0004 => Command::ListServices,
            0x0063 => Command::ListIdentity,
            0x0064 => Command::ListInterfaces,
            0x0065 => Command::RegisterSession,
            0x0066 => Command::UnRegisterSession,
            0x006F => Command::SendRRData,
            0x0070 => Command::SendUnitData,
            other => Command::Unrecognized(other),
        }
    }
}

/// Encapsulation header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncapsulationHeader {
    pub command: Command,
    pub length: u16,
    pub session_handle: u32,
    pub status: u32,
    pub sender_context: u64,
    pub options: u32,
}

impl EncapsulationHeader {
    /// Create a header with zero status and options
    pub fn new(command: Command, length: u16, session_handle: u32, sender_context: u64) -> Self {
        Self {
            command,
            length,
            session_handle,
            status: 0,
            sender_context,
            options: 0,
        }
    }

    /// Decode a header starting at `offset`
    ///
    /// # Returns
    /// The header and the offset just past it
    ///
    /// # Errors
    /// `Format` if fewer than 24 bytes remain.
    pub fn decode(data: &[u8], offset: usize) -> EnipResult<(Self, usize)> {
        let available = data.len().saturating_sub(offset);
        if available < ENCAPSULATION_HEADER_LENGTH {
            return Err(EnipError::Format(format!(
                "Encapsulation header too short: expected {}, got {}",
                ENCAPSULATION_HEADER_LENGTH, available
            )));
        }

        let mut reader = ByteReader::at_offset(data, offset)?;
        let header = Self {
            command: Command::from(reader.read_u16()?),
            length: reader.read_u16()?,
            session_handle: reader.read_u32()?,
            status: reader.read_u32()?,
            sender_context: reader.read_u64()?,
            options: reader.read_u32()?,
        };
        Ok((header, reader.position()))
    }

    /// Append the header to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(ENCAPSULATION_HEADER_LENGTH);
        buf.put_u16_le(self.command.code());
        buf.put_u16_le(self.length);
        buf.put_u32_le(self.session_handle);
        buf.put_u32_le(self.status);
        buf.put_u64_le(self.sender_context);
        buf.put_u32_le(self.options);
    }

    /// Total frame length (header plus declared body)
    pub fn frame_length(&self) -> usize {
        ENCAPSULATION_HEADER_LENGTH + self.length as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = EncapsulationHeader {
            command: Command::SendRRData,
            length: 0x0010,
            session_handle: 0x12345678,
            status: 0,
            sender_context: 0x0102030405060708,
            options: 0,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(
            buf.as_ref(),
            &[
                0x6F, 0x00, 0x10, 0x00, 0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x00, 0x00, 0x08,
                0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, 0x00, 0x00, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn test_decode_at_offset() {
        let header = EncapsulationHeader::new(Command::RegisterSession, 4, 0xCAFE, 0);
        let mut buf = BytesMut::from(&[0xEE, 0xEE][..]);
        header.encode(&mut buf);

        let (decoded, end) = EncapsulationHeader::decode(&buf, 2).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(end, 2 + ENCAPSULATION_HEADER_LENGTH);
    }

    #[test]
    fn test_short_header_is_format_error() {
        let result = EncapsulationHeader::decode(&[0u8; 23], 0);
        assert!(matches!(result, Err(EnipError::Format(_))));
        assert!(EncapsulationHeader::decode(&[0u8; 30], 10).is_err());
    }

    #[test]
    fn test_unknown_command_is_kept() {
        assert_eq!(Command::from(0x00C8), Command::Unrecognized(0x00C8));
        assert_eq!(Command::Unrecognized(0x00C8).code(), 0x00C8);
        assert_eq!(Command::from(0x0070), Command::SendUnitData);
    }

    #[test]
    fn test_fields_survive_encode_decode() {
        let commands = [
            Command::Nop,
            Command::ListServices,
            Command::ListIdentity,
            Command::ListInterfaces,
            Command::RegisterSession,
            Command::UnRegisterSession,
            Command::SendRRData,
            Command::SendUnitData,
            Command::Unrecognized(0x00C8),
        ];
        // each bit picks zero or the field maximum
        for command in commands {
            for mask in 0u8..32 {
                let pick = |bit: u8| mask & (1 << bit) != 0;
                let header = EncapsulationHeader {
                    command,
                    length: if pick(0) { u16::MAX } else { 0 },
                    session_handle: if pick(1) { u32::MAX } else { 0 },
                    status: if pick(2) { u32::MAX } else { 0 },
                    sender_context: if pick(3) { u64::MAX } else { 0 },
                    options: if pick(4) { u32::MAX } else { 0 },
                };
                let mut buf = BytesMut::new();
                header.encode(&mut buf);
                assert_eq!(buf.len(), ENCAPSULATION_HEADER_LENGTH);

                let (decoded, next) = EncapsulationHeader::decode(&buf, 0).unwrap();
                assert_eq!(decoded, header, "mask {:05b}", mask);
                assert_eq!(next, ENCAPSULATION_HEADER_LENGTH);
            }
        }
    }
}
