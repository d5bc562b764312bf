//! Command-specific data following the encapsulation header

use super::header::Command;
use crate::error::EnipResult;
use bytes::{BufMut, BytesMut};
use enip_codec::ByteReader;

/// Command-specific data, present only for the commands that define one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSpecific {
    /// RegisterSession / UnRegisterSession body
    RegisterSession { protocol_version: u16, options_flags: u16 },
    /// SendRRData / SendUnitData prefix
    SendData { interface_handle: u32, timeout: u16 },
}

impl CommandSpecific {
    /// Read the command-specific data of `command` from `reader`
    ///
    /// Returns `None` for commands without one or when the body is empty
    /// (UnRegisterSession is sent without a body).
    pub fn decode(command: Command, reader: &mut ByteReader<'_>) -> EnipResult<Option<Self>> {
        if reader.is_empty() {
            return Ok(None);
        }
        let data = match command {
            Command::RegisterSession | Command::UnRegisterSession => {
                CommandSpecific::RegisterSession {
                    protocol_version: reader.read_u16()?,
                    options_flags: reader.read_u16()?,
                }
            }
            Command::SendRRData | Command::SendUnitData => CommandSpecific::SendData {
                interface_handle: reader.read_u32()?,
                timeout: reader.read_u16()?,
            },
            _ => return Ok(None),
        };
        Ok(Some(data))
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        match *self {
            CommandSpecific::RegisterSession {
                protocol_version,
                options_flags,
            } => {
                buf.put_u16_le(protocol_version);
                buf.put_u16_le(options_flags);
            }
            CommandSpecific::SendData {
                interface_handle,
                timeout,
            } => {
                buf.put_u32_le(interface_handle);
                buf.put_u16_le(timeout);
            }
        }
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            CommandSpecific::RegisterSession { .. } => 4,
            CommandSpecific::SendData { .. } => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_data_prefix() {
        let data = [0x00, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x02, 0x00];
        let mut reader = ByteReader::new(&data);
        let decoded = CommandSpecific::decode(Command::SendRRData, &mut reader).unwrap();
        assert_eq!(
            decoded,
            Some(CommandSpecific::SendData {
                interface_handle: 0,
                timeout: 10
            })
        );
        // item count left for the item list decoder
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn test_commands_without_data() {
        let data = [0x01, 0x00];
        let mut reader = ByteReader::new(&data);
        assert_eq!(CommandSpecific::decode(Command::Nop, &mut reader).unwrap(), None);
        assert_eq!(reader.position(), 0);

        let mut empty = ByteReader::new(&[]);
        assert_eq!(
            CommandSpecific::decode(Command::UnRegisterSession, &mut empty).unwrap(),
            None
        );
    }

    #[test]
    fn test_register_session_encoding() {
        let data = CommandSpecific::RegisterSession {
            protocol_version: 1,
            options_flags: 0,
        };
        let mut buf = BytesMut::new();
        data.encode(&mut buf);
        assert_eq!(buf.as_ref(), &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(buf.len(), data.encoded_len());
    }
}
