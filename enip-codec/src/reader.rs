//! Little-endian field reader

use crate::error::{EnipError, EnipResult};

/// Bounds-checked reader over a byte slice
///
/// Every read either consumes exactly the requested number of bytes or fails
/// with [`EnipError::Format`] without advancing.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a new reader positioned at the start of `buffer`
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Create a new reader positioned at `offset`
    pub fn at_offset(buffer: &'a [u8], offset: usize) -> EnipResult<Self> {
        if offset > buffer.len() {
            return Err(EnipError::Format(format!(
                "Offset {} beyond buffer of {} bytes",
                offset,
                buffer.len()
            )));
        }
        Ok(Self {
            buffer,
            position: offset,
        })
    }

    /// Current offset into the underlying buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read `len` raw bytes
    pub fn read_bytes(&mut self, len: usize) -> EnipResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(EnipError::Format(format!(
                "Need {} bytes at offset {}, only {} remain",
                len,
                self.position,
                self.remaining()
            )));
        }
        let slice = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    /// Read everything that is left
    pub fn read_rest(&mut self) -> &'a [u8] {
        let slice = &self.buffer[self.position..];
        self.position = self.buffer.len();
        slice
    }

    fn read_array<const N: usize>(&mut self) -> EnipResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> EnipResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> EnipResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> EnipResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> EnipResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_little_endian_fields() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xFF];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u32().unwrap(), 0x12345678);
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.read_rest(), &[0xFF]);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let data = [0x01, 0x02, 0x03];
        let mut reader = ByteReader::new(&data);
        reader.read_u8().unwrap();
        assert!(matches!(reader.read_u32(), Err(EnipError::Format(_))));
        assert_eq!(reader.position(), 1);
        assert_eq!(reader.read_u16().unwrap(), 0x0302);
    }

    #[test]
    fn test_at_offset_bounds() {
        let data = [0u8; 4];
        assert!(ByteReader::at_offset(&data, 4).is_ok());
        assert!(ByteReader::at_offset(&data, 5).is_err());
    }
}
