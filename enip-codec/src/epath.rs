//! CIP path segment (EPATH) encoding
//!
//! Only logical segments are encoded; they address class, instance,
//! attribute and connection point ids. The first byte of a logical segment is
//! `segment_type | logical_type | format`. 16 and 32 bit formats insert a pad
//! byte so the value stays word aligned (padded EPATH).

use crate::error::{EnipError, EnipResult};
use bytes::{BufMut, Bytes, BytesMut};

/// Segment type (bits 7..5 of the segment byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SegmentType {
    Port = 0x00,
    Logical = 0x20,
    Network = 0x40,
    Symbolic = 0x60,
    Data = 0x80,
}

/// Logical segment type (bits 4..2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogicalType {
    ClassId = 0x00,
    InstanceId = 0x04,
    MemberId = 0x08,
    ConnectionPoint = 0x0C,
    AttributeId = 0x10,
    Special = 0x14,
    ServiceId = 0x18,
}

/// Logical segment format (bits 1..0)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LogicalFormat {
    Bit8 = 0x00,
    Bit16 = 0x01,
    Bit32 = 0x02,
}

/// One encoded path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment(Bytes);

impl PathSegment {
    /// Encode a segment
    ///
    /// # Errors
    /// `InvalidData` if the segment type is not logical or `value` does not
    /// fit the requested format.
    pub fn encode(
        segment_type: SegmentType,
        logical_type: LogicalType,
        format: LogicalFormat,
        value: u32,
    ) -> EnipResult<Self> {
        if segment_type != SegmentType::Logical {
            return Err(EnipError::InvalidData(format!(
                "Only logical segments can be value-encoded, got {:?}",
                segment_type
            )));
        }

        let lead = segment_type as u8 | logical_type as u8 | format as u8;
        let mut buf = BytesMut::with_capacity(6);
        buf.put_u8(lead);
        match format {
            LogicalFormat::Bit8 => {
                let value = u8::try_from(value).map_err(|_| out_of_range(value, format))?;
                buf.put_u8(value);
            }
            LogicalFormat::Bit16 => {
                let value = u16::try_from(value).map_err(|_| out_of_range(value, format))?;
                buf.put_u8(0x00);
                buf.put_u16_le(value);
            }
            LogicalFormat::Bit32 => {
                buf.put_u8(0x00);
                buf.put_u32_le(value);
            }
        }
        Ok(Self(buf.freeze()))
    }

    /// Logical segment with the narrowest format that holds `value`
    pub fn logical(logical_type: LogicalType, value: u32) -> Self {
        let lead = SegmentType::Logical as u8 | logical_type as u8;
        let mut buf = BytesMut::with_capacity(6);
        if let Ok(narrow) = u8::try_from(value) {
            buf.put_u8(lead | LogicalFormat::Bit8 as u8);
            buf.put_u8(narrow);
        } else if let Ok(narrow) = u16::try_from(value) {
            buf.put_u8(lead | LogicalFormat::Bit16 as u8);
            buf.put_u8(0x00);
            buf.put_u16_le(narrow);
        } else {
            buf.put_u8(lead | LogicalFormat::Bit32 as u8);
            buf.put_u8(0x00);
            buf.put_u32_le(value);
        }
        Self(buf.freeze())
    }

    /// 8-bit class id segment
    pub fn class_id(class: u8) -> Self {
        Self::logical(LogicalType::ClassId, class as u32)
    }

    /// 8-bit instance id segment
    pub fn instance_id(instance: u8) -> Self {
        Self::logical(LogicalType::InstanceId, instance as u32)
    }

    /// 8-bit attribute id segment
    pub fn attribute_id(attribute: u8) -> Self {
        Self::logical(LogicalType::AttributeId, attribute as u32)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn out_of_range(value: u32, format: LogicalFormat) -> EnipError {
    EnipError::InvalidData(format!(
        "Value {} does not fit logical format {:?}",
        value, format
    ))
}

/// Ordered sequence of path segments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EPath {
    segments: Vec<PathSegment>,
}

impl EPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path to `class`/`instance` (8-bit logical format)
    pub fn class_instance(class: u8, instance: u8) -> Self {
        Self::new()
            .with(PathSegment::class_id(class))
            .with(PathSegment::instance_id(instance))
    }

    /// Path to `class`/`instance`/`attribute` (8-bit logical format)
    pub fn attribute(class: u8, instance: u8, attribute: u8) -> Self {
        Self::class_instance(class, instance).with(PathSegment::attribute_id(attribute))
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn with(mut self, segment: PathSegment) -> Self {
        self.push(segment);
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Encoded length in bytes
    pub fn byte_len(&self) -> usize {
        self.segments.iter().map(PathSegment::len).sum()
    }

    /// Encoded length in 16-bit words, as carried in path size fields
    pub fn word_len(&self) -> EnipResult<u8> {
        let bytes = self.byte_len();
        if bytes % 2 != 0 {
            return Err(EnipError::InvalidData(format!(
                "Path of {} bytes is not word aligned",
                bytes
            )));
        }
        u8::try_from(bytes / 2)
            .map_err(|_| EnipError::InvalidData(format!("Path too long: {} bytes", bytes)))
    }

    /// Append the concatenated segments to `buf`
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.reserve(self.byte_len());
        for segment in &self.segments {
            buf.put_slice(segment.as_bytes());
        }
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.byte_len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

impl FromIterator<PathSegment> for EPath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_8bit_logical_segments() {
        assert_eq!(PathSegment::class_id(0x06).as_bytes(), &[0x20, 0x06]);
        assert_eq!(PathSegment::instance_id(0x01).as_bytes(), &[0x24, 0x01]);
        assert_eq!(PathSegment::attribute_id(0x03).as_bytes(), &[0x30, 0x03]);
    }

    #[test]
    fn test_wider_formats_are_padded() {
        let segment = PathSegment::encode(
            SegmentType::Logical,
            LogicalType::InstanceId,
            LogicalFormat::Bit16,
            0x1234,
        )
        .unwrap();
        assert_eq!(segment.as_bytes(), &[0x25, 0x00, 0x34, 0x12]);

        let segment = PathSegment::logical(LogicalType::ClassId, 0x0001_0000);
        assert_eq!(segment.as_bytes(), &[0x22, 0x00, 0x00, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn test_value_out_of_range_rejected() {
        let result = PathSegment::encode(
            SegmentType::Logical,
            LogicalType::ClassId,
            LogicalFormat::Bit8,
            0x100,
        );
        assert!(matches!(result, Err(EnipError::InvalidData(_))));

        let result = PathSegment::encode(
            SegmentType::Port,
            LogicalType::ClassId,
            LogicalFormat::Bit8,
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_attribute_path() {
        let path = EPath::attribute(0x47, 0x01, 0x02);
        assert_eq!(path.segment_count(), 3);
        assert_eq!(path.word_len().unwrap(), 3);
        assert_eq!(path.to_bytes().as_ref(), &[0x20, 0x47, 0x24, 0x01, 0x30, 0x02]);
    }
}
