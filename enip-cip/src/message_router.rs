//! Message Router request and response
//!
//! Request:
//! ```text
//! u8  service
//! u8  path_size      in 16-bit words
//! [u8] path
//! [u8] request data
//! ```
//! Response (unconnected):
//! ```text
//! u8  reply_service
//! u8  reserved
//! u8  general_status
//! u8  additional_status_size   in 16-bit words
//! [u16] additional_status
//! [u8]  reply data
//! ```
//! A connected response is prefixed with the u16 sequence count of the request.

use crate::error::{EnipError, EnipResult};
use crate::service::{general_status, ServiceCode, REPLY_FLAG};
use bytes::{BufMut, Bytes, BytesMut};
use enip_codec::{ByteReader, EPath};

/// Explicit request addressed to an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRouterRequest {
    pub service: ServiceCode,
    pub path: EPath,
    pub data: Bytes,
}

impl MessageRouterRequest {
    pub fn new(service: ServiceCode, path: EPath) -> Self {
        Self {
            service,
            path,
            data: Bytes::new(),
        }
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    pub fn encoded_len(&self) -> usize {
        2 + self.path.byte_len() + self.data.len()
    }

    /// Append the request to `buf`
    ///
    /// # Errors
    /// `InvalidData` if the path is not word aligned or longer than 255 words.
    pub fn encode(&self, buf: &mut BytesMut) -> EnipResult<()> {
        let path_words = self.path.word_len()?;
        buf.reserve(self.encoded_len());
        buf.put_u8(self.service.code());
        buf.put_u8(path_words);
        self.path.encode(buf);
        buf.put_slice(&self.data);
        Ok(())
    }
}

/// Decoded Message Router response header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRouterResponse {
    /// Present for connected responses
    pub sequence_count: Option<u16>,
    pub reply_service: u8,
    pub general_status: u8,
    pub additional_status: Vec<u16>,
}

impl MessageRouterResponse {
    /// Decode a connected response
    ///
    /// # Returns
    /// The response and the number of bytes consumed
    pub fn decode_connected(data: &[u8]) -> EnipResult<(Self, usize)> {
        let mut reader = ByteReader::new(data);
        let sequence_count = reader.read_u16()?;
        let mut response = Self::read_header(&mut reader)?;
        response.sequence_count = Some(sequence_count);
        Ok((response, reader.position()))
    }

    /// Decode an unconnected response
    pub fn decode_unconnected(data: &[u8]) -> EnipResult<(Self, usize)> {
        let mut reader = ByteReader::new(data);
        let response = Self::read_header(&mut reader)?;
        Ok((response, reader.position()))
    }

    fn read_header(reader: &mut ByteReader<'_>) -> EnipResult<Self> {
        let reply_service = reader.read_u8()?;
        let _reserved = reader.read_u8()?;
        let general_status = reader.read_u8()?;
        let additional_words = reader.read_u8()?;
        let additional_status = (0..additional_words)
            .map(|_| reader.read_u16())
            .collect::<EnipResult<Vec<_>>>()?;
        Ok(Self {
            sequence_count: None,
            reply_service,
            general_status,
            additional_status,
        })
    }

    /// Service the reply answers (reply flag stripped)
    pub fn service(&self) -> ServiceCode {
        ServiceCode::from(self.reply_service)
    }

    pub fn is_reply(&self) -> bool {
        self.reply_service & REPLY_FLAG != 0
    }

    pub fn is_success(&self) -> bool {
        self.general_status == general_status::SUCCESS
    }

    /// Turn a nonzero general status into `ProtocolStatus`
    pub fn ensure_success(&self) -> EnipResult<()> {
        if self.is_success() {
            return Ok(());
        }
        Err(EnipError::ProtocolStatus {
            service: self.reply_service & !REPLY_FLAG,
            general_status: self.general_status,
            additional_status: self.additional_status.clone(),
        })
    }

    /// Encoded size of the header, including the sequence count if present
    pub fn byte_size(&self) -> usize {
        let sequence = if self.sequence_count.is_some() { 2 } else { 0 };
        sequence + 4 + 2 * self.additional_status.len()
    }
}
