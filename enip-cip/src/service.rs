//! CIP service codes and general status codes

/// Bit set in the service code of every reply
pub const REPLY_FLAG: u8 = 0x80;

/// CIP service code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceCode {
    GetAttributeAll,
    SetAttributeAll,
    GetAttributeList,
    SetAttributeList,
    Reset,
    Start,
    Stop,
    Create,
    Delete,
    MultipleServicePacket,
    ApplyAttributes,
    GetAttributeSingle,
    SetAttributeSingle,
    FindNextObjectInstance,
    ForwardClose,
    UnconnectedSend,
    ForwardOpen,
    LargeForwardOpen,
    /// Object-specific or unknown service
    Other(u8),
}

impl ServiceCode {
    pub fn code(&self) -> u8 {
        match self {
            ServiceCode::GetAttributeAll => 0x01,
            ServiceCode::SetAttributeAll => 0x02,
            ServiceCode::GetAttributeList => 0x03,
            ServiceCode::SetAttributeList => 0x04,
            ServiceCode::Reset => 0x05,
            ServiceCode::Start => 0x06,
            ServiceCode::Stop => 0x07,
            ServiceCode::Create => 0x08,
            ServiceCode::Delete => 0x09,
            ServiceCode::MultipleServicePacket => 0x0A,
            ServiceCode::ApplyAttributes => 0x0D,
            ServiceCode::GetAttributeSingle => 0x0E,
            ServiceCode::SetAttributeSingle => 0x10,
            ServiceCode::FindNextObjectInstance => 0x11,
            ServiceCode::ForwardClose => 0x4E,
            ServiceCode::UnconnectedSend => 0x52,
            ServiceCode::ForwardOpen => 0x54,
            ServiceCode::LargeForwardOpen => 0x5B,
            ServiceCode::Other(code) => *code,
        }
    }

    /// Service code the reply carries
    pub fn reply_code(&self) -> u8 {
        self.code() | REPLY_FLAG
    }
}

impl From<u8> for ServiceCode {
    fn from(value: u8) -> Self {
        match value & !REPLY_FLAG {
            0x01 => ServiceCode::GetAttributeAll,
            0x02 => ServiceCode::SetAttributeAll,
            0x03 => ServiceCode::GetAttributeList,
            0x04 => ServiceCode::SetAttributeList,
            0x05 => ServiceCode::Reset,
            0x06 => ServiceCode::Start,
            0x07 => ServiceCode::Stop,
            0x08 => ServiceCode::Create,
            0x09 => ServiceCode::Delete,
            0x0A => ServiceCode::MultipleServicePacket,
            0x0D => ServiceCode::ApplyAttributes,
            0x0E => ServiceCode::GetAttributeSingle,
            0x10 => ServiceCode::SetAttributeSingle,
            0x11 => ServiceCode::FindNextObjectInstance,
            0x4E => ServiceCode::ForwardClose,
            0x52 => ServiceCode::UnconnectedSend,
            0x54 => ServiceCode::ForwardOpen,
            0x5B => ServiceCode::LargeForwardOpen,
            other => ServiceCode::Other(other),
        }
    }
}

impl From<ServiceCode> for u8 {
    fn from(service: ServiceCode) -> Self {
        service.code()
    }
}

/// General status codes seen by this client
pub mod general_status {
    pub const SUCCESS: u8 = 0x00;
    pub const CONNECTION_FAILURE: u8 = 0x01;
    pub const RESOURCE_UNAVAILABLE: u8 = 0x02;
    pub const PATH_SEGMENT_ERROR: u8 = 0x04;
    pub const PATH_DESTINATION_UNKNOWN: u8 = 0x05;
    pub const SERVICE_NOT_SUPPORTED: u8 = 0x08;
    pub const ATTRIBUTE_NOT_SUPPORTED: u8 = 0x14;
    pub const OBJECT_DOES_NOT_EXIST: u8 = 0x16;

    /// Short description of a general status code
    pub fn describe(status: u8) -> &'static str {
        match status {
            SUCCESS => "success",
            CONNECTION_FAILURE => "connection failure",
            RESOURCE_UNAVAILABLE => "resource unavailable",
            PATH_SEGMENT_ERROR => "path segment error",
            PATH_DESTINATION_UNKNOWN => "path destination unknown",
            SERVICE_NOT_SUPPORTED => "service not supported",
            ATTRIBUTE_NOT_SUPPORTED => "attribute not supported",
            OBJECT_DOES_NOT_EXIST => "object does not exist",
            _ => "unknown status",
        }
    }
}
