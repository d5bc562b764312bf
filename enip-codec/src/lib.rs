//! Binary codecs for the EtherNet/IP client stack
//!
//! - [`ByteReader`]: bounds-checked little-endian field reader
//! - [`ItemList`]: common packet format (CPF) item list carried inside
//!   SendRRData/SendUnitData and implicit I/O datagrams
//! - [`EPath`]: CIP path segment encoder used for class/instance/attribute addressing

pub mod error;
pub mod reader;
pub mod item_list;
pub mod epath;

pub use error::{EnipError, EnipResult};
pub use reader::ByteReader;
pub use item_list::{Item, ItemList, ItemType, ITEM_LIST_HEADER_LENGTH};
pub use epath::{EPath, LogicalFormat, LogicalType, PathSegment, SegmentType};
