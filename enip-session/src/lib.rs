//! Session layer for the EtherNet/IP client stack
//!
//! This crate implements the encapsulation session: frame codecs, stream
//! reassembly, session registration, request/reply correlation and the
//! worker task that owns the sockets.
//!
//! ## Encapsulation
//! - [x] 24 byte header and command-specific data
//! - [x] RegisterSession / UnRegisterSession / NOP / SendRRData / SendUnitData builders
//! - [x] Stream reassembly across partial reads
//! - [x] Implicit I/O datagram decoding (sequenced address items)
//!
//! ## Session
//! - [x] Registration with timeout and rejection handling
//! - [x] Keep-alive NOPs after idle periods
//! - [x] Response identifier allocation with reserved contexts
//! - [x] Correlation of replies to waiters with per-wait timeouts
//! - [x] Bounded outbound queues with backpressure
//! - [x] Session statistics

pub mod assembler;
pub mod config;
pub mod correlator;
pub mod dispatcher;
pub mod encapsulation;
pub mod error;
pub mod identifiers;
pub mod originator;
pub mod packet;
pub mod queue;
pub mod state;
pub mod statistics;
pub mod transport;
mod worker;

pub use assembler::FrameAssembler;
pub use config::SessionConfig;
pub use correlator::{Correlator, PendingReply};
pub use dispatcher::{route, Route};
pub use encapsulation::{Command, CommandSpecific, EncapsulationHeader, ENCAPSULATION_HEADER_LENGTH};
pub use error::{EnipError, EnipResult};
pub use identifiers::{
    connected_response_id, ResponseIdAllocator, FIRST_RESPONSE_ID, IGNORING_CONTEXT,
    INTERNAL_CONTEXT,
};
pub use originator::Originator;
pub use packet::TransportPacket;
pub use queue::{outbound_queue, OutboundQueue, OutboundReceiver};
pub use state::SessionState;
pub use statistics::SessionStatistics;
pub use transport::EncapsulationTransport;
