//! CIP object models for the EtherNet/IP client stack
//!
//! Objects are read with explicit messaging through a
//! [`CipMessenger`](enip_cip::CipMessenger).
//!
//! - [x] Device Level Ring object (class 0x47)

pub mod dlr;
pub mod error;

pub use dlr::{
    DlrInstance, DlrNode, DlrObject, NetworkStatus, NetworkTopology, RedundantGatewayConfig,
    RingSupervisorConfig, DLR_CLASS_ID,
};
pub use error::{EnipError, EnipResult};
