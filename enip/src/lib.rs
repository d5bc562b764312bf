//! EtherNet/IP client stack
//!
//! Originator side of the EtherNet/IP encapsulation protocol with CIP
//! explicit messaging on top.
//!
//! # Architecture
//!
//! - `enip-core`: error type shared by all layers
//! - `enip-codec`: little-endian reader, common packet format item lists, EPATH segments
//! - `enip-transport`: TCP and UDP socket setup
//! - `enip-session`: encapsulation frames, session registration, the I/O worker
//!   and reply correlation
//! - `enip-cip`: Message Router requests, forward open, connected messaging
//! - `enip-interface`: CIP object models (Device Level Ring)
//! - `enip-client`: connection builder and lifecycle
//!
//! # Usage
//!
//! ```no_run
//! use enip::client::{ClientBuilder, Connection};
//!
//! # async fn run() -> enip::EnipResult<()> {
//! let mut client = ClientBuilder::new().target([192, 168, 1, 20]).build()?;
//! client.open().await?;
//! let identity = client.get_attribute_all(0x01, 0x01).await?;
//! println!("{:?}", identity.data);
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

pub use enip_core::{EnipError, EnipResult};

pub mod codec {
    pub use enip_codec::*;
}

pub mod transport {
    pub use enip_transport::*;
}

pub mod session {
    pub use enip_session::*;
}

pub mod cip {
    pub use enip_cip::*;
}

pub mod interface {
    pub use enip_interface::*;
}

pub mod client {
    pub use enip_client::*;
}
