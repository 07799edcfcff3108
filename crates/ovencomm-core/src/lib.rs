//! # OvenComm Core Library
//!
//! Core functionality for driving oven temperature controllers over a serial link.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Request/response frame encoding with sum-of-bytes checksums
//! - A FIFO command queue with at most one request in flight
//! - The dispatch/timeout state machine that drives the link
//! - A serial port transport and a simulated oven for testing
//! - Typed interpretation of controller readings
//!
//! ## Example
//!
//! ```rust,ignore
//! use ovencomm_core::protocol::{OvenConnection, PortConfig, SerialTransport};
//!
//! let (mut conn, mut events) = OvenConnection::new(SerialTransport::new(), Default::default());
//! conn.open(&PortConfig::new("/dev/ttyUSB0", 9600))?;
//! conn.read_temperature();
//!
//! loop {
//!     conn.service(std::time::Instant::now());
//!     while let Ok(event) = events.try_recv() {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

pub mod config;
pub mod demo;
pub mod protocol;
pub mod values;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::OvenConfig;
    pub use crate::demo::DemoOven;
    pub use crate::protocol::{
        Command, ErrorKind, LineFault, OvenConnection, OvenEvent, PortConfig, ProtocolError,
        SerialTransport, Transport,
    };
    pub use crate::values::Reading;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
