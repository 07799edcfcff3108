//! Serial Protocol Communication
//!
//! Implements the oven controller's ASCII command/response protocol.
//!
//! Requests are `*CCDDDDKK\r` and responses are `*DDDDKK^`, both protected by
//! an 8-bit sum-of-bytes checksum. Only one request is ever on the wire.

pub mod commands;
mod connection;
mod dispatcher;
mod error;
pub mod frame;
mod queue;
pub mod serial;
mod timeout;
mod transport;

pub use commands::Command;
pub use connection::{ConnectionSettings, EventReceiver, OvenConnection};
pub use dispatcher::{DispatchState, Dispatched, Dispatcher, OvenEvent};
pub use error::{ErrorKind, ProtocolError};
pub use frame::{Decoded, ResponseFrame};
pub use queue::{CommandQueue, PendingRequest};
pub use serial::{list_ports, FlowControl, Parity, PortConfig, PortInfo, SerialTransport, StopBits};
pub use timeout::TimeoutSupervisor;
pub use transport::{LineFault, Transport, TransportError};

/// Default baud rate for oven controllers
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default timeout for responses in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default interval between dispatch ticks in milliseconds
pub const DEFAULT_DISPATCH_INTERVAL_MS: u64 = 50;

/// Size of an encoded request frame
pub const REQUEST_FRAME_LEN: usize = 10;

/// Size of an encoded response frame
pub const RESPONSE_FRAME_LEN: usize = 8;
