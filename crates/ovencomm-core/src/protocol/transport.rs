//! Transport boundary
//!
//! The protocol engine never touches a serial device directly. It talks to
//! a [`Transport`], which lets the same state machine drive a real port, the
//! simulated oven in [`crate::demo`], or a recording mock in tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

use super::{PortConfig, ProtocolError};

/// Byte-level link to an oven controller
///
/// Every method must return without blocking on the device: `write` hands
/// bytes to the OS and `read_available` returns only bytes already received.
pub trait Transport {
    /// Open the link with the given port settings
    fn open(&mut self, config: &PortConfig) -> Result<(), TransportError>;

    /// Close the link; closing a closed link is a no-op
    fn close(&mut self);

    /// Check whether the link is open
    fn is_open(&self) -> bool;

    /// Write a complete frame
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Return every byte received since the last call (possibly none)
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError>;
}

/// Line-level fault classes reported by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineFault {
    /// Device became unavailable (unplugged, broken pipe)
    Resource,
    /// Device could not be found at open time
    NotFound,
    /// Access to the device was denied
    Permission,
    /// Parity error on the line
    Parity,
    /// Framing error on the line
    Framing,
    /// Low-level read/write timed out
    Timeout,
    /// Writing to the device failed
    Write,
    /// Reading from the device failed
    Read,
    /// Anything else
    Unknown,
}

impl LineFault {
    /// Fatal faults require the link to be closed
    pub fn is_fatal(&self) -> bool {
        matches!(self, LineFault::Resource | LineFault::NotFound)
    }

    /// Classify an I/O error
    pub fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => LineFault::NotFound,
            io::ErrorKind::PermissionDenied => LineFault::Permission,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => LineFault::Timeout,
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset => LineFault::Resource,
            io::ErrorKind::WriteZero => LineFault::Write,
            _ => LineFault::Unknown,
        }
    }
}

impl fmt::Display for LineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LineFault::Resource => "resource",
            LineFault::NotFound => "not found",
            LineFault::Permission => "permission",
            LineFault::Parity => "parity",
            LineFault::Framing => "framing",
            LineFault::Timeout => "timeout",
            LineFault::Write => "write",
            LineFault::Read => "read",
            LineFault::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Errors returned by a [`Transport`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The link is closed
    #[error("Port is not open")]
    NotOpen,

    /// The device or driver reported a fault
    #[error("{fault} fault: {message}")]
    #[allow(missing_docs)]
    Fault { fault: LineFault, message: String },
}

impl TransportError {
    /// Create a fault error
    pub fn fault(fault: LineFault, message: impl Into<String>) -> Self {
        TransportError::Fault {
            fault,
            message: message.into(),
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::fault(LineFault::from_io_kind(err.kind()), err.to_string())
    }
}

impl From<TransportError> for ProtocolError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotOpen => ProtocolError::NotOpen,
            TransportError::Fault { fault, message } => {
                ProtocolError::TransportFault { fault, message }
            }
        }
    }
}
