//! Protocol errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::LineFault;

/// Errors reported for a command sent to the oven controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Operation attempted while the link is closed
    #[error("No open connection")]
    NotOpen,

    /// Response checksum did not match its data
    #[error("Checksum mismatched: expected {expected:#04x}, got {actual:#04x}")]
    #[allow(missing_docs)]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// No complete response before the deadline
    #[error("No complete response within {timeout_ms}ms ({received} bytes received)")]
    #[allow(missing_docs)]
    ResponseTimeout { timeout_ms: u64, received: usize },

    /// Line-level fault reported by the transport
    #[error("Transport fault ({fault}): {message}")]
    #[allow(missing_docs)]
    TransportFault { fault: LineFault, message: String },

    /// Request value cannot be encoded
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Coarse classification of a [`ProtocolError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Operation attempted while the link is closed
    NotOpen,
    /// Response received but the integrity check failed
    ChecksumMismatch,
    /// No (or only a partial) response within the timeout interval
    ResponseTimeout,
    /// Line-level fault reported by the transport
    TransportFault,
    /// Request value cannot be encoded as a payload
    InvalidPayload,
}

impl ProtocolError {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::NotOpen => ErrorKind::NotOpen,
            ProtocolError::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            ProtocolError::ResponseTimeout { .. } => ErrorKind::ResponseTimeout,
            ProtocolError::TransportFault { .. } => ErrorKind::TransportFault,
            ProtocolError::InvalidPayload(_) => ErrorKind::InvalidPayload,
        }
    }

    /// Whether this error requires the link to be closed
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProtocolError::TransportFault { fault, .. } if fault.is_fatal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ProtocolError::NotOpen.to_string(), "No open connection");

        let err = ProtocolError::ChecksumMismatch {
            expected: 0xfb,
            actual: 0x0a,
        };
        assert_eq!(
            err.to_string(),
            "Checksum mismatched: expected 0xfb, got 0x0a"
        );
    }

    #[test]
    fn test_error_kind() {
        let err = ProtocolError::ResponseTimeout {
            timeout_ms: 1000,
            received: 3,
        };
        assert_eq!(err.kind(), ErrorKind::ResponseTimeout);
        assert!(err.to_string().contains("3 bytes"));
    }

    #[test]
    fn test_fatal_only_for_fatal_faults() {
        let resource = ProtocolError::TransportFault {
            fault: LineFault::Resource,
            message: "device unplugged".into(),
        };
        let parity = ProtocolError::TransportFault {
            fault: LineFault::Parity,
            message: "parity error".into(),
        };
        assert!(resource.is_fatal());
        assert!(!parity.is_fatal());
        assert!(!ProtocolError::NotOpen.is_fatal());
    }
}
