//! Error types for the dcshare protocol core
//!
//! This module contains the error types used throughout the core crate: encoding
//! errors (base-32, character sets), protocol errors raised while decoding wire
//! lines and commands, and the `DcError` type that unifies them.
//!
//! Encoding a search result never fails. Only the decoding direction reports
//! errors, since it deals with input received from remote peers.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Errors raised by the base-32 and character-set helpers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("Invalid base32 data: {reason}")]
    InvalidBase32 { reason: String },
    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("Unknown character set: {label}")]
    UnknownCharset { label: String },
}

/// Errors raised while decoding legacy lines or structured commands
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Line does not start with {expected}")]
    BadPrefix { expected: &'static str },
    #[error("Missing field: {field}")]
    MissingField { field: &'static str },
    #[error("Invalid number in field {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Invalid hash: {reason}")]
    InvalidHash { reason: String },
    #[error("Invalid escape sequence: \\{sequence}")]
    InvalidEscape { sequence: char },
    #[error("Unknown command type: {kind:?}")]
    UnknownCommandType { kind: char },
    #[error("Malformed command: {reason}")]
    MalformedCommand { reason: String },
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Core error type for the dcshare protocol
#[derive(Debug, thiserror::Error)]
pub enum DcError {
    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// Timer service error
    #[error("Timer error: {reason}")]
    Timer { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl DcError {
    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        DcError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a timer error with a reason
    pub fn timer_error<T: Into<String>>(reason: T) -> Self {
        DcError::Timer {
            reason: reason.into(),
        }
    }

    /// Create a malformed command error with a reason
    pub fn malformed<T: Into<String>>(reason: T) -> Self {
        DcError::Protocol(ProtocolError::MalformedCommand {
            reason: reason.into(),
        })
    }

    /// Create a missing field error
    pub fn missing_field(field: &'static str) -> Self {
        DcError::Protocol(ProtocolError::MissingField { field })
    }

    /// Create an invalid number error for a named field
    pub fn invalid_number<V: Into<String>>(field: &'static str, value: V) -> Self {
        DcError::Protocol(ProtocolError::InvalidNumber {
            field,
            value: value.into(),
        })
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, DcError>;
pub type DcResult<T> = Result<T>;
