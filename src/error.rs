//! # Error Types
//!
//! Error handling for the messaging core.
//!
//! This module defines all error variants that can occur across the wire
//! path, from low-level I/O failures to framing and handshake violations.
//!
//! ## Error Categories
//! - **I/O Errors**: socket and resolver failures
//! - **Framing Errors**: invalid headers, oversized messages, unknown tags
//! - **Payload Errors**: reading past the end of a message body
//! - **Handshake Errors**: challenge/response mismatches
//!
//! All errors implement `std::error::Error` for interoperability. The core
//! never terminates the process on its own initiative; every failure is
//! either returned to the caller or logged and resolved by closing the
//! affected connection.

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
/// Static strings are borrowed, avoiding heap allocations for common cases.
pub mod constants {
    /// Handshake errors
    pub const ERR_VALIDATION_MISMATCH: &str = "handshake response did not match expected value";

    /// Configuration errors
    pub const ERR_BAD_ADDRESS: &str = "address could not be resolved";
}

/// Primary error type for all messaging operations.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid message header")]
    InvalidHeader,

    #[error("message too large: {0} bytes")]
    OversizedMessage(usize),

    #[error("unknown message id tag: {0}")]
    UnknownMessageId(u32),

    #[error("payload underflow: requested {requested} bytes, body holds {available}")]
    PayloadUnderflow { requested: usize, available: usize },

    #[error("handshake failed: {0}")]
    HandshakeError(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using `WireError`.
pub type Result<T> = std::result::Result<T, WireError>;
