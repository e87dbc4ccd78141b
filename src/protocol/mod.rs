//! # Protocol Components
//!
//! Connection validation: the challenge/response handshake exchanged
//! before any framed traffic flows.

pub mod handshake;
