//! # Transport Layer
//!
//! Per-socket connection state machines: handshake, then the framed
//! read/write pipelines that move [`crate::core::message::Message`]s in
//! and out of a TCP stream.

pub mod connection;
