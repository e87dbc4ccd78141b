//! # gamewire
//!
//! Asynchronous framed TCP messaging for multiplayer games and realtime
//! services.
//!
//! The crate frames arbitrary binary messages, multiplexes many concurrent
//! connections through a single I/O thread per endpoint, validates new
//! connections with a symmetric scramble handshake, and hands completed
//! messages to application code through a thread-safe queue. The
//! application drains that queue on its own schedule - a pull model, never
//! a callback storm on the I/O thread.
//!
//! ## Layers
//! - [`core`]: message framing and the wire codec
//! - [`protocol`]: the challenge/response handshake
//! - [`transport`]: per-socket connection state machines
//! - [`service`]: the [`Client`] and [`Server`] endpoints
//! - [`utils`]: the shared thread-safe queue
//!
//! ## Example
//! ```no_run
//! use gamewire::{Client, Message, MessageKind};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Msg {
//!     Ping,
//! }
//!
//! impl MessageKind for Msg {
//!     fn to_wire(self) -> u32 {
//!         0
//!     }
//!     fn from_wire(raw: u32) -> Option<Self> {
//!         (raw == 0).then_some(Msg::Ping)
//!     }
//! }
//!
//! let mut client = Client::<Msg>::new(1.0);
//! client.connect("127.0.0.1", 60000).expect("resolve");
//!
//! let mut msg = Message::new(Msg::Ping);
//! msg.push(42.0f32);
//! let _ = client.send(msg);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::config::NetConfig;
pub use crate::core::message::{Message, MessageHeader, MessageKind, OwnedMessage};
pub use crate::error::{Result, WireError};
pub use crate::protocol::handshake::{NoScramble, Scramble, VersionScramble};
pub use crate::service::client::Client;
pub use crate::service::server::{Server, ServerHandler};
pub use crate::transport::connection::{Connection, Role};
pub use crate::utils::SharedDeque;
