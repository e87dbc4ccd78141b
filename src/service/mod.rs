//! # Endpoint Services
//!
//! The two endpoint flavors an application instantiates:
//!
//! - **Client**: owns one connection and the background thread running its
//!   I/O event loop.
//! - **Server**: accepts many connections, multiplexes unicast/broadcast
//!   sends, and dispatches inbound messages to application policy from
//!   `update()`.
//!
//! Both endpoints expose a pull model: completed messages accumulate in a
//! thread-safe queue and application code drains them on its own schedule.
//! No application callback ever runs on the I/O thread except the server's
//! connect/validated accept-time policy hooks.

pub mod client;
pub mod server;
