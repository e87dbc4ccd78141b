//! # Utility Modules
//!
//! Supporting utilities used throughout the messaging core.
//!
//! ## Components
//! - **SharedDeque**: lock-protected double-ended queue with a blocking
//!   wait-for-nonempty, used for outbound per-connection buffering and the
//!   shared inbound message queue.

pub mod shared_deque;

// Re-export the queue for call sites that don't care about the module path
pub use shared_deque::SharedDeque;
