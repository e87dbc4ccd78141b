//! # Core Wire Components
//!
//! Message framing and the codec that moves frames over byte streams.
//!
//! ## Components
//! - **Message**: tagged binary message with a stack-like payload
//! - **Codec**: tokio codec for framing messages over byte streams
//!
//! ## Wire Format
//! ```text
//! [Id(4)] [Size(4)] [Body(Size - 8)]
//! ```
//!
//! `Size` is the total encoded size including the 8-byte header. All
//! integers are host byte order - peers on heterogeneous architectures are
//! not supported, a documented limitation of the protocol.
//!
//! ## Safety
//! - Body length is validated against a maximum before allocation
//! - `Size` values smaller than the header are rejected outright

pub mod codec;
pub mod message;
