//! Tokio codec implementing the wire format: an 8-byte header (`u32` tag,
//! `u32` total size) followed by `size - 8` body bytes. Host byte order
//! throughout, matching the framing contract.
//!
//! The decoder validates the header before allocating: a claimed size
//! smaller than the header is an [`WireError::InvalidHeader`], a body
//! larger than the configured maximum is an
//! [`WireError::OversizedMessage`], and a tag outside the application's
//! closed enumeration is an [`WireError::UnknownMessageId`]. Any of these
//! tears down the connection that produced it.

use std::marker::PhantomData;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::MAX_PAYLOAD_SIZE;
use crate::core::message::{Message, MessageKind, HEADER_LEN};
use crate::error::WireError;

/// Codec for [`Message`] frames over a byte stream.
pub struct MessageCodec<T> {
    max_payload: usize,
    _kind: PhantomData<T>,
}

impl<T> MessageCodec<T> {
    /// Creates a codec enforcing the given maximum body size.
    pub fn new(max_payload: usize) -> Self {
        Self {
            max_payload,
            _kind: PhantomData,
        }
    }
}

impl<T> Default for MessageCodec<T> {
    fn default() -> Self {
        Self::new(MAX_PAYLOAD_SIZE)
    }
}

impl<T: MessageKind> Decoder for MessageCodec<T> {
    type Item = Message<T>;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            src.reserve(HEADER_LEN - src.len());
            return Ok(None);
        }

        // Peek the header without consuming it; the frame may still be
        // arriving.
        let mut peek = &src[..HEADER_LEN];
        let raw_id = peek.get_u32_ne();
        let total = peek.get_u32_ne() as usize;

        if total < HEADER_LEN {
            return Err(WireError::InvalidHeader);
        }

        let body_len = total - HEADER_LEN;
        if body_len > self.max_payload {
            return Err(WireError::OversizedMessage(total));
        }

        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let body = src.split_to(body_len).to_vec();

        let id = T::from_wire(raw_id).ok_or(WireError::UnknownMessageId(raw_id))?;
        Ok(Some(Message::from_parts(id, body)))
    }
}

impl<T: MessageKind> Encoder<Message<T>> for MessageCodec<T> {
    type Error = WireError;

    fn encode(&mut self, msg: Message<T>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let total = msg.size();
        if total - HEADER_LEN > self.max_payload {
            return Err(WireError::OversizedMessage(total));
        }

        dst.reserve(total);
        dst.put_u32_ne(msg.header.id.to_wire());
        dst.put_u32_ne(total as u32);
        dst.put_slice(msg.body());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Tag {
        Ping,
        Data,
    }

    impl MessageKind for Tag {
        fn to_wire(self) -> u32 {
            match self {
                Tag::Ping => 0,
                Tag::Data => 1,
            }
        }

        fn from_wire(raw: u32) -> Option<Self> {
            match raw {
                0 => Some(Tag::Ping),
                1 => Some(Tag::Data),
                _ => None,
            }
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut msg = Message::new(Tag::Data);
        msg.push(0xDEAD_BEEFu32).push(3.25f32);

        let mut codec = MessageCodec::<Tag>::default();
        let mut buf = BytesMut::new();
        codec.encode(msg.clone(), &mut buf).expect("encode");

        let decoded = codec
            .decode(&mut buf)
            .expect("decode")
            .expect("complete frame");
        assert_eq!(decoded, msg);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_full_frame() {
        let mut msg = Message::new(Tag::Data);
        msg.push([7u8; 16]);

        let mut codec = MessageCodec::<Tag>::default();
        let mut full = BytesMut::new();
        codec.encode(msg.clone(), &mut full).expect("encode");

        // Feed the frame one byte at a time; only the final byte completes
        // the message.
        let mut partial = BytesMut::new();
        let last = full.len() - 1;
        for (i, byte) in full.iter().enumerate() {
            partial.put_u8(*byte);
            let result = codec.decode(&mut partial).expect("decode");
            if i < last {
                assert!(result.is_none(), "frame completed early at byte {i}");
            } else {
                assert_eq!(result.expect("final byte completes frame"), msg);
            }
        }
    }

    #[test]
    fn empty_body_round_trips() {
        let msg = Message::new(Tag::Ping);

        let mut codec = MessageCodec::<Tag>::default();
        let mut buf = BytesMut::new();
        codec.encode(msg.clone(), &mut buf).expect("encode");
        assert_eq!(buf.len(), HEADER_LEN);

        let decoded = codec
            .decode(&mut buf)
            .expect("decode")
            .expect("complete frame");
        assert_eq!(decoded, msg);
        assert!(decoded.is_empty());
    }

    #[test]
    fn undersized_header_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_ne(0); // Ping
        buf.put_u32_ne(4); // claims total smaller than the header itself

        let mut codec = MessageCodec::<Tag>::default();
        let err = codec.decode(&mut buf).expect_err("size < header");
        assert!(matches!(err, WireError::InvalidHeader));
    }

    #[test]
    fn oversized_claim_is_rejected_before_allocation() {
        let mut buf = BytesMut::new();
        buf.put_u32_ne(1);
        buf.put_u32_ne((MAX_PAYLOAD_SIZE + HEADER_LEN + 1) as u32);

        let mut codec = MessageCodec::<Tag>::default();
        let err = codec.decode(&mut buf).expect_err("oversized claim");
        assert!(matches!(err, WireError::OversizedMessage(_)));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_ne(99);
        buf.put_u32_ne(HEADER_LEN as u32);

        let mut codec = MessageCodec::<Tag>::default();
        let err = codec.decode(&mut buf).expect_err("unknown tag");
        assert!(matches!(err, WireError::UnknownMessageId(99)));
    }
}
