//! Wire format between the client and an agent.
//!
//! The client sends any non-empty payload; its content is ignored.
//! The agent answers every read with its value as a 4-byte big-endian
//! unsigned integer, as many times as it is asked on one connection.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::{QUERY_TRIGGER, REPLY_LEN};

/// Encode an agent value as the reply frame.
pub fn encode_reply(value: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(REPLY_LEN);
    buf.put_u32(value);
    buf.freeze()
}

/// Decode a reply frame. Returns `None` unless exactly `REPLY_LEN`
/// bytes are given.
pub fn decode_reply(mut frame: &[u8]) -> Option<u32> {
    if frame.len() != REPLY_LEN {
        return None;
    }
    Some(frame.get_u32())
}

/// The payload a client sends to ask for a value.
pub fn query() -> Bytes {
    Bytes::from_static(QUERY_TRIGGER)
}
