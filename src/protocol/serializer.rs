//! RESP Serializer
//!
//! Renders a [`RespValue`] into its exact wire bytes. Serialization cannot
//! fail: simple strings and errors are [`Line`](crate::protocol::types::Line)s,
//! which never contain CR or LF, and every other variant is length-prefixed.
//!
//! The output of [`serialize`] is always accepted by
//! [`RespParser`](crate::protocol::parser::RespParser) and decodes back to an
//! equal value.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::BufMut;

/// Serializes `value` into a fresh buffer.
pub fn serialize(value: &RespValue) -> Vec<u8> {
    let mut buf = Vec::with_capacity(serialized_len(value));
    serialize_into(value, &mut buf);
    buf
}

/// Appends the wire form of `value` to `buf`.
pub fn serialize_into<B: BufMut>(value: &RespValue, buf: &mut B) {
    match value {
        RespValue::SimpleString(s) => {
            buf.put_u8(prefix::SIMPLE_STRING);
            buf.put_slice(s.as_bytes());
            buf.put_slice(CRLF);
        }
        RespValue::Error(s) => {
            buf.put_u8(prefix::ERROR);
            buf.put_slice(s.as_bytes());
            buf.put_slice(CRLF);
        }
        RespValue::Integer(n) => {
            buf.put_u8(prefix::INTEGER);
            buf.put_slice(n.to_string().as_bytes());
            buf.put_slice(CRLF);
        }
        RespValue::BulkString(None) => {
            buf.put_u8(prefix::BULK_STRING);
            buf.put_slice(b"-1");
            buf.put_slice(CRLF);
        }
        RespValue::BulkString(Some(data)) => {
            buf.put_u8(prefix::BULK_STRING);
            buf.put_slice(data.len().to_string().as_bytes());
            buf.put_slice(CRLF);
            buf.put_slice(data);
            buf.put_slice(CRLF);
        }
        RespValue::Array(None) => {
            buf.put_u8(prefix::ARRAY);
            buf.put_slice(b"-1");
            buf.put_slice(CRLF);
        }
        RespValue::Array(Some(values)) => {
            buf.put_u8(prefix::ARRAY);
            buf.put_slice(values.len().to_string().as_bytes());
            buf.put_slice(CRLF);
            for value in values {
                serialize_into(value, buf);
            }
        }
    }
}

/// Exact number of bytes [`serialize_into`] will write for `value`.
pub fn serialized_len(value: &RespValue) -> usize {
    match value {
        RespValue::SimpleString(s) | RespValue::Error(s) => 1 + s.len() + 2,
        RespValue::Integer(n) => 1 + decimal_len(*n) + 2,
        RespValue::BulkString(None) | RespValue::Array(None) => 5,
        RespValue::BulkString(Some(data)) => {
            1 + decimal_len(data.len() as i64) + 2 + data.len() + 2
        }
        RespValue::Array(Some(values)) => {
            1 + decimal_len(values.len() as i64) + 2 + values.iter().map(serialized_len).sum::<usize>()
        }
    }
}

fn decimal_len(n: i64) -> usize {
    let sign = usize::from(n < 0);
    let mut magnitude = n.unsigned_abs();
    let mut digits = 1;
    while magnitude >= 10 {
        magnitude /= 10;
        digits += 1;
    }
    sign + digits
}
