//! Streaming RESP Protocol Parser
//!
//! This module implements an incremental, resumable parser for RESP.
//! Bytes are appended to the parser's own buffer as they arrive from the
//! socket, in chunks of any size, and complete values are pulled out one at
//! a time.
//!
//! ## Design Philosophy
//!
//! 1. **Incremental**: Partial frames are kept across calls. A line that is
//!    still missing its CRLF is never rescanned from the start, and array
//!    elements that are already decoded are never decoded again.
//! 2. **Zero-Copy**: Bulk string payloads are split off the read buffer as
//!    `Bytes`, without copying.
//! 3. **Bounded**: Line length, bulk length, array length and nesting depth
//!    are all capped by [`ParserLimits`]. Nested arrays are tracked on an
//!    explicit stack, not on the call stack.
//!
//! ## How the Parser Works
//!
//! [`RespParser::next_value`] returns either:
//! - `Ok(Some(value))` - A complete value was decoded and its bytes consumed
//! - `Ok(None)` - Need more data, the partial frame is kept
//! - `Err(ParseError)` - Invalid protocol data
//!
//! After an error the parser stays failed and reports the same error on
//! every call: RESP has no resynchronisation point, so the connection is
//! expected to reply with an error and close.

use crate::protocol::number::parse_i64;
use crate::protocol::types::{prefix, Line, RespValue, CRLF};
use bytes::{Buf, BytesMut};
use memchr::memchr2;
use thiserror::Error;

/// Errors that can occur during RESP parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Invalid integer, length or count field
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a simple string or error message
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Bulk string length is negative (but not -1 for null)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for null)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// Protocol violation (bare CR or LF, missing CRLF after a payload)
    #[error("protocol error: {0}")]
    ProtocolError(&'static str),

    /// A CRLF-terminated line is longer than allowed
    #[error("line too long (max: {max} bytes)")]
    LineTooLong { max: usize },

    /// The bulk string exceeds maximum allowed size
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: u64, max: usize },

    /// The array has more elements than allowed
    #[error("array too large: {count} elements (max: {max})")]
    ArrayTooLarge { count: u64, max: usize },

    /// Arrays are nested deeper than allowed
    #[error("maximum nesting depth exceeded: {0}")]
    NestingTooDeep(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Default maximum length of a single CRLF-terminated line (64 KB)
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Default maximum number of elements in one array
pub const MAX_ARRAY_LENGTH: usize = 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_NESTING_DEPTH: usize = 32;

/// Element vectors are never pre-allocated beyond this, whatever count the
/// peer announces.
const MAX_PREALLOCATED_ELEMENTS: usize = 1024;

/// Resource limits applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    /// Longest accepted simple string, error, integer or length line,
    /// excluding the CRLF
    pub max_line_length: usize,
    /// Largest accepted bulk string payload
    pub max_bulk_length: usize,
    /// Largest accepted array element count
    pub max_array_length: usize,
    /// Deepest accepted array nesting (a flat array has depth 1)
    pub max_depth: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_line_length: MAX_LINE_LENGTH,
            max_bulk_length: MAX_BULK_SIZE,
            max_array_length: MAX_ARRAY_LENGTH,
            max_depth: MAX_NESTING_DEPTH,
        }
    }
}

/// What the line being read will become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    SimpleString,
    Error,
    Integer,
    BulkLength,
    ArrayLength,
}

impl LineKind {
    fn from_prefix(byte: u8) -> Option<Self> {
        match byte {
            prefix::SIMPLE_STRING => Some(LineKind::SimpleString),
            prefix::ERROR => Some(LineKind::Error),
            prefix::INTEGER => Some(LineKind::Integer),
            prefix::BULK_STRING => Some(LineKind::BulkLength),
            prefix::ARRAY => Some(LineKind::ArrayLength),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    /// Waiting for a type prefix byte
    #[default]
    Prefix,
    /// Prefix consumed, waiting for the CRLF that ends the line.
    /// `scanned` bytes of the buffer are known to hold no CR or LF.
    Line { kind: LineKind, scanned: usize },
    /// Length line consumed, waiting for `len` payload bytes plus CRLF
    Payload { len: usize },
}

/// An array whose header is decoded but whose elements are still arriving.
#[derive(Debug)]
struct PendingArray {
    remaining: usize,
    elements: Vec<RespValue>,
}

/// A streaming RESP protocol parser.
///
/// One parser belongs to one connection. It owns the connection's read
/// buffer so partial frames survive between reads.
///
/// # Example
///
/// ```
/// use flashresp::protocol::parser::RespParser;
/// use flashresp::protocol::types::RespValue;
/// use bytes::Bytes;
///
/// let mut parser = RespParser::new();
///
/// assert!(parser.feed(b"*2\r\n$3\r\nfo").unwrap().is_empty());
/// let values = parser.feed(b"o\r\n$3\r\nbar\r\n").unwrap();
///
/// assert_eq!(
///     values,
///     vec![RespValue::array(vec![
///         RespValue::bulk_string(Bytes::from("foo")),
///         RespValue::bulk_string(Bytes::from("bar")),
///     ])]
/// );
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    /// Bytes received but not yet consumed
    buffer: BytesMut,

    /// Progress through the current item
    state: State,

    /// Open arrays, outermost first
    stack: Vec<PendingArray>,

    limits: ParserLimits,

    /// Set once a protocol error has been seen
    failed: Option<ParseError>,
}

impl RespParser {
    /// Creates a new parser instance with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser that enforces `limits`.
    pub fn with_limits(limits: ParserLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> &ParserLimits {
        &self.limits
    }

    /// Appends `data` and decodes every value it completes.
    ///
    /// An empty vector means more bytes are needed. If a protocol error is
    /// hit, values decoded earlier in the same call are dropped with the
    /// rest of the connection state; use [`RespParser::next_value`] to
    /// answer those first.
    pub fn feed(&mut self, data: &[u8]) -> ParseResult<Vec<RespValue>> {
        self.buffer.extend_from_slice(data);
        let mut values = Vec::new();
        while let Some(value) = self.next_value()? {
            values.push(value);
        }
        Ok(values)
    }

    /// The read buffer, for reading straight from a socket with
    /// `read_buf`. Only append to it.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Number of received bytes not yet consumed.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if part of a value has been received but not all of it.
    pub fn is_mid_frame(&self) -> bool {
        !self.buffer.is_empty() || self.state != State::Prefix || !self.stack.is_empty()
    }

    /// Returns true once a protocol error has been reported.
    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }

    /// Discards all buffered bytes, partial frames and any failure.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = State::Prefix;
        self.stack.clear();
        self.failed = None;
    }

    /// Attempts to decode the next complete value from the buffer.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(value))` - Successfully parsed a value
    /// - `Ok(None)` - Incomplete data, need more bytes
    /// - `Err(e)` - Parse error; the parser stays failed
    pub fn next_value(&mut self) -> ParseResult<Option<RespValue>> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        match self.advance() {
            Ok(value) => Ok(value),
            Err(err) => {
                self.buffer.clear();
                self.stack.clear();
                self.state = State::Prefix;
                self.failed = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Runs the state machine until a top-level value completes or the
    /// buffer runs dry.
    fn advance(&mut self) -> ParseResult<Option<RespValue>> {
        loop {
            let value = match self.state {
                State::Prefix => {
                    let Some(&byte) = self.buffer.first() else {
                        return Ok(None);
                    };
                    let kind = LineKind::from_prefix(byte).ok_or(ParseError::UnknownPrefix(byte))?;
                    self.buffer.advance(1);
                    self.state = State::Line { kind, scanned: 0 };
                    continue;
                }
                State::Line { kind, scanned } => {
                    let Some(line) = self.take_line(scanned)? else {
                        return Ok(None);
                    };
                    match self.decode_line(kind, line)? {
                        Some(value) => value,
                        // A bulk payload or array elements follow
                        None => continue,
                    }
                }
                State::Payload { len } => match self.take_payload(len)? {
                    Some(value) => value,
                    None => return Ok(None),
                },
            };

            self.state = State::Prefix;
            if let Some(complete) = self.complete(value) {
                return Ok(Some(complete));
            }
        }
    }

    /// Splits off the line ending at the next CRLF, without the CRLF.
    fn take_line(&mut self, scanned: usize) -> ParseResult<Option<BytesMut>> {
        let max = self.limits.max_line_length;

        let Some(offset) = memchr2(b'\r', b'\n', &self.buffer[scanned..]) else {
            if self.buffer.len() > max {
                return Err(ParseError::LineTooLong { max });
            }
            self.remember_scan(self.buffer.len());
            return Ok(None);
        };

        let pos = scanned + offset;
        if pos > max {
            return Err(ParseError::LineTooLong { max });
        }
        if self.buffer[pos] == b'\n' {
            return Err(ParseError::ProtocolError("unexpected LF in line"));
        }

        match self.buffer.get(pos + 1) {
            Some(b'\n') => {
                let line = self.buffer.split_to(pos);
                self.buffer.advance(CRLF.len());
                Ok(Some(line))
            }
            Some(_) => Err(ParseError::ProtocolError("unexpected CR in line")),
            None => {
                // The LF may be in the next read
                self.remember_scan(pos);
                Ok(None)
            }
        }
    }

    fn remember_scan(&mut self, upto: usize) {
        if let State::Line { scanned, .. } = &mut self.state {
            *scanned = upto;
        }
    }

    /// Turns a complete line into a value, or moves on to the payload or
    /// elements it announces (returning `None`).
    fn decode_line(&mut self, kind: LineKind, line: BytesMut) -> ParseResult<Option<RespValue>> {
        match kind {
            LineKind::SimpleString => {
                let text = String::from_utf8(line.to_vec())
                    .map_err(|_| ParseError::InvalidUtf8("simple string"))?;
                Ok(Some(RespValue::SimpleString(Line::from_wire(text))))
            }
            LineKind::Error => {
                let text = String::from_utf8(line.to_vec())
                    .map_err(|_| ParseError::InvalidUtf8("error message"))?;
                Ok(Some(RespValue::Error(Line::from_wire(text))))
            }
            LineKind::Integer => Ok(Some(RespValue::Integer(decode_integer(&line)?))),
            LineKind::BulkLength => {
                let length = decode_integer(&line)?;

                // Handle null bulk string
                if length == -1 {
                    return Ok(Some(RespValue::BulkString(None)));
                }
                if length < 0 {
                    return Err(ParseError::InvalidBulkLength(length));
                }

                let max = self.limits.max_bulk_length;
                if length as u64 > max as u64 {
                    return Err(ParseError::MessageTooLarge {
                        size: length as u64,
                        max,
                    });
                }

                self.state = State::Payload {
                    len: length as usize,
                };
                Ok(None)
            }
            LineKind::ArrayLength => {
                let count = decode_integer(&line)?;

                if self.stack.len() >= self.limits.max_depth {
                    return Err(ParseError::NestingTooDeep(self.limits.max_depth));
                }

                // Handle null array
                if count == -1 {
                    return Ok(Some(RespValue::Array(None)));
                }
                if count < 0 {
                    return Err(ParseError::InvalidArrayLength(count));
                }

                let max = self.limits.max_array_length;
                if count as u64 > max as u64 {
                    return Err(ParseError::ArrayTooLarge {
                        count: count as u64,
                        max,
                    });
                }

                let count = count as usize;
                if count == 0 {
                    return Ok(Some(RespValue::Array(Some(Vec::new()))));
                }

                self.stack.push(PendingArray {
                    remaining: count,
                    elements: Vec::with_capacity(count.min(MAX_PREALLOCATED_ELEMENTS)),
                });
                self.state = State::Prefix;
                Ok(None)
            }
        }
    }

    /// Splits off a `len`-byte bulk payload once it and its CRLF are buffered.
    fn take_payload(&mut self, len: usize) -> ParseResult<Option<RespValue>> {
        // Fail on a wrong terminator as soon as its first byte shows up
        if self.buffer.len() > len && self.buffer[len] != b'\r' {
            return Err(ParseError::ProtocolError("bulk string missing trailing CRLF"));
        }

        let total_needed = len + CRLF.len();
        if self.buffer.len() < total_needed {
            return Ok(None);
        }

        if &self.buffer[len..total_needed] != CRLF {
            return Err(ParseError::ProtocolError("bulk string missing trailing CRLF"));
        }

        let data = self.buffer.split_to(len).freeze();
        self.buffer.advance(CRLF.len());
        Ok(Some(RespValue::BulkString(Some(data))))
    }

    /// Adds a finished value to the innermost open array, closing every
    /// array it completes. Returns the top-level value once there is one.
    fn complete(&mut self, mut value: RespValue) -> Option<RespValue> {
        while let Some(mut top) = self.stack.pop() {
            top.elements.push(value);
            top.remaining -= 1;
            if top.remaining > 0 {
                self.stack.push(top);
                return None;
            }
            value = RespValue::Array(Some(top.elements));
        }
        Some(value)
    }
}

fn decode_integer(line: &[u8]) -> ParseResult<i64> {
    parse_i64(line).ok_or_else(|| ParseError::InvalidInteger(String::from_utf8_lossy(line).into_owned()))
}

/// Helper function to parse a single RESP message from bytes.
///
/// Returns the value and the number of bytes it occupied, or `None` if
/// `buf` does not yet hold a complete value.
pub fn parse_message(buf: &[u8]) -> ParseResult<Option<(RespValue, usize)>> {
    let mut parser = RespParser::new();
    parser.buffer.extend_from_slice(buf);
    let value = parser.next_value()?;
    Ok(value.map(|value| (value, buf.len() - parser.buffered_len())))
}
