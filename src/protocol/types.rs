//! RESP (Redis Serialization Protocol) Data Types
//!
//! This module defines the value model shared by the parser, the serializer
//! and command handlers.
//!
//! ## Protocol Format
//!
//! Each RESP type starts with a type prefix byte:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Array
//!
//! All lines are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Null Bulk String: `$-1\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$4\r\nname\r\n`
//! Null Array: `*-1\r\n`

use crate::protocol::number::parse_i64;
use bytes::Bytes;
use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;
use thiserror::Error;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// Text rejected by [`Line::new`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line text contains forbidden byte {byte:#04x} at offset {offset}")]
pub struct LineError {
    /// Position of the first CR or LF
    pub offset: usize,
    /// The offending byte (`\r` or `\n`)
    pub byte: u8,
}

/// Single-line text carried by simple strings and errors.
///
/// A `Line` never contains CR or LF, so it can always be framed with a
/// trailing CRLF without corrupting the stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Line(Cow<'static, str>);

impl Line {
    /// Validates `text`, rejecting any CR or LF byte.
    pub fn new(text: impl Into<String>) -> Result<Self, LineError> {
        let text = text.into();
        match text.bytes().position(is_line_break) {
            Some(offset) => Err(LineError {
                offset,
                byte: text.as_bytes()[offset],
            }),
            None => Ok(Line(Cow::Owned(text))),
        }
    }

    /// Builds a line from `text`, replacing every CR and LF with a space.
    pub fn sanitized(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.bytes().any(is_line_break) {
            Line(Cow::Owned(text.replace(|c: char| c == '\r' || c == '\n', " ")))
        } else {
            Line(Cow::Owned(text))
        }
    }

    /// Wraps a string literal. Panics (at compile time in const context) if
    /// the literal contains CR or LF.
    pub const fn from_static(text: &'static str) -> Self {
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\r' || bytes[i] == b'\n' {
                panic!("RESP line text must not contain CR or LF");
            }
            i += 1;
        }
        Line(Cow::Borrowed(text))
    }

    /// The parser only hands over text it has already split on CRLF and
    /// checked for bare CR/LF.
    pub(crate) fn from_wire(text: String) -> Self {
        debug_assert!(!text.bytes().any(is_line_break));
        Line(Cow::Owned(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[inline]
fn is_line_break(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

impl Deref for Line {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Line {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Line {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Line {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl TryFrom<String> for Line {
    type Error = LineError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Line::new(text)
    }
}

impl TryFrom<&str> for Line {
    type Error = LineError;

    fn try_from(text: &str) -> Result<Self, Self::Error> {
        Line::new(text)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a value in the RESP protocol.
///
/// This enum covers all RESP2 data types and is used both for parsing
/// incoming data and for building outgoing responses. Values are immutable
/// once built and are `Send + Sync`, so a parsed command can be handed to
/// another thread as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status text without CR or LF.
    /// Format: `+<string>\r\n`
    SimpleString(Line),

    /// Error text without CR or LF.
    /// Format: `-<error message>\r\n`
    Error(Line),

    /// 64-bit signed integers.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe string, `None` for the null bulk string.
    /// Format: `$<length>\r\n<data>\r\n`, null: `$-1\r\n`
    BulkString(Option<Bytes>),

    /// Ordered elements of any type, `None` for the null array.
    /// Format: `*<count>\r\n<element1><element2>...`, null: `*-1\r\n`
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// `$-1\r\n`
    pub const NULL_BULK_STRING: RespValue = RespValue::BulkString(None);

    /// `*-1\r\n`
    pub const NULL_ARRAY: RespValue = RespValue::Array(None);

    /// `+OK\r\n`
    pub const OK: RespValue = RespValue::SimpleString(Line::from_static("OK"));

    /// `+PONG\r\n`
    pub const PONG: RespValue = RespValue::SimpleString(Line::from_static("PONG"));

    /// `:0\r\n`
    pub const ZERO: RespValue = RespValue::Integer(0);

    /// `:1\r\n`
    pub const ONE: RespValue = RespValue::Integer(1);

    /// Creates a new simple string response. CR and LF are replaced with
    /// spaces.
    ///
    /// # Example
    /// ```
    /// use flashresp::protocol::types::RespValue;
    /// let ok = RespValue::simple_string("OK");
    /// assert_eq!(ok, RespValue::OK);
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(Line::sanitized(s))
    }

    /// Like [`RespValue::simple_string`], but rejects CR and LF instead of
    /// replacing them.
    pub fn try_simple_string(s: impl Into<String>) -> Result<Self, LineError> {
        Line::new(s).map(RespValue::SimpleString)
    }

    /// Creates a new error response. CR and LF are replaced with spaces.
    ///
    /// # Example
    /// ```
    /// use flashresp::protocol::types::RespValue;
    /// let err = RespValue::error("ERR unknown command");
    /// assert!(err.is_error());
    /// ```
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(Line::sanitized(s))
    }

    /// Like [`RespValue::error`], but rejects CR and LF.
    pub fn try_error(s: impl Into<String>) -> Result<Self, LineError> {
        Line::new(s).map(RespValue::Error)
    }

    /// Creates a new integer response.
    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a new (non-null) bulk string response.
    ///
    /// # Example
    /// ```
    /// use flashresp::protocol::types::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.as_bytes(), Some(&b"hello"[..]));
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(Some(data.into()))
    }

    /// Creates a bulk string, or the null bulk string for `None`.
    pub fn nullable_bulk_string<B: Into<Bytes>>(data: Option<B>) -> Self {
        RespValue::BulkString(data.map(Into::into))
    }

    /// Creates a (non-null) array response.
    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(Some(values))
    }

    /// Creates an array, or the null array for `None`.
    pub fn nullable_array(values: Option<Vec<RespValue>>) -> Self {
        RespValue::Array(values)
    }

    /// Serializes the RESP value to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        crate::protocol::serializer::serialize(self)
    }

    /// Serializes the RESP value into an existing buffer.
    ///
    /// This is more efficient than `serialize()` when you want to reuse a buffer.
    pub fn serialize_into<B: bytes::BufMut>(&self, buf: &mut B) {
        crate::protocol::serializer::serialize_into(self, buf)
    }

    /// Returns true for the null bulk string and the null array.
    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::BulkString(None) | RespValue::Array(None))
    }

    /// Returns true if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Text view of the value.
    ///
    /// Simple strings, errors and UTF-8 bulk strings are borrowed; integers
    /// are rendered in base 10. Null bulk strings, non-UTF-8 bulk strings and
    /// arrays have no text form.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            RespValue::SimpleString(s) | RespValue::Error(s) => Some(Cow::Borrowed(s.as_str())),
            RespValue::BulkString(Some(b)) => std::str::from_utf8(b).ok().map(Cow::Borrowed),
            RespValue::Integer(n) => Some(Cow::Owned(n.to_string())),
            RespValue::BulkString(None) | RespValue::Array(_) => None,
        }
    }

    /// Raw payload of simple strings, errors and non-null bulk strings.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::SimpleString(s) | RespValue::Error(s) => Some(s.as_bytes()),
            RespValue::BulkString(Some(b)) => Some(b),
            _ => None,
        }
    }

    /// Integer view of the value.
    ///
    /// Integers are returned as-is. Simple strings and bulk strings are
    /// parsed as a whole: an optional `-` followed by digits, nothing else.
    /// Everything else (including errors) is `None`, which command handlers
    /// report as "value is not an integer or out of range".
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            RespValue::SimpleString(s) => parse_i64(s.as_bytes()),
            RespValue::BulkString(Some(b)) => parse_i64(b),
            _ => None,
        }
    }

    /// Elements of a non-null array.
    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(Some(arr)) => Some(arr),
            _ => None,
        }
    }

    /// Consumes self and returns the elements of a non-null array.
    pub fn into_array(self) -> Option<Vec<RespValue>> {
        match self {
            RespValue::Array(Some(arr)) => Some(arr),
            _ => None,
        }
    }
}

impl From<Line> for RespValue {
    fn from(line: Line) -> Self {
        RespValue::SimpleString(line)
    }
}

impl From<i64> for RespValue {
    fn from(n: i64) -> Self {
        RespValue::Integer(n)
    }
}

impl From<Bytes> for RespValue {
    fn from(data: Bytes) -> Self {
        RespValue::BulkString(Some(data))
    }
}

impl From<Vec<RespValue>> for RespValue {
    fn from(values: Vec<RespValue>) -> Self {
        RespValue::Array(Some(values))
    }
}

/// Diagnostic summary, e.g. `Integer(42)` or `Array(3 items)`. Never used
/// for wire encoding.
impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "SimpleString({})", s),
            RespValue::Error(s) => write!(f, "Error({})", s),
            RespValue::Integer(n) => write!(f, "Integer({})", n),
            RespValue::BulkString(Some(data)) => {
                write!(f, "BulkString({})", String::from_utf8_lossy(data))
            }
            RespValue::BulkString(None) => write!(f, "BulkString(null)"),
            RespValue::Array(Some(values)) if values.len() == 1 => write!(f, "Array(1 item)"),
            RespValue::Array(Some(values)) => write!(f, "Array({} items)", values.len()),
            RespValue::Array(None) => write!(f, "Array(null)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_line_rejects_line_breaks() {
        assert!(Line::new("OK").is_ok());
        assert_eq!(
            Line::new("bad\r\nline"),
            Err(LineError {
                offset: 3,
                byte: b'\r'
            })
        );
        assert_eq!(Line::new("a\nb").unwrap_err().byte, b'\n');
    }

    #[test]
    fn test_line_sanitized() {
        assert_eq!(Line::sanitized("ERR bad\r\nthing"), "ERR bad  thing");
        assert_eq!(Line::sanitized("lone\rcr"), "lone cr");
        assert_eq!(Line::sanitized("clean"), "clean");
    }

    #[test]
    fn test_constructors_sanitize() {
        let value = RespValue::error("ERR oops\ninjected");
        assert_eq!(value, RespValue::Error(Line::from_static("ERR oops injected")));

        assert!(RespValue::try_simple_string("OK\r\n+PWNED").is_err());
        assert!(RespValue::try_error("ERR fine").is_ok());
    }

    #[test]
    fn test_constants() {
        assert_eq!(RespValue::OK, RespValue::simple_string("OK"));
        assert_eq!(RespValue::PONG, RespValue::simple_string("PONG"));
        assert_eq!(RespValue::ZERO, RespValue::integer(0));
        assert_eq!(RespValue::ONE, RespValue::integer(1));
        assert_eq!(RespValue::NULL_BULK_STRING, RespValue::nullable_bulk_string::<Bytes>(None));
        assert_eq!(RespValue::NULL_ARRAY, RespValue::nullable_array(None));
    }

    #[test]
    fn test_null_distinct_from_empty() {
        assert_ne!(RespValue::NULL_BULK_STRING, RespValue::bulk_string(Bytes::new()));
        assert_ne!(RespValue::NULL_ARRAY, RespValue::array(vec![]));
        assert!(RespValue::NULL_BULK_STRING.is_null());
        assert!(RespValue::NULL_ARRAY.is_null());
        assert!(!RespValue::bulk_string(Bytes::new()).is_null());
        assert!(!RespValue::array(vec![]).is_null());
    }

    #[rstest]
    #[case(RespValue::bulk_string(Bytes::from("123")), Some(123))]
    #[case(RespValue::bulk_string(Bytes::from("12x")), None)]
    #[case(RespValue::bulk_string(Bytes::from("-5")), Some(-5))]
    #[case(RespValue::bulk_string(Bytes::from("")), None)]
    #[case(RespValue::simple_string("42"), Some(42))]
    #[case(RespValue::integer(7), Some(7))]
    #[case(RespValue::error("42"), None)]
    #[case(RespValue::NULL_BULK_STRING, None)]
    #[case(RespValue::array(vec![RespValue::integer(1)]), None)]
    fn test_as_integer(#[case] value: RespValue, #[case] expected: Option<i64>) {
        assert_eq!(value.as_integer(), expected);
    }

    #[test]
    fn test_as_text() {
        assert_eq!(RespValue::OK.as_text().as_deref(), Some("OK"));
        assert_eq!(RespValue::error("ERR x").as_text().as_deref(), Some("ERR x"));
        assert_eq!(
            RespValue::bulk_string(Bytes::from("hello")).as_text().as_deref(),
            Some("hello")
        );
        assert_eq!(RespValue::integer(-42).as_text().as_deref(), Some("-42"));
        assert_eq!(RespValue::NULL_BULK_STRING.as_text(), None);
        assert_eq!(RespValue::array(vec![]).as_text(), None);
        assert_eq!(
            RespValue::bulk_string(Bytes::from_static(&[0xff, 0xfe])).as_text(),
            None
        );
    }

    #[test]
    fn test_as_bytes_is_binary_safe() {
        let raw: &[u8] = &[0x00, 0x0d, 0x0a, 0xff];
        let value = RespValue::bulk_string(Bytes::copy_from_slice(raw));
        assert_eq!(value.as_bytes(), Some(raw));
        assert_eq!(RespValue::NULL_BULK_STRING.as_bytes(), None);
    }

    #[test]
    fn test_array_accessors() {
        let value = RespValue::array(vec![RespValue::ONE, RespValue::ZERO]);
        assert_eq!(value.as_array().map(<[RespValue]>::len), Some(2));
        assert_eq!(RespValue::NULL_ARRAY.as_array(), None);
        assert_eq!(
            value.into_array(),
            Some(vec![RespValue::integer(1), RespValue::integer(0)])
        );
    }

    #[test]
    fn test_display_summary() {
        assert_eq!(RespValue::integer(42).to_string(), "Integer(42)");
        assert_eq!(
            RespValue::bulk_string(Bytes::from("hello")).to_string(),
            "BulkString(hello)"
        );
        assert_eq!(
            RespValue::array(vec![RespValue::ONE, RespValue::ONE, RespValue::ONE]).to_string(),
            "Array(3 items)"
        );
        assert_eq!(RespValue::NULL_ARRAY.to_string(), "Array(null)");
        assert_eq!(RespValue::OK.to_string(), "SimpleString(OK)");
    }

    #[test]
    fn test_values_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RespValue>();
    }
}
