//! RESP Protocol Implementation
//!
//! This module provides a complete implementation of the Redis Serialization Protocol (RESP2).
//!
//! ## Overview
//!
//! RESP is a simple, binary-safe protocol used by Redis for client-server communication.
//! Frames carry no total-length header, so the parser has to work out frame
//! boundaries as bytes arrive.
//!
//! ## Modules
//!
//! - `types`: Defines the `RespValue` enum and its coercions
//! - `parser`: Streaming parser for incoming RESP data
//! - `serializer`: Renders values back into wire bytes
//! - `number`: Strict decimal integer parsing shared by the above
//!
//! ## Example
//!
//! ```
//! use flashresp::protocol::{RespParser, RespValue};
//! use bytes::Bytes;
//!
//! // Parsing incoming data, possibly split across reads
//! let mut parser = RespParser::new();
//! assert!(parser.feed(b"*2\r\n$3\r\nGET\r\n$4\r\nna").unwrap().is_empty());
//! let commands = parser.feed(b"me\r\n").unwrap();
//! assert_eq!(commands[0].as_array().unwrap()[1].as_text().unwrap(), "name");
//!
//! // Creating responses
//! let response = RespValue::bulk_string(Bytes::from("Ariz"));
//! assert_eq!(response.serialize(), b"$4\r\nAriz\r\n");
//! ```

pub mod number;
pub mod parser;
pub mod serializer;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{parse_message, ParseError, ParseResult, ParserLimits, RespParser};
pub use serializer::{serialize, serialize_into};
pub use types::{Line, LineError, RespValue};
