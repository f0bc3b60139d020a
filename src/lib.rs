//! # FlashRESP - A Streaming RESP Codec for Redis-Compatible Servers
//!
//! FlashRESP is the protocol core of a Redis-compatible server written in
//! Rust: the value model for every RESP2 datum, a streaming parser that
//! turns untrusted network bytes into values, and a serializer that turns
//! values back into exact wire bytes. A small Tokio server is included to
//! drive it over real connections.
//!
//! ## Features
//!
//! - **Redis-Compatible**: Byte-exact RESP2, works with `redis-cli` and client libraries
//! - **Streaming**: Frames may arrive split across any number of reads
//! - **Bounded**: Line, payload, array and nesting limits guard against hostile input
//! - **Zero-Copy**: Bulk string payloads are sliced out of the read buffer
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              FlashRESP                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                        ▲   │                  │                         │
//! │                 bytes  │   ▼ RespValue        ▼ RespValue               │
//! │                     ┌──┴──────────┐    ┌─────────────┐                  │
//! │                     │ RESP Parser │    │ Serializer  │──> bytes         │
//! │                     └─────────────┘    └─────────────┘                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use flashresp::commands::CommandHandler;
//! use flashresp::connection::{handle_connection, ConnectionStats};
//! use flashresp::protocol::ParserLimits;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let stats = Arc::new(ConnectionStats::new());
//!     let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await?;
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(
//!             stream,
//!             addr,
//!             CommandHandler::new(),
//!             stats,
//!             ParserLimits::default(),
//!         ));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP value model, parser and serializer
//! - [`commands`]: Minimal command dispatch (`PING`, `ECHO`, `COMMAND`, `QUIT`)
//! - [`connection`]: Client connection management
//! - [`config`]: CLI and TOML configuration
//!
//! ## Design Highlights
//!
//! ### Closed Value Model
//!
//! `RespValue` is an enum with one payload per variant. Null bulk strings
//! and null arrays are `None` payloads, distinct from empty ones, and
//! simple strings and errors carry a [`protocol::Line`] that cannot hold
//! CR or LF. Malformed frames cannot be built, so serialization never fails.
//!
//! ### Resumable Parsing
//!
//! The parser keeps its position inside the current frame, including any
//! half-built arrays, so each received byte is examined once no matter how
//! the stream is chunked.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ParseError, ParserLimits, RespParser, RespValue};

/// The default port the server listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host the server binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of FlashRESP
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
