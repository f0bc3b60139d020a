//! Command Handler Module
//!
//! This module is the thin dispatch layer between decoded RESP commands and
//! their responses. It only relies on the value model's public accessors
//! (`as_text()`, `as_bytes()`, `as_integer()`), the same contract a full
//! command table with a storage engine behind it would use.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Parser    │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ RESP Serializer │  (protocol module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`
//! - `ECHO message`
//! - `COMMAND [...]`
//! - `QUIT`

pub mod handler;

// Re-export the main command handler
pub use handler::{CommandHandler, Reply};
