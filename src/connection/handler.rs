//! Connection Handler Module
//!
//! This module handles individual client connections.
//! Each client gets its own handler task that runs in a loop,
//! reading commands and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read bytes from socket  │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Parse RESP commands     │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Execute each command    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Flush responses         │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / QUIT / protocol error
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Buffer Management
//!
//! Bytes are read straight into the parser's buffer. TCP is a stream
//! protocol, so a read may end in the middle of a command or carry several
//! commands at once; the parser keeps the partial frame until the rest
//! arrives.
//!
//! ## Protocol Errors
//!
//! RESP cannot be resynchronised after malformed input, so on a protocol
//! error the client gets a single `-ERR Protocol error: ...` reply and the
//! connection is closed. Other connections are unaffected.

use crate::commands::{CommandHandler, Reply};
use crate::protocol::{ParseError, ParserLimits, RespParser, RespValue};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Minimum free space kept in the read buffer before each read
const MIN_READ_CAPACITY: usize = 1024;

/// How much to grow the read buffer by
const READ_CHUNK_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Connections closed because of malformed input
    pub protocol_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// This struct owns the stream, the parser (and with it the read buffer)
/// and the pending responses for one connected client.
pub struct ConnectionHandler<S> {
    /// The client stream, buffered for writes
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Responses serialized but not yet written
    out: BytesMut,

    /// The command handler
    command_handler: CommandHandler,

    /// RESP parser, holding the read buffer
    parser: RespParser,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The client stream (usually a `TcpStream`)
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    /// * `limits` - Parser limits for this connection
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
        limits: ParserLimits,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            out: BytesMut::with_capacity(READ_CHUNK_SIZE),
            command_handler,
            parser: RespParser::with_limits(limits),
            stats,
        }
    }

    /// Runs the main connection loop.
    ///
    /// This method reads commands from the client, executes them,
    /// and sends back responses until the client disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected gracefully"),
            Err(e) => match e {
                ConnectionError::ClientDisconnected => {
                    debug!(client = %self.addr, "Client disconnected")
                }
                ConnectionError::IoError(io_err)
                    if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
                {
                    debug!(client = %self.addr, "Connection reset by client")
                }
                _ => warn!(client = %self.addr, error = %e, "Connection error"),
            },
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            // Execute every complete command already buffered (pipelining)
            loop {
                let command = match self.parser.next_value() {
                    Ok(Some(command)) => command,
                    Ok(None) => break,
                    Err(e) => return self.reject(e).await,
                };

                trace!(
                    client = %self.addr,
                    command = %command,
                    remaining = self.parser.buffered_len(),
                    "Parsed command"
                );

                let reply = self.command_handler.execute(command);
                self.stats.command_processed();

                match reply {
                    Reply::Continue(response) => self.queue_response(&response),
                    Reply::Close(response) => {
                        self.queue_response(&response);
                        self.flush_responses().await?;
                        return Ok(());
                    }
                }
            }

            self.flush_responses().await?;

            // Need more data - read from the socket
            self.read_more_data().await?;
        }
    }

    /// Answers a protocol error and ends the connection.
    async fn reject(&mut self, error: ParseError) -> Result<(), ConnectionError> {
        warn!(client = %self.addr, error = %error, "Protocol error");
        self.stats.protocol_error();

        let response = RespValue::error(format!("ERR Protocol error: {}", error));
        self.queue_response(&response);
        self.flush_responses().await?;

        Err(ConnectionError::ParseError(error))
    }

    /// Reads more data from the socket into the parser's buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        let buffer = self.parser.buffer_mut();

        // Ensure we have some capacity
        if buffer.capacity() - buffer.len() < MIN_READ_CAPACITY {
            buffer.reserve(READ_CHUNK_SIZE);
        }

        // Read data
        let n = self.stream.get_mut().read_buf(buffer).await?;

        if n == 0 {
            // Connection closed by client
            if self.parser.is_mid_frame() {
                // Partial command in buffer
                return Err(ConnectionError::UnexpectedEof);
            } else {
                return Err(ConnectionError::ClientDisconnected);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Serializes a response into the pending output.
    fn queue_response(&mut self, response: &RespValue) {
        response.serialize_into(&mut self.out);
    }

    /// Writes and flushes every pending response.
    async fn flush_responses(&mut self) -> Result<(), ConnectionError> {
        if self.out.is_empty() {
            return Ok(());
        }

        let pending = self.out.split();
        self.stream.write_all(&pending).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(pending.len());
        trace!(
            client = %self.addr,
            bytes = pending.len(),
            "Sent responses"
        );
        Ok(())
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// RESP parse error
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial command)
    #[error("Unexpected end of stream")]
    UnexpectedEof,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
///
/// # Arguments
///
/// * `stream` - The client stream for this connection
/// * `addr` - The client's socket address
/// * `command_handler` - The command handler for executing commands
/// * `stats` - Shared connection statistics
/// * `limits` - Parser limits for this connection
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    limits: ParserLimits,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, limits);
    if let Err(e) = handler.run().await {
        match e {
            ConnectionError::ClientDisconnected => {}
            ConnectionError::IoError(ref io_err)
                if io_err.kind() == std::io::ErrorKind::ConnectionReset => {}
            _ => {
                debug!(client = %addr, error = %e, "Connection ended with error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio_test::io::Builder;

    async fn create_test_server() -> (SocketAddr, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stats = Arc::new(ConnectionStats::new());

        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(
                    stream,
                    client_addr,
                    CommandHandler::new(),
                    stats,
                    ParserLimits::default(),
                ));
            }
        });

        (addr, stats)
    }

    fn test_addr() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    /// Reads until `expected_len` bytes arrived or the peer closes.
    async fn read_exactly(client: &mut TcpStream, expected_len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; expected_len];
        let mut total = 0;
        let timeout = tokio::time::Duration::from_secs(2);

        while total < expected_len {
            match tokio::time::timeout(timeout, client.read(&mut buf[total..])).await {
                Ok(Ok(n)) if n > 0 => total += n,
                _ => break,
            }
        }

        buf.truncate(total);
        buf
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (addr, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Send PING command
        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();

        // Read response
        let response = read_exactly(&mut client, 7).await;
        assert_eq!(response, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_command_split_across_writes() {
        let (addr, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.set_nodelay(true).unwrap();

        client.write_all(b"*2\r\n$4\r\nECHO\r\n$3\r\nfo").await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        client.write_all(b"o\r\n").await.unwrap();

        let response = read_exactly(&mut client, 9).await;
        assert_eq!(response, b"$3\r\nfoo\r\n");
    }

    #[tokio::test]
    async fn test_multiple_commands() {
        let (addr, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Send multiple commands in one write (pipelining)
        client
            .write_all(b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nECHO\r\n$2\r\nv1\r\n*2\r\n$4\r\nPING\r\n$2\r\nv2\r\n")
            .await
            .unwrap();

        // Expected: +PONG\r\n$2\r\nv1\r\n$2\r\nv2\r\n (23 bytes)
        let response = read_exactly(&mut client, 23).await;
        assert_eq!(response, b"+PONG\r\n$2\r\nv1\r\n$2\r\nv2\r\n");
    }

    #[tokio::test]
    async fn test_protocol_error_closes_connection() {
        let (addr, stats) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"#bogus\r\n").await.unwrap();

        let expected = b"-ERR Protocol error: unknown type prefix: 0x23\r\n";
        let response = read_exactly(&mut client, expected.len()).await;
        assert_eq!(response, expected);

        // The server closes its side afterwards (FIN, or RST on some platforms)
        let mut buf = [0u8; 16];
        assert!(matches!(client.read(&mut buf).await, Ok(0) | Err(_)));

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        assert_eq!(stats.protocol_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_quit_closes_connection() {
        let (addr, _) = create_test_server().await;

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"*1\r\n$4\r\nQUIT\r\n").await.unwrap();

        let response = read_exactly(&mut client, 5).await;
        assert_eq!(response, b"+OK\r\n");

        let mut buf = [0u8; 16];
        assert!(matches!(client.read(&mut buf).await, Ok(0) | Err(_)));
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, stats) = create_test_server().await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Give the server time to accept the connection
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        // Send a command
        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        let _ = read_exactly(&mut client, 7).await;

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert!(stats.commands_processed.load(Ordering::Relaxed) >= 1);
        assert!(stats.bytes_read.load(Ordering::Relaxed) > 0);
        assert!(stats.bytes_written.load(Ordering::Relaxed) > 0);

        // Close connection
        drop(client);

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_mock_split_reads() {
        let stream = Builder::new()
            .read(b"*1\r\n$4\r\nPI")
            .read(b"NG\r\n")
            .write(b"+PONG\r\n")
            .build();

        let handler = ConnectionHandler::new(
            stream,
            test_addr(),
            CommandHandler::new(),
            Arc::new(ConnectionStats::new()),
            ParserLimits::default(),
        );

        let result = handler.run().await;
        assert!(matches!(result, Err(ConnectionError::ClientDisconnected)));
    }

    #[tokio::test]
    async fn test_mock_eof_mid_frame() {
        let stream = Builder::new().read(b"*2\r\n$4\r\nECHO\r\n").build();

        let handler = ConnectionHandler::new(
            stream,
            test_addr(),
            CommandHandler::new(),
            Arc::new(ConnectionStats::new()),
            ParserLimits::default(),
        );

        let result = handler.run().await;
        assert!(matches!(result, Err(ConnectionError::UnexpectedEof)));
    }

    #[tokio::test]
    async fn test_mock_oversized_bulk_rejected() {
        let limits = ParserLimits {
            max_bulk_length: 16,
            ..ParserLimits::default()
        };
        let stream = Builder::new()
            .read(b"*1\r\n$17\r\n")
            .write(b"-ERR Protocol error: message too large: 17 bytes (max: 16)\r\n")
            .build();

        let handler = ConnectionHandler::new(
            stream,
            test_addr(),
            CommandHandler::new(),
            Arc::new(ConnectionStats::new()),
            limits,
        );

        let result = handler.run().await;
        assert!(matches!(
            result,
            Err(ConnectionError::ParseError(ParseError::MessageTooLarge { size: 17, max: 16 }))
        ));
    }
}
