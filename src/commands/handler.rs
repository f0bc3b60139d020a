//! Command Handler
//!
//! Receives a decoded command (an array whose first element names the
//! command) and produces the response value.

use crate::protocol::RespValue;
use bytes::Bytes;

/// What the connection should do after sending a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Send the value and keep reading commands
    Continue(RespValue),
    /// Send the value, then close the connection
    Close(RespValue),
}

impl Reply {
    /// The value to send back.
    pub fn value(&self) -> &RespValue {
        match self {
            Reply::Continue(value) | Reply::Close(value) => value,
        }
    }
}

impl From<RespValue> for Reply {
    fn from(value: RespValue) -> Self {
        Reply::Continue(value)
    }
}

/// Dispatches commands to their handlers.
#[derive(Debug, Clone, Default)]
pub struct CommandHandler;

impl CommandHandler {
    pub fn new() -> Self {
        Self
    }

    /// Executes a command and returns the response.
    ///
    /// # Arguments
    ///
    /// * `command` - The parsed RESP value (should be an array)
    pub fn execute(&self, command: RespValue) -> Reply {
        // Commands should be arrays
        let args = match command {
            RespValue::Array(Some(args)) => args,
            RespValue::Array(None) => return RespValue::error("ERR null command").into(),
            _ => return RespValue::error("ERR invalid command format").into(),
        };

        let Some(first) = args.first() else {
            return RespValue::error("ERR empty command").into();
        };

        // Extract command name (first argument)
        let cmd_name = match first.as_text() {
            Some(name) => name.to_ascii_uppercase(),
            None => return RespValue::error("ERR invalid command name").into(),
        };

        self.dispatch(&cmd_name, &args[1..])
    }

    /// Dispatches a command to its handler.
    fn dispatch(&self, cmd: &str, args: &[RespValue]) -> Reply {
        match cmd {
            "PING" => self.cmd_ping(args).into(),
            "ECHO" => self.cmd_echo(args).into(),
            "COMMAND" => RespValue::array(Vec::new()).into(),
            "QUIT" => Reply::Close(RespValue::OK),

            // Unknown command
            _ => RespValue::error(format!("ERR unknown command '{}'", cmd)).into(),
        }
    }

    /// Extracts an argument's payload, sharing the buffer for bulk strings.
    fn get_bytes(&self, value: &RespValue) -> Option<Bytes> {
        match value {
            RespValue::BulkString(Some(b)) => Some(b.clone()),
            other => other.as_bytes().map(Bytes::copy_from_slice),
        }
    }

    /// PING [message]
    fn cmd_ping(&self, args: &[RespValue]) -> RespValue {
        match args {
            [] => RespValue::PONG,
            [message] => match self.get_bytes(message) {
                Some(msg) => RespValue::bulk_string(msg),
                None => RespValue::error("ERR invalid message"),
            },
            _ => wrong_arity("ping"),
        }
    }

    /// ECHO message
    fn cmd_echo(&self, args: &[RespValue]) -> RespValue {
        let [message] = args else {
            return wrong_arity("echo");
        };

        match self.get_bytes(message) {
            Some(msg) => RespValue::bulk_string(msg),
            None => RespValue::error("ERR invalid message"),
        }
    }
}

fn wrong_arity(cmd: &str) -> RespValue {
    RespValue::error(format!("ERR wrong number of arguments for '{}' command", cmd))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_handler() -> CommandHandler {
        CommandHandler::new()
    }

    fn make_command(args: &[&str]) -> RespValue {
        RespValue::array(
            args.iter()
                .map(|s| RespValue::bulk_string(Bytes::from(s.to_string())))
                .collect(),
        )
    }

    #[test]
    fn test_ping() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["PING"]));
        assert_eq!(response, Reply::Continue(RespValue::PONG));

        let response = handler.execute(make_command(&["ping", "hello"]));
        assert_eq!(
            response,
            Reply::Continue(RespValue::bulk_string(Bytes::from("hello")))
        );

        let response = handler.execute(make_command(&["PING", "a", "b"]));
        assert_eq!(
            response.value(),
            &RespValue::error("ERR wrong number of arguments for 'ping' command")
        );
    }

    #[test]
    fn test_echo() {
        let handler = create_handler();

        let response = handler.execute(make_command(&["ECHO", "hi there"]));
        assert_eq!(
            response.value(),
            &RespValue::bulk_string(Bytes::from("hi there"))
        );

        let response = handler.execute(make_command(&["ECHO"]));
        assert!(response.value().is_error());
    }

    #[test]
    fn test_echo_binary_and_integer_arguments() {
        let handler = create_handler();

        let raw = Bytes::from_static(&[0x00, 0xff, b'\r', b'\n']);
        let response = handler.execute(RespValue::array(vec![
            RespValue::bulk_string(Bytes::from("ECHO")),
            RespValue::bulk_string(raw.clone()),
        ]));
        assert_eq!(response.value(), &RespValue::bulk_string(raw));

        let response = handler.execute(RespValue::array(vec![
            RespValue::bulk_string(Bytes::from("ECHO")),
            RespValue::integer(5),
        ]));
        assert!(response.value().is_error());
    }

    #[test]
    fn test_quit_closes() {
        let handler = create_handler();
        let response = handler.execute(make_command(&["QUIT"]));
        assert_eq!(response, Reply::Close(RespValue::OK));
    }

    #[test]
    fn test_command() {
        let handler = create_handler();
        let response = handler.execute(make_command(&["COMMAND", "DOCS"]));
        assert_eq!(response.value(), &RespValue::array(vec![]));
    }

    #[test]
    fn test_unknown_command() {
        let handler = create_handler();
        let response = handler.execute(make_command(&["FROB", "x"]));
        assert_eq!(
            response.value(),
            &RespValue::error("ERR unknown command 'FROB'")
        );
    }

    #[test]
    fn test_malformed_commands() {
        let handler = create_handler();

        assert!(handler.execute(RespValue::OK).value().is_error());
        assert!(handler.execute(RespValue::NULL_ARRAY).value().is_error());
        assert!(handler.execute(RespValue::array(vec![])).value().is_error());
        assert!(handler
            .execute(RespValue::array(vec![RespValue::NULL_BULK_STRING]))
            .value()
            .is_error());
    }
}
