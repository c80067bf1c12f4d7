pub mod canned;
pub mod config;
pub mod echo;
pub mod executable;
pub mod fakes;
pub mod ping;
pub mod registry;
pub mod time;

use itertools::Itertools;
use std::vec;
use strum_macros::EnumString;
use thiserror::Error as ThisError;
use tracing::debug;

use crate::builder;
use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::value::Value;
use crate::Error;

pub use fakes::Fakes;
pub use registry::{Handler, Registry};

use canned::Canned;
use config::Config;
use echo::Echo;
use ping::Ping;
use registry::Registered;
use time::Time;

/// A resolved client request. Registered handlers take precedence over the built-in commands,
/// and anything else is answered from the canned replies.
#[derive(Debug, PartialEq)]
pub enum Command {
    Registered(Registered),

    Ping(Ping),
    Echo(Echo),
    Time(Time),
    Config(Config),

    Canned(Canned),
}

/// Commands answered by the server itself when no handler is registered for them.
#[derive(Debug, PartialEq, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Builtin {
    Ping,
    Echo,
    Time,
    Config,
}

impl Executable for Command {
    fn exec(self, fakes: &Fakes) -> String {
        match self {
            Command::Registered(cmd) => cmd.exec(fakes),
            Command::Ping(cmd) => cmd.exec(fakes),
            Command::Echo(cmd) => cmd.exec(fakes),
            Command::Time(cmd) => cmd.exec(fakes),
            Command::Config(cmd) => cmd.exec(fakes),
            Command::Canned(cmd) => cmd.exec(fakes),
        }
    }
}

impl Command {
    /// Resolves a request, command name included at index 0. The error is a client-facing
    /// reply, the connection stays usable.
    pub fn resolve(args: Vec<String>, registry: &Registry) -> Result<Command, CommandError> {
        let name = args.first().ok_or(CommandError::Empty)?;

        if let Some(handler) = registry.get(name) {
            return Ok(Command::Registered(Registered {
                handler: handler.clone(),
                args,
            }));
        }

        let parser = &mut CommandParser::new(args)?;

        match parser.name.parse::<Builtin>() {
            Ok(Builtin::Ping) => Ping::try_from(parser).map(Command::Ping),
            Ok(Builtin::Echo) => Echo::try_from(parser).map(Command::Echo),
            Ok(Builtin::Time) => Ok(Command::Time(Time)),
            Ok(Builtin::Config) => Config::try_from(parser).map(Command::Config),
            Err(_) => Ok(Command::Canned(Canned {
                command: parser.name.clone(),
            })),
        }
    }
}

/// Decodes a frame into a request and produces the framed reply.
///
/// Fails when the frame is not a client command, i.e. a non-empty array of bulk strings. A
/// failure is a protocol error the connection cannot recover from.
pub fn dispatch(frame: &Frame, registry: &Registry, fakes: &Fakes) -> Result<String, Error> {
    // A frame's nesting was already bounded when it was read.
    let value = Value::parse_with_max_depth(frame.as_bytes(), usize::MAX)?;
    let args = command_args(value)?;

    debug!(request = %args.iter().format(" "), "Dispatching command");

    let reply = match Command::resolve(args, registry) {
        Ok(cmd) => cmd.exec(fakes),
        Err(err) => builder::error(&err.to_string()),
    };

    Ok(reply)
}

/// Clients send commands to the server as RESP arrays of bulk strings.
pub fn command_args(value: Value) -> Result<Vec<String>, CommandError> {
    let values = match value {
        Value::Array(Some(values)) => values,
        value => return Err(CommandError::NotACommand(value.to_string())),
    };

    if values.is_empty() {
        return Err(CommandError::Empty);
    }

    values
        .into_iter()
        .map(|value| match value {
            // Arguments are handed to handlers as text, invalid UTF-8 is replaced.
            Value::Bulk(Some(bytes)) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            value => Err(CommandError::InvalidArgument(value.to_string())),
        })
        .collect()
}

pub(crate) struct CommandParser {
    /// Lowercased command name.
    name: String,
    parts: vec::IntoIter<String>,
}

impl CommandParser {
    fn new(args: Vec<String>) -> Result<CommandParser, CommandError> {
        let mut parts = args.into_iter();
        let name = parts.next().ok_or(CommandError::Empty)?.to_lowercase();

        Ok(CommandParser { name, parts })
    }

    fn next_string(&mut self) -> Result<String, CommandError> {
        self.parts.next().ok_or(CommandError::EndOfStream)
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandError {
    #[error("protocol error; expected an array of bulk strings, got {0}")]
    NotACommand(String),
    #[error("protocol error; empty command")]
    Empty,
    #[error("protocol error; expected a bulk string argument, got {0}")]
    InvalidArgument(String),
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArity { command: String },
    #[error("protocol error; attempting to extract a value failed due to the command being fully consumed")]
    EndOfStream,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn frame(args: &[&str]) -> Frame {
        Frame::try_from(builder::command(args)).unwrap()
    }

    #[test]
    fn ping() {
        let reply = dispatch(&frame(&["PING"]), &Registry::new(), &Fakes::default()).unwrap();
        assert_eq!(reply, "+PONG\r\n");
    }

    #[test]
    fn echo() {
        let reply = dispatch(&frame(&["ECHO", "hi"]), &Registry::new(), &Fakes::default());
        assert_eq!(reply.unwrap(), "$2\r\nhi\r\n");
    }

    #[test]
    fn registered_handler_reply_is_verbatim() {
        let mut registry = Registry::new();
        registry.register(
            "GET",
            Arc::new(|args: &[String]| builder::string(Some(&format!("value of {}", args[1])))),
        );

        let reply = dispatch(&frame(&["get", "foo"]), &registry, &Fakes::default()).unwrap();

        assert_eq!(reply, "$12\r\nvalue of foo\r\n");
    }

    #[test]
    fn registered_handler_overrides_builtin() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler = {
            let calls = calls.clone();
            move |_: &[String]| {
                calls.fetch_add(1, Ordering::SeqCst);
                builder::inline("CUSTOM")
            }
        };

        let mut registry = Registry::new();
        registry.register("ping", Arc::new(handler));

        let reply = dispatch(&frame(&["PING"]), &registry, &Fakes::default()).unwrap();

        assert_eq!(reply, "+CUSTOM\r\n");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_receives_command_name() {
        let mut registry = Registry::new();
        registry.register(
            "EVAL",
            Arc::new(|args: &[String]| builder::strings(args)),
        );

        let reply = dispatch(&frame(&["eval", "return 1", "0"]), &registry, &Fakes::default());

        assert_eq!(reply.unwrap(), builder::strings(&["eval", "return 1", "0"]));
    }

    #[test]
    fn wrong_arity_is_a_reply() {
        let reply = dispatch(&frame(&["ECHO"]), &Registry::new(), &Fakes::default()).unwrap();
        assert_eq!(reply, "-ERR wrong number of arguments for 'echo' command\r\n");
    }

    #[test]
    fn unknown_command() {
        let reply = dispatch(&frame(&["FLUSHALL"]), &Registry::new(), &Fakes::default());
        assert_eq!(reply.unwrap(), "+OK\r\n");
    }

    #[test]
    fn frame_is_not_a_command() {
        let cases = [
            "+PING\r\n",
            "*0\r\n",
            "*-1\r\n",
            "*1\r\n+PING\r\n",
            "*2\r\n$4\r\nECHO\r\n$-1\r\n",
            "-ERR\r\n",
        ];

        for case in cases {
            let frame = Frame::try_from(case).unwrap();
            assert!(
                dispatch(&frame, &Registry::new(), &Fakes::default()).is_err(),
                "{:?}",
                case
            );
        }
    }

    #[test]
    fn command_args_from_value() {
        let value = Value::parse(builder::command(&["SET", "k", "v"]).as_bytes()).unwrap();

        assert_eq!(
            command_args(value),
            Ok(vec!["SET".to_string(), "k".to_string(), "v".to_string()])
        );
        assert_eq!(
            command_args(Value::Array(Some(vec![]))),
            Err(CommandError::Empty)
        );
    }

    #[test]
    fn resolve_registered() {
        let handler: Arc<dyn Handler> = Arc::new(|_: &[String]| builder::nil());
        let mut registry = Registry::new();
        registry.register("MGET", handler.clone());

        let args = vec!["mget".to_string(), "a".to_string()];
        let cmd = Command::resolve(args.clone(), &registry).unwrap();

        assert_eq!(cmd, Command::Registered(Registered { handler, args }));
    }

    #[test]
    fn resolve_time() {
        let cmd = Command::resolve(vec!["TiME".to_string()], &Registry::new()).unwrap();
        assert_eq!(cmd, Command::Time(Time));
    }
}
