use crate::builder;
use crate::commands::executable::Executable;
use crate::commands::fakes::Fakes;
use crate::commands::{CommandError, CommandParser};

/// Returns PONG if no argument is provided, otherwise return a copy of the argument as a bulk.
///
/// Ref: <https://redis.io/docs/latest/commands/ping>
#[derive(Debug, PartialEq)]
pub struct Ping {
    pub payload: Option<String>,
}

impl Executable for Ping {
    fn exec(self, _fakes: &Fakes) -> String {
        match self.payload {
            Some(payload) => builder::string(Some(&payload)),
            None => builder::inline("PONG"),
        }
    }
}

impl TryFrom<&mut CommandParser> for Ping {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let payload = match parser.next_string() {
            Ok(payload) => Some(payload),
            Err(CommandError::EndOfStream) => None,
            Err(e) => return Err(e),
        };

        Ok(Self { payload })
    }
}
