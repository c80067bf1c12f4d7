use crate::builder;
use crate::commands::canned::Canned;
use crate::commands::executable::Executable;
use crate::commands::fakes::Fakes;
use crate::commands::{CommandError, CommandParser};

/// `CONFIG GET <name>` answers from the fake configuration, with an empty bulk string for unknown
/// names. Other subcommands are treated like any command without a built-in implementation.
///
/// Ref: <https://redis.io/docs/latest/commands/config-get>
#[derive(Debug, PartialEq)]
pub enum Config {
    Get { name: String },
    Other { subcommand: String },
}

impl Executable for Config {
    fn exec(self, fakes: &Fakes) -> String {
        match self {
            Config::Get { name } => builder::string(fakes.config_value(&name)),
            Config::Other { .. } => Canned {
                command: "config".to_string(),
            }
            .exec(fakes),
        }
    }
}

impl TryFrom<&mut CommandParser> for Config {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let subcommand = parser.next_string().map_err(|_| CommandError::WrongArity {
            command: "config".to_string(),
        })?;

        if !subcommand.eq_ignore_ascii_case("get") {
            return Ok(Config::Other { subcommand });
        }

        let name = parser.next_string().map_err(|_| CommandError::WrongArity {
            command: "config|get".to_string(),
        })?;

        Ok(Config::Get { name })
    }
}
