use crate::builder;
use crate::commands::executable::Executable;
use crate::commands::fakes::Fakes;
use crate::commands::{CommandError, CommandParser};

/// Returns message.
///
/// Ref: <https://redis.io/docs/latest/commands/echo>
#[derive(Debug, PartialEq)]
pub struct Echo {
    pub message: String,
}

impl Executable for Echo {
    fn exec(self, _fakes: &Fakes) -> String {
        builder::string(Some(&self.message))
    }
}

impl TryFrom<&mut CommandParser> for Echo {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let message = parser.next_string().map_err(|_| CommandError::WrongArity {
            command: "echo".to_string(),
        })?;

        Ok(Self { message })
    }
}
