use crate::commands::fakes::Fakes;

pub trait Executable {
    /// Produces the framed reply for the command.
    fn exec(self, fakes: &Fakes) -> String;
}
