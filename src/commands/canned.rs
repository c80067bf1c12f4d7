use crate::builder;
use crate::commands::executable::Executable;
use crate::commands::fakes::Fakes;

/// Any command without a registered handler or a built-in implementation. Replies with the
/// canned reply for the command, or `OK`.
#[derive(Debug, PartialEq)]
pub struct Canned {
    pub command: String,
}

impl Executable for Canned {
    fn exec(self, fakes: &Fakes) -> String {
        fakes
            .canned_reply(&self.command)
            .map(str::to_string)
            .unwrap_or_else(|| builder::inline("OK"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, Registry};

    fn exec(args: &[&str], fakes: &Fakes) -> String {
        let args = args.iter().map(|s| s.to_string()).collect();
        Command::resolve(args, &Registry::new()).unwrap().exec(fakes)
    }

    #[test]
    fn canned_replies() {
        let fakes = Fakes::default();

        assert_eq!(exec(&["EXISTS", "key"], &fakes), ":0\r\n");
        assert_eq!(exec(&["ttl", "key"], &fakes), ":-1\r\n");
        assert_eq!(exec(&["LLEN", "key"], &fakes), ":0\r\n");
        assert_eq!(exec(&["GET", "key"], &fakes), "$-1\r\n");
        assert_eq!(exec(&["HGET", "key", "field"], &fakes), "_\r\n");
        assert_eq!(exec(&["LPOP", "key"], &fakes), "_\r\n");
        assert_eq!(exec(&["INFO"], &fakes), "$0\r\n\r\n");
    }

    #[test]
    fn fallback_ok() {
        let fakes = Fakes::default();

        assert_eq!(exec(&["SET", "key", "value"], &fakes), "+OK\r\n");
        assert_eq!(exec(&["CLIENT", "SETNAME", "test"], &fakes), "+OK\r\n");
        assert_eq!(exec(&["GET", "key"], &Fakes::empty()), "+OK\r\n");
    }
}
