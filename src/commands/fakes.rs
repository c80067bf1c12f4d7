use std::collections::HashMap;

use crate::builder;

/// Fixed data the server answers with for commands it does not implement: the configuration
/// returned by `CONFIG GET`, and canned replies for commands clients commonly send while
/// connecting. Names are case-insensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Fakes {
    config: HashMap<String, String>,
    canned: HashMap<String, String>,
}

impl Fakes {
    /// No configuration and no canned replies.
    pub fn empty() -> Fakes {
        Fakes {
            config: HashMap::new(),
            canned: HashMap::new(),
        }
    }

    /// Sets the value `CONFIG GET <name>` replies with.
    pub fn config(mut self, name: &str, value: &str) -> Self {
        self.config.insert(name.to_lowercase(), value.to_string());
        self
    }

    /// Sets the framed reply returned for `command`.
    pub fn canned(mut self, command: &str, reply: impl Into<String>) -> Self {
        self.canned.insert(command.to_lowercase(), reply.into());
        self
    }

    pub fn config_value(&self, name: &str) -> Option<&str> {
        self.config.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn canned_reply(&self, command: &str) -> Option<&str> {
        self.canned.get(&command.to_lowercase()).map(String::as_str)
    }
}

impl Default for Fakes {
    fn default() -> Self {
        Fakes::empty()
            .config("slave-read-only", "yes")
            .config("databases", "2")
            .canned("EXISTS", builder::int(0))
            .canned("TTL", builder::int(-1))
            .canned("LLEN", builder::int(0))
            .canned("GET", builder::nil())
            .canned("HGET", builder::nil_resp3())
            .canned("LPOP", builder::nil_resp3())
            .canned("INFO", builder::string(None))
    }
}
