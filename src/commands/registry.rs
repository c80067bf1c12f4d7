use itertools::Itertools;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::commands::executable::Executable;
use crate::commands::fakes::Fakes;

/// Business logic for a command, supplied by the user of the server.
///
/// `args` holds the whole request, command name included at index 0, and the returned string
/// must already be a framed reply (see [`crate::builder`]). Connections run concurrently, so a
/// handler can be invoked from many tasks at once.
pub trait Handler: Send + Sync {
    fn handle(&self, args: &[String]) -> String;
}

impl<F> Handler for F
where
    F: Fn(&[String]) -> String + Send + Sync,
{
    fn handle(&self, args: &[String]) -> String {
        self(args)
    }
}

/// Command name to handler mapping. Names are case-insensitive. It is filled before the server
/// starts and only read afterwards.
#[derive(Default, Clone)]
pub struct Registry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Registry {
    pub fn new() -> Registry {
        Self::default()
    }

    /// Registers `handler` for `name`, replacing any handler previously registered for it. The
    /// same handler may be registered under several names.
    pub fn register(&mut self, name: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.handlers.insert(name.to_lowercase(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.handlers.keys().sorted())
            .finish()
    }
}

/// A request routed to a registered handler.
pub struct Registered {
    pub handler: Arc<dyn Handler>,
    pub args: Vec<String>,
}

impl Executable for Registered {
    fn exec(self, _fakes: &Fakes) -> String {
        self.handler.handle(&self.args)
    }
}

// Two requests are equal when they carry the same arguments to the same handler instance.
impl PartialEq for Registered {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler) && self.args == other.args
    }
}

impl fmt::Debug for Registered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registered")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut registry = Registry::new();
        registry.register("Get", Arc::new(|_: &[String]| builder::nil()));

        assert!(registry.get("GET").is_some());
        assert!(registry.get("get").is_some());
        assert!(registry.get("gEt").is_some());
        assert!(registry.get("SET").is_none());
    }

    #[test]
    fn shared_handler() {
        let handler: Arc<dyn Handler> =
            Arc::new(|args: &[String]| builder::int(args.len() as i64 - 1));

        let mut registry = Registry::new();
        registry
            .register("DEL", handler.clone())
            .register("UNLINK", handler);

        assert_eq!(registry.len(), 2);
        let args = vec!["UNLINK".to_string(), "a".to_string(), "b".to_string()];
        assert_eq!(registry.get("unlink").unwrap().handle(&args), ":2\r\n");
    }

    #[test]
    fn later_registration_replaces() {
        let mut registry = Registry::new();
        registry
            .register("GET", Arc::new(|_: &[String]| builder::nil()))
            .register("get", Arc::new(|_: &[String]| builder::string(Some("v"))));

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("GET").unwrap().handle(&["GET".to_string()]),
            "$1\r\nv\r\n"
        );
    }

    #[test]
    fn debug_lists_names() {
        let mut registry = Registry::new();
        registry
            .register("MGET", Arc::new(|_: &[String]| builder::nil_list()))
            .register("EVAL", Arc::new(|_: &[String]| builder::nil()));

        assert_eq!(format!("{:?}", registry), r#"{"eval", "mget"}"#);
    }
}
