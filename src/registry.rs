//! # Handler Registry
//!
//! Maps a handler type key (a plain string such as `"echo"`) to a factory that
//! builds a fresh, not yet set up handler. Configuration names handler types by
//! key, and the registry is the only place those keys are resolved, so every
//! type a configuration can reach is known when the process starts.
//!
//! ```rust
//! use defer_dispatch::registry::HandlerRegistry;
//!
//! let registry = HandlerRegistry::builtin();
//! assert!(registry.contains("echo"));
//! assert!(registry.create("no-such-type").is_err());
//! ```

use crate::echo::{DelayedEchoHandler, EchoHandler};
use crate::handler::{Handler, HandlerError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry key of [`EchoHandler`].
pub const ECHO_HANDLER_TYPE: &str = "echo";

/// Registry key of [`DelayedEchoHandler`].
pub const DELAYED_ECHO_HANDLER_TYPE: &str = "delayed-echo";

/// Factory producing a new handler instance per call.
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn Handler> + Send + Sync>;

/// String-keyed table of handler factories.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    factories: BTreeMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the handlers shipped in this crate.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ECHO_HANDLER_TYPE, || Box::new(EchoHandler::default()));
        registry.register(DELAYED_ECHO_HANDLER_TYPE, || {
            Box::new(DelayedEchoHandler::default())
        });
        registry
    }

    /// Register `factory` under `key`, replacing any previous entry.
    pub fn register<F>(&mut self, key: &str, factory: F)
    where
        F: Fn() -> Box<dyn Handler> + Send + Sync + 'static,
    {
        let key = key.trim().to_string();
        if self.factories.insert(key.clone(), Arc::new(factory)).is_some() {
            warn!(handler_type = %key, "Replaced existing handler factory");
        } else {
            debug!(handler_type = %key, "Handler factory registered");
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key.trim())
    }

    /// Registered keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Look up the factory for `key` without invoking it.
    pub fn factory(&self, key: &str) -> Result<HandlerFactory, HandlerError> {
        self.factories
            .get(key.trim())
            .map(Arc::clone)
            .ok_or_else(|| HandlerError::UnknownHandlerType {
                handler_type: key.trim().to_string(),
            })
    }

    /// Build a fresh handler of type `key`.
    pub fn create(&self, key: &str) -> Result<Box<dyn Handler>, HandlerError> {
        self.factory(key).map(|factory| factory())
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.keys())
            .finish()
    }
}
