//! # Service Configuration
//!
//! YAML description of the handlers a process hosts:
//!
//! ```yaml
//! handlers:
//!   - name: reports
//!     type: deferred-init
//!     load_on_startup: 10
//!     params:
//!       delegate-handler-type: delayed-echo
//!       init-delay-ms: 500
//!   - name: echo
//!     type: echo
//! ```
//!
//! Parameter values must be scalars. Strings, booleans and numbers are
//! stringified (`500` becomes `"500"`, `false` becomes `"false"`) and `null`
//! becomes an empty string. Sequences and mappings are rejected when the file
//! is loaded, as are blank and duplicate handler names.

use crate::handler::{HandlerConfig, HandlerError};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Declared handlers, in file order
    #[serde(default)]
    pub handlers: Vec<HandlerEntry>,
}

/// One handler declaration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerEntry {
    /// Name requests are dispatched by
    pub name: String,
    /// Registry key, or `deferred-init` for the deferred wrapper
    #[serde(rename = "type")]
    pub handler_type: String,
    /// Registration order; lower first, absent last
    #[serde(default)]
    pub load_on_startup: Option<i32>,
    /// Init parameters handed to the handler's setup
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl HandlerEntry {
    /// Convert into the [`HandlerConfig`] passed to `setup`.
    pub fn to_handler_config(&self) -> Result<HandlerConfig, HandlerError> {
        let mut config = HandlerConfig::new(self.name.trim());
        for (key, value) in &self.params {
            let value = scalar_to_string(value).ok_or_else(|| HandlerError::InvalidParameter {
                handler: self.name.clone(),
                parameter: key.clone(),
                value: describe_non_scalar(value).to_string(),
            })?;
            config.insert_param(key.trim(), value);
        }
        Ok(config)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

fn describe_non_scalar(value: &Value) -> &'static str {
    match value {
        Value::Sequence(_) => "<sequence>",
        Value::Mapping(_) => "<mapping>",
        _ => "<tagged value>",
    }
}

impl ServiceConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: ServiceConfig =
            serde_yaml::from_str(content).context("Invalid service configuration YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject blank or duplicate names and non-scalar parameter values.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.handlers {
            let name = entry.name.trim();
            if name.is_empty() {
                bail!("handler of type '{}' has an empty name", entry.handler_type);
            }
            if entry.handler_type.trim().is_empty() {
                bail!("handler '{}' has an empty type", name);
            }
            if !seen.insert(name) {
                bail!("duplicate handler name '{}'", name);
            }
            entry.to_handler_config()?;
        }
        Ok(())
    }

    /// Handlers in registration order: ascending `load_on_startup`, absent
    /// last, ties in file order.
    #[must_use]
    pub fn startup_order(&self) -> Vec<&HandlerEntry> {
        let mut ordered: Vec<&HandlerEntry> = self.handlers.iter().collect();
        ordered.sort_by_key(|entry| match entry.load_on_startup {
            Some(order) => (0, order),
            None => (1, 0),
        });
        ordered
    }

    /// Look up a handler declaration by name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&HandlerEntry> {
        self.handlers.iter().find(|entry| entry.name.trim() == name)
    }
}

/// Read, parse and validate a service configuration file.
pub fn load_config(path: &Path) -> Result<ServiceConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    ServiceConfig::from_yaml_str(&content)
        .with_context(|| format!("Failed to load config file {}", path.display()))
}
