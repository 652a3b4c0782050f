use super::{CancellationToken, HandlerError};
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use std::collections::BTreeMap;

/// The capability set every handler exposes: setup, handle, shutdown.
///
/// Handlers are constructed by a [`HandlerRegistry`](crate::registry::HandlerRegistry)
/// factory, set up exactly once with exclusive access, and then shared
/// behind an `Arc` so `handle` may be called from many threads at once.
pub trait Handler: Send + Sync {
    /// One-time initialization. May be slow.
    ///
    /// Long running setups should watch `cancel` and bail out with an
    /// [`HandlerError::Initialization`] once it fires.
    fn setup(
        &mut self,
        _config: &HandlerConfig,
        _cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Serve one request.
    fn handle(&self, req: &HandlerRequest) -> Result<HandlerResponse, HandlerError>;

    /// Release resources. Called at most once, after a successful setup.
    fn shutdown(&self) {}
}

/// Name and init parameters a handler is set up with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerConfig {
    name: String,
    params: BTreeMap<String, String>,
}

impl HandlerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter insertion.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn insert_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Trimmed, non-empty value of `key`.
    pub fn required_param(&self, key: &str) -> Result<&str, HandlerError> {
        match self.param(key).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(HandlerError::MissingParameter {
                handler: self.name.clone(),
                parameter: key.to_string(),
            }),
        }
    }

    /// Lenient boolean: `true` in any letter case is true, anything else is false.
    #[must_use]
    pub fn bool_param(&self, key: &str) -> bool {
        self.param(key)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Optional unsigned integer parameter; a present but malformed value is an error.
    pub fn u64_param(&self, key: &str) -> Result<Option<u64>, HandlerError> {
        let Some(raw) = self.param(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| HandlerError::InvalidParameter {
                handler: self.name.clone(),
                parameter: key.to_string(),
                value: raw.to_string(),
            })
    }
}
