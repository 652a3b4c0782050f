use std::fmt;

/// Errors raised by handler setup and request handling.
///
/// The first four variants are configuration errors: they are reported
/// synchronously from `setup` and leave the handler unusable. An
/// [`Initialization`](HandlerError::Initialization) error means the handler was
/// configured correctly but could not be brought up. A
/// [`Request`](HandlerError::Request) error is produced by a live handler for a
/// single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// A required init parameter is absent or blank
    MissingParameter {
        /// Handler whose configuration is incomplete
        handler: String,
        /// Name of the missing parameter
        parameter: String,
    },
    /// An init parameter is present but cannot be interpreted
    InvalidParameter {
        /// Handler whose configuration is invalid
        handler: String,
        /// Name of the offending parameter
        parameter: String,
        /// The raw value that failed to parse
        value: String,
    },
    /// No factory is registered under the requested handler type
    UnknownHandlerType {
        /// The type key that could not be resolved
        handler_type: String,
    },
    /// `setup` was called on a handler that was already configured
    AlreadyConfigured {
        /// Handler that received the second `setup` call
        handler: String,
    },
    /// Construction or setup of a handler failed
    Initialization {
        /// Handler that failed to initialize
        handler: String,
        /// Human readable cause
        message: String,
    },
    /// A live handler rejected a request
    Request {
        /// HTTP status to report to the caller
        status: u16,
        /// Human readable cause
        message: String,
    },
}

impl HandlerError {
    /// Build an initialization error for `handler`.
    pub fn initialization(handler: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::Initialization {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// Build a request error with an explicit status.
    pub fn request(status: u16, message: impl Into<String>) -> Self {
        HandlerError::Request {
            status,
            message: message.into(),
        }
    }

    /// True for errors that are fatal at setup time.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            HandlerError::MissingParameter { .. }
                | HandlerError::InvalidParameter { .. }
                | HandlerError::UnknownHandlerType { .. }
                | HandlerError::AlreadyConfigured { .. }
        )
    }

    /// HTTP status used when this error reaches the dispatcher.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            HandlerError::Request { status, .. } => *status,
            HandlerError::Initialization { .. } => 503,
            _ => 500,
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::MissingParameter { handler, parameter } => {
                write!(
                    f,
                    "handler '{}': please set the '{}' init parameter",
                    handler, parameter
                )
            }
            HandlerError::InvalidParameter {
                handler,
                parameter,
                value,
            } => {
                write!(
                    f,
                    "handler '{}': invalid value '{}' for init parameter '{}'",
                    handler, value, parameter
                )
            }
            HandlerError::UnknownHandlerType { handler_type } => {
                write!(f, "cannot find the handler type '{}'", handler_type)
            }
            HandlerError::AlreadyConfigured { handler } => {
                write!(f, "handler '{}' has already been set up", handler)
            }
            HandlerError::Initialization { handler, message } => {
                write!(f, "failed to initialize handler '{}': {}", handler, message)
            }
            HandlerError::Request { status, message } => {
                write!(f, "request failed with status {}: {}", status, message)
            }
        }
    }
}

impl std::error::Error for HandlerError {}
