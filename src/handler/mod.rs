//! # Handler Module
//!
//! The capability set shared by every handler the dispatcher hosts, including
//! the [`DeferredInitHandler`](crate::deferred::DeferredInitHandler) wrapper,
//! which exposes exactly the same surface as the handlers it wraps.
//!
//! ## Lifecycle
//!
//! 1. A [`HandlerRegistry`](crate::registry::HandlerRegistry) factory builds the handler
//! 2. [`Handler::setup`] runs once with its [`HandlerConfig`] and a [`CancellationToken`]
//! 3. [`Handler::handle`] serves requests, possibly from many threads
//! 4. [`Handler::shutdown`] runs at most once when the host tears down
//!
//! ## Errors
//!
//! [`HandlerError`] separates configuration errors (fatal, reported from
//! `setup`), initialization errors and per-request errors. Each maps to the
//! HTTP status the dispatcher reports.

mod cancel;
mod core;
mod error;

pub use cancel::CancellationToken;
pub use self::core::{Handler, HandlerConfig};
pub use error::HandlerError;
