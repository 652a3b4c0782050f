//! # Deferred Initialization
//!
//! [`DeferredInitHandler`] stands in for a handler whose setup is too slow to
//! run on the startup path. It is registered like any other handler, names its
//! delegate through the `delegate-handler-type` init parameter, and builds that
//! delegate on a dedicated background thread.
//!
//! ## Request behaviour
//!
//! - Before the delegate is published: `502` with
//!   `{"error": "DeferredInitHandler: delegate handler '<type>' not loaded yet"}`
//! - After it is published: the delegate's result, unchanged
//! - After a failed initialization: `502`, for the lifetime of the wrapper
//!
//! Readiness is monotonic. Once a request has seen the delegate, no later
//! request sees the placeholder again until shutdown.
//!
//! ## Shutdown
//!
//! Shutdown signals the initialization thread through its
//! [`CancellationToken`](crate::handler::CancellationToken) and stops the
//! delegate exactly once, whether the delegate was published before shutdown
//! or finishes initializing afterwards.
//!
//! ## Configuration
//!
//! | Parameter | Meaning |
//! |-----------|---------|
//! | `delegate-handler-type` | Registry key of the delegate (required) |
//! | `deferred-init-disabled` | `true` runs the delegate's setup inside `setup` |
//!
//! All other parameters are passed through to the delegate. The stack size of
//! the initialization thread comes from
//! [`RuntimeConfig`](crate::runtime_config::RuntimeConfig).

mod core;
mod state;

pub use self::core::{
    DeferredInitHandler, DEFERRED_INIT_DISABLED_PARAM, DEFERRED_INIT_HANDLER_TYPE,
    DELEGATE_HANDLER_TYPE_PARAM, NOT_READY_STATUS,
};
pub use state::InitState;
