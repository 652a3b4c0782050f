//! # Dispatcher Module
//!
//! The dispatcher hosts named handlers and routes requests to them by name.
//! It is the host-side placeholder mechanism the deferred wrapper plugs into:
//! a [`DeferredInitHandler`](crate::deferred::DeferredInitHandler) is registered
//! like any other handler and starts answering immediately.
//!
//! ## Handler Registration
//!
//! ```rust
//! use defer_dispatch::dispatcher::{Dispatcher, HandlerRequest};
//! use defer_dispatch::echo::EchoHandler;
//! use defer_dispatch::handler::HandlerConfig;
//! use http::Method;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher
//!     .register(&HandlerConfig::new("echo"), Box::new(EchoHandler::default()))
//!     .expect("echo setup never fails");
//!
//! let resp = dispatcher
//!     .dispatch(HandlerRequest::new(Method::GET, "echo", "/ping"))
//!     .expect("handler is registered");
//! assert_eq!(resp.status, 200);
//! ```
//!
//! ## Request Flow
//!
//! 1. Caller builds a [`HandlerRequest`] naming the target handler
//! 2. Dispatcher looks the handler up; unknown names yield `None`
//! 3. The handler runs on the caller's thread
//! 4. `Ok` responses are returned as-is, errors and panics become JSON error bodies
//!
//! ## Error Handling
//!
//! - Handler errors use [`HandlerError::status`](crate::handler::HandlerError::status)
//! - Handler panics are caught and return 500 responses
//! - Setup failures are returned from [`Dispatcher::register`] and nothing is registered

mod core;

pub use self::core::{
    generate_request_id, Dispatcher, HandlerRequest, HandlerResponse, HeaderVec, ParamVec,
    MAX_INLINE_HEADERS, MAX_INLINE_PARAMS,
};
pub(crate) use self::core::panic_message;
