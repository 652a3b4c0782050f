//! # defer-dispatch
//!
//! **defer-dispatch** hosts named request handlers and lets a slow-starting
//! handler be deployed behind a [`DeferredInitHandler`], which takes its
//! expensive setup off the startup path. The process starts serving at once;
//! requests for the deferred handler get a `502` until its delegate is ready
//! and are forwarded unchanged from then on.
//!
//! ## Architecture
//!
//! - **[`handler`]** - The [`Handler`] capability set (setup, handle, shutdown),
//!   its configuration, errors and cancellation token
//! - **[`registry`]** - String-keyed handler factories, resolved at deploy time
//! - **[`deferred`]** - The deferred-initialization wrapper
//! - **[`dispatcher`]** - Hosts handlers by name and turns errors and panics into responses
//! - **[`config`]** - YAML service configuration
//! - **[`deploy`](mod@deploy)** - Builds a dispatcher from a configuration
//! - **[`echo`]** - Built-in `echo` and `delayed-echo` handlers
//! - **[`runtime_config`]** - Environment tuning for background threads
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`ids`]** - Request IDs
//! - **[`cli`]** - The `defer-dispatch` command line
//!
//! ### Deferred Initialization Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host as Dispatcher
//!     participant Wrapper as DeferredInitHandler
//!     participant Registry as HandlerRegistry
//!     participant Init as deferred-init thread
//!     participant Delegate
//!
//!     Host->>Wrapper: setup(config)
//!     Wrapper->>Registry: factory(delegate-handler-type)
//!     alt Unknown type
//!         Registry-->>Host: UnknownHandlerType
//!     end
//!     Wrapper->>Init: spawn
//!     Wrapper-->>Host: Ok
//!     Host->>Wrapper: handle(request)
//!     Wrapper-->>Host: 502 not loaded yet
//!     Init->>Delegate: factory() + setup(config)
//!     Init->>Wrapper: publish delegate
//!     Host->>Wrapper: handle(request)
//!     Wrapper->>Delegate: handle(request)
//!     Delegate-->>Host: response
//!     Host->>Wrapper: shutdown()
//!     Wrapper->>Init: cancel
//!     Wrapper->>Delegate: shutdown()
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use defer_dispatch::config::ServiceConfig;
//! use defer_dispatch::deploy;
//! use defer_dispatch::dispatcher::HandlerRequest;
//! use defer_dispatch::registry::HandlerRegistry;
//! use http::Method;
//! use std::sync::Arc;
//!
//! let config = ServiceConfig::from_yaml_str(
//!     r#"
//! handlers:
//!   - name: reports
//!     type: deferred-init
//!     params:
//!       delegate-handler-type: delayed-echo
//!       init-delay-ms: 60000
//! "#,
//! )
//! .unwrap();
//!
//! let mut dispatcher = deploy(&config, &Arc::new(HandlerRegistry::builtin())).unwrap();
//! let resp = dispatcher
//!     .dispatch(HandlerRequest::new(Method::GET, "reports", "/"))
//!     .unwrap();
//! assert_eq!(resp.status, 502);
//! dispatcher.shutdown();
//! ```

pub mod cli;
pub mod config;
pub mod deferred;
pub mod deploy;
pub mod dispatcher;
pub mod echo;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod registry;
pub mod runtime_config;

pub use config::{load_config, ServiceConfig};
pub use deferred::{DeferredInitHandler, InitState};
pub use deploy::deploy;
pub use dispatcher::{Dispatcher, HandlerRequest, HandlerResponse};
pub use handler::{CancellationToken, Handler, HandlerConfig, HandlerError};
pub use registry::HandlerRegistry;
