//! Builds a [`Dispatcher`] from a [`ServiceConfig`].
//!
//! Handlers are constructed and set up one by one in startup order. A handler
//! of type `deferred-init` becomes a [`DeferredInitHandler`] that resolves its
//! delegate in the same registry; every other type comes straight from the
//! registry. The first failure aborts the deployment and shuts down whatever
//! was already registered.

use crate::config::ServiceConfig;
use crate::deferred::{DeferredInitHandler, DEFERRED_INIT_HANDLER_TYPE};
use crate::dispatcher::Dispatcher;
use crate::handler::{Handler, HandlerError};
use crate::registry::HandlerRegistry;
use crate::runtime_config::RuntimeConfig;
use std::sync::Arc;
use tracing::{error, info};

/// Construct the handler for a configured type key.
pub fn build_handler(
    handler_type: &str,
    registry: &Arc<HandlerRegistry>,
    runtime: RuntimeConfig,
) -> Result<Box<dyn Handler>, HandlerError> {
    if handler_type.trim() == DEFERRED_INIT_HANDLER_TYPE {
        return Ok(Box::new(DeferredInitHandler::with_runtime_config(
            Arc::clone(registry),
            runtime,
        )));
    }
    registry.create(handler_type)
}

/// Deploy every configured handler into a new dispatcher.
pub fn deploy(
    config: &ServiceConfig,
    registry: &Arc<HandlerRegistry>,
) -> Result<Dispatcher, HandlerError> {
    deploy_with_runtime(config, registry, RuntimeConfig::from_env())
}

/// [`deploy`] with explicit runtime tuning.
pub fn deploy_with_runtime(
    config: &ServiceConfig,
    registry: &Arc<HandlerRegistry>,
    runtime: RuntimeConfig,
) -> Result<Dispatcher, HandlerError> {
    let mut dispatcher = Dispatcher::new();
    for entry in config.startup_order() {
        let registered = entry.to_handler_config().and_then(|handler_config| {
            let handler = build_handler(&entry.handler_type, registry, runtime)?;
            dispatcher.register(&handler_config, handler)
        });
        if let Err(e) = registered {
            error!(
                handler_name = %entry.name,
                handler_type = %entry.handler_type,
                error = %e,
                registered = dispatcher.len(),
                "Deployment failed - shutting down registered handlers"
            );
            dispatcher.shutdown();
            return Err(e);
        }
    }
    info!(
        handlers = dispatcher.len(),
        names = ?dispatcher.handler_names(),
        "Service deployed"
    );
    Ok(dispatcher)
}
