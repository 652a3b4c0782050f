use super::state::{AtomicInitState, InitState};
use crate::dispatcher::{panic_message, HandlerRequest, HandlerResponse};
use crate::handler::{CancellationToken, Handler, HandlerConfig, HandlerError};
use crate::registry::{HandlerFactory, HandlerRegistry};
use crate::runtime_config::RuntimeConfig;
use arc_swap::ArcSwapOption;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Registry key under which configuration refers to the wrapper itself.
pub const DEFERRED_INIT_HANDLER_TYPE: &str = "deferred-init";

/// Init parameter naming the delegate's registry key. Required.
pub const DELEGATE_HANDLER_TYPE_PARAM: &str = "delegate-handler-type";

/// Init parameter that, when `true`, runs the delegate's setup inside `setup`.
pub const DEFERRED_INIT_DISABLED_PARAM: &str = "deferred-init-disabled";

/// Status returned while the delegate is not available.
pub const NOT_READY_STATUS: u16 = 502;

struct Delegate(Box<dyn Handler>);

/// State shared between the wrapper and its initialization thread.
struct Shared {
    /// Written once by the init thread, emptied once by shutdown.
    slot: ArcSwapOption<Delegate>,
    state: AtomicInitState,
    cancel: CancellationToken,
    /// Serializes "publish then check cancel" against "cancel then take".
    lifecycle: Mutex<()>,
}

impl Shared {
    fn lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Everything the initialization thread needs, moved in at spawn time.
struct InitJob {
    handler_name: String,
    delegate_type: String,
    factory: HandlerFactory,
    config: HandlerConfig,
    shared: Arc<Shared>,
}

impl InitJob {
    fn run(self) {
        let InitJob {
            handler_name,
            delegate_type,
            factory,
            config,
            shared,
        } = self;

        if shared.cancel.is_cancelled() {
            info!(
                handler_name = %handler_name,
                delegate_type = %delegate_type,
                "Shutdown requested before delegate initialization started"
            );
            shared.state.store(InitState::Stopped);
            return;
        }

        let started = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let mut delegate = factory();
            delegate.setup(&config, &shared.cancel).map(|()| delegate)
        }));

        let delegate = match outcome {
            Ok(Ok(delegate)) => delegate,
            Ok(Err(e)) if shared.cancel.is_cancelled() => {
                info!(
                    handler_name = %handler_name,
                    delegate_type = %delegate_type,
                    error = %e,
                    "Delegate initialization abandoned after shutdown"
                );
                shared.state.store(InitState::Stopped);
                return;
            }
            Ok(Err(e)) => {
                error!(
                    handler_name = %handler_name,
                    delegate_type = %delegate_type,
                    error = %e,
                    "Failed to initialize delegate handler"
                );
                shared.state.store(InitState::Failed);
                return;
            }
            Err(panic) => {
                error!(
                    handler_name = %handler_name,
                    delegate_type = %delegate_type,
                    panic_message = %panic_message(panic.as_ref()),
                    "Delegate handler panicked during initialization"
                );
                shared.state.store(InitState::Failed);
                return;
            }
        };

        let orphaned = {
            let _guard = shared.lifecycle();
            if shared.cancel.is_cancelled() {
                shared.state.store(InitState::Stopped);
                Some(delegate)
            } else {
                shared.slot.store(Some(Arc::new(Delegate(delegate))));
                shared.state.store(InitState::Ready);
                None
            }
        };

        match orphaned {
            Some(delegate) => {
                warn!(
                    handler_name = %handler_name,
                    delegate_type = %delegate_type,
                    "Shutdown requested during initialization - stopping delegate"
                );
                if let Err(panic) = catch_unwind(AssertUnwindSafe(|| delegate.shutdown())) {
                    error!(
                        handler_name = %handler_name,
                        delegate_type = %delegate_type,
                        panic_message = %panic_message(panic.as_ref()),
                        "Delegate handler shutdown panicked"
                    );
                }
            }
            None => {
                info!(
                    handler_name = %handler_name,
                    delegate_type = %delegate_type,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Initialization of delegate handler done"
                );
            }
        }
    }
}

/// Placeholder handler that builds its delegate off the startup path.
///
/// Register it with the dispatcher in place of a slow handler. Setup resolves
/// `delegate-handler-type` in the registry and returns at once, while a
/// background thread constructs and sets up the delegate. Until that finishes
/// every request gets a `502` response; afterwards requests are forwarded
/// unchanged.
///
/// ```rust
/// use defer_dispatch::deferred::{DeferredInitHandler, InitState};
/// use defer_dispatch::handler::{CancellationToken, Handler, HandlerConfig};
/// use defer_dispatch::registry::HandlerRegistry;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let mut wrapper = DeferredInitHandler::new(Arc::new(HandlerRegistry::builtin()));
/// let config = HandlerConfig::new("reports")
///     .with_param("delegate-handler-type", "delayed-echo")
///     .with_param("init-delay-ms", "50");
/// wrapper.setup(&config, &CancellationToken::new()).unwrap();
///
/// assert_eq!(wrapper.wait_for_outcome(Duration::from_secs(5)), InitState::Ready);
/// wrapper.shutdown();
/// ```
pub struct DeferredInitHandler {
    registry: Arc<HandlerRegistry>,
    runtime: RuntimeConfig,
    handler_name: String,
    delegate_type: String,
    shared: Arc<Shared>,
    init_task: Mutex<Option<JoinHandle<()>>>,
}

impl DeferredInitHandler {
    /// Wrapper resolving delegates in `registry`, tuned from the environment.
    #[must_use]
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self::with_runtime_config(registry, RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_runtime_config(registry: Arc<HandlerRegistry>, runtime: RuntimeConfig) -> Self {
        Self {
            registry,
            runtime,
            handler_name: String::new(),
            delegate_type: String::new(),
            shared: Arc::new(Shared {
                slot: ArcSwapOption::empty(),
                state: AtomicInitState::new(InitState::Unconfigured),
                cancel: CancellationToken::new(),
                lifecycle: Mutex::new(()),
            }),
            init_task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> InitState {
        self.shared.state.load()
    }

    /// True while a delegate is published.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.shared.slot.load().is_some()
    }

    /// Registry key of the delegate, empty before `setup`.
    #[must_use]
    pub fn delegate_type(&self) -> &str {
        &self.delegate_type
    }

    /// Poll until initialization settles or `timeout` elapses; returns the last state seen.
    pub fn wait_for_outcome(&self, timeout: Duration) -> InitState {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.state();
            if state.is_settled() || state == InitState::Unconfigured || Instant::now() >= deadline
            {
                return state;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn not_ready_response(&self) -> HandlerResponse {
        HandlerResponse::error(
            NOT_READY_STATUS,
            &format!(
                "DeferredInitHandler: delegate handler '{}' not loaded yet",
                self.delegate_type
            ),
        )
    }

    fn task_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.init_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Handler for DeferredInitHandler {
    /// Resolve the delegate type, then initialize it in the background or,
    /// with `deferred-init-disabled: true`, right here.
    ///
    /// Only configuration errors are returned. A delegate that fails to
    /// initialize is logged and leaves the wrapper answering `502`; this
    /// holds in the synchronous mode too, where the caller cannot tell from
    /// the return value and has to look at [`DeferredInitHandler::state`].
    fn setup(
        &mut self,
        config: &HandlerConfig,
        _cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        if self.state() != InitState::Unconfigured {
            return Err(HandlerError::AlreadyConfigured {
                handler: config.name().to_string(),
            });
        }

        let delegate_type = config.required_param(DELEGATE_HANDLER_TYPE_PARAM)?.to_string();
        let factory = self.registry.factory(&delegate_type).inspect_err(|e| {
            error!(
                handler_name = %config.name(),
                delegate_type = %delegate_type,
                error = %e,
                "Cannot resolve the delegate handler type"
            );
        })?;
        let deferred_init_disabled = config.bool_param(DEFERRED_INIT_DISABLED_PARAM);

        self.handler_name = config.name().to_string();
        self.delegate_type = delegate_type.clone();
        self.shared.state.store(InitState::Initializing);

        let job = InitJob {
            handler_name: self.handler_name.clone(),
            delegate_type,
            factory,
            config: config.clone(),
            shared: Arc::clone(&self.shared),
        };

        if deferred_init_disabled {
            debug!(
                handler_name = %self.handler_name,
                delegate_type = %self.delegate_type,
                "Deferred initialization disabled - initializing delegate in place"
            );
            job.run();
            return Ok(());
        }

        let spawned = thread::Builder::new()
            .name(format!("deferred-init-{}", self.handler_name))
            .stack_size(self.runtime.init_stack_size)
            .spawn(move || job.run());

        match spawned {
            Ok(handle) => {
                debug!(
                    handler_name = %self.handler_name,
                    delegate_type = %self.delegate_type,
                    stack_size = self.runtime.init_stack_size,
                    "Delegate initialization thread started"
                );
                *self.task_slot() = Some(handle);
            }
            Err(e) => {
                error!(
                    handler_name = %self.handler_name,
                    delegate_type = %self.delegate_type,
                    error = %e,
                    "Failed to spawn delegate initialization thread"
                );
                self.shared.state.store(InitState::Failed);
            }
        }
        Ok(())
    }

    fn handle(&self, req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
        match self.shared.slot.load_full() {
            Some(delegate) => delegate.0.handle(req),
            None => {
                debug!(
                    request_id = %req.request_id,
                    handler_name = %self.handler_name,
                    delegate_type = %self.delegate_type,
                    state = %self.state(),
                    "Delegate handler not loaded yet"
                );
                Ok(self.not_ready_response())
            }
        }
    }

    fn shutdown(&self) {
        if let Some(task) = self.task_slot().take() {
            if !task.is_finished() {
                info!(
                    handler_name = %self.handler_name,
                    delegate_type = %self.delegate_type,
                    "Signalling delegate initialization to stop"
                );
            }
        }

        let taken = {
            let _guard = self.shared.lifecycle();
            self.shared.cancel.cancel();
            self.shared.slot.swap(None)
        };

        if let Some(delegate) = taken {
            self.shared.state.transition(InitState::Ready, InitState::Stopped);
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| delegate.0.shutdown())) {
                error!(
                    handler_name = %self.handler_name,
                    delegate_type = %self.delegate_type,
                    panic_message = %panic_message(panic.as_ref()),
                    "Delegate handler shutdown panicked"
                );
            } else {
                info!(
                    handler_name = %self.handler_name,
                    delegate_type = %self.delegate_type,
                    "Delegate handler shut down"
                );
            }
        }
    }
}

impl Drop for DeferredInitHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
