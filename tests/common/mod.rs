#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]
//! Shared fixtures for integration tests: instrumented handlers, a registry
//! preloaded with them, temp config files and a test log subscriber.

use defer_dispatch::dispatcher::{HandlerRequest, HandlerResponse};
use defer_dispatch::handler::{CancellationToken, Handler, HandlerConfig, HandlerError};
use defer_dispatch::registry::HandlerRegistry;
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const SLOW_ECHO: &str = "slow-echo";
pub const FAILING_SLOW_ECHO: &str = "failing-slow-echo";
pub const CANCELLABLE: &str = "cancellable";
pub const TEAPOT: &str = "teapot";
pub const PANICKING_SETUP: &str = "panicking-setup";

/// Setup delay of [`SlowEchoHandler`].
pub const SLOW_SETUP: Duration = Duration::from_millis(500);

/// Call counts observed across every instance built by one registry.
#[derive(Debug, Default)]
pub struct Counters {
    pub constructed: AtomicUsize,
    pub setups: AtomicUsize,
    pub handled: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl Counters {
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }

    pub fn setups(&self) -> usize {
        self.setups.load(Ordering::SeqCst)
    }

    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

/// Echo handler whose setup sleeps (ignoring cancellation) and may then fail.
pub struct SlowEchoHandler {
    delay: Duration,
    fail: bool,
    counters: Arc<Counters>,
}

impl SlowEchoHandler {
    pub fn new(delay: Duration, fail: bool, counters: Arc<Counters>) -> Self {
        counters.constructed.fetch_add(1, Ordering::SeqCst);
        Self {
            delay,
            fail,
            counters,
        }
    }
}

impl Handler for SlowEchoHandler {
    fn setup(
        &mut self,
        config: &HandlerConfig,
        _cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        thread::sleep(self.delay);
        self.counters.setups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(HandlerError::initialization(config.name(), "slow echo refused to start"));
        }
        Ok(())
    }

    fn handle(&self, req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
        self.counters.handled.fetch_add(1, Ordering::SeqCst);
        Ok(HandlerResponse::ok_json(json!({ "echo": req.path })))
    }

    fn shutdown(&self) {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handler whose setup blocks until its cancellation token fires.
pub struct CancellableHandler {
    counters: Arc<Counters>,
}

impl Handler for CancellableHandler {
    fn setup(
        &mut self,
        config: &HandlerConfig,
        cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        self.counters.setups.fetch_add(1, Ordering::SeqCst);
        if cancel.wait_timeout(Duration::from_secs(30)) {
            return Err(HandlerError::initialization(config.name(), "cancelled"));
        }
        Ok(())
    }

    fn handle(&self, _req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
        Ok(HandlerResponse::ok_json(json!({ "ok": true })))
    }

    fn shutdown(&self) {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handler that fails every request with status 418.
pub struct TeapotHandler;

impl Handler for TeapotHandler {
    fn handle(&self, _req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
        Err(HandlerError::request(418, "short and stout"))
    }
}

/// Handler whose setup panics.
pub struct PanickingSetupHandler;

impl Handler for PanickingSetupHandler {
    fn setup(
        &mut self,
        _config: &HandlerConfig,
        _cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        panic!("setup exploded");
    }

    fn handle(&self, _req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
        Ok(HandlerResponse::ok_json(json!({})))
    }
}

/// Built-in registry extended with the test handlers above.
pub fn test_registry(counters: &Arc<Counters>) -> Arc<HandlerRegistry> {
    let mut registry = HandlerRegistry::builtin();
    let c = Arc::clone(counters);
    registry.register(SLOW_ECHO, move || {
        Box::new(SlowEchoHandler::new(SLOW_SETUP, false, Arc::clone(&c)))
    });
    let c = Arc::clone(counters);
    registry.register(FAILING_SLOW_ECHO, move || {
        Box::new(SlowEchoHandler::new(SLOW_SETUP, true, Arc::clone(&c)))
    });
    let c = Arc::clone(counters);
    registry.register(CANCELLABLE, move || {
        c.constructed.fetch_add(1, Ordering::SeqCst);
        Box::new(CancellableHandler {
            counters: Arc::clone(&c),
        })
    });
    registry.register(TEAPOT, || Box::new(TeapotHandler));
    registry.register(PANICKING_SETUP, || Box::new(PanickingSetupHandler));
    Arc::new(registry)
}

/// Wrapper configuration delegating to `delegate_type`.
pub fn deferred_config(name: &str, delegate_type: &str) -> HandlerConfig {
    HandlerConfig::new(name).with_param("delegate-handler-type", delegate_type)
}

/// GET request for `handler` at `path`.
pub fn get(handler: &str, path: &str) -> HandlerRequest {
    HandlerRequest::new(http::Method::GET, handler, path)
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Write `content` to a temporary `.yaml` file that lives as long as the handle.
pub fn temp_yaml(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("defer_dispatch_test_")
        .suffix(".yaml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Route this thread's log events to the test writer.
pub fn test_tracing() -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::set_default(subscriber)
}
