//! Built-in handlers that echo the request back as JSON.
//!
//! `echo` is ready as soon as it is constructed. `delayed-echo` simulates a
//! slow-starting handler: its setup waits `init-delay-ms` milliseconds and can
//! be told to fail with `fail-on-init: true`, which makes it a convenient
//! delegate for exercising the deferred wrapper from a config file.

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::handler::{CancellationToken, Handler, HandlerConfig, HandlerError};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Init parameter: milliseconds `delayed-echo` spends in setup.
pub const INIT_DELAY_MS_PARAM: &str = "init-delay-ms";

/// Init parameter: when `true`, `delayed-echo` setup fails after its delay.
pub const FAIL_ON_INIT_PARAM: &str = "fail-on-init";

fn echo_body(name: &str, req: &HandlerRequest) -> Value {
    json!({
        "handler": name,
        "request_id": req.request_id,
        "method": req.method.to_string(),
        "path": req.path,
        "query": req.query_params_map(),
        "body": req.body,
    })
}

/// Echoes every request back as a 200 JSON response.
#[derive(Debug, Default)]
pub struct EchoHandler {
    name: String,
}

impl Handler for EchoHandler {
    fn setup(
        &mut self,
        config: &HandlerConfig,
        _cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        self.name = config.name().to_string();
        Ok(())
    }

    fn handle(&self, req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
        Ok(HandlerResponse::ok_json(echo_body(&self.name, req)))
    }
}

/// Echo handler with a configurable, cancellable setup delay.
#[derive(Debug, Default)]
pub struct DelayedEchoHandler {
    name: String,
}

impl Handler for DelayedEchoHandler {
    fn setup(
        &mut self,
        config: &HandlerConfig,
        cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        let delay = Duration::from_millis(config.u64_param(INIT_DELAY_MS_PARAM)?.unwrap_or(0));
        if cancel.wait_timeout(delay) {
            return Err(HandlerError::initialization(
                config.name(),
                "setup cancelled",
            ));
        }
        if config.bool_param(FAIL_ON_INIT_PARAM) {
            return Err(HandlerError::initialization(
                config.name(),
                format!("'{}' is set", FAIL_ON_INIT_PARAM),
            ));
        }
        self.name = config.name().to_string();
        info!(
            handler_name = %self.name,
            delay_ms = delay.as_millis() as u64,
            "Delayed echo handler ready"
        );
        Ok(())
    }

    fn handle(&self, req: &HandlerRequest) -> Result<HandlerResponse, HandlerError> {
        Ok(HandlerResponse::ok_json(echo_body(&self.name, req)))
    }

    fn shutdown(&self) {
        info!(handler_name = %self.name, "Delayed echo handler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn test_echo_reflects_request() {
        let mut handler = EchoHandler::default();
        handler
            .setup(&HandlerConfig::new("echo"), &CancellationToken::new())
            .unwrap();
        let req = HandlerRequest::new(Method::POST, "echo", "/items")
            .with_query_param("debug", "true")
            .with_body(json!({"name": "widget"}));
        let resp = handler.handle(&req).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body["handler"], "echo");
        assert_eq!(resp.body["method"], "POST");
        assert_eq!(resp.body["path"], "/items");
        assert_eq!(resp.body["query"]["debug"], "true");
        assert_eq!(resp.body["body"]["name"], "widget");
    }

    #[test]
    fn test_delayed_echo_fails_on_request() {
        let mut handler = DelayedEchoHandler::default();
        let config = HandlerConfig::new("slow").with_param(FAIL_ON_INIT_PARAM, "true");
        let err = handler
            .setup(&config, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, HandlerError::Initialization { .. }));
    }

    #[test]
    fn test_delayed_echo_honours_cancellation() {
        let mut handler = DelayedEchoHandler::default();
        let config = HandlerConfig::new("slow").with_param(INIT_DELAY_MS_PARAM, "60000");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = handler.setup(&config, &cancel).unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn test_delayed_echo_rejects_bad_delay() {
        let mut handler = DelayedEchoHandler::default();
        let config = HandlerConfig::new("slow").with_param(INIT_DELAY_MS_PARAM, "later");
        let err = handler
            .setup(&config, &CancellationToken::new())
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
