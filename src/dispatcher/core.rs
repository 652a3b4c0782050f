use crate::handler::{CancellationToken, Handler, HandlerConfig, HandlerError};
use crate::ids::RequestId;
use http::Method;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Maximum inline query parameters before heap allocation
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated header storage for the request path.
///
/// Header names use `Arc<str>` since the same few names repeat across requests.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Stack-allocated query parameter storage.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Generate a unique request ID for tracing (ULID string)
#[must_use]
pub fn generate_request_id() -> String {
    RequestId::new().to_string()
}

/// Request data handed to a handler.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path
    pub path: String,
    /// Name of the handler that should process this request
    pub handler_name: String,
    /// Query string parameters (stack-allocated for ≤8 params)
    pub query_params: ParamVec,
    /// HTTP headers (stack-allocated for ≤16 headers)
    pub headers: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
}

impl HandlerRequest {
    /// Create a request for `handler_name` with no parameters, headers or body.
    pub fn new(method: Method, handler_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: path.into(),
            handler_name: handler_name.into(),
            query_params: ParamVec::new(),
            headers: HeaderVec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_query_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query_params.push((Arc::from(name), value.into()));
        self
    }

    /// Adds a header. `x-request-id` also replaces the request id when it parses.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("x-request-id") {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Get a query parameter by name
    ///
    /// Uses "last write wins" semantics: `?limit=10&limit=20` yields `20`.
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Convert query_params to HashMap. Allocates.
    #[must_use]
    pub fn query_params_map(&self) -> HashMap<String, String> {
        self.query_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Response produced by a handler.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 502, etc.)
    pub status: u16,
    /// HTTP response headers
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// Response body as JSON
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Create a JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn ok_json(body: Value) -> Self {
        Self::json(200, body)
    }

    /// Create an error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header by name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Render a caught panic payload for logs and error bodies.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Host for named handlers.
///
/// Handlers are set up when registered and then called directly on the
/// caller's thread, so `dispatch` only blocks for as long as the handler
/// itself does. Errors and panics are turned into JSON error responses.
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn Handler>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("Dispatcher")
            .field("handlers", &names)
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Dispatcher {
            handlers: HashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set up `handler` with `config` and register it under `config.name()`.
    ///
    /// If setup fails the handler is dropped and the error returned. If a
    /// handler with the same name already exists it is replaced and shut down.
    pub fn register(
        &mut self,
        config: &HandlerConfig,
        mut handler: Box<dyn Handler>,
    ) -> Result<(), HandlerError> {
        let handler_name = config.name().to_string();
        let started = Instant::now();

        let setup = catch_unwind(AssertUnwindSafe(|| handler.setup(config, &self.cancel)));
        match setup {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(
                    handler_name = %handler_name,
                    error = %e,
                    "Handler setup failed"
                );
                return Err(e);
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    handler_name = %handler_name,
                    panic_message = %message,
                    "Handler setup panicked"
                );
                return Err(HandlerError::initialization(handler_name, message));
            }
        }

        let handler: Arc<dyn Handler> = Arc::from(handler);
        if let Some(old) = self.handlers.insert(handler_name.clone(), handler) {
            warn!(
                handler_name = %handler_name,
                "Replaced existing handler - shutting down the old instance"
            );
            old.shutdown();
        }

        info!(
            handler_name = %handler_name,
            setup_ms = started.elapsed().as_millis() as u64,
            total_handlers = self.handlers.len(),
            "Handler registered successfully"
        );
        Ok(())
    }

    /// Dispatch a request to the handler named by `req.handler_name`.
    ///
    /// Returns `None` when no such handler is registered.
    #[must_use]
    pub fn dispatch(&self, req: HandlerRequest) -> Option<HandlerResponse> {
        debug!(
            request_id = %req.request_id,
            handler_name = %req.handler_name,
            available_handlers = self.handlers.len(),
            "Handler lookup"
        );

        let Some(handler) = self.handlers.get(&req.handler_name) else {
            let available_handlers: Vec<&String> = self.handlers.keys().collect();
            error!(
                request_id = %req.request_id,
                handler_name = %req.handler_name,
                available_handlers = ?available_handlers,
                "Handler not found"
            );
            return None;
        };

        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(&req)));
        let latency_ms = start.elapsed().as_millis() as u64;

        let resp = match outcome {
            Ok(Ok(resp)) => {
                info!(
                    request_id = %req.request_id,
                    handler_name = %req.handler_name,
                    method = %req.method,
                    path = %req.path,
                    status = resp.status,
                    latency_ms,
                    "Handler response"
                );
                resp
            }
            Ok(Err(e)) => {
                warn!(
                    request_id = %req.request_id,
                    handler_name = %req.handler_name,
                    status = e.status(),
                    error = %e,
                    latency_ms,
                    "Handler returned an error"
                );
                HandlerResponse::error(e.status(), &e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    request_id = %req.request_id,
                    handler_name = %req.handler_name,
                    panic_message = %message,
                    "Handler panicked - CRITICAL"
                );
                HandlerResponse::error(500, &format!("Handler panicked: {}", message))
            }
        };
        Some(resp)
    }

    /// Look up a live handler by name.
    #[must_use]
    pub fn handler(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(name).map(Arc::clone)
    }

    #[must_use]
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Cancel pending setups and shut every handler down once.
    ///
    /// The dispatcher is empty afterwards and may be reused.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        for (name, handler) in self.handlers.drain() {
            debug!(handler_name = %name, "Shutting down handler");
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler.shutdown())) {
                error!(
                    handler_name = %name,
                    panic_message = %panic_message(panic.as_ref()),
                    "Handler shutdown panicked"
                );
            }
        }
        self.cancel = CancellationToken::new();
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if !self.handlers.is_empty() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_last_write_wins() {
        let req = HandlerRequest::new(Method::GET, "h", "/items")
            .with_query_param("limit", "10")
            .with_query_param("limit", "20");
        assert_eq!(req.get_query_param("limit"), Some("20"));
        assert_eq!(req.get_query_param("offset"), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = HandlerRequest::new(Method::GET, "h", "/").with_header("X-Trace", "abc");
        assert_eq!(req.get_header("x-trace"), Some("abc"));
    }

    #[test]
    fn test_request_id_header_is_adopted() {
        let id = generate_request_id();
        let req = HandlerRequest::new(Method::GET, "h", "/").with_header("X-Request-Id", id.clone());
        assert_eq!(req.request_id.to_string(), id);
    }

    #[test]
    fn test_error_response_shape() {
        let resp = HandlerResponse::error(502, "not loaded yet");
        assert_eq!(resp.status, 502);
        assert!(!resp.is_success());
        assert_eq!(resp.get_header("Content-Type"), Some("application/json"));
        assert_eq!(resp.body["error"], "not loaded yet");
    }

    #[test]
    fn test_set_header_replaces() {
        let mut resp = HandlerResponse::ok_json(serde_json::json!({}));
        resp.set_header("Content-Type", "text/plain".to_string());
        assert_eq!(resp.get_header("content-type"), Some("text/plain"));
        assert_eq!(resp.headers.len(), 1);
    }

    #[test]
    fn test_panic_message_downcasts() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
