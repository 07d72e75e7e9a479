//! Invocation arguments.
//!
//! An [`Invocation`] carries the arguments handed to a handler in a fixed
//! order: the trigger payload, then the execution context (only when the
//! handler asked for it), then the output blob binding (only when the
//! manifest declares one).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::http::{HeaderMap, Method};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use stratus_dispatch::QueueMessage;

use crate::output::BlobOutput;
use crate::route::RouteParams;

/// Per-call execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    function_name: String,
    function_directory: PathBuf,
    invocation_id: String,
}

impl Context {
    /// A context with a fresh invocation id.
    pub fn new(function_name: impl Into<String>, function_directory: impl Into<PathBuf>) -> Self {
        Self {
            function_name: function_name.into(),
            function_directory: function_directory.into(),
            invocation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn function_directory(&self) -> &Path {
        &self.function_directory
    }

    pub fn invocation_id(&self) -> &str {
        &self.invocation_id
    }
}

/// An inbound HTTP request as seen by a handler.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    params: HashMap<String, String>,
    route_params: RouteParams,
    body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            params: HashMap::new(),
            route_params: RouteParams::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_route_params(mut self, route_params: RouteParams) -> Self {
        self.route_params = route_params;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Decoded query string parameters.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn route_params(&self) -> &RouteParams {
        &self.route_params
    }

    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name).map(String::as_str)
    }

    pub fn get_body(&self) -> &Bytes {
        &self.body
    }

    pub fn get_json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerRequest {
    past_due: bool,
}

impl TimerRequest {
    pub fn new(past_due: bool) -> Self {
        Self { past_due }
    }

    /// True when the tick fired at least one full period late.
    pub fn past_due(&self) -> bool {
        self.past_due
    }
}

#[derive(Debug, Clone)]
pub enum Trigger {
    Http(HttpRequest),
    Queue(QueueMessage),
    Timer(TimerRequest),
}

impl Trigger {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Queue(_) => "queue",
            Self::Timer(_) => "timer",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Invocation {
    trigger: Trigger,
    context: Option<Context>,
    output: Option<BlobOutput>,
}

impl Invocation {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            context: None,
            output: None,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_output(mut self, output: BlobOutput) -> Self {
        self.output = Some(output);
        self
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn http(&self) -> Option<&HttpRequest> {
        match &self.trigger {
            Trigger::Http(request) => Some(request),
            _ => None,
        }
    }

    pub fn queue(&self) -> Option<&QueueMessage> {
        match &self.trigger {
            Trigger::Queue(message) => Some(message),
            _ => None,
        }
    }

    pub fn timer(&self) -> Option<&TimerRequest> {
        match &self.trigger {
            Trigger::Timer(request) => Some(request),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    pub fn output(&self) -> Option<&BlobOutput> {
        self.output.as_ref()
    }

    /// The arguments in call order.
    pub fn into_parts(self) -> (Trigger, Option<Context>, Option<BlobOutput>) {
        (self.trigger, self.context, self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contexts_get_fresh_ids() {
        let a = Context::new("hello", "/srv/hello");
        let b = Context::new("hello", "/srv/hello");
        assert_ne!(a.invocation_id(), b.invocation_id());
        assert_eq!(a.function_name(), "hello");
        assert_eq!(a.function_directory(), Path::new("/srv/hello"));
    }

    #[test]
    fn request_accessors() {
        let request = HttpRequest::new(Method::POST, "http://localhost/api/items/7?name=x")
            .with_params(HashMap::from([("name".to_string(), "x".to_string())]))
            .with_route_params(RouteParams::from([("id".to_string(), "7".to_string())]))
            .with_body(&br#"{"count": 3}"#[..]);

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.param("name"), Some("x"));
        assert_eq!(request.param("missing"), None);
        assert_eq!(request.route_param("id"), Some("7"));
        let json: serde_json::Value = request.get_json().unwrap();
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn invocation_parts_keep_order() {
        let invocation = Invocation::new(Trigger::Timer(TimerRequest::new(true)))
            .with_context(Context::new("tick", "/srv/tick"));
        assert!(invocation.timer().unwrap().past_due());
        assert!(invocation.http().is_none());
        assert!(invocation.output().is_none());

        let (trigger, context, output) = invocation.into_parts();
        assert_eq!(trigger.kind(), "timer");
        assert_eq!(context.unwrap().function_name(), "tick");
        assert!(output.is_none());
    }
}
