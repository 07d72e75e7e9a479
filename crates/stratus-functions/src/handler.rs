//! Handlers and the compiled-in handler registry.
//!
//! A handler is an async callback taking an [`Invocation`]. Whether it
//! receives the execution context is declared when the handler is built;
//! whether it receives an output binding follows from the manifest. Both
//! are fixed at registration in [`Capabilities`].

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::invoke::Invocation;
use crate::manifest::Manifest;
use crate::response::HandlerOutput;

pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<HandlerOutput>> + Send>>;

/// Callback type behind every [`Handler`].
pub type HandlerFn = Arc<dyn Fn(Invocation) -> HandlerFuture + Send + Sync>;

#[derive(Clone)]
pub struct Handler {
    func: HandlerFn,
    accepts_context: bool,
}

impl Handler {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<HandlerOutput>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |invocation: Invocation| -> HandlerFuture {
                Box::pin(func(invocation))
            }),
            accepts_context: false,
        }
    }

    /// Ask for the execution context on every call.
    pub fn with_context(mut self) -> Self {
        self.accepts_context = true;
        self
    }

    pub fn accepts_context(&self) -> bool {
        self.accepts_context
    }

    pub fn call(&self, invocation: Invocation) -> HandlerFuture {
        (self.func)(invocation)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("accepts_context", &self.accepts_context)
            .finish_non_exhaustive()
    }
}

/// Which optional arguments a function receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub accepts_context: bool,
    pub accepts_output_binding: bool,
}

impl Capabilities {
    pub fn resolve(handler: &Handler, manifest: &Manifest) -> Self {
        Self {
            accepts_context: handler.accepts_context(),
            accepts_output_binding: manifest.blob_output().is_some(),
        }
    }
}

/// Handlers by function name. Function directories are matched against
/// this registry during discovery.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, handler: Handler) -> &mut Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
