//! stratus-functions — trigger router for locally hosted functions.
//!
//! Turns per-function manifests into live HTTP routes, queue
//! subscriptions, and timer schedules, and runs handlers with the
//! arguments their manifest and declared capabilities call for.
//!
//! # Lifecycle
//!
//! ```text
//! function dir ── Manifest::load ──► Function (manifest + handler + capabilities)
//!                                        │
//!        ┌───────────────────────────────┼──────────────────────────────┐
//!        ▼                               ▼                              ▼
//!  httpTrigger                    serviceBusTrigger               timerTrigger
//!  RouteTemplate → RouteEntry     Dispatcher::subscribe           Schedule → TimerScheduler
//!        │                               │                              │
//!        ▼                               ▼                              ▼
//!  axum Router → invoke           worker pool → invoke            timer loop → invoke
//!        │
//!        ▼
//!  HandlerOutput → Response
//! ```
//!
//! Handlers are Rust closures registered in a [`HandlerRegistry`] under
//! the name of their function directory.

pub mod app;
pub mod error;
pub mod function;
pub mod handler;
pub mod invoke;
pub mod manifest;
pub mod output;
pub mod response;
pub mod route;
pub mod router;
pub mod timer;

pub use app::FunctionApp;
pub use error::{FunctionError, FunctionResult, ManifestError, ManifestResult};
pub use function::{Function, QueueSubscriber};
pub use handler::{Capabilities, Handler, HandlerFuture, HandlerRegistry};
pub use invoke::{Context, HttpRequest, Invocation, TimerRequest, Trigger};
pub use manifest::{Binding, BindingKind, Manifest};
pub use output::BlobOutput;
pub use response::{HandlerOutput, HttpResponse, ResponseBody};
pub use route::{RouteParams, RoutePattern, RouteTemplate};
pub use router::{RouteEntry, build_router};
pub use timer::{Schedule, TimerScheduler};
