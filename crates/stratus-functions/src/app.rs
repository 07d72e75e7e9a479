//! FunctionApp — registration of functions against their triggers.
//!
//! Registering a function loads its manifest and then installs, for each
//! trigger it declares, an HTTP route, a queue subscription, or a timer
//! schedule. Registration is permanent for the life of the app.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use stratus_core::Environment;
use stratus_core::config::HttpConfig;
use stratus_dispatch::{Dispatcher, StorageEngine};
use stratus_storage::BlobStore;

use crate::error::{FunctionError, FunctionResult, ManifestError};
use crate::function::{Function, QueueSubscriber};
use crate::handler::{Handler, HandlerRegistry};
use crate::manifest::{HttpMethod, Manifest};
use crate::route::{RoutePattern, RouteTemplate};
use crate::router::{RouteEntry, build_router};
use crate::timer::{Schedule, TimerScheduler};

pub struct FunctionApp {
    store: BlobStore,
    dispatcher: Arc<Dispatcher>,
    env: Arc<Environment>,
    http: HttpConfig,
    functions: Vec<Arc<Function>>,
    routes: Vec<RouteEntry>,
    timers: Vec<(Arc<Function>, Schedule)>,
}

impl FunctionApp {
    pub fn new(
        store: BlobStore,
        dispatcher: Arc<Dispatcher>,
        env: Environment,
        http: &HttpConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            env: Arc::new(env),
            http: http.clone(),
            functions: Vec::new(),
            routes: Vec::new(),
            timers: Vec::new(),
        }
    }

    pub fn from_engine(engine: &StorageEngine, env: Environment, http: &HttpConfig) -> Self {
        Self::new(engine.blobs().clone(), engine.dispatcher().clone(), env, http)
    }

    /// Register the function in `directory` with `handler`.
    ///
    /// Every trigger is validated before anything is installed, so a
    /// failed registration leaves the app unchanged.
    pub fn register(&mut self, directory: &Path, handler: Handler) -> FunctionResult<Arc<Function>> {
        let manifest = Manifest::load(directory)?;
        let function = Arc::new(Function::new(
            directory,
            manifest,
            handler,
            self.store.clone(),
            self.env.clone(),
        ));
        let manifest = function.manifest();

        let mut routes = Vec::new();
        if let Some(http) = manifest.http_trigger() {
            let patterns = RouteTemplate::parse(&http.route)?.compile(&self.http.api_prefix);
            let methods = served_methods(function.name(), &http.methods);
            for pattern in patterns {
                self.check_route(&pattern, &methods)?;
                routes.push(RouteEntry {
                    pattern,
                    methods: methods.clone(),
                    function: function.clone(),
                });
            }
        }

        let schedule = manifest.timer_trigger().and_then(|timer| {
            let schedule = Schedule::parse(&timer.schedule);
            if schedule.is_none() {
                warn!(
                    function = function.name(),
                    schedule = %timer.schedule,
                    "unsupported timer schedule, function will not be scheduled"
                );
            }
            schedule
        });

        for entry in routes {
            info!(
                function = function.name(),
                route = %entry.pattern,
                methods = ?entry.methods,
                "http route registered"
            );
            self.routes.push(entry);
        }
        if let Some(queue) = manifest.queue_trigger() {
            let queue = self.env.expand(&queue.queue_name);
            self.dispatcher
                .subscribe(&queue, Arc::new(QueueSubscriber::new(function.clone())));
        }
        if let Some(schedule) = schedule {
            info!(function = function.name(), ?schedule, "timer scheduled");
            self.timers.push((function.clone(), schedule));
        }

        self.functions.push(function.clone());
        Ok(function)
    }

    /// Register every function directory under `root` that has a handler
    /// in `registry`. Directories without a manifest are skipped; a
    /// manifest without a handler is logged. Returns how many functions
    /// were registered.
    pub fn discover(&mut self, root: &Path, registry: &HandlerRegistry) -> FunctionResult<usize> {
        let mut registered = 0;
        let walker = WalkDir::new(root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable path during discovery");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let directory = entry.path();
            match Manifest::locate(directory) {
                Ok(_) => {}
                Err(ManifestError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            }

            let name = entry.file_name().to_string_lossy();
            let Some(handler) = registry.get(&name) else {
                warn!(function = %name, path = %directory.display(), "manifest has no registered handler");
                continue;
            };
            self.register(directory, handler.clone())?;
            registered += 1;
        }

        debug!(root = %root.display(), registered, "function discovery finished");
        Ok(registered)
    }

    /// Register a named handler from `registry`, failing if it is absent.
    pub fn register_named(
        &mut self,
        directory: &Path,
        registry: &HandlerRegistry,
    ) -> FunctionResult<Arc<Function>> {
        let name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let handler = registry
            .get(&name)
            .ok_or_else(|| FunctionError::MissingHandler(name.clone()))?;
        self.register(directory, handler.clone())
    }

    pub fn functions(&self) -> &[Arc<Function>] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&Arc<Function>> {
        self.functions.iter().find(|f| f.name() == name)
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Axum router serving every registered HTTP route.
    pub fn router(&self) -> Router {
        build_router(&self.routes, self.http.cors)
    }

    /// A scheduler holding every registered timer.
    pub fn timer_scheduler(&self) -> TimerScheduler {
        let mut scheduler = TimerScheduler::new();
        for (function, schedule) in &self.timers {
            scheduler.add(function.clone(), *schedule);
        }
        scheduler
    }

    /// Reject a pattern the router could not mount next to existing ones:
    /// a verb already served on the same pattern, or a differently spelled
    /// pattern claiming the same paths.
    fn check_route(&self, pattern: &RoutePattern, methods: &[Method]) -> FunctionResult<()> {
        for entry in &self.routes {
            if entry.pattern.collides_with(pattern) {
                return Err(FunctionError::ConflictingRoute {
                    route: pattern.to_string(),
                    existing_route: entry.pattern.to_string(),
                    existing: entry.function.name().to_string(),
                });
            }
            if &entry.pattern != pattern {
                continue;
            }
            if let Some(method) = methods.iter().find(|m| entry.methods.contains(m)) {
                return Err(FunctionError::DuplicateRoute {
                    route: pattern.to_string(),
                    method: method.to_string(),
                    existing: entry.function.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

fn served_methods(function: &str, declared: &[HttpMethod]) -> Vec<Method> {
    let mut methods = Vec::new();
    for method in declared {
        if !method.is_served() {
            warn!(%function, method = ?method, "http method not served, requests will get 404");
            continue;
        }
        let method = method.as_method();
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    methods
}
