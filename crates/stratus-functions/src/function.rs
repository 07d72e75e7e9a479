//! A registered function: manifest, handler, and the resources needed to
//! assemble its arguments.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use stratus_core::Environment;
use stratus_dispatch::{DeliveryFuture, QueueMessage, Subscriber};
use stratus_storage::BlobStore;

use crate::error::{FunctionError, FunctionResult};
use crate::handler::{Capabilities, Handler};
use crate::invoke::{Context, Invocation, Trigger};
use crate::manifest::Manifest;
use crate::output::BlobOutput;
use crate::response::HandlerOutput;

#[derive(Debug)]
pub struct Function {
    name: String,
    directory: PathBuf,
    manifest: Manifest,
    handler: Handler,
    capabilities: Capabilities,
    store: BlobStore,
    env: Arc<Environment>,
}

impl Function {
    /// The function is named after its directory.
    pub fn new(
        directory: &Path,
        manifest: Manifest,
        handler: Handler,
        store: BlobStore,
        env: Arc<Environment>,
    ) -> Self {
        let name = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| directory.display().to_string());
        let capabilities = Capabilities::resolve(&handler, &manifest);
        Self {
            name,
            directory: directory.to_path_buf(),
            manifest,
            handler,
            capabilities,
            store,
            env,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Assemble the arguments for one call.
    pub fn invocation(&self, trigger: Trigger) -> Invocation {
        let mut invocation = Invocation::new(trigger);
        if self.capabilities.accepts_context {
            invocation = invocation.with_context(Context::new(&self.name, &self.directory));
        }
        if self.capabilities.accepts_output_binding {
            if let Some(binding) = self.manifest.blob_output() {
                invocation = invocation.with_output(BlobOutput::new(
                    &binding.path,
                    self.env.clone(),
                    self.store.clone(),
                ));
            }
        }
        invocation
    }

    /// Run the handler to completion.
    pub async fn invoke(&self, trigger: Trigger) -> FunctionResult<HandlerOutput> {
        let kind = trigger.kind();
        let invocation = self.invocation(trigger);
        debug!(
            function = %self.name,
            trigger = kind,
            invocation_id = ?invocation.context().map(Context::invocation_id),
            "invoking function"
        );
        let started = Instant::now();
        let output = self
            .handler
            .call(invocation)
            .await
            .map_err(|error| FunctionError::Handler {
                function: self.name.clone(),
                error,
            })?;
        debug!(
            function = %self.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "function completed"
        );
        Ok(output)
    }
}

/// Delivers queue messages to a function.
pub struct QueueSubscriber {
    function: Arc<Function>,
}

impl QueueSubscriber {
    pub fn new(function: Arc<Function>) -> Self {
        Self { function }
    }
}

impl Subscriber for QueueSubscriber {
    fn name(&self) -> &str {
        self.function.name()
    }

    fn deliver(&self, message: QueueMessage) -> DeliveryFuture {
        let function = self.function.clone();
        Box::pin(async move {
            function.invoke(Trigger::Queue(message)).await?;
            Ok(())
        })
    }
}
