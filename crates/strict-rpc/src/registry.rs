//! Process-wide handler table and published service definitions

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{Instrument, debug, info, info_span};

use crate::context::CallContext;
use crate::definition::ServiceDefinition;
use crate::error::{RegistryError, RpcError, RpcResult};
use crate::frame::{Command, Response};
use crate::server::CommandHandler;
use crate::validator::CompiledService;

/// Handlers and definition of one service, registered as a unit
pub struct ServiceBinding {
    service_id: String,
    definition: ServiceDefinition,
    handlers: Vec<(String, Arc<dyn CommandHandler>)>,
}

impl ServiceBinding {
    pub fn new(service_id: impl Into<String>, service: &CompiledService) -> Self {
        Self {
            service_id: service_id.into(),
            definition: service.definition().clone(),
            handlers: Vec::new(),
        }
    }

    /// Bind a handler under a qualified command name
    pub fn handler<H>(mut self, command: impl Into<String>, handler: H) -> Self
    where
        H: CommandHandler + 'static,
    {
        self.handlers.push((command.into(), Arc::new(handler)));
        self
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }
}

/// Maps qualified command names to handlers.
///
/// Written at registration, read at dispatch. Locks are never held across a
/// handler call.
#[derive(Default)]
pub struct Registry {
    handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
    services: RwLock<BTreeMap<String, ServiceDefinition>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a single command handler. Rejects a name that is already bound.
    pub fn register_command_handler<H>(
        &self,
        command: impl Into<String>,
        handler: H,
    ) -> Result<(), RegistryError>
    where
        H: CommandHandler + 'static,
    {
        let command = command.into();
        let mut handlers = self.handlers.write();
        if handlers.contains_key(&command) {
            return Err(RegistryError::DuplicateHandler(command));
        }
        debug!(command = %command, "Registered command handler");
        handlers.insert(command, Arc::new(handler));
        Ok(())
    }

    /// Register every handler of a service and publish its definition.
    ///
    /// All or nothing: if the service or any command is already registered,
    /// the registry is left unchanged.
    pub fn register(&self, binding: ServiceBinding) -> Result<(), RegistryError> {
        let mut handlers = self.handlers.write();
        let mut services = self.services.write();

        if services.contains_key(&binding.service_id) {
            return Err(RegistryError::DuplicateService(binding.service_id));
        }
        let mut seen = Vec::with_capacity(binding.handlers.len());
        for (command, _) in &binding.handlers {
            if handlers.contains_key(command) || seen.contains(&command) {
                return Err(RegistryError::DuplicateHandler(command.clone()));
            }
            seen.push(command);
        }

        info!(
            service = %binding.service_id,
            commands = binding.handlers.len(),
            "Registered service"
        );
        handlers.extend(binding.handlers);
        services.insert(binding.service_id, binding.definition);
        Ok(())
    }

    pub fn handler(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.read().get(command).cloned()
    }

    pub fn registered_commands(&self) -> Vec<String> {
        let mut commands: Vec<String> = self.handlers.read().keys().cloned().collect();
        commands.sort();
        commands
    }

    /// Published definition of a registered service
    pub fn service(&self, service_id: &str) -> Option<ServiceDefinition> {
        self.services.read().get(service_id).cloned()
    }

    pub fn services(&self) -> Vec<String> {
        self.services.read().keys().cloned().collect()
    }

    /// Run the handler bound to `cmd.cmd`
    pub async fn handle(&self, ctx: CallContext, src: &str, cmd: &Command) -> RpcResult<Value> {
        let Some(handler) = self.handler(&cmd.cmd) else {
            return Err(RpcError::MethodNotFound(cmd.cmd.clone()));
        };
        let span = info_span!("rpc.dispatch", cmd = %cmd.cmd, src = %src);
        handler.handle(ctx, src, cmd).instrument(span).await
    }

    /// Run the handler bound to `cmd.cmd` and map its outcome to a response
    pub async fn dispatch(&self, ctx: CallContext, src: &str, cmd: Command) -> Response {
        Response::from_outcome(self.handle(ctx, src, &cmd).await)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.registered_commands())
            .field("services", &self.services())
            .finish()
    }
}
