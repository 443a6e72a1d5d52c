//! # Sys service bindings
//!
//! Client and server bindings for the device `Sys` service. Both halves
//! validate `Reboot` arguments against the schema compiled from
//! [`SERVICE_DEFINITION`], which is built once per process on first use.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strict_rpc::prelude::*;

/// Identifier the service definition is published under
pub const SERVICE_ID: &str = "http://mongoose-iot.com/fwSys";

/// Reboot delay applied when `delay_ms` is omitted
pub const DEFAULT_REBOOT_DELAY_MS: i64 = 100;

pub const SERVICE_DEFINITION: &str = r#"{
  "methods": {
    "Reboot": {
      "args": {
        "delay_ms": {
          "doc": "Optional delay, in milliseconds. Default is 100.",
          "type": "integer"
        }
      },
      "doc": "Reboot the device"
    }
  },
  "name": "Sys",
  "namespace": "http://mongoose-iot.com/fw"
}"#;

static VALIDATORS: ValidatorCache = ValidatorCache::new(SERVICE_DEFINITION);

/// The compiled Sys service
pub fn service() -> &'static CompiledService {
    VALIDATORS.get()
}

pub fn validator_cache() -> &'static ValidatorCache {
    &VALIDATORS
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebootArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<i64>,
}

impl RebootArgs {
    pub fn with_delay_ms(delay_ms: i64) -> Self {
        Self {
            delay_ms: Some(delay_ms),
        }
    }

    pub fn delay_ms_or_default(&self) -> i64 {
        self.delay_ms.unwrap_or(DEFAULT_REBOOT_DELAY_MS)
    }
}

/// The Sys service, implemented by devices and by [`SysClient`]
#[async_trait]
pub trait Sys: Send + Sync {
    /// Reboot the device
    async fn reboot(&self, ctx: &CallContext, args: RebootArgs) -> RpcResult<()>;
}

/// Calls a remote Sys service
#[derive(Debug, Clone)]
pub struct SysClient {
    stub: ClientStub,
}

impl SysClient {
    pub fn new(instance: Arc<dyn Instance>, addr: impl Into<String>) -> Self {
        Self {
            stub: ClientStub::new(instance, addr, service()),
        }
    }

    pub fn with_config(mut self, config: StubConfig) -> Self {
        self.stub = self.stub.with_config(config);
        self
    }
}

#[async_trait]
impl Sys for SysClient {
    async fn reboot(&self, ctx: &CallContext, args: RebootArgs) -> RpcResult<()> {
        self.stub.invoke(ctx, "Reboot", &args).await
    }
}

/// Bind the Sys handlers to `registry` and publish the service definition
pub fn register_service(
    registry: &Registry,
    implementation: Arc<dyn Sys>,
) -> Result<(), RegistryError> {
    register_service_with_config(registry, implementation, StubConfig::default())
}

pub fn register_service_with_config(
    registry: &Registry,
    implementation: Arc<dyn Sys>,
    config: StubConfig,
) -> Result<(), RegistryError> {
    let reboot = MethodHandler::new(service(), "Reboot", move |ctx, args: RebootArgs| {
        let implementation = implementation.clone();
        async move { implementation.reboot(&ctx, args).await }
    })
    .with_config(config);

    tracing::debug!(service = SERVICE_ID, "Binding Sys handlers");
    registry.register(
        ServiceBinding::new(SERVICE_ID, service()).handler(reboot.command().to_string(), reboot),
    )
}
