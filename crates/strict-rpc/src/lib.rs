//! # strict-rpc
//!
//! Runtime for remote procedures described by a declarative service
//! definition. The same compiled argument schema gates every call twice: in
//! the client stub before a command is sent, and in the dispatcher before the
//! implementation runs.
//!
//! ## Pieces
//! - [`definition`]: service documents and shorthand normalization
//! - [`validator`]: per-method validators, compiled once per process
//! - [`client`]: the client stub (validate, send, interpret the response)
//! - [`server`]: the per-method dispatcher (validate, decode, invoke)
//! - [`registry`]: the handler table and published definitions
//! - [`loopback`]: an in-process [`Instance`] for tests and demos
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strict_rpc::prelude::*;
//! use strict_rpc::loopback::LoopbackInstance;
//!
//! static ECHO: ValidatorCache = ValidatorCache::new(r#"{
//!     "name": "Echo",
//!     "namespace": "http://example.com/echo",
//!     "methods": {"Say": {"args": {"text": "string"}, "result": "string"}}
//! }"#);
//!
//! #[derive(Default, serde::Deserialize)]
//! struct SayArgs { text: Option<String> }
//!
//! # async fn run() -> RpcResult<()> {
//! let registry = Arc::new(Registry::new());
//! let say = MethodHandler::new(ECHO.get(), "Say", |_ctx, args: SayArgs| async move {
//!     Ok(args.text.unwrap_or_default())
//! });
//! registry
//!     .register(ServiceBinding::new("echo", ECHO.get()).handler("Echo.Say", say))
//!     .expect("fresh registry");
//!
//! let client = ClientStub::new(
//!     Arc::new(LoopbackInstance::new(registry, "demo")),
//!     "local",
//!     ECHO.get(),
//! );
//! let reply: String = client
//!     .invoke(&CallContext::new(), "Say", &serde_json::json!({"text": "hi"}))
//!     .await?;
//! assert_eq!(reply, "hi");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod definition;
pub mod error;
pub mod frame;
pub mod instance;
pub mod loopback;
pub mod prelude;
pub mod registry;
pub mod server;
pub mod validator;

// Re-export main types
pub use client::ClientStub;
pub use config::{ParseFailurePolicy, StubConfig};
pub use context::{CallContext, CancellationHandle};
pub use definition::{MethodSpec, ServiceDefinition, normalize};
pub use error::{DefinitionError, RegistryError, RpcError, RpcResult, TransportError};
pub use frame::{Command, Response};
pub use instance::{CallTrace, Instance};
pub use registry::{Registry, ServiceBinding};
pub use server::{CommandHandler, MethodHandler};
pub use validator::{CompiledService, MethodValidator, ValidatorCache};
