//! # strict-rpc Prelude
//!
//! Re-exports of the types service bindings and their callers use most.
//!
//! ```rust
//! use strict_rpc::prelude::*;
//! ```

pub use crate::client::ClientStub;
pub use crate::config::{ParseFailurePolicy, StubConfig};
pub use crate::context::{CallContext, CancellationHandle};
pub use crate::error::{RegistryError, RpcError, RpcResult, TransportError};
pub use crate::frame::{Command, Response, status};
pub use crate::instance::{CallTrace, Instance};
pub use crate::registry::{Registry, ServiceBinding};
pub use crate::server::{CommandHandler, MethodHandler};
pub use crate::validator::{CompiledService, ValidatorCache};
