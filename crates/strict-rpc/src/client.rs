//! Client stub: validates arguments before they leave the process

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{Instrument, debug};

use crate::config::StubConfig;
use crate::context::CallContext;
use crate::error::{RpcError, RpcResult, TransportError};
use crate::frame::Command;
use crate::instance::Instance;
use crate::validator::{CompiledService, MethodValidator};

/// Calls the methods of one service on one destination
#[derive(Clone)]
pub struct ClientStub {
    instance: Arc<dyn Instance>,
    dest: String,
    service: &'static CompiledService,
    config: StubConfig,
}

impl ClientStub {
    pub fn new(
        instance: Arc<dyn Instance>,
        dest: impl Into<String>,
        service: &'static CompiledService,
    ) -> Self {
        Self {
            instance,
            dest: dest.into(),
            service,
            config: StubConfig::default(),
        }
    }

    pub fn with_config(mut self, config: StubConfig) -> Self {
        self.config = config;
        self
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn service(&self) -> &'static CompiledService {
        self.service
    }

    /// Invoke `method` with `args` and decode its result.
    ///
    /// Arguments failing validation are never sent. A nonzero response status
    /// becomes [`RpcError::Remote`]; transport failures become
    /// [`RpcError::Transport`] tagged with the command and destination.
    pub async fn invoke<A, R>(&self, ctx: &CallContext, method: &str, args: &A) -> RpcResult<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let cmd = Command::new(self.service.definition().qualified_name(method));
        let trace = self.instance.trace_call(ctx, &self.dest, &cmd);
        let outcome = match self.service.validator(method) {
            Some(validator) => {
                self.invoke_traced(ctx, validator, cmd, args)
                    .instrument(trace.span().clone())
                    .await
            }
            None => Err(RpcError::MethodNotFound(cmd.cmd)),
        };
        trace.finish(&outcome);
        outcome
    }

    async fn invoke_traced<A, R>(
        &self,
        ctx: &CallContext,
        validator: &MethodValidator,
        mut cmd: Command,
        args: &A,
    ) -> RpcResult<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let cmd_name = cmd.cmd.clone();
        let encoded = serde_json::to_vec(args).map_err(|source| RpcError::Codec {
            cmd: cmd_name.clone(),
            source,
        })?;
        debug!(args = %String::from_utf8_lossy(&encoded), "Sending");

        validator.check_payload(&encoded, self.config.on_parse_failure)?;
        cmd.args = encoded.into();

        let call = self.instance.call(ctx, &self.dest, cmd);
        let response = match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(TransportError::Timeout)),
            None => call.await,
        }
        .map_err(|source| RpcError::Transport {
            cmd: cmd_name.clone(),
            dest: self.dest.clone(),
            source,
        })?;

        if !response.is_ok() {
            return Err(RpcError::Remote {
                status: response.status,
                message: response.status_msg,
            });
        }

        decode_result(&cmd_name, &response.result)
    }
}

impl std::fmt::Debug for ClientStub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientStub")
            .field("service", &self.service.definition().name)
            .field("dest", &self.dest)
            .field("config", &self.config)
            .finish()
    }
}

/// Decode a result payload; an empty payload reads as `null`
fn decode_result<R: DeserializeOwned>(cmd: &str, payload: &[u8]) -> RpcResult<R> {
    let decoded = if payload.is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_slice(payload)
    };
    decoded.map_err(|source| RpcError::Codec {
        cmd: cmd.to_string(),
        source,
    })
}
