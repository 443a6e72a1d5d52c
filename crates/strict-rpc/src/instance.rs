//! The capability client stubs consume from the hosting runtime

use async_trait::async_trait;
use tracing::{Span, debug};

use crate::context::CallContext;
use crate::error::{RpcResult, TransportError};
use crate::frame::{Command, Response, status};

/// Performs calls and opens their trace spans
#[async_trait]
pub trait Instance: Send + Sync {
    /// Deliver `cmd` to `dest` and wait for its response.
    ///
    /// Implementations must honor the deadline and cancellation carried by `ctx`.
    async fn call(
        &self,
        ctx: &CallContext,
        dest: &str,
        cmd: Command,
    ) -> Result<Response, TransportError>;

    /// Open the span a call runs in
    fn trace_call(&self, ctx: &CallContext, dest: &str, cmd: &Command) -> CallTrace {
        CallTrace::new(tracing::info_span!(
            "rpc.call",
            cmd = %cmd.cmd,
            dest = %dest,
            caller = ctx.caller().unwrap_or(""),
            status = tracing::field::Empty,
            error = tracing::field::Empty,
        ))
    }
}

/// Span of a single outbound call
#[derive(Debug, Clone)]
pub struct CallTrace {
    span: Span,
}

impl CallTrace {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Annotate the span with the call's outcome and close it
    pub fn finish<T>(self, outcome: &RpcResult<T>) {
        let _entered = self.span.enter();
        match outcome {
            Ok(_) => {
                self.span.record("status", status::OK);
                debug!("Call completed");
            }
            Err(error) => {
                self.span.record("status", error.response_status());
                self.span.record("error", tracing::field::display(error));
                debug!("Call failed");
            }
        }
    }
}
