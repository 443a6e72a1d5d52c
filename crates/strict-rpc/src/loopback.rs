//! In-process instance routing commands straight into a registry

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::trace;

use crate::context::CallContext;
use crate::error::TransportError;
use crate::frame::{Command, Response};
use crate::instance::Instance;
use crate::registry::Registry;

/// An [`Instance`] whose destination is always the local registry.
///
/// Honors the call context: a cancelled call reports
/// [`TransportError::Cancelled`] and a call past its deadline
/// [`TransportError::Timeout`].
#[derive(Debug)]
pub struct LoopbackInstance {
    registry: Arc<Registry>,
    source: String,
    carried: AtomicUsize,
    closed: AtomicBool,
}

impl LoopbackInstance {
    pub fn new(registry: Arc<Registry>, source: impl Into<String>) -> Self {
        Self {
            registry,
            source: source.into(),
            carried: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of commands handed to the registry so far
    pub fn carried(&self) -> usize {
        self.carried.load(Ordering::SeqCst)
    }

    /// Fail every later call with [`TransportError::Closed`]
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Instance for LoopbackInstance {
    async fn call(
        &self,
        ctx: &CallContext,
        dest: &str,
        cmd: Command,
    ) -> Result<Response, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if ctx.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if ctx.is_expired() {
            return Err(TransportError::Timeout);
        }

        trace!(dest = %dest, cmd = %cmd.cmd, "Loopback call");
        self.carried.fetch_add(1, Ordering::SeqCst);

        let dispatch = self.registry.dispatch(ctx.clone(), &self.source, cmd);
        let bounded = async {
            match ctx.remaining() {
                Some(remaining) => tokio::time::timeout(remaining, dispatch)
                    .await
                    .map_err(|_| TransportError::Timeout),
                None => Ok(dispatch.await),
            }
        };

        tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(TransportError::Cancelled),
            response = bounded => response,
        }
    }
}
