//! Server stub: validates and decodes a command before invoking the implementation

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::StubConfig;
use crate::context::CallContext;
use crate::error::{RpcError, RpcResult};
use crate::frame::Command;
use crate::validator::{CompiledService, MethodValidator, is_absent};

/// Handles one qualified command name
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle `cmd` sent by `src`.
    ///
    /// Implementation errors are returned unchanged; mapping them to a
    /// response status is up to the caller.
    async fn handle(&self, ctx: CallContext, src: &str, cmd: &Command) -> RpcResult<Value>;
}

type MethodFn<A, R> = Box<dyn Fn(CallContext, A) -> BoxFuture<'static, RpcResult<R>> + Send + Sync>;

/// Typed dispatcher for one method of a compiled service
pub struct MethodHandler<A, R> {
    command: String,
    validator: &'static MethodValidator,
    config: StubConfig,
    call: MethodFn<A, R>,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A, R> MethodHandler<A, R>
where
    A: DeserializeOwned + Default + Send + 'static,
    R: Serialize + Send + 'static,
{
    /// Bind `method` of `service` to an implementation.
    ///
    /// # Panics
    ///
    /// If `method` is not part of the service definition.
    pub fn new<F, Fut>(service: &'static CompiledService, method: &str, call: F) -> Self
    where
        F: Fn(CallContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RpcResult<R>> + Send + 'static,
    {
        let validator = service
            .method(method)
            .unwrap_or_else(|e| panic!("cannot bind handler: {e}"));
        Self {
            command: service.definition().qualified_name(method),
            validator,
            config: StubConfig::default(),
            call: Box::new(move |ctx, args| Box::pin(call(ctx, args))),
            _marker: PhantomData,
        }
    }

    pub fn with_config(mut self, config: StubConfig) -> Self {
        self.config = config;
        self
    }

    /// Qualified command name this handler answers to
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Validate `cmd.args` and decode them into the typed argument struct.
    /// An empty or `null` payload decodes to `A::default()`.
    pub fn decode_args(&self, cmd: &Command) -> RpcResult<A> {
        self.validator
            .check_payload(&cmd.args, self.config.on_parse_failure)?;

        if is_absent(&cmd.args) {
            return Ok(A::default());
        }
        serde_json::from_slice(&cmd.args).map_err(|e| {
            RpcError::invalid_args(self.validator.method(), format!("unmarshaling args: {e}"))
        })
    }
}

#[async_trait]
impl<A, R> CommandHandler for MethodHandler<A, R>
where
    A: DeserializeOwned + Default + Send + 'static,
    R: Serialize + Send + 'static,
{
    async fn handle(&self, ctx: CallContext, _src: &str, cmd: &Command) -> RpcResult<Value> {
        let args = self.decode_args(cmd)?;
        let result = (self.call)(ctx, args).await?;
        serde_json::to_value(result).map_err(|source| RpcError::Codec {
            cmd: self.command.clone(),
            source,
        })
    }
}

impl<A, R> std::fmt::Debug for MethodHandler<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodHandler")
            .field("command", &self.command)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::ValidatorCache;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static LAMP: ValidatorCache = ValidatorCache::new(
        r#"{
            "name": "Lamp",
            "namespace": "http://example.com/lamp",
            "methods": {
                "Set": {"args": {"on": "boolean", "level": "integer"}, "required_args": ["on"], "result": "boolean"},
                "Toggle": {}
            }
        }"#,
    );

    #[derive(Debug, Default, Deserialize)]
    struct SetArgs {
        on: bool,
        level: Option<i64>,
    }

    fn set_handler(invocations: Arc<AtomicUsize>) -> MethodHandler<SetArgs, bool> {
        MethodHandler::new(LAMP.get(), "Set", move |_ctx, args: SetArgs| {
            let invocations = invocations.clone();
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                if args.level == Some(99) {
                    return Err(RpcError::remote(5, "busy"));
                }
                Ok(args.on)
            }
        })
    }

    fn command(args: Value) -> Command {
        Command::new("Lamp.Set").with_args(serde_json::to_vec(&args).unwrap())
    }

    #[tokio::test]
    async fn test_valid_command_invokes_implementation() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let handler = set_handler(invocations.clone());
        assert_eq!(handler.command(), "Lamp.Set");

        let result = handler
            .handle(CallContext::new(), "peer", &command(json!({"on": true, "level": 3})))
            .await
            .unwrap();
        assert_eq!(result, json!(true));
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_command_never_reaches_implementation() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let handler = set_handler(invocations.clone());

        for args in [json!({"on": "yes"}), json!({"level": 3}), json!({"on": true, "level": 1.5})] {
            let err = handler
                .handle(CallContext::new(), "peer", &command(args))
                .await
                .unwrap_err();
            assert!(err.is_invalid_args(), "{err}");
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_implementation_error_is_propagated() {
        let handler = set_handler(Arc::new(AtomicUsize::new(0)));
        let err = handler
            .handle(CallContext::new(), "peer", &command(json!({"on": true, "level": 99})))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(5));
    }

    #[tokio::test]
    async fn test_unparseable_payload_fails_open_then_decode_rejects() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let handler = set_handler(invocations.clone());
        let cmd = Command::new("Lamp.Set").with_args(&b"{\"on\":"[..]);

        let err = handler
            .handle(CallContext::new(), "peer", &cmd)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unmarshaling args"));
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_payload_decodes_to_defaults() {
        #[derive(Debug, Default, Deserialize)]
        struct NoArgs {}

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let handler: MethodHandler<NoArgs, ()> =
            MethodHandler::new(LAMP.get(), "Toggle", move |_ctx, _args| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            });

        let result = handler
            .handle(CallContext::new(), "peer", &Command::new("Lamp.Toggle"))
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_null_payload_decodes_to_defaults() {
        #[derive(Debug, Default, Deserialize)]
        struct NoArgs {}

        let handler: MethodHandler<NoArgs, bool> =
            MethodHandler::new(LAMP.get(), "Toggle", |_ctx, _args| async { Ok(true) });

        let result = handler
            .handle(
                CallContext::new(),
                "peer",
                &Command::new("Lamp.Toggle").with_args(&b"null"[..]),
            )
            .await
            .unwrap();
        assert_eq!(result, json!(true));
    }

    #[test]
    #[should_panic(expected = "cannot bind handler")]
    fn test_binding_unknown_method_panics() {
        let _ = MethodHandler::<SetArgs, bool>::new(LAMP.get(), "Dim", |_ctx, args: SetArgs| async move {
            Ok(args.on)
        });
    }
}
