//! Compiled argument validators and the process-wide validator cache
//!
//! Each service has one [`ValidatorCache`], normally a `static`. The first
//! caller compiles the whole service; concurrent first callers block until
//! that single build finishes and then share it. After that every lookup is a
//! plain read of immutable data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use jsonschema::Validator;
use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ParseFailurePolicy;
use crate::definition::ServiceDefinition;
use crate::error::{DefinitionError, RpcError, RpcResult};

/// Argument validator for one method
pub struct MethodValidator {
    method: String,
    args: Option<Validator>,
}

impl std::fmt::Debug for MethodValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodValidator")
            .field("method", &self.method)
            .field("has_args_schema", &self.has_args_schema())
            .finish()
    }
}

impl MethodValidator {
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether the method declares `args`. Methods without are never validated.
    pub fn has_args_schema(&self) -> bool {
        self.args.is_some()
    }

    /// Check an argument document against the method's schema
    pub fn validate(&self, args: &Value) -> RpcResult<()> {
        let Some(validator) = &self.args else {
            return Ok(());
        };

        let errors: Vec<String> = validator.iter_errors(args).map(|e| e.to_string()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RpcError::invalid_args(&self.method, errors.join("; ")))
        }
    }

    /// Check encoded arguments as they travel on the wire.
    ///
    /// An empty or `null` payload stands for an empty argument object. A payload that is
    /// not a JSON document is handled per `policy`: logged and let through, or
    /// rejected as invalid arguments.
    pub fn check_payload(&self, payload: &[u8], policy: ParseFailurePolicy) -> RpcResult<()> {
        if !self.has_args_schema() {
            return Ok(());
        }

        let document = if is_absent(payload) {
            Value::Object(Default::default())
        } else {
            match serde_json::from_slice::<Value>(payload) {
                Ok(document) => document,
                Err(e) => {
                    error!(
                        method = %self.method,
                        payload = %String::from_utf8_lossy(payload),
                        error = %e,
                        "Failed to parse args as JSON"
                    );
                    return match policy {
                        ParseFailurePolicy::FailOpen => Ok(()),
                        ParseFailurePolicy::Reject => Err(RpcError::invalid_args(
                            &self.method,
                            format!("args are not valid JSON: {e}"),
                        )),
                    };
                }
            }
        };

        self.validate(&document).inspect_err(|e| {
            warn!(method = %self.method, error = %e, "Invalid args");
        })
    }
}

/// Whether an encoded argument payload carries no arguments: empty, or a bare `null`
pub fn is_absent(payload: &[u8]) -> bool {
    let payload = payload.trim_ascii();
    payload.is_empty() || payload == b"null"
}

/// A normalized service definition with a validator for every method
#[derive(Debug)]
pub struct CompiledService {
    definition: ServiceDefinition,
    validators: HashMap<String, MethodValidator>,
}

impl CompiledService {
    /// Parse, normalize and compile a definition document
    pub fn from_source(source: &str) -> Result<Self, DefinitionError> {
        Self::compile(ServiceDefinition::from_source(source)?)
    }

    pub fn compile(definition: ServiceDefinition) -> Result<Self, DefinitionError> {
        let mut validators = HashMap::with_capacity(definition.methods.len());
        for method in definition.methods.keys() {
            let args = match definition.args_schema(method) {
                Some(schema) => Some(Validator::new(&schema).map_err(|e| {
                    DefinitionError::Schema {
                        method: method.clone(),
                        detail: e.to_string(),
                    }
                })?),
                None => None,
            };
            validators.insert(
                method.clone(),
                MethodValidator {
                    method: method.clone(),
                    args,
                },
            );
        }

        debug!(
            service = %definition.name,
            methods = validators.len(),
            "Compiled service validators"
        );
        Ok(Self {
            definition,
            validators,
        })
    }

    pub fn definition(&self) -> &ServiceDefinition {
        &self.definition
    }

    pub fn validator(&self, method: &str) -> Option<&MethodValidator> {
        self.validators.get(method)
    }

    /// Like [`validator`](Self::validator), for bindings that require the method to exist
    pub fn method(&self, method: &str) -> Result<&MethodValidator, DefinitionError> {
        self.validator(method)
            .ok_or_else(|| DefinitionError::UnknownMethod(method.to_string()))
    }
}

/// Lazily compiled validators for one embedded service definition
pub struct ValidatorCache {
    source: &'static str,
    compiled: OnceCell<CompiledService>,
    builds: AtomicUsize,
}

impl ValidatorCache {
    pub const fn new(source: &'static str) -> Self {
        Self {
            source,
            compiled: OnceCell::new(),
            builds: AtomicUsize::new(0),
        }
    }

    /// The compiled service, building it on first use.
    ///
    /// # Panics
    ///
    /// If the embedded definition is malformed or a schema fails to compile.
    pub fn get(&self) -> &CompiledService {
        self.compiled.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::SeqCst);
            match CompiledService::from_source(self.source) {
                Ok(compiled) => compiled,
                Err(e) => panic!("invalid service definition: {e}"),
            }
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// How many times the build ran; at most 1
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for ValidatorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorCache")
            .field("initialized", &self.is_initialized())
            .field("builds", &self.build_count())
            .finish()
    }
}
