//! Error types for strict-rpc calls, service definitions and registration

use thiserror::Error;

use crate::frame::status;

/// Result type for a single RPC invocation
pub type RpcResult<T> = Result<T, RpcError>;

/// Outcome of a failed call, classified so every layer can match on it
#[derive(Error, Debug)]
pub enum RpcError {
    /// Arguments did not pass schema validation or could not be decoded
    #[error("invalid args for {method}: {detail}")]
    InvalidArgs { method: String, detail: String },

    /// The serving side answered with a nonzero status
    #[error("remote error (status {status}): {message}")]
    Remote { status: i32, message: String },

    /// The call never produced a response
    #[error("transport error calling {cmd} on {dest}: {source}")]
    Transport {
        cmd: String,
        dest: String,
        #[source]
        source: TransportError,
    },

    /// Payload could not be encoded, or a result could not be decoded
    #[error("codec error for {cmd}: {source}")]
    Codec {
        cmd: String,
        #[source]
        source: serde_json::Error,
    },

    /// No handler is bound to the command name
    #[error("no handler registered for {0}")]
    MethodNotFound(String),
}

/// Failures of the transport capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("call timed out")]
    Timeout,

    #[error("call cancelled")]
    Cancelled,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("transport closed")]
    Closed,
}

/// A malformed service definition or schema. Never returned per call: the
/// validator cache and bindings turn it into a startup panic.
#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("malformed service definition: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("service definition has no `methods` object")]
    MissingMethods,

    #[error("expected {expected} at {path}")]
    UnexpectedNode { path: String, expected: &'static str },

    #[error("method {0} is not part of the service definition")]
    UnknownMethod(String),

    #[error("argument schema for {method} does not compile: {detail}")]
    Schema { method: String, detail: String },
}

/// Rejected handler table updates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a handler for {0} is already registered")]
    DuplicateHandler(String),

    #[error("service {0} is already registered")]
    DuplicateService(String),
}

impl RpcError {
    /// Create a remote error, as a service implementation would to report failure
    pub fn remote(status: i32, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid-arguments error for a method
    pub fn invalid_args(method: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidArgs {
            method: method.into(),
            detail: detail.into(),
        }
    }

    pub fn is_invalid_args(&self) -> bool {
        matches!(self, Self::InvalidArgs { .. })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Remote status code, if the serving side reported one
    pub fn status(&self) -> Option<i32> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Status to put on the wire for this error. Never `status::OK`.
    pub fn response_status(&self) -> i32 {
        match self {
            Self::Remote { status: code, .. } if *code != status::OK => *code,
            Self::InvalidArgs { .. } => status::INVALID_ARGS,
            Self::MethodNotFound(_) => status::NOT_FOUND,
            Self::Remote { .. } | Self::Transport { .. } | Self::Codec { .. } => status::INTERNAL,
        }
    }

    /// Message to put on the wire alongside `response_status`
    pub fn response_message(&self) -> String {
        match self {
            Self::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_status_is_preserved() {
        let error = RpcError::remote(5, "busy");
        assert!(error.is_remote());
        assert_eq!(error.status(), Some(5));
        assert_eq!(error.response_status(), 5);
        assert_eq!(error.response_message(), "busy");
    }

    #[test]
    fn test_errors_never_map_to_ok() {
        let errors = [
            RpcError::remote(0, "claims success"),
            RpcError::invalid_args("Reboot", "bad"),
            RpcError::MethodNotFound("Sys.Nope".to_string()),
            RpcError::Transport {
                cmd: "Sys.Reboot".to_string(),
                dest: "device".to_string(),
                source: TransportError::Timeout,
            },
        ];
        for error in &errors {
            assert_ne!(error.response_status(), status::OK, "{error}");
        }
    }

    #[test]
    fn test_classification() {
        let error = RpcError::invalid_args("Reboot", "\"soon\" is not of type \"integer\"");
        assert!(error.is_invalid_args());
        assert!(!error.is_transport());
        assert_eq!(error.status(), None);
        assert_eq!(error.response_status(), status::INVALID_ARGS);
        assert!(error.to_string().contains("invalid args for Reboot"));
    }
}
