//! Wire representation of a call: the outbound `Command` and inbound `Response`

use bytes::Bytes;
use serde_json::Value;

use crate::error::RpcResult;

/// Response status codes
pub mod status {
    /// The only success code
    pub const OK: i32 = 0;
    pub const INVALID_ARGS: i32 = 400;
    pub const NOT_FOUND: i32 = 404;
    pub const INTERNAL: i32 = 500;
}

/// Outbound call: a method-qualified command name and its encoded arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// `<Service>.<Method>`
    pub cmd: String,
    /// JSON-encoded arguments; empty means "no arguments"
    pub args: Bytes,
}

impl Command {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            args: Bytes::new(),
        }
    }

    pub fn with_args(mut self, args: impl Into<Bytes>) -> Self {
        self.args = args.into();
        self
    }
}

/// Inbound outcome of a call, produced exactly once per call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: i32,
    pub status_msg: String,
    /// JSON-encoded result; empty when the method has none
    pub result: Bytes,
}

impl Response {
    pub fn ok(result: impl Into<Bytes>) -> Self {
        Self {
            status: status::OK,
            status_msg: String::new(),
            result: result.into(),
        }
    }

    pub fn error(status: i32, status_msg: impl Into<String>) -> Self {
        Self {
            status,
            status_msg: status_msg.into(),
            result: Bytes::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == status::OK
    }

    /// Map a dispatcher outcome to its wire form. A `null` result is sent as
    /// an empty payload.
    pub fn from_outcome(outcome: RpcResult<Value>) -> Self {
        match outcome {
            Ok(Value::Null) => Self::ok(Bytes::new()),
            Ok(value) => match serde_json::to_vec(&value) {
                Ok(encoded) => Self::ok(encoded),
                Err(e) => Self::error(status::INTERNAL, format!("encoding result: {e}")),
            },
            Err(error) => Self::error(error.response_status(), error.response_message()),
        }
    }
}
