//! Error types for commonrpc.
//!
//! `RpcError` covers every failure that surfaces locally: malformed input at
//! the decode step, misconfiguration, transport failures, and the structured
//! errors the invoker raises from a result envelope. Failures that happen
//! inside a dispatched call never become an `RpcError` on the server; they are
//! captured as a [`Fault`] and shipped back as data.

use std::fmt;
use thiserror::Error;

/// Main error type for commonrpc.
#[derive(Debug, Error)]
pub enum RpcError {
    // Protocol errors
    #[error("Malformed envelope: {message}")]
    MalformedEnvelope { message: String },

    #[error("Unexpected envelope status {status}")]
    ProtocolAnomaly { status: i32 },

    // Remote application errors
    #[error("Remote call failed with {exc_type}: {message}")]
    RemoteCall { exc_type: String, message: String },

    // Client-side errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Cannot bind arguments for {function}: {message}")]
    Binding { function: String, message: String },

    // Transport errors
    #[error("Transport error talking to {addr}: {message}")]
    Transport { addr: String, message: String },

    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for commonrpc operations.
pub type Result<T> = std::result::Result<T, RpcError>;

impl From<std::io::Error> for RpcError {
    fn from(err: std::io::Error) -> Self {
        RpcError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl RpcError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        RpcError::MalformedEnvelope {
            message: message.into(),
        }
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        RpcError::Configuration {
            message: message.into(),
        }
    }

    /// The remote error kind, when this error came from a `-1` result envelope.
    pub fn remote_kind(&self) -> Option<&str> {
        match self {
            RpcError::RemoteCall { exc_type, .. } => Some(exc_type),
            _ => None,
        }
    }

    /// Check whether the failure happened before or while talking to the peer,
    /// as opposed to an answer the peer produced.
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Transport { .. } | RpcError::Io { .. })
    }
}

/// A failure captured on the server while resolving or invoking a call.
///
/// `kind` and `message` travel to the caller as `excType` and `message`.
/// `detail` holds the full diagnostic (debug chain, panic payload) and is only
/// ever logged locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: String,
    pub message: String,
    pub detail: Option<String>,
}

impl Fault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::VALUE_ERROR, message)
    }

    pub fn key_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::KEY_ERROR, message)
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::TYPE_ERROR, message)
    }

    pub fn attribute_error(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ATTRIBUTE_ERROR, message)
    }

    pub fn module_not_found(message: impl Into<String>) -> Self {
        Self::new(FaultKind::MODULE_NOT_FOUND, message)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Any error a handler hits can be raised with `?`. The kind is the error's
/// short type name, so `"abc".parse::<i64>()?` reports `ParseIntError`.
impl<E> From<E> for Fault
where
    E: std::error::Error + 'static,
{
    fn from(err: E) -> Self {
        Fault {
            kind: short_type_name::<E>().to_string(),
            message: err.to_string(),
            detail: Some(format!("{:?}", err)),
        }
    }
}

/// Symbolic fault kinds produced by the dispatcher itself.
pub struct FaultKind;

impl FaultKind {
    pub const ATTRIBUTE_ERROR: &'static str = "AttributeError";
    pub const KEY_ERROR: &'static str = "KeyError";
    pub const MALFORMED_ENVELOPE: &'static str = "MalformedEnvelope";
    pub const MODULE_NOT_FOUND: &'static str = "ModuleNotFoundError";
    pub const PANIC: &'static str = "Panic";
    pub const TYPE_ERROR: &'static str = "TypeError";
    pub const VALUE_ERROR: &'static str = "ValueError";
}

/// `std::num::ParseIntError` -> `ParseIntError`, `Wrapper<a::B>` -> `Wrapper`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
