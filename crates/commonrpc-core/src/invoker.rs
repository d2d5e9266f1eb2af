//! Client-side invocation of remote functions.
//!
//! A [`RemoteFunction`] is declared once, at setup time: which server, which
//! namespace, which qualified method path, and the parameter list the caller
//! binds against. Calling it goes through an [`Invoker`], which owns the
//! endpoint registry.
//!
//! # Example
//!
//! ```rust,ignore
//! use commonrpc::{CallArgs, EndpointRegistry, Invoker, RemoteFunction, Signature};
//! use std::sync::Arc;
//!
//! let mut endpoints = EndpointRegistry::new();
//! endpoints.register("math_server", "127.0.0.1", 6565);
//! let invoker = Invoker::new(Arc::new(endpoints));
//!
//! let add = RemoteFunction::new("math_server", "math_ns", "add", Signature::new(["a", "b"]));
//! let sum: i64 = add.call_as(&invoker, CallArgs::new().arg(2).arg(3)).await?;
//! ```

use crate::config::RpcConfig;
use crate::dispatch::Signature;
use crate::envelope::{decode_result, encode_call, Status};
use crate::registry::EndpointRegistry;
use crate::transport::{Transport, TransportRequest};
use crate::{Result, RpcError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Arguments at a call site.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Add a keyword argument.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(name.into(), value.into());
        self
    }

    /// Append any serializable value as a positional argument.
    pub fn try_arg(mut self, value: impl Serialize) -> Result<Self> {
        self.args.push(serde_json::to_value(value)?);
        Ok(self)
    }

    /// Add any serializable value as a keyword argument.
    pub fn try_kwarg(mut self, name: impl Into<String>, value: impl Serialize) -> Result<Self> {
        self.kwargs.insert(name.into(), serde_json::to_value(value)?);
        Ok(self)
    }
}

/// A locally declared stub for a function that lives on a remote server.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFunction {
    server: String,
    namespace: String,
    method: String,
    signature: Signature,
    serialize: i32,
}

impl RemoteFunction {
    pub fn new(
        server: impl Into<String>,
        namespace: impl Into<String>,
        method: impl Into<String>,
        signature: Signature,
    ) -> Self {
        Self {
            server: server.into(),
            namespace: namespace.into(),
            method: method.into(),
            signature,
            serialize: RpcConfig::SERIALIZE_JSON,
        }
    }

    /// Override the serialization tag sent with every call.
    pub fn with_serialize(mut self, serialize: i32) -> Self {
        self.serialize = serialize;
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// `namespace.method`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.method)
    }

    /// Bind call-site arguments and flatten them into keyword form.
    ///
    /// Every bound parameter travels as a keyword argument; the receiver, if
    /// declared, is dropped. A required parameter left unbound fails here and
    /// nothing is sent. Defaults are left to the server.
    pub fn bind(&self, args: &CallArgs) -> Result<Map<String, Value>> {
        self.signature
            .bind_call(&args.args, &args.kwargs)
            .map_err(|fault| RpcError::Binding {
                function: self.qualified_name(),
                message: fault.message,
            })
    }

    pub async fn call(&self, invoker: &Invoker, args: CallArgs) -> Result<Value> {
        invoker.invoke(self, args).await
    }

    /// Call and deserialize the result.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        invoker: &Invoker,
        args: CallArgs,
    ) -> Result<T> {
        let value = invoker.invoke(self, args).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Json {
            message: format!("Unexpected result from {}: {}", self.qualified_name(), e),
            source: Some(e),
        })
    }
}

/// Sends remote function calls to the servers in an endpoint registry.
#[derive(Debug, Clone)]
pub struct Invoker {
    endpoints: Arc<EndpointRegistry>,
}

impl Invoker {
    pub fn new(endpoints: Arc<EndpointRegistry>) -> Self {
        Self { endpoints }
    }

    pub fn endpoints(&self) -> &EndpointRegistry {
        &self.endpoints
    }

    /// Perform one remote call.
    ///
    /// Returns the remote result on status `0`; a `-1` answer becomes
    /// [`RpcError::RemoteCall`] carrying the remote kind and message; any other
    /// status is a [`RpcError::ProtocolAnomaly`].
    pub async fn invoke(&self, function: &RemoteFunction, args: CallArgs) -> Result<Value> {
        let kwargs = function.bind(&args)?;
        let payload = encode_call(&function.namespace, &function.method, &[], &kwargs)?;
        let transport = self.endpoints.connect(&function.server)?;

        let request_id = uuid::Uuid::new_v4().simple().to_string();
        debug!(
            request_id = %request_id,
            server = %function.server,
            "Calling {}",
            function.qualified_name()
        );

        let request =
            TransportRequest::new(payload, request_id.clone()).with_serialize(function.serialize);
        let response = transport.handle(request).await?;
        let envelope = decode_result(&response.payload)?;

        match envelope.status {
            Status::OK => Ok(envelope.result.unwrap_or(Value::Null)),
            Status::ERROR => Err(RpcError::RemoteCall {
                exc_type: envelope.exc_type,
                message: envelope.message,
            }),
            status => {
                warn!(
                    request_id = %request_id,
                    "{} answered with status {}: {}",
                    function.qualified_name(),
                    status,
                    envelope.message
                );
                Err(RpcError::ProtocolAnomaly { status })
            }
        }
    }
}
