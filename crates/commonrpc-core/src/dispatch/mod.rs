//! Server-side dispatch of call envelopes.
//!
//! A call moves through `Received → Resolving → Invoking → (Succeeded | Failed)`:
//!
//! - **Received**: the payload is decoded; a malformed payload is answered with
//!   a `-2` anomaly status and nothing is invoked
//! - **Resolving**: the namespace goes through the [`NamespaceResolver`] and the
//!   dotted method path is walked inside it
//! - **Invoking**: arguments are bound against the method's signature and the
//!   handler runs; handler faults and panics alike are captured
//!
//! Failures from resolving onward are returned as `-1` result envelopes and
//! logged here in full. Nothing a handler does can take the worker down.

mod finite;
mod namespace;
mod resolver;
mod signature;

pub use namespace::{Handler, Member, Method, Namespace};
pub use resolver::{
    resolver_fn, AliasResolver, AllowList, FnResolver, NamespaceRegistry, NamespaceResolver,
};
pub use signature::{BoundArgs, Param, Signature};

use crate::envelope::{decode_call, encode_result, CallEnvelope, ResultEnvelope, Status};
use crate::error::{Fault, FaultKind, RpcError};
use crate::observe::{rpc_log, CallRecord};
use crate::transport::{Transport, TransportRequest, TransportResponse};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, warn};

/// Resolves and invokes call envelopes.
#[derive(Clone)]
pub struct Dispatcher {
    resolver: Arc<dyn NamespaceResolver>,
}

impl Dispatcher {
    pub fn new(resolver: impl NamespaceResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    /// Replace the namespace resolver.
    pub fn set_resolver(&mut self, resolver: impl NamespaceResolver) {
        self.resolver = Arc::new(resolver);
    }

    /// Resolve and invoke one decoded call.
    pub fn dispatch(&self, call: &CallEnvelope) -> ResultEnvelope {
        match self.resolve_and_invoke(call) {
            Ok(value) => ResultEnvelope::success(value),
            Err(fault) => {
                error!(
                    function = %call.function_name(),
                    exc_type = %fault.kind,
                    detail = fault.detail.as_deref().unwrap_or(""),
                    "Dispatch failed: {}",
                    fault
                );
                ResultEnvelope::failure(&fault)
            }
        }
    }

    fn resolve_and_invoke(&self, call: &CallEnvelope) -> Result<serde_json::Value, Fault> {
        let namespace = self.resolver.resolve(&call.namespace)?;
        let method = namespace.lookup(&call.method)?;

        match catch_unwind(AssertUnwindSafe(|| method.invoke(&call.args, &call.kwargs))) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                Err(Fault::new(FaultKind::PANIC, message.clone()).with_detail(message))
            }
        }
    }

    /// Handle one transport request: decode, dispatch, encode, log.
    pub fn handle(&self, request: &TransportRequest) -> TransportResponse {
        self.handle_recorded(request).0
    }

    /// Like [`handle`](Self::handle), also returning the emitted `rpc_log` record.
    pub fn handle_recorded(&self, request: &TransportRequest) -> (TransportResponse, CallRecord) {
        let (payload, status, record) = rpc_log(&request.request_id, || {
            let (envelope, function) = match decode_call(&request.payload) {
                Ok(call) => (self.dispatch(&call), call.function_name()),
                Err(e) => {
                    warn!(request_id = %request.request_id, "Rejecting request: {}", e);
                    (ResultEnvelope::malformed(e.to_string()), "<malformed>".to_string())
                }
            };
            let status = envelope.status;
            (encode_envelope(envelope), status, function)
        });

        (TransportResponse { payload, status }, record)
    }
}

/// Dispatch in-process, without a network hop.
///
/// Handlers run on tokio's blocking pool, as they do behind [`RpcServer`].
///
/// [`RpcServer`]: crate::RpcServer
#[async_trait::async_trait]
impl Transport for Dispatcher {
    async fn handle(&self, request: TransportRequest) -> crate::Result<TransportResponse> {
        let dispatcher = self.clone();
        tokio::task::spawn_blocking(move || Dispatcher::handle(&dispatcher, &request))
            .await
            .map_err(|e| RpcError::Transport {
                addr: self.peer(),
                message: format!("dispatch worker failed: {}", e),
            })
    }

    fn peer(&self) -> String {
        "in-process".to_string()
    }
}

fn encode_envelope(envelope: ResultEnvelope) -> Vec<u8> {
    match encode_result(&envelope) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to encode result envelope: {}", e);
            let fallback = ResultEnvelope::failure(&Fault::type_error(format!(
                "result is not serializable: {}",
                e
            )));
            encode_result(&fallback).unwrap_or_else(|_| {
                format!(r#"{{"status":{},"message":"","excType":"TypeError"}}"#, Status::ERROR)
                    .into_bytes()
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
