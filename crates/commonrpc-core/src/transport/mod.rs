//! The single unary transport operation every call travels through.
//!
//! # Architecture
//!
//! - **Types**: `TransportRequest`/`TransportResponse` carry an opaque payload
//! - **Trait**: [`Transport`] is the `handle(request) -> response` primitive
//! - **Framing**: length-prefixed frames shared by the TCP client and server
//! - **Client**: [`TcpConnection`], a lazily connected handle with a stream pool
//! - **Server**: [`RpcServer`], accepts connections and dispatches on a bounded pool

pub mod client;
pub mod frame;
pub mod server;

pub use client::TcpConnection;
pub use server::{RpcServer, RpcServerHandle};

use crate::config::RpcConfig;
use crate::Result;
use serde::{Deserialize, Serialize};

/// One call on the wire: an envelope payload plus routing metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub payload: Vec<u8>,
    /// Serialization scheme of `payload`. Passed through unexamined.
    pub serialize: i32,
    /// Per-call correlation id, used only for observability.
    pub request_id: String,
}

impl TransportRequest {
    pub fn new(payload: Vec<u8>, request_id: impl Into<String>) -> Self {
        Self {
            payload,
            serialize: RpcConfig::SERIALIZE_JSON,
            request_id: request_id.into(),
        }
    }

    pub fn with_serialize(mut self, serialize: i32) -> Self {
        self.serialize = serialize;
        self
    }
}

/// The answer to one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub payload: Vec<u8>,
    /// Mirrors the status of the result envelope in `payload`.
    pub status: i32,
}

/// Header frame preceding a request payload frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RequestHeader {
    pub serialize: i32,
    pub request_id: String,
}

/// Header frame preceding a response payload frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ResponseHeader {
    pub status: i32,
}

/// A unary call primitive: one request in, one response out.
///
/// No retries, no deadline. An error means the call could not be carried;
/// application failures come back inside the response payload.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn handle(&self, request: TransportRequest) -> Result<TransportResponse>;

    /// Human-readable peer description for logs and errors.
    fn peer(&self) -> String;
}
