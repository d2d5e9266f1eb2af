//! commonrpc - generic call forwarding over a single transport operation.
//!
//! Instead of one network procedure per business operation, every call is an
//! envelope naming a namespace, a dotted method path and its arguments. The
//! server resolves that name against namespaces it registered at startup,
//! invokes the method, and answers with a result envelope that is either a
//! value or a structured error.
//!
//! # Example
//!
//! ```rust,ignore
//! use commonrpc::{
//!     BoundArgs, CallArgs, Dispatcher, EndpointRegistry, Invoker, Namespace,
//!     NamespaceRegistry, RemoteFunction, RpcServer, ServerConfig, Signature,
//! };
//! use std::sync::Arc;
//!
//! // Server side
//! let math = Namespace::new("math_ns").function("add", Signature::new(["a", "b"]), |args: &BoundArgs| {
//!     Ok(args.get::<i64>("a")? + args.get::<i64>("b")?)
//! });
//! let dispatcher = Dispatcher::new(NamespaceRegistry::new().register(math));
//! let server = RpcServer::start(Arc::new(dispatcher), &ServerConfig::default()).await?;
//!
//! // Client side
//! let mut endpoints = EndpointRegistry::new();
//! endpoints.register("math_server", "127.0.0.1", 6565);
//! let invoker = Invoker::new(Arc::new(endpoints));
//! let add = RemoteFunction::new("math_server", "math_ns", "add", Signature::new(["a", "b"]));
//! assert_eq!(add.call_as::<i64>(&invoker, CallArgs::new().arg(2).arg(3)).await?, 5);
//! ```

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod invoker;
pub mod observe;
pub mod registry;
pub mod transport;

pub use config::{ClientConfig, RpcConfig, ServerConfig};
pub use dispatch::{
    resolver_fn, AliasResolver, AllowList, BoundArgs, Dispatcher, Handler, Namespace,
    NamespaceRegistry, NamespaceResolver, Signature,
};
pub use envelope::{CallEnvelope, ResultEnvelope, Status};
pub use error::{Fault, FaultKind, Result, RpcError};
pub use invoker::{CallArgs, Invoker, RemoteFunction};
pub use observe::CallRecord;
pub use registry::{Endpoint, EndpointRegistry};
pub use transport::{
    RpcServer, RpcServerHandle, TcpConnection, Transport, TransportRequest, TransportResponse,
};
