//! TCP server for a commonrpc process.
//!
//! Accepts connections and answers framed requests with the [`Dispatcher`].
//! Each connection is handled in its own task; each call additionally takes a
//! permit from a worker pool of `max_workers` and runs its dispatch on a
//! blocking thread, so a slow handler only ever occupies its own worker.
//!
//! # Thread Safety
//!
//! The dispatcher is shared via `Arc` and holds no mutable per-call state.

use super::frame::{read_request, write_response};
use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::envelope::{encode_result, ResultEnvelope};
use crate::{Result, RpcError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch, Semaphore};
use tracing::{debug, error, info, warn};

/// Handle to a running server. Dropping shuts down the server.
pub struct RpcServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    conn_shutdown_tx: watch::Sender<bool>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl RpcServerHandle {
    /// Get the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shut down the server.
    ///
    /// Stops accepting new connections and signals all active connection
    /// handlers to close. Calls already running on a worker finish first.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.conn_shutdown_tx.send(true);
    }

    /// Wait until the accept loop has exited.
    pub async fn stopped(mut self) {
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for RpcServerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

/// TCP server that dispatches every call through one [`Dispatcher`].
pub struct RpcServer;

impl RpcServer {
    /// Bind to `config.host:config.port` and start serving in background tasks.
    ///
    /// Port `0` picks a free port; the handle reports the bound address.
    pub async fn start(
        dispatcher: Arc<Dispatcher>,
        config: &ServerConfig,
    ) -> Result<RpcServerHandle> {
        config.validate()?;

        let listener = TcpListener::bind(config.address())
            .await
            .map_err(|e| RpcError::Io {
                message: format!("Failed to bind {}: {}", config.address(), e),
                source: Some(e),
            })?;
        let addr = listener.local_addr()?;

        info!(
            "commonrpc server listening on {} ({} workers)",
            addr, config.max_workers
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (conn_shutdown_tx, conn_shutdown_rx) = watch::channel(false);
        let workers = Arc::new(Semaphore::new(config.max_workers));

        let task_handle = tokio::spawn(Self::accept_loop(
            listener,
            dispatcher,
            workers,
            shutdown_rx,
            conn_shutdown_rx,
        ));

        Ok(RpcServerHandle {
            addr,
            shutdown_tx: Some(shutdown_tx),
            conn_shutdown_tx,
            task_handle: Some(task_handle),
        })
    }

    async fn accept_loop(
        listener: TcpListener,
        dispatcher: Arc<Dispatcher>,
        workers: Arc<Semaphore>,
        mut shutdown_rx: oneshot::Receiver<()>,
        conn_shutdown_rx: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("commonrpc server shutting down");
                    break;
                }
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            let dispatcher = dispatcher.clone();
                            let workers = workers.clone();
                            let mut conn_shutdown = conn_shutdown_rx.clone();

                            tokio::spawn(async move {
                                debug!("Connection from {}", peer_addr);
                                if let Err(e) = Self::handle_connection(
                                    stream,
                                    dispatcher,
                                    workers,
                                    &mut conn_shutdown,
                                )
                                .await
                                {
                                    warn!("Connection {} ended: {}", peer_addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
            }
        }
    }

    async fn handle_connection(
        mut stream: TcpStream,
        dispatcher: Arc<Dispatcher>,
        workers: Arc<Semaphore>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        stream.set_nodelay(true)?;
        let (mut reader, mut writer) = stream.split();

        loop {
            let request = tokio::select! {
                result = read_request(&mut reader) => {
                    match result? {
                        Some(request) => request,
                        None => return Ok(()),
                    }
                }
                _ = shutdown_rx.changed() => {
                    return Ok(());
                }
            };

            let permit = workers
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| RpcError::configuration("worker pool closed"))?;

            let dispatcher = dispatcher.clone();
            let request_id = request.request_id.clone();
            let response = match tokio::task::spawn_blocking(move || {
                let _permit = permit;
                dispatcher.handle(&request)
            })
            .await
            {
                Ok(response) => response,
                Err(e) => {
                    // Handler panics never get here; the dispatch path itself failed.
                    error!(request_id = %request_id, "Dispatch worker failed: {}", e);
                    let envelope = ResultEnvelope::failure(&crate::Fault::new(
                        crate::error::FaultKind::PANIC,
                        "dispatch worker failed",
                    ));
                    super::TransportResponse {
                        payload: encode_result(&envelope)?,
                        status: envelope.status,
                    }
                }
            };

            write_response(&mut writer, &response).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{BoundArgs, Namespace, NamespaceRegistry, Signature};
    use crate::envelope::{decode_result, encode_call};
    use crate::transport::{TcpConnection, Transport, TransportRequest};
    use serde_json::{json, Map, Value};
    use std::time::Duration;

    fn local_config(max_workers: usize) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            max_workers,
        }
    }

    fn dispatcher() -> Arc<Dispatcher> {
        let ns = Namespace::new("svc")
            .function("echo", Signature::new(["value"]), |args: &BoundArgs| {
                args.get::<Value>("value")
            })
            .function("sleep", Signature::new(["ms"]), |args: &BoundArgs| {
                std::thread::sleep(Duration::from_millis(args.get("ms")?));
                Ok(true)
            });
        Arc::new(Dispatcher::new(NamespaceRegistry::new().register(ns)))
    }

    fn echo_request(value: Value, request_id: &str) -> TransportRequest {
        let mut kwargs = Map::new();
        kwargs.insert("value".into(), value);
        TransportRequest::new(encode_call("svc", "echo", &[], &kwargs).unwrap(), request_id)
    }

    #[tokio::test]
    async fn test_server_start_and_shutdown() {
        let mut handle = RpcServer::start(dispatcher(), &local_config(2)).await.unwrap();
        assert!(handle.addr().port() > 0);
        handle.shutdown();
        handle.stopped().await;
    }

    #[tokio::test]
    async fn test_server_rejects_zero_workers() {
        let result = RpcServer::start(dispatcher(), &local_config(0)).await;
        assert!(matches!(result, Err(RpcError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_server_answers_over_tcp() {
        let handle = RpcServer::start(dispatcher(), &local_config(2)).await.unwrap();
        let conn = TcpConnection::new(handle.addr().to_string());

        let response = conn
            .handle(echo_request(json!({"k": [1, 2]}), "r1"))
            .await
            .unwrap();
        let envelope = decode_result(&response.payload).unwrap();
        assert_eq!(envelope.status, 0);
        assert_eq!(envelope.result, Some(json!({"k": [1, 2]})));
    }

    #[tokio::test]
    async fn test_malformed_payload_keeps_connection_usable() {
        let handle = RpcServer::start(dispatcher(), &local_config(2)).await.unwrap();
        let conn = TcpConnection::new(handle.addr().to_string());

        let response = conn
            .handle(TransportRequest::new(b"garbage".to_vec(), "bad"))
            .await
            .unwrap();
        assert_eq!(response.status, crate::envelope::Status::MALFORMED);

        let response = conn.handle(echo_request(json!(1), "good")).await.unwrap();
        assert_eq!(response.status, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_calls_run_concurrently_across_workers() {
        let handle = RpcServer::start(dispatcher(), &local_config(4)).await.unwrap();
        let conn = Arc::new(TcpConnection::new(handle.addr().to_string()));

        let start = std::time::Instant::now();
        let calls = (0..4).map(|i| {
            let conn = conn.clone();
            async move {
                let mut kwargs = Map::new();
                kwargs.insert("ms".into(), json!(300));
                let payload = encode_call("svc", "sleep", &[], &kwargs).unwrap();
                conn.handle(TransportRequest::new(payload, format!("s{}", i)))
                    .await
                    .unwrap()
            }
        });
        let responses = futures::future::join_all(calls).await;

        assert!(responses.iter().all(|r| r.status == 0));
        // Four 300ms calls on four workers finish well under the serial 1.2s.
        assert!(start.elapsed() < Duration::from_millis(1000));
    }
}
