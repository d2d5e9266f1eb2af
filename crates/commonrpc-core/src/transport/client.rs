//! TCP client connection to a commonrpc server.
//!
//! A `TcpConnection` is created without touching the network; the first call
//! opens a stream. Each in-flight call owns a stream for its duration, so
//! concurrent calls through one handle never wait on each other. Streams that
//! finish a call cleanly go back to a small idle pool.
//!
//! # Thread Safety
//!
//! The idle pool sits behind a tokio `Mutex` that is only held to push or pop
//! a stream, never across network I/O.

use super::frame::{read_response, write_request};
use super::{Transport, TransportRequest, TransportResponse};
use crate::config::RpcConfig;
use crate::{Result, RpcError};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

/// Lazily connected client handle for one server address.
#[derive(Debug)]
pub struct TcpConnection {
    addr: String,
    idle: Mutex<Vec<TcpStream>>,
}

impl TcpConnection {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn checkout(&self) -> Result<TcpStream> {
        if let Some(stream) = self.idle.lock().await.pop() {
            return Ok(stream);
        }

        let stream = tokio::time::timeout(
            RpcConfig::CONNECT_TIMEOUT,
            TcpStream::connect(self.addr.as_str()),
        )
        .await
        .map_err(|_| RpcError::Transport {
            addr: self.addr.clone(),
            message: format!("connect timed out after {:?}", RpcConfig::CONNECT_TIMEOUT),
        })?
        .map_err(|e| RpcError::Transport {
            addr: self.addr.clone(),
            message: e.to_string(),
        })?;
        stream.set_nodelay(true)?;

        debug!("Connected to {}", self.addr);
        Ok(stream)
    }

    async fn checkin(&self, stream: TcpStream) {
        let mut idle = self.idle.lock().await;
        if idle.len() < RpcConfig::MAX_IDLE_STREAMS {
            idle.push(stream);
        }
    }

    async fn exchange(
        &self,
        stream: &mut TcpStream,
        request: &TransportRequest,
    ) -> Result<TransportResponse> {
        let (mut reader, mut writer) = stream.split();
        write_request(&mut writer, request).await?;
        read_response(&mut reader).await
    }
}

#[async_trait::async_trait]
impl Transport for TcpConnection {
    async fn handle(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut stream = self.checkout().await?;

        match self.exchange(&mut stream, &request).await {
            Ok(response) => {
                self.checkin(stream).await;
                Ok(response)
            }
            // The stream is in an unknown state; drop it.
            Err(e) => Err(RpcError::Transport {
                addr: self.addr.clone(),
                message: e.to_string(),
            }),
        }
    }

    fn peer(&self) -> String {
        self.addr.clone()
    }
}
