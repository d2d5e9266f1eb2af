//! Endpoint registry: logical server name → connection handle.
//!
//! The registry is an explicit value, built during initialization with
//! `&mut self` and then shared read-only (usually behind an `Arc`) by every
//! invoker. After that point lookups take no lock.

use crate::config::ClientConfig;
use crate::transport::{TcpConnection, Transport};
use crate::{Result, RpcError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// A named server address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct Registered {
    endpoint: Option<Endpoint>,
    transport: Arc<dyn Transport>,
}

/// Maps logical server names to exactly one connection each.
#[derive(Default)]
pub struct EndpointRegistry {
    entries: HashMap<String, Registered>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a client configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        let mut registry = Self::new();
        registry.load(config.servers.iter().cloned());
        registry
    }

    /// Register a TCP endpoint. The connection opens lazily on first use.
    /// Registering a name again replaces the previous connection.
    pub fn register(&mut self, name: impl Into<String>, host: impl Into<String>, port: u16) {
        let endpoint = Endpoint::new(name, host, port);
        let transport: Arc<dyn Transport> = Arc::new(TcpConnection::new(endpoint.addr()));
        info!("Registered server '{}' at {}", endpoint.name, endpoint.addr());
        self.entries.insert(
            endpoint.name.clone(),
            Registered {
                endpoint: Some(endpoint),
                transport,
            },
        );
    }

    /// Register any transport under a name, e.g. an in-process [`Dispatcher`].
    ///
    /// [`Dispatcher`]: crate::Dispatcher
    pub fn register_transport(&mut self, name: impl Into<String>, transport: Arc<dyn Transport>) {
        let name = name.into();
        info!("Registered server '{}' via {}", name, transport.peer());
        self.entries.insert(
            name,
            Registered {
                endpoint: None,
                transport,
            },
        );
    }

    /// Register many endpoints at once.
    pub fn load<I>(&mut self, endpoints: I)
    where
        I: IntoIterator<Item = Endpoint>,
    {
        for endpoint in endpoints {
            self.register(endpoint.name, endpoint.host, endpoint.port);
        }
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Transport>> {
        self.entries.get(name).map(|entry| entry.transport.clone())
    }

    /// Like [`resolve`](Self::resolve), but an unknown name is a configuration error.
    pub fn connect(&self, name: &str) -> Result<Arc<dyn Transport>> {
        self.resolve(name).ok_or_else(|| {
            RpcError::configuration(format!("No server registered under '{}'", name))
        })
    }

    /// The TCP endpoint registered under `name`, if it was registered by address.
    pub fn endpoint(&self, name: &str) -> Option<&Endpoint> {
        self.entries.get(name).and_then(|entry| entry.endpoint.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for EndpointRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, entry) in &self.entries {
            map.entry(name, &entry.transport.peer());
        }
        map.finish()
    }
}
