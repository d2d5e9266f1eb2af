//! Namespace resolution.
//!
//! The dispatcher never loads code by name. Every namespace a server can reach
//! is registered up front in a [`NamespaceRegistry`]; the other resolvers here
//! narrow or rename what a caller may ask for. A production server should put
//! an [`AllowList`] in front of its registry.

use super::namespace::Namespace;
use crate::error::Fault;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Maps a caller-supplied namespace string to a registered namespace.
pub trait NamespaceResolver: Send + Sync + 'static {
    fn resolve(&self, namespace: &str) -> Result<Arc<Namespace>, Fault>;
}

fn not_found(namespace: &str) -> Fault {
    Fault::module_not_found(format!("No namespace named '{}'", namespace))
}

/// In-process table of namespaces, built at startup.
#[derive(Debug, Default, Clone)]
pub struct NamespaceRegistry {
    namespaces: HashMap<String, Arc<Namespace>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a namespace under its own name. A later registration with the
    /// same name replaces the earlier one.
    pub fn register(mut self, namespace: Namespace) -> Self {
        self.insert(namespace);
        self
    }

    pub fn insert(&mut self, namespace: Namespace) {
        self.namespaces
            .insert(namespace.name().to_string(), Arc::new(namespace));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

impl NamespaceResolver for NamespaceRegistry {
    fn resolve(&self, namespace: &str) -> Result<Arc<Namespace>, Fault> {
        self.namespaces
            .get(namespace)
            .cloned()
            .ok_or_else(|| not_found(namespace))
    }
}

/// Restricts another resolver to an explicit set of namespace names.
pub struct AllowList<R> {
    inner: R,
    allowed: HashSet<String>,
}

impl<R: NamespaceResolver> AllowList<R> {
    pub fn new<I, S>(inner: R, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

impl<R: NamespaceResolver> NamespaceResolver for AllowList<R> {
    fn resolve(&self, namespace: &str) -> Result<Arc<Namespace>, Fault> {
        if !self.allowed.contains(namespace) {
            // Same answer as an unknown namespace.
            return Err(not_found(namespace));
        }
        self.inner.resolve(namespace)
    }
}

/// Rewrites caller-visible namespace names before delegating.
///
/// Names without an alias pass through unchanged.
pub struct AliasResolver<R> {
    inner: R,
    aliases: HashMap<String, String>,
}

impl<R: NamespaceResolver> AliasResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            aliases: HashMap::new(),
        }
    }

    pub fn alias(mut self, visible: impl Into<String>, registered: impl Into<String>) -> Self {
        self.aliases.insert(visible.into(), registered.into());
        self
    }
}

impl<R: NamespaceResolver> NamespaceResolver for AliasResolver<R> {
    fn resolve(&self, namespace: &str) -> Result<Arc<Namespace>, Fault> {
        let target = self
            .aliases
            .get(namespace)
            .map(String::as_str)
            .unwrap_or(namespace);
        self.inner.resolve(target)
    }
}

/// Resolver backed by a closure.
pub struct FnResolver<F>(F);

/// Wrap a closure as a resolver.
pub fn resolver_fn<F>(f: F) -> FnResolver<F>
where
    F: Fn(&str) -> Result<Arc<Namespace>, Fault> + Send + Sync + 'static,
{
    FnResolver(f)
}

impl<F> NamespaceResolver for FnResolver<F>
where
    F: Fn(&str) -> Result<Arc<Namespace>, Fault> + Send + Sync + 'static,
{
    fn resolve(&self, namespace: &str) -> Result<Arc<Namespace>, Fault> {
        (self.0)(namespace)
    }
}
