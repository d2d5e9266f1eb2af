//! Namespaces: named tables of callables, built once at startup.
//!
//! A namespace maps attribute names to either a method or a nested group, so
//! a dotted method path such as `Stats.mean` walks `Stats` then `mean`.

use super::finite::check_finite;
use super::signature::{BoundArgs, Signature};
use crate::error::Fault;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A server-side callable. Runs synchronously on a dispatch worker.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, args: &BoundArgs) -> Result<Value, Fault>;
}

impl<F> Handler for F
where
    F: Fn(&BoundArgs) -> Result<Value, Fault> + Send + Sync + 'static,
{
    fn call(&self, args: &BoundArgs) -> Result<Value, Fault> {
        self(args)
    }
}

/// A registered method: its declared signature plus the handler.
#[derive(Clone)]
pub struct Method {
    pub(crate) signature: Signature,
    pub(crate) handler: Arc<dyn Handler>,
}

impl Method {
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Bind and invoke.
    pub fn invoke(
        &self,
        args: &[Value],
        kwargs: &serde_json::Map<String, Value>,
    ) -> Result<Value, Fault> {
        let bound = self.signature.bind(args, kwargs)?;
        self.handler.call(&bound)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// A namespace attribute.
#[derive(Debug, Clone)]
pub enum Member {
    Method(Method),
    Group(Namespace),
}

/// A resolvable unit exposing methods, possibly through nested groups.
#[derive(Debug, Clone)]
pub struct Namespace {
    name: String,
    members: BTreeMap<String, Member>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a method that works on raw bound arguments.
    pub fn method<H: Handler>(
        mut self,
        name: impl Into<String>,
        signature: Signature,
        handler: H,
    ) -> Self {
        self.members.insert(
            name.into(),
            Member::Method(Method {
                signature,
                handler: Arc::new(handler),
            }),
        );
        self
    }

    /// Register a method whose return value is any serializable type.
    ///
    /// A return value holding NaN or an infinity becomes a `ValueError`
    /// fault; any other value JSON cannot represent becomes a `TypeError`.
    pub fn function<F, T>(self, name: impl Into<String>, signature: Signature, f: F) -> Self
    where
        F: Fn(&BoundArgs) -> Result<T, Fault> + Send + Sync + 'static,
        T: Serialize + 'static,
    {
        self.method(name, signature, move |args: &BoundArgs| {
            let value = f(args)?;
            check_finite(&value).map_err(|e| Fault::value_error(e.to_string()))?;
            serde_json::to_value(value).map_err(|e| {
                Fault::type_error(format!("return value is not JSON serializable: {}", e))
            })
        })
    }

    /// Register a nested group, reachable as `<group>.<member>`.
    pub fn group(mut self, group: Namespace) -> Self {
        self.members.insert(group.name.clone(), Member::Group(group));
        self
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.get(name)
    }

    /// Walk a dotted path to a method.
    ///
    /// Missing attributes are `AttributeError`s naming the owner; a path that
    /// ends on a group is a `TypeError` (the group is not callable).
    pub fn lookup(&self, path: &str) -> Result<&Method, Fault> {
        let mut owner = self;
        let mut owner_path = self.name.clone();
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let member = owner.member(segment).ok_or_else(|| {
                Fault::attribute_error(format!(
                    "'{}' has no attribute '{}'",
                    owner_path, segment
                ))
            })?;

            match member {
                Member::Method(method) => {
                    if let Some(next) = segments.peek() {
                        return Err(Fault::attribute_error(format!(
                            "'{}.{}' is a method and has no attribute '{}'",
                            owner_path, segment, next
                        )));
                    }
                    return Ok(method);
                }
                Member::Group(group) => {
                    owner = group;
                    owner_path = format!("{}.{}", owner_path, segment);
                }
            }
        }

        Err(Fault::type_error(format!("'{}' is not callable", owner_path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn math() -> Namespace {
        Namespace::new("math_ns")
            .function("add", Signature::new(["a", "b"]), |args: &BoundArgs| {
                Ok(args.get::<i64>("a")? + args.get::<i64>("b")?)
            })
            .group(Namespace::new("Stats").function(
                "mean",
                Signature::new(["values"]),
                |args: &BoundArgs| {
                    let values: Vec<f64> = args.get("values")?;
                    if values.is_empty() {
                        return Err(Fault::value_error("mean requires at least one data point"));
                    }
                    Ok(values.iter().sum::<f64>() / values.len() as f64)
                },
            ))
    }

    #[test]
    fn test_lookup_and_invoke_top_level() {
        let ns = math();
        let method = ns.lookup("add").unwrap();
        let result = method.invoke(&[json!(2), json!(3)], &Map::new()).unwrap();
        assert_eq!(result, json!(5));
    }

    #[test]
    fn test_lookup_nested_path() {
        let ns = math();
        let method = ns.lookup("Stats.mean").unwrap();
        let mut kwargs = Map::new();
        kwargs.insert("values".into(), json!([1.0, 2.0]));
        assert_eq!(method.invoke(&[], &kwargs).unwrap(), json!(1.5));
    }

    #[test]
    fn test_missing_attribute_names_owner() {
        let ns = math();
        let fault = ns.lookup("Stats.median").unwrap_err();
        assert_eq!(fault.kind, "AttributeError");
        assert_eq!(fault.message, "'math_ns.Stats' has no attribute 'median'");
    }

    #[test]
    fn test_path_through_method_is_attribute_error() {
        let fault = math().lookup("add.inner").unwrap_err();
        assert_eq!(fault.kind, "AttributeError");
    }

    #[test]
    fn test_group_is_not_callable() {
        let fault = math().lookup("Stats").unwrap_err();
        assert_eq!(fault.kind, "TypeError");
        assert_eq!(fault.message, "'math_ns.Stats' is not callable");
    }

    #[test]
    fn test_unserializable_return_is_type_error() {
        use std::collections::HashMap;

        let ns = Namespace::new("bad").function("keys", Signature::default(), |_: &BoundArgs| {
            let mut map = HashMap::new();
            map.insert(vec![1u8], 1);
            Ok(map)
        });
        let fault = ns.lookup("keys").unwrap().invoke(&[], &Map::new()).unwrap_err();
        assert_eq!(fault.kind, "TypeError");
    }

    #[test]
    fn test_non_finite_return_is_value_error() {
        let ns = Namespace::new("float")
            .function("inf", Signature::default(), |_: &BoundArgs| Ok(f64::INFINITY))
            .function("nested", Signature::default(), |_: &BoundArgs| {
                Ok(vec![1.0, f64::NAN])
            });

        let fault = ns.lookup("inf").unwrap().invoke(&[], &Map::new()).unwrap_err();
        assert_eq!(fault.kind, "ValueError");
        assert_eq!(
            fault.message,
            "Out of range float values are not JSON compliant: inf"
        );

        let fault = ns.lookup("nested").unwrap().invoke(&[], &Map::new()).unwrap_err();
        assert_eq!(fault.kind, "ValueError");
    }
}
