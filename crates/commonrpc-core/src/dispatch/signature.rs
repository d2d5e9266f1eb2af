//! Declared parameter lists and argument binding.
//!
//! The same `Signature` type is used on both sides of a call: the invoker
//! binds the caller's arguments to flatten them into keyword form, and the
//! dispatcher binds the received arguments before invoking a handler.

use crate::error::Fault;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Value>,
}

/// Ordered parameter list of a callable, optionally led by an implicit
/// receiver (`self`/`cls`) that is bound but never transmitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    receiver: Option<String>,
    params: Vec<Param>,
}

impl Signature {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            receiver: None,
            params: names
                .into_iter()
                .map(|name| Param {
                    name: name.into(),
                    default: None,
                })
                .collect(),
        }
    }

    /// Declare a leading receiver parameter.
    pub fn with_receiver(mut self, name: impl Into<String>) -> Self {
        self.receiver = Some(name.into());
        self
    }

    /// Give a parameter a default value.
    ///
    /// A name already declared keeps its position and gains the default; a new
    /// name is appended. Binding is by name, so a defaulted parameter may sit
    /// before required ones, but it can then only be skipped via keywords.
    pub fn with_default(mut self, name: impl Into<String>, default: Value) -> Self {
        let name = name.into();
        match self.params.iter_mut().find(|p| p.name == name) {
            Some(param) => param.default = Some(default),
            None => self.params.push(Param {
                name,
                default: Some(default),
            }),
        }
        self
    }

    pub fn receiver(&self) -> Option<&str> {
        self.receiver.as_deref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Bind positional and keyword arguments to parameter names.
    ///
    /// Only supplied arguments appear in the output; the receiver, when
    /// declared, is bound and dropped. Fails with a `TypeError` fault on too
    /// many positionals, an unknown keyword, or a parameter given twice.
    pub fn bind_supplied(
        &self,
        args: &[Value],
        kwargs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, Fault> {
        let mut positional = args.iter();
        let mut receiver_bound = false;
        if self.receiver.is_some() && positional.len() > 0 {
            positional.next();
            receiver_bound = true;
        }

        if positional.len() > self.params.len() {
            return Err(Fault::type_error(format!(
                "takes {} positional arguments but {} were given",
                self.params.len(),
                positional.len()
            )));
        }

        let mut bound = Map::new();
        for (param, value) in self.params.iter().zip(positional) {
            bound.insert(param.name.clone(), value.clone());
        }

        for (name, value) in kwargs {
            if self.receiver.as_deref() == Some(name.as_str()) {
                if receiver_bound {
                    return Err(Fault::type_error(format!(
                        "got multiple values for argument '{}'",
                        name
                    )));
                }
                receiver_bound = true;
                continue;
            }
            if !self.params.iter().any(|p| &p.name == name) {
                return Err(Fault::type_error(format!(
                    "got an unexpected keyword argument '{}'",
                    name
                )));
            }
            if bound.contains_key(name) {
                return Err(Fault::type_error(format!(
                    "got multiple values for argument '{}'",
                    name
                )));
            }
            bound.insert(name.clone(), value.clone());
        }

        Ok(bound)
    }

    /// Bind call-site arguments for transmission.
    ///
    /// Like [`bind_supplied`](Self::bind_supplied), but every parameter
    /// without a default must be supplied. Defaults are not filled in.
    pub fn bind_call(
        &self,
        args: &[Value],
        kwargs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, Fault> {
        let bound = self.bind_supplied(args, kwargs)?;
        self.check_required(&bound)?;
        Ok(bound)
    }

    /// Bind arguments and fill defaults; every parameter must end up bound.
    pub fn bind(&self, args: &[Value], kwargs: &Map<String, Value>) -> Result<BoundArgs, Fault> {
        let mut bound = self.bind_call(args, kwargs)?;

        for param in &self.params {
            if let Some(default) = &param.default {
                bound
                    .entry(param.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }

        Ok(BoundArgs { values: bound })
    }

    fn check_required(&self, bound: &Map<String, Value>) -> Result<(), Fault> {
        let missing: Vec<String> = self
            .params
            .iter()
            .filter(|p| p.default.is_none() && !bound.contains_key(&p.name))
            .map(|p| format!("'{}'", p.name))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }
        Err(Fault::type_error(format!(
            "missing {} required argument{}: {}",
            missing.len(),
            if missing.len() == 1 { "" } else { "s" },
            missing.join(", ")
        )))
    }
}

/// Arguments bound against a handler's signature.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: Map<String, Value>,
}

impl BoundArgs {
    pub fn raw(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Deserialize a bound argument; a shape mismatch is a `TypeError`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, Fault> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| Fault::key_error(format!("'{}'", name)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| Fault::type_error(format!("argument '{}': {}", name, e)))
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}
