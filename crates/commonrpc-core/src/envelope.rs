//! Call and result envelopes.
//!
//! Both envelopes travel as the opaque payload of a transport request or
//! response, encoded as UTF-8 JSON text:
//!
//! ```text
//! call:   {"clazz": "math_ns", "method": "Stats.mean", "args": [], "kwargs": {"values": [1, 2]}}
//! result: {"status": 0, "message": "", "excType": "", "result": 1.5}
//! ```

use crate::error::Fault;
use crate::{Result, RpcError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status of a result envelope.
pub struct Status;

impl Status {
    pub const OK: i32 = 0;
    pub const ERROR: i32 = -1;
    /// Sent back when the request payload could not be decoded.
    pub const MALFORMED: i32 = -2;
}

/// A remote procedure call: which callable, with which arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    #[serde(rename = "clazz", alias = "namespace")]
    pub namespace: String,
    pub method: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub args: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub kwargs: Map<String, Value>,
}

impl CallEnvelope {
    pub fn new(namespace: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            method: method.into(),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    /// `namespace.method`, used to identify the call in logs.
    pub fn function_name(&self) -> String {
        format!("{}.{}", self.namespace, self.method)
    }
}

/// Outcome of a dispatched call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub status: i32,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "excType", default)]
    pub exc_type: String,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
}

impl ResultEnvelope {
    pub fn success(result: Value) -> Self {
        Self {
            status: Status::OK,
            message: String::new(),
            exc_type: String::new(),
            result: Some(result),
        }
    }

    pub fn failure(fault: &Fault) -> Self {
        Self {
            status: Status::ERROR,
            message: fault.message.clone(),
            exc_type: fault.kind.clone(),
            result: None,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            status: Status::MALFORMED,
            message: message.into(),
            exc_type: crate::error::FaultKind::MALFORMED_ENVELOPE.to_string(),
            result: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::OK
    }
}

pub fn encode_call(
    namespace: &str,
    method: &str,
    args: &[Value],
    kwargs: &Map<String, Value>,
) -> Result<Vec<u8>> {
    #[derive(Serialize)]
    struct CallRef<'a> {
        clazz: &'a str,
        method: &'a str,
        args: &'a [Value],
        kwargs: &'a Map<String, Value>,
    }

    Ok(serde_json::to_vec(&CallRef {
        clazz: namespace,
        method,
        args,
        kwargs,
    })?)
}

pub fn decode_call(payload: &[u8]) -> Result<CallEnvelope> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| RpcError::malformed(format!("call payload is not UTF-8: {}", e)))?;
    let call: CallEnvelope = serde_json::from_str(text)
        .map_err(|e| RpcError::malformed(format!("call payload: {}", e)))?;

    if call.namespace.is_empty() {
        return Err(RpcError::malformed("call namespace is empty"));
    }
    if call.method.is_empty() {
        return Err(RpcError::malformed("call method is empty"));
    }
    Ok(call)
}

pub fn encode_result(result: &ResultEnvelope) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(result)?)
}

pub fn decode_result(payload: &[u8]) -> Result<ResultEnvelope> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| RpcError::malformed(format!("result payload is not UTF-8: {}", e)))?;
    serde_json::from_str(text).map_err(|e| RpcError::malformed(format!("result payload: {}", e)))
}

/// `"args": null` is treated like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keeps `"result": null` distinct from an absent result.
fn present_value<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_roundtrip_preserves_fields() {
        let args = vec![json!(1), json!("two"), json!([3.5, null]), json!({"k": true})];
        let mut kwargs = Map::new();
        kwargs.insert("nested".into(), json!({"a": [1, {"b": "c"}]}));
        kwargs.insert("unicode".into(), json!("héllo ✓"));

        let bytes = encode_call("math_ns", "Stats.mean", &args, &kwargs).unwrap();
        let call = decode_call(&bytes).unwrap();

        assert_eq!(call.namespace, "math_ns");
        assert_eq!(call.method, "Stats.mean");
        assert_eq!(call.args, args);
        assert_eq!(call.kwargs, kwargs);
    }

    #[test]
    fn test_call_uses_clazz_on_the_wire() {
        let bytes = encode_call("svc", "run", &[], &Map::new()).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["clazz"], "svc");
        assert!(value.get("namespace").is_none());
    }

    #[test]
    fn test_non_ascii_is_not_escaped() {
        let mut kwargs = Map::new();
        kwargs.insert("name".into(), json!("日本"));
        let bytes = encode_call("svc", "greet", &[], &kwargs).unwrap();
        assert!(std::str::from_utf8(&bytes).unwrap().contains("日本"));
    }

    #[test]
    fn test_absent_and_null_arguments_default_to_empty() {
        let call = decode_call(br#"{"clazz": "svc", "method": "ping"}"#).unwrap();
        assert!(call.args.is_empty());
        assert!(call.kwargs.is_empty());

        let call =
            decode_call(br#"{"namespace": "svc", "method": "ping", "args": null, "kwargs": null}"#)
                .unwrap();
        assert_eq!(call.namespace, "svc");
        assert!(call.args.is_empty());
        assert!(call.kwargs.is_empty());
    }

    #[test]
    fn test_malformed_call_payloads() {
        let cases: [&[u8]; 5] = [
            b"not json",
            b"[1, 2, 3]",
            br#"{"method": "ping"}"#,
            br#"{"clazz": "", "method": "ping"}"#,
            &[0xff, 0xfe, 0x00],
        ];
        for payload in cases {
            let err = decode_call(payload).unwrap_err();
            assert!(
                matches!(err, RpcError::MalformedEnvelope { .. }),
                "expected MalformedEnvelope for {:?}, got {:?}",
                payload,
                err
            );
        }
    }

    #[test]
    fn test_result_roundtrip_success_and_failure() {
        let ok = ResultEnvelope::success(json!({"sum": 5, "items": [1, 2]}));
        assert_eq!(decode_result(&encode_result(&ok).unwrap()).unwrap(), ok);

        let failed = ResultEnvelope::failure(&Fault::key_error("'missing'"));
        let decoded = decode_result(&encode_result(&failed).unwrap()).unwrap();
        assert_eq!(decoded, failed);
        assert_eq!(decoded.status, Status::ERROR);
        assert_eq!(decoded.exc_type, "KeyError");
        assert!(decoded.result.is_none());
    }

    #[test]
    fn test_null_result_survives_roundtrip() {
        let ok = ResultEnvelope::success(Value::Null);
        let decoded = decode_result(&encode_result(&ok).unwrap()).unwrap();
        assert_eq!(decoded.result, Some(Value::Null));
    }

    #[test]
    fn test_result_uses_exc_type_wire_name() {
        let bytes = encode_result(&ResultEnvelope::failure(&Fault::value_error("bad"))).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["excType"], "ValueError");
        assert_eq!(value["status"], -1);
    }

    #[test]
    fn test_decode_result_rejects_missing_status() {
        let err = decode_result(br#"{"message": ""}"#).unwrap_err();
        assert!(matches!(err, RpcError::MalformedEnvelope { .. }));
    }
}
