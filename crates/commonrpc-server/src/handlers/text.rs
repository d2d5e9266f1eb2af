//! `text_ns`: string helpers.

use commonrpc::{BoundArgs, Fault, Namespace, Signature};
use serde_json::json;

pub const NAME: &str = "text_ns";

/// Upper bound on the output of `repeat`.
const MAX_REPEAT_BYTES: usize = 16 * 1024 * 1024;

pub fn namespace() -> Namespace {
    Namespace::new(NAME)
        .function("upper", Signature::new(["text"]), |args: &BoundArgs| {
            Ok(args.get::<String>("text")?.to_uppercase())
        })
        .function("repeat", Signature::new(["text", "times"]), repeat)
        .function(
            "split",
            Signature::new(["text", "sep"]).with_default("sep", json!(" ")),
            split,
        )
        .function("parse_int", Signature::new(["text"]), |args: &BoundArgs| {
            let text: String = args.get("text")?;
            Ok(text.trim().parse::<i64>()?)
        })
}

fn repeat(args: &BoundArgs) -> Result<String, Fault> {
    let text: String = args.get("text")?;
    let times: usize = args.get("times")?;
    if text.len().saturating_mul(times) > MAX_REPEAT_BYTES {
        return Err(Fault::value_error(format!(
            "result would exceed {} bytes",
            MAX_REPEAT_BYTES
        )));
    }
    Ok(text.repeat(times))
}

fn split(args: &BoundArgs) -> Result<Vec<String>, Fault> {
    let text: String = args.get("text")?;
    let sep: String = args.get("sep")?;
    if sep.is_empty() {
        return Err(Fault::value_error("empty separator"));
    }
    Ok(text.split(sep.as_str()).map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn invoke(path: &str, kwargs: Value) -> Result<Value, Fault> {
        let Value::Object(kwargs) = kwargs else {
            panic!("kwargs must be an object");
        };
        namespace().lookup(path).unwrap().invoke(&[], &kwargs)
    }

    #[test]
    fn test_upper() {
        assert_eq!(invoke("upper", json!({"text": "abc"})).unwrap(), json!("ABC"));
    }

    #[test]
    fn test_repeat_and_limit() {
        assert_eq!(
            invoke("repeat", json!({"text": "ab", "times": 3})).unwrap(),
            json!("ababab")
        );

        let fault = invoke("repeat", json!({"text": "x", "times": usize::MAX})).unwrap_err();
        assert_eq!(fault.kind, "ValueError");
    }

    #[test]
    fn test_split_default_separator() {
        assert_eq!(
            invoke("split", json!({"text": "a b c"})).unwrap(),
            json!(["a", "b", "c"])
        );
        assert_eq!(
            invoke("split", json!({"text": "a,b", "sep": ","})).unwrap(),
            json!(["a", "b"])
        );
    }

    #[test]
    fn test_parse_error_kind_is_error_type_name() {
        assert_eq!(invoke("parse_int", json!({"text": " 42 "})).unwrap(), json!(42));

        let fault = invoke("parse_int", json!({"text": "forty-two"})).unwrap_err();
        assert_eq!(fault.kind, "ParseIntError");
        assert_eq!(fault.message, "invalid digit found in string");
    }
}
