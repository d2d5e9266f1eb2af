//! `math_ns`: arithmetic and a `Stats` group.

use commonrpc::{BoundArgs, Fault, Namespace, Signature};
use serde::Serialize;
use serde_json::{json, Value};

pub const NAME: &str = "math_ns";

pub fn namespace() -> Namespace {
    Namespace::new(NAME)
        .function("add", Signature::new(["a", "b"]), add)
        .function("sub", Signature::new(["a", "b"]), sub)
        .function("div", Signature::new(["a", "b"]), div)
        .function(
            "round",
            Signature::new(["value", "ndigits"]).with_default("ndigits", json!(0)),
            round,
        )
        .group(
            Namespace::new("Stats")
                .function("mean", Signature::new(["values"]), mean)
                .function("describe", Signature::new(["values"]), describe),
        )
}

fn add(args: &BoundArgs) -> Result<Value, Fault> {
    arithmetic(args, i64::checked_add, |a, b| a + b)
}

fn sub(args: &BoundArgs) -> Result<Value, Fault> {
    arithmetic(args, i64::checked_sub, |a, b| a - b)
}

/// Integer operands stay integers; anything else is computed as floats.
fn arithmetic(
    args: &BoundArgs,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, Fault> {
    let a: Value = args.get("a")?;
    let b: Value = args.get("b")?;

    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return int_op(x, y)
            .map(Value::from)
            .ok_or_else(|| Fault::new("OverflowError", "integer overflow"));
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => serde_json::Number::from_f64(float_op(x, y))
            .map(Value::Number)
            .ok_or_else(|| Fault::new("OverflowError", "numerical result out of range")),
        _ => Err(Fault::type_error(format!(
            "unsupported operand types: {} and {}",
            type_name(&a),
            type_name(&b)
        ))),
    }
}

fn div(args: &BoundArgs) -> Result<f64, Fault> {
    let a: f64 = args.get("a")?;
    let b: f64 = args.get("b")?;
    if b == 0.0 {
        return Err(Fault::new("ZeroDivisionError", "division by zero"));
    }
    Ok(a / b)
}

fn round(args: &BoundArgs) -> Result<f64, Fault> {
    let value: f64 = args.get("value")?;
    let ndigits: i32 = args.get("ndigits")?;
    let scale = 10f64.powi(ndigits);
    Ok((value * scale).round() / scale)
}

fn mean(args: &BoundArgs) -> Result<f64, Fault> {
    let values: Vec<f64> = args.get("values")?;
    if values.is_empty() {
        return Err(empty_data("mean"));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

#[derive(Debug, Serialize)]
struct Summary {
    count: usize,
    mean: f64,
    min: f64,
    max: f64,
}

fn describe(args: &BoundArgs) -> Result<Summary, Fault> {
    let values: Vec<f64> = args.get("values")?;
    if values.is_empty() {
        return Err(empty_data("describe"));
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(Summary {
        count: values.len(),
        mean: values.iter().sum::<f64>() / values.len() as f64,
        min,
        max,
    })
}

fn empty_data(operation: &str) -> Fault {
    Fault::new(
        "StatisticsError",
        format!("{} requires at least one data point", operation),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoke(path: &str, kwargs: Value) -> Result<Value, Fault> {
        let ns = namespace();
        let Value::Object(kwargs) = kwargs else {
            panic!("kwargs must be an object");
        };
        ns.lookup(path).unwrap().invoke(&[], &kwargs)
    }

    #[test]
    fn test_add_keeps_integers() {
        assert_eq!(invoke("add", json!({"a": 2, "b": 3})).unwrap(), json!(5));
        assert_eq!(invoke("add", json!({"a": 0.5, "b": 1})).unwrap(), json!(1.5));
    }

    #[test]
    fn test_add_rejects_non_numbers() {
        let fault = invoke("add", json!({"a": "x", "b": 1})).unwrap_err();
        assert_eq!(fault.kind, "TypeError");
        assert_eq!(fault.message, "unsupported operand types: str and number");
    }

    #[test]
    fn test_integer_overflow() {
        let fault = invoke("add", json!({"a": i64::MAX, "b": 1})).unwrap_err();
        assert_eq!(fault.kind, "OverflowError");
    }

    #[test]
    fn test_sub() {
        assert_eq!(invoke("sub", json!({"a": 2, "b": 5})).unwrap(), json!(-3));
    }

    #[test]
    fn test_div_by_zero() {
        let fault = invoke("div", json!({"a": 1, "b": 0})).unwrap_err();
        assert_eq!(fault.kind, "ZeroDivisionError");
        assert_eq!(fault.message, "division by zero");
    }

    #[test]
    fn test_round_uses_default_ndigits() {
        assert_eq!(invoke("round", json!({"value": 2.567})).unwrap(), json!(3.0));
        assert_eq!(
            invoke("round", json!({"value": 2.567, "ndigits": 2})).unwrap(),
            json!(2.57)
        );
    }

    #[test]
    fn test_stats_group() {
        assert_eq!(
            invoke("Stats.mean", json!({"values": [1, 2, 3, 4]})).unwrap(),
            json!(2.5)
        );

        let summary = invoke("Stats.describe", json!({"values": [3, -1, 4]})).unwrap();
        assert_eq!(summary["count"], json!(3));
        assert_eq!(summary["min"], json!(-1.0));
        assert_eq!(summary["max"], json!(4.0));
    }

    #[test]
    fn test_stats_on_empty_data() {
        let fault = invoke("Stats.mean", json!({"values": []})).unwrap_err();
        assert_eq!(fault.kind, "StatisticsError");
    }

    #[test]
    fn test_float_overflow_is_reported() {
        let fault = invoke("add", json!({"a": 1e308, "b": 1e308})).unwrap_err();
        assert_eq!(fault.kind, "OverflowError");
    }

    #[test]
    fn test_round_out_of_range_is_value_error() {
        let fault = invoke("round", json!({"value": 2.5, "ndigits": 400})).unwrap_err();
        assert_eq!(fault.kind, "ValueError");
    }
}
