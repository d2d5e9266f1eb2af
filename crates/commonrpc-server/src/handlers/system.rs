//! `system_ns`: liveness and timing probes.

use commonrpc::{BoundArgs, Fault, Namespace, Signature};
use serde_json::Value;
use std::time::Duration;

pub const NAME: &str = "system_ns";

/// Longest sleep a caller may request.
const MAX_SLEEP_SECS: f64 = 60.0;

pub fn namespace() -> Namespace {
    Namespace::new(NAME)
        .function("ping", Signature::default(), |_: &BoundArgs| Ok("pong"))
        .function("echo", Signature::new(["value"]), |args: &BoundArgs| {
            args.get::<Value>("value")
        })
        .function("sleep", Signature::new(["seconds"]), sleep)
}

/// Block the worker for `seconds` and return the duration slept.
fn sleep(args: &BoundArgs) -> Result<f64, Fault> {
    let seconds: f64 = args.get("seconds")?;
    if !(0.0..=MAX_SLEEP_SECS).contains(&seconds) {
        return Err(Fault::value_error(format!(
            "seconds must be between 0 and {}",
            MAX_SLEEP_SECS
        )));
    }
    std::thread::sleep(Duration::from_secs_f64(seconds));
    Ok(seconds)
}
