//! Per-call `rpc_log` records.
//!
//! Every dispatched call produces one [`CallRecord`] keyed by the request's
//! correlation id. Large responses are logged as a bounded preview; the
//! response sent back to the caller is never touched.

use crate::config::RpcConfig;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// One structured log record describing a dispatched call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRecord {
    #[serde(rename = "type")]
    pub record_type: &'static str,
    pub request_id: String,
    pub function: String,
    pub status: i32,
    pub process_time: String,
    /// Parsed response envelope, or a string preview when truncated.
    pub response: Value,
    pub truncated: bool,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CallRecord {
    pub fn new(
        request_id: impl Into<String>,
        function: impl Into<String>,
        status: i32,
        elapsed: Duration,
        response: &[u8],
    ) -> Self {
        let text = String::from_utf8_lossy(response);
        let (response, truncated) = match preview(&text, RpcConfig::LOG_PREVIEW_BYTES) {
            Some(cut) => (Value::String(cut), true),
            None => (
                serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.into_owned())),
                false,
            ),
        };

        Self {
            record_type: "rpc_log",
            request_id: request_id.into(),
            function: function.into(),
            status,
            process_time: format!("{:.6}s", elapsed.as_secs_f64()),
            response,
            truncated,
            elapsed,
        }
    }

    /// Emit the record on the `rpc_log` target.
    pub fn emit(&self) {
        let record = serde_json::to_string(self).unwrap_or_default();
        debug!(
            target: RpcConfig::LOG_TARGET,
            request_id = %self.request_id,
            function = %self.function,
            status = self.status,
            process_time = %self.process_time,
            truncated = self.truncated,
            "{}",
            record
        );
    }
}

/// Cut `text` to at most `limit` bytes on a char boundary and append the
/// truncation marker. Returns `None` when `text` already fits.
pub fn preview(text: &str, limit: usize) -> Option<String> {
    if text.len() <= limit {
        return None;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut cut = String::with_capacity(end + RpcConfig::LOG_TRUNCATION_MARKER.len());
    cut.push_str(&text[..end]);
    cut.push_str(RpcConfig::LOG_TRUNCATION_MARKER);
    Some(cut)
}

/// Time a dispatch and build its record.
///
/// `dispatch` returns the encoded response payload, the envelope status and
/// the function identity it resolved.
pub fn rpc_log<F>(request_id: &str, dispatch: F) -> (Vec<u8>, i32, CallRecord)
where
    F: FnOnce() -> (Vec<u8>, i32, String),
{
    let start = Instant::now();
    let (payload, status, function) = dispatch();
    let record = CallRecord::new(request_id, function, status, start.elapsed(), &payload);
    record.emit();
    (payload, status, record)
}
