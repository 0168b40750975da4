use crate::ipc::helpers::HandlerErr;
use serde::Serialize;
use serde_json::Value;

/// One response line. Exactly one of `result` and `error` is present.
#[derive(Serialize)]
struct Envelope<'a> {
    id: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a HandlerErr>,
}

fn envelope(env: Envelope<'_>) -> Value {
    serde_json::to_value(env).unwrap_or(Value::Null)
}

pub fn ok(id: &str, result: Value) -> Value {
    envelope(Envelope {
        id,
        ok: true,
        result: Some(result),
        error: None,
    })
}

pub fn err(id: &str, error: &HandlerErr) -> Value {
    envelope(Envelope {
        id,
        ok: false,
        result: None,
        error: Some(error),
    })
}
