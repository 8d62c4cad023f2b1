use serde::Serialize;
use serde_json::{json, Value};

/// `error` member of a failed reply.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

pub fn ok(id: &str, result: Value) -> Value {
    json!({ "id": id, "ok": true, "result": result })
}

pub fn err(id: &str, code: &str, message: impl Into<String>, details: Option<Value>) -> Value {
    let body = ErrorBody {
        code,
        message: message.into(),
        details,
    };
    json!({ "id": id, "ok": false, "error": body })
}
