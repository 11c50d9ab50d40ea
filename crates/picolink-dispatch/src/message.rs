use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Request type: liveness check.
pub const REQUEST_PING: &str = "ping";
/// Request type: uptime, free heap and firmware version.
pub const REQUEST_GET_STATUS: &str = "get_status";
/// Request type: return the `data` field unchanged.
pub const REQUEST_ECHO: &str = "echo";
/// Request type: arm the maintenance flag and soft reboot.
pub const REQUEST_ENTER_MAINTENANCE: &str = "enter_maintenance";

/// Error code: the request type is not recognised.
pub const ERROR_UNKNOWN_CMD: &str = "UNKNOWN_CMD";
/// Error code: handling the request raised a fault.
pub const ERROR_EXC: &str = "EXC";

/// Interpreted request type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Ping,
    GetStatus,
    Echo,
    EnterMaintenance,
    /// Anything else, rendered as the peer sent it (`null` when absent).
    Unknown(String),
}

/// A decoded request. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub kind: RequestKind,
    /// The `data` field, `null` when absent.
    pub data: Value,
}

impl Request {
    /// Interpret a frame payload.
    ///
    /// Payloads that are not a JSON object are treated as an empty request,
    /// which is answered as an unknown command rather than surfacing the
    /// parse error on the wire.
    pub fn parse(payload: &[u8]) -> Self {
        let fields = match serde_json::from_slice::<Value>(payload) {
            Ok(Value::Object(fields)) => fields,
            Ok(other) => {
                debug!(kind = json_kind(&other), "request is not an object");
                Map::new()
            }
            Err(err) => {
                debug!(error = %err, len = payload.len(), "malformed request payload");
                Map::new()
            }
        };
        Self::from_fields(fields)
    }

    /// Interpret an already parsed object.
    pub fn from_fields(mut fields: Map<String, Value>) -> Self {
        let kind = match fields.get("type") {
            Some(Value::String(kind)) => match kind.as_str() {
                REQUEST_PING => RequestKind::Ping,
                REQUEST_GET_STATUS => RequestKind::GetStatus,
                REQUEST_ECHO => RequestKind::Echo,
                REQUEST_ENTER_MAINTENANCE => RequestKind::EnterMaintenance,
                other => RequestKind::Unknown(other.to_string()),
            },
            Some(other) => RequestKind::Unknown(other.to_string()),
            None => RequestKind::Unknown("null".to_string()),
        };
        let data = fields.remove("data").unwrap_or(Value::Null);
        Self { kind, data }
    }
}

/// Response payloads, tagged by their `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong {
        ts: u64,
        version: String,
    },
    Status {
        uptime_ms: u64,
        heap_free: u64,
        version: String,
    },
    Echo {
        data: Value,
    },
    Error {
        code: String,
        message: String,
    },
}

impl Response {
    /// Create an error response.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Error response for an unrecognised request type.
    pub fn unknown_command(kind: &str) -> Self {
        Self::error(ERROR_UNKNOWN_CMD, format!("Unknown command: {kind}"))
    }

    /// The wire `type` of this response.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Pong { .. } => "pong",
            Response::Status { .. } => "status",
            Response::Echo { .. } => "echo",
            Response::Error { .. } => "error",
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
