//! JSON-RPC 2.0 envelope handling shared by both front doors.

use rmcp::model::{CallToolRequestParams, ErrorCode, ListToolsResult};
use rmcp::ErrorData as McpError;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::CallContext;
use crate::dispatch::Dispatcher;

/// One decoded JSON-RPC message. `id` is `None` for notifications.
#[derive(Debug, Deserialize)]
pub(crate) struct RpcRequest {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Decode a message, or return the error envelope to send back.
pub(crate) fn parse(bytes: &[u8]) -> Result<RpcRequest, Value> {
    let message: Value = serde_json::from_slice(bytes).map_err(|e| {
        error_envelope(
            Value::Null,
            McpError::parse_error(format!("invalid JSON: {e}"), None),
        )
    })?;
    serde_json::from_value(message).map_err(|e| {
        error_envelope(
            Value::Null,
            McpError::invalid_request(format!("invalid request: {e}"), None),
        )
    })
}

pub(crate) fn result_envelope(id: Value, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

pub(crate) fn error_envelope(id: Value, error: McpError) -> Value {
    let error = serde_json::to_value(&error).unwrap_or_else(|_| {
        json!({"code": error.code.0, "message": error.message.to_string()})
    });
    json!({"jsonrpc": "2.0", "id": id, "error": error})
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, McpError> {
    serde_json::to_value(value).map_err(|e| McpError::internal_error(e.to_string(), None))
}

/// Answer one request method.
pub(crate) async fn respond(
    dispatcher: &Dispatcher,
    method: &str,
    params: Option<Value>,
    ctx: CallContext,
) -> Result<Value, McpError> {
    match method {
        "initialize" => encode(&dispatcher.info()),
        "ping" => Ok(json!({})),
        "tools/list" => encode(&ListToolsResult {
            tools: dispatcher.tools(),
            next_cursor: None,
            meta: None,
        }),
        "tools/call" => {
            let params: CallToolRequestParams =
                serde_json::from_value(params.unwrap_or(Value::Null))
                    .map_err(|e| McpError::invalid_params(format!("invalid params: {e}"), None))?;
            let result = dispatcher.call(&params.name, params.arguments, ctx).await?;
            encode(&result)
        }
        other => Err(McpError::new(
            ErrorCode::METHOD_NOT_FOUND,
            format!("method '{other}' not found"),
            None,
        )),
    }
}
