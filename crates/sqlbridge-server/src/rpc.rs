//! Newline-delimited JSON-RPC 2.0 over TCP
//!
//! Each line is one request. Every request runs in its own task, and one
//! writer task per client serializes the responses, so concurrent calls
//! never interleave within a line. A client that disconnects does not cancel
//! calls already in flight.

use std::future::Future;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlbridge_tools::{DispatchError, ToolRegistry};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "mysql-mcp-server";

#[derive(Debug, Deserialize)]
struct Request {
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Handle one request line. Returns `None` for notifications.
///
/// A request without an `id` member is a notification; `"id": null` still
/// gets a response.
pub async fn handle_line(registry: &ToolRegistry, line: &str) -> Option<String> {
    let response = match serde_json::from_str::<Value>(line) {
        Err(e) => Some(Response::err(Value::Null, PARSE_ERROR, format!("Parse error: {}", e))),
        Ok(raw) => match serde_json::from_value::<Request>(raw.clone()) {
            Err(e) => Some(Response::err(
                Value::Null,
                INVALID_REQUEST,
                format!("Invalid request: {}", e),
            )),
            Ok(request) => {
                let id = raw.get("id").cloned();
                let response = handle_request(registry, request).await;
                id.map(|id| match response {
                    Ok(result) => Response::ok(id, result),
                    Err((code, message)) => Response::err(id, code, message),
                })
            }
        },
    }?;

    match serde_json::to_string(&response) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
            None
        }
    }
}

async fn handle_request(
    registry: &ToolRegistry,
    request: Request,
) -> Result<Value, (i64, String)> {
    match request.method.as_str() {
        "ping" => Ok(json!({})),
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
        })),
        "tools/list" => Ok(json!({ "tools": registry.catalog() })),
        "tools/call" => {
            let params: CallParams = serde_json::from_value(request.params)
                .map_err(|e| (INVALID_PARAMS, format!("Invalid params: {}", e)))?;
            match registry.dispatch(&params.name, params.arguments).await {
                Ok(response) => Ok(json!({
                    "content": [{ "type": "text", "text": response.text }],
                    "isError": response.is_error,
                })),
                Err(err @ DispatchError::UnknownTool(_)) => Err((INVALID_PARAMS, err.to_string())),
            }
        }
        method if method.starts_with("notifications/") => Ok(Value::Null),
        method => Err((METHOD_NOT_FOUND, format!("Method not found: {}", method))),
    }
}

async fn handle_client(stream: TcpStream, peer: SocketAddr, registry: ToolRegistry) {
    let (reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        while let Some(mut line) = rx.recv().await {
            line.push('\n');
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                tracing::debug!(%peer, error = %e, "client went away, dropping responses");
                break;
            }
        }
    });

    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => {
                let registry = registry.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(response) = handle_line(&registry, &line).await {
                        let _ = tx.send(response);
                    }
                });
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "failed to read from client");
                break;
            }
        }
    }

    drop(tx);
    let _ = writer_task.await;
    tracing::debug!(%peer, "client disconnected");
}

/// Accept clients until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, registry: ToolRegistry, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("shutdown requested, no longer accepting clients");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "client connected");
                    tokio::spawn(handle_client(stream, peer, registry.clone()));
                }
                Err(e) => tracing::warn!(error = %e, "failed to accept connection"),
            },
        }
    }
}
