// Copyright (c) Microsoft Corporation. All rights reserved.

//! JSON-RPC 2.0 client implementation for TCP, process stdio and in-process
//! transports.
//!
//! Uses Content-Length header framing (LSP-style) for message delimiting.
//! Messages are formatted as:
//! ```text
//! Content-Length: <length>\r\n
//! \r\n
//! <json-body>
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::P4Error;

// ============================================================================
// JSON-RPC Message Types
// ============================================================================

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC 2.0 response message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC 2.0 notification (no id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Internal error (-32603), used when a client callback fails.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {}", method),
            data: None,
        }
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC Error {}: {}", self.code, self.message)
    }
}

/// A generic JSON-RPC message (could be request, response, or notification).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A message initiated by the server.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// A notification (e.g. `command.output`).
    Notification { method: String, params: Value },
    /// A request that must be answered with [`JsonRpcClient::respond`]
    /// (e.g. `command.prompt`).
    Request {
        id: Value,
        method: String,
        params: Value,
    },
}

// ============================================================================
// Framing
// ============================================================================

/// Serializes a message and prepends its Content-Length header.
pub fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>, P4Error> {
    let content =
        serde_json::to_string(message).map_err(|e| P4Error::Serialization(e.to_string()))?;
    let content_bytes = content.as_bytes();
    let header = format!("Content-Length: {}\r\n\r\n", content_bytes.len());
    let mut frame = header.into_bytes();
    frame.extend_from_slice(content_bytes);
    Ok(frame)
}

/// Reads one framed message body. Returns [`P4Error::ConnectionClosed`] at
/// end of stream.
pub async fn read_frame<R: tokio::io::AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, P4Error> {
    let content_length = read_content_length(reader).await?;
    let mut body = vec![0u8; content_length];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| P4Error::Io(e.to_string()))?;
    Ok(body)
}

/// Reads the Content-Length header and the blank line separator.
/// Returns the content length value.
async fn read_content_length<R: tokio::io::AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<usize, P4Error> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| P4Error::Io(e.to_string()))?;

        if bytes_read == 0 {
            return Err(P4Error::ConnectionClosed);
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            // Empty line separates header from body
            if let Some(len) = content_length {
                return Ok(len);
            }
            // Keep reading if we haven't found Content-Length yet
            continue;
        }

        if let Some(value) = trimmed.strip_prefix("Content-Length:") {
            let len: usize = value
                .trim()
                .parse()
                .map_err(|_| P4Error::Wire(format!("Invalid Content-Length: {}", value.trim())))?;
            content_length = Some(len);
        }
        // Ignore other headers (e.g., Content-Type)
    }
}

// ============================================================================
// Internal message for the write channel
// ============================================================================

enum WriteCommand {
    Send(Vec<u8>),
    Shutdown,
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Result<Value, JsonRpcError>>>>>;

/// A request that has been sent and whose response has not arrived yet.
///
/// Awaiting it yields the response. The id is known up front so that
/// server messages about the request can be matched while it runs.
pub struct PendingRequest {
    id: String,
    rx: oneshot::Receiver<Result<Value, JsonRpcError>>,
}

impl PendingRequest {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for PendingRequest {
    type Output = Result<Value, P4Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(rpc_error)) => Err(P4Error::JsonRpc {
                code: rpc_error.code,
                message: rpc_error.message,
                data: rpc_error.data,
            }),
            // Sender dropped: the reader task saw the connection close
            Err(_) => Err(P4Error::ConnectionClosed),
        })
    }
}

// ============================================================================
// JSON-RPC Client
// ============================================================================

/// An async JSON-RPC 2.0 client that communicates over a byte stream
/// using Content-Length header framing.
///
/// This client supports:
/// - Sending requests and waiting for responses
/// - Sending notifications
/// - Receiving server notifications and requests through the
///   [`Incoming`] channel returned by [`JsonRpcClient::new`]
pub struct JsonRpcClient {
    /// Pending request futures awaiting responses, keyed by request ID.
    pending_requests: PendingMap,
    /// Channel to send outgoing messages to the writer task.
    write_tx: mpsc::Sender<WriteCommand>,
    /// Set once the reader task stops.
    closed: Arc<AtomicBool>,
    /// Handle to the reader task.
    reader_handle: Option<tokio::task::JoinHandle<()>>,
    /// Handle to the writer task.
    writer_handle: Option<tokio::task::JoinHandle<()>>,
}

impl JsonRpcClient {
    /// Creates a new JsonRpcClient from async reader and writer streams.
    ///
    /// This spawns two background tasks:
    /// - A reader task that reads incoming messages, completes pending
    ///   requests and forwards server-initiated messages
    /// - A writer task that sends outgoing messages
    ///
    /// Server notifications and requests arrive on the returned receiver,
    /// which yields `None` once the connection is closed.
    ///
    /// # Arguments
    /// * `reader` - An async reader (e.g., stdout of a child process or TCP stream read half)
    /// * `writer` - An async writer (e.g., stdin of a child process or TCP stream write half)
    pub fn new<R, W>(reader: R, writer: W) -> (Self, mpsc::UnboundedReceiver<Incoming>)
    where
        R: tokio::io::AsyncRead + Unpin + Send + 'static,
        W: tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let pending_requests: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        // Write channel
        let (write_tx, write_rx) = mpsc::channel::<WriteCommand>(256);
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

        // Spawn writer task
        let writer_handle = tokio::spawn(Self::writer_loop(writer, write_rx));

        // Spawn reader task
        let reader_handle = tokio::spawn(Self::reader_loop(
            reader,
            Arc::clone(&pending_requests),
            incoming_tx,
            write_tx.clone(),
            Arc::clone(&closed),
        ));

        let client = Self {
            pending_requests,
            write_tx,
            closed,
            reader_handle: Some(reader_handle),
            writer_handle: Some(writer_handle),
        };
        (client, incoming_rx)
    }

    /// Sends a JSON-RPC request and returns a handle to its response.
    pub async fn start_request(
        &self,
        method: &str,
        params: Value,
    ) -> Result<PendingRequest, P4Error> {
        if self.is_closed() {
            return Err(P4Error::ConnectionClosed);
        }
        let request_id = uuid::Uuid::new_v4().to_string();

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending_requests.lock().await;
            pending.insert(request_id.clone(), tx);
        }

        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Value::String(request_id.clone()),
            method: method.to_string(),
            params,
        };

        if let Err(e) = self.send(&request).await {
            let mut pending = self.pending_requests.lock().await;
            pending.remove(&request_id);
            return Err(e);
        }

        Ok(PendingRequest { id: request_id, rx })
    }

    /// Sends a JSON-RPC request and waits for the response.
    ///
    /// # Arguments
    /// * `method` - The RPC method name
    /// * `params` - The parameters to send
    /// * `timeout` - Optional timeout duration; `None` waits until the
    ///   server answers or the connection closes
    ///
    /// # Errors
    /// Returns an error if the server responds with an error, the request times out,
    /// or the connection is closed.
    pub async fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Option<std::time::Duration>,
    ) -> Result<Value, P4Error> {
        let pending = self.start_request(method, params).await?;
        let Some(timeout) = timeout else {
            return pending.await;
        };

        let request_id = pending.id.clone();
        match tokio::time::timeout(timeout, pending).await {
            Ok(result) => result,
            Err(_) => {
                // Timeout - clean up
                let mut pending = self.pending_requests.lock().await;
                pending.remove(&request_id);
                Err(P4Error::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// Sends a JSON-RPC notification (no response expected).
    pub async fn notify(&self, method: &str, params: Value) -> Result<(), P4Error> {
        let notification = JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        };
        self.send(&notification).await
    }

    /// Answers a request the server sent.
    pub async fn respond(
        &self,
        id: Value,
        result: Result<Value, JsonRpcError>,
    ) -> Result<(), P4Error> {
        let (result, error) = match result {
            Ok(value) => (Some(value), None),
            Err(error) => (None, Some(error)),
        };
        let response = JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id,
            result,
            error,
        };
        self.send(&response).await
    }

    /// Returns true once the connection has been closed by either side.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops the client, shutting down reader and writer tasks.
    pub async fn stop(&mut self) {
        let _ = self.write_tx.send(WriteCommand::Shutdown).await;

        if let Some(handle) = self.writer_handle.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
            let _ = handle.await;
        }
        self.closed.store(true, Ordering::SeqCst);

        // Cancel all pending requests
        let mut pending = self.pending_requests.lock().await;
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(JsonRpcError {
                code: -32000,
                message: "Client stopped".to_string(),
                data: None,
            }));
        }
    }

    async fn send<T: Serialize>(&self, message: &T) -> Result<(), P4Error> {
        let frame = encode_frame(message)?;
        self.write_tx
            .send(WriteCommand::Send(frame))
            .await
            .map_err(|_| P4Error::ConnectionClosed)
    }

    // ========================================================================
    // Internal: Writer loop
    // ========================================================================

    async fn writer_loop<W: tokio::io::AsyncWrite + Unpin>(
        mut writer: W,
        mut rx: mpsc::Receiver<WriteCommand>,
    ) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                WriteCommand::Send(data) => {
                    if writer.write_all(&data).await.is_err() {
                        break;
                    }
                    if writer.flush().await.is_err() {
                        break;
                    }
                }
                WriteCommand::Shutdown => break,
            }
        }
        let _ = writer.shutdown().await;
    }

    // ========================================================================
    // Internal: Reader loop
    // ========================================================================

    async fn reader_loop<R: tokio::io::AsyncRead + Unpin>(
        reader: R,
        pending_requests: PendingMap,
        incoming_tx: mpsc::UnboundedSender<Incoming>,
        write_tx: mpsc::Sender<WriteCommand>,
        closed: Arc<AtomicBool>,
    ) {
        let mut buf_reader = BufReader::new(reader);

        loop {
            let body = match read_frame(&mut buf_reader).await {
                Ok(body) => body,
                Err(P4Error::ConnectionClosed) => break,
                Err(e) => {
                    tracing::warn!("Closing connection after read failure: {}", e);
                    break;
                }
            };

            // Parse the JSON message
            let raw: RawMessage = match serde_json::from_slice(&body) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("Failed to parse JSON-RPC message: {}", e);
                    continue;
                }
            };

            // Determine message type and dispatch
            let id = raw.id.filter(|v| !v.is_null());
            match (id, raw.method) {
                (Some(id), None) => {
                    // This is a response to one of our requests
                    let id_str = match &id {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        _ => continue,
                    };

                    let mut pending = pending_requests.lock().await;
                    if let Some(tx) = pending.remove(&id_str) {
                        let outcome = match raw.error {
                            Some(error) => Err(error),
                            None => Ok(raw.result.unwrap_or(Value::Null)),
                        };
                        let _ = tx.send(outcome);
                    } else {
                        tracing::warn!("Response for unknown request {}", id_str);
                    }
                }
                (Some(id), Some(method)) => {
                    // Incoming request from the server (e.g., command.prompt)
                    let params = raw.params.unwrap_or(Value::Object(Default::default()));
                    let request = Incoming::Request {
                        id: id.clone(),
                        method: method.clone(),
                        params,
                    };
                    if incoming_tx.send(request).is_err() {
                        // Nobody is listening - send method not found error
                        let response = JsonRpcResponse {
                            jsonrpc: "2.0".to_string(),
                            id,
                            result: None,
                            error: Some(JsonRpcError::method_not_found(&method)),
                        };
                        if let Ok(frame) = encode_frame(&response) {
                            let _ = write_tx.send(WriteCommand::Send(frame)).await;
                        }
                    }
                }
                (None, Some(method)) => {
                    // Notification from the server
                    let params = raw.params.unwrap_or(Value::Object(Default::default()));
                    let _ = incoming_tx.send(Incoming::Notification { method, params });
                }
                (None, None) => {
                    tracing::warn!("Ignoring JSON-RPC message without id or method");
                }
            }
        }

        closed.store(true, Ordering::SeqCst);
        // Dropping the senders completes every pending request with ConnectionClosed
        pending_requests.lock().await.clear();
    }
}

impl Drop for JsonRpcClient {
    fn drop(&mut self) {
        if let Some(handle) = self.reader_handle.take() {
            handle.abort();
        }
        // Writer will shut down when write_tx is dropped
    }
}
