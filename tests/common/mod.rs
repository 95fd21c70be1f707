// Copyright (c) Microsoft Corporation. All rights reserved.

//! A scripted in-process server for driving `P4Client` over a duplex pipe.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use p4_sdk::jsonrpc::{encode_frame, read_frame};
use p4_sdk::{CommandParams, P4Client, P4Config};
use serde_json::{json, Value};
use tokio::io::{split, AsyncWriteExt, BufReader, DuplexStream, ReadHalf, WriteHalf};

/// One thing the server does while running a command.
#[derive(Debug, Clone)]
pub enum Step {
    /// Sends a `command.output` notification with this payload
    /// (`kind` plus its fields).
    Output(Value),
    /// Sends a `command.progress` event.
    Progress(Value),
    /// Sends a server request (`command.prompt`, `command.input`, ...) and
    /// waits for the answer.
    Request(&'static str, Value),
    /// Waits until the client sends `command.cancel`.
    AwaitCancel,
    /// Answers `command.run` with an error.
    Fail(i32, &'static str),
    /// Answers `command.run` with these tracking lines.
    Complete(Vec<String>),
}

pub fn stat(data: Value) -> Step {
    Step::Output(json!({ "kind": "stat", "data": data }))
}

pub fn info(text: &str) -> Step {
    Step::Output(json!({ "kind": "info", "level": 0, "text": text }))
}

pub fn text(text: &str) -> Step {
    Step::Output(json!({ "kind": "text", "text": text }))
}

/// A server message; severity 2 is a warning, 3 an error, 4 fatal.
pub fn message(severity: i32, msgid: i32, text: &str) -> Step {
    Step::Output(json!({
        "kind": "message",
        "message": { "severity": severity, "generic": 2, "msgid": msgid, "text": text }
    }))
}

type Script = dyn Fn(&CommandParams) -> Vec<Step> + Send + Sync;

/// Everything the client sent, for assertions.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<Value>>>);

impl Log {
    fn push(&self, message: Value) {
        self.0.lock().unwrap().push(message);
    }

    /// All messages received so far.
    pub fn messages(&self) -> Vec<Value> {
        self.0.lock().unwrap().clone()
    }

    /// The `command.run` params received so far.
    pub fn commands(&self) -> Vec<CommandParams> {
        self.messages()
            .into_iter()
            .filter(|m| m["method"] == "command.run")
            .map(|m| serde_json::from_value(m["params"].clone()).unwrap())
            .collect()
    }

    /// Results the client returned for server requests.
    pub fn replies(&self) -> Vec<Value> {
        self.messages()
            .into_iter()
            .filter(|m| m.get("method").is_none())
            .collect()
    }

    pub fn saw_method(&self, method: &str) -> bool {
        self.messages().iter().any(|m| m["method"] == method)
    }
}

/// Options of the scripted server's handshake answer.
pub struct ServerInfo {
    pub protocol_version: u32,
    pub server_level: u32,
    pub unicode: bool,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            protocol_version: 1,
            server_level: 57,
            unicode: false,
        }
    }
}

/// Starts a scripted server and returns a session connected to it.
pub async fn connect<F>(script: F) -> (P4Client, Log)
where
    F: Fn(&CommandParams) -> Vec<Step> + Send + Sync + 'static,
{
    let mut p4 = P4Client::new(P4Config {
        user: Some("bruno".to_string()),
        client: Some("bruno_ws".to_string()),
        ..Default::default()
    });
    let log = serve(&mut p4, ServerInfo::default(), script).await.unwrap();
    (p4, log)
}

/// Starts a scripted server and connects `p4` to it.
pub async fn serve<F>(
    p4: &mut P4Client,
    server: ServerInfo,
    script: F,
) -> Result<Log, p4_sdk::P4Error>
where
    F: Fn(&CommandParams) -> Vec<Step> + Send + Sync + 'static,
{
    let (client_end, server_end) = tokio::io::duplex(64 * 1024);
    let log = Log::default();
    tokio::spawn(run_server(server_end, server, Arc::new(script), log.clone()));

    let (reader, writer) = split(client_end);
    p4.connect_with_transport(reader, writer).await?;
    Ok(log)
}

struct Wire {
    reader: BufReader<ReadHalf<DuplexStream>>,
    writer: WriteHalf<DuplexStream>,
    log: Log,
    next_id: u64,
}

impl Wire {
    async fn recv(&mut self) -> Option<Value> {
        let body = read_frame(&mut self.reader).await.ok()?;
        let message: Value = serde_json::from_slice(&body).unwrap();
        self.log.push(message.clone());
        Some(message)
    }

    async fn send(&mut self, message: Value) -> bool {
        let frame = encode_frame(&message).unwrap();
        self.writer.write_all(&frame).await.is_ok()
    }

    /// Sends a request and waits for the answer with the same id.
    async fn call(&mut self, method: &str, params: Value) -> Option<Value> {
        self.next_id += 1;
        let id = format!("srv-{}", self.next_id);
        self.send(json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params }))
            .await;
        loop {
            let message = self.recv().await?;
            if message["id"] == id.as_str() && message.get("method").is_none() {
                return Some(message);
            }
        }
    }
}

async fn run_server(stream: DuplexStream, server: ServerInfo, script: Arc<Script>, log: Log) {
    let (reader, writer) = split(stream);
    let mut wire = Wire {
        reader: BufReader::new(reader),
        writer,
        log,
        next_id: 0,
    };

    while let Some(message) = wire.recv().await {
        let id = message["id"].clone();
        match message["method"].as_str() {
            Some("protocol.handshake") => {
                wire.send(json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "protocolVersion": server.protocol_version,
                        "serverLevel": server.server_level,
                        "serverVersion": "P4D/LINUX26X86_64/2024.1/2596294",
                        "unicode": server.unicode,
                        "caseInsensitive": false
                    }
                }))
                .await;
            }
            Some("command.run") => {
                let params: CommandParams =
                    serde_json::from_value(message["params"].clone()).unwrap();
                let request_id = id.as_str().unwrap_or_default().to_string();
                if !run_command(&mut wire, &script, &params, id, &request_id).await {
                    return;
                }
            }
            _ => {}
        }
    }
}

async fn run_command(
    wire: &mut Wire,
    script: &Arc<Script>,
    params: &CommandParams,
    id: Value,
    request_id: &str,
) -> bool {
    for step in (**script)(params) {
        match step {
            Step::Output(mut payload) => {
                payload["requestId"] = json!(request_id);
                let notification =
                    json!({ "jsonrpc": "2.0", "method": "command.output", "params": payload });
                if !wire.send(notification).await {
                    return false;
                }
            }
            Step::Progress(event) => {
                let notification = json!({
                    "jsonrpc": "2.0",
                    "method": "command.progress",
                    "params": { "requestId": request_id, "event": event }
                });
                if !wire.send(notification).await {
                    return false;
                }
            }
            Step::Request(method, mut params) => {
                params["requestId"] = json!(request_id);
                if wire.call(method, params).await.is_none() {
                    return false;
                }
            }
            Step::AwaitCancel => loop {
                match wire.recv().await {
                    Some(message) if message["method"] == "command.cancel" => break,
                    Some(_) => continue,
                    None => return false,
                }
            },
            Step::Fail(code, text) => {
                return wire
                    .send(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": code, "message": text }
                    }))
                    .await;
            }
            Step::Complete(track) => {
                return wire
                    .send(json!({ "jsonrpc": "2.0", "id": id, "result": { "track": track } }))
                    .await;
            }
        }
    }
    wire.send(json!({ "jsonrpc": "2.0", "id": id, "result": { "track": [] } }))
        .await
}
