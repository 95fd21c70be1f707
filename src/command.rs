// Copyright (c) Microsoft Corporation. All rights reserved.

//! Command dispatch: runs one command on a connection and collects its output.
//!
//! While a `command.run` request is outstanding the server streams output and
//! progress notifications and may call back with prompt, input and resolve
//! requests. All of them are handled on the task awaiting the command, in
//! arrival order, so callbacks never run concurrently with each other.

use std::collections::VecDeque;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::handler::{deliver_progress, HandlerResult, OutputHandler, Progress};
use crate::jsonrpc::{Incoming, JsonRpcClient, JsonRpcError};
use crate::resolve::{ResolveAction, Resolver};
use crate::result::{CommandResult, Output};
use crate::types::*;
use crate::P4Error;

// ============================================================================
// Connection
// ============================================================================

/// A live link to the server.
pub(crate) struct Connection {
    pub rpc: JsonRpcClient,
    pub incoming: mpsc::UnboundedReceiver<Incoming>,
    /// The server process of an `rsh:` port; killed when dropped.
    pub child: Option<Child>,
}

impl Connection {
    pub async fn close(mut self) {
        self.rpc.stop().await;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
        }
    }
}

/// Session state the dispatch loop needs while a command runs.
pub(crate) struct Callbacks<'a> {
    pub handler: Option<&'a mut dyn OutputHandler>,
    pub resolver: Option<&'a mut dyn Resolver>,
    pub progress: Option<&'a mut dyn Progress>,
    /// Answers for `command.input` and `command.prompt`, consumed in order.
    pub input: &'a mut VecDeque<String>,
    /// Answer for prompts once the input queue is empty.
    pub password: Option<&'a str>,
}

/// What happened while a command ran.
pub(crate) struct Outcome {
    pub result: CommandResult,
    /// The output handler cancelled the command.
    pub cancelled: bool,
    /// The first error a resolver returned.
    pub callback_error: Option<P4Error>,
}

// ============================================================================
// Dispatch
// ============================================================================

/// A command that failed at the transport or JSON-RPC level, with whatever
/// it reported before failing.
#[derive(Debug)]
pub(crate) struct Failure {
    pub result: CommandResult,
    pub error: P4Error,
}

/// Runs one command to completion.
///
/// Everything the server reports about the command itself ends up in the
/// [`Outcome`]. Transport and JSON-RPC failures are returned as a
/// [`Failure`] whose result holds the output received so far, with the
/// failure appended to its errors.
pub(crate) async fn dispatch(
    conn: &mut Connection,
    params: CommandParams,
    callbacks: Callbacks<'_>,
) -> Result<Outcome, Failure> {
    let mut run = Run {
        request_id: String::new(),
        callbacks,
        outcome: Outcome {
            result: CommandResult::new(params.command.clone()),
            cancelled: false,
            callback_error: None,
        },
    };

    match run.complete(conn, &params).await {
        Ok(complete) => {
            let mut outcome = run.outcome;
            outcome.result.track = complete.track;
            tracing::debug!(
                "\"p4 {}\" finished: {} output, {} errors, {} warnings",
                outcome.result.command,
                outcome.result.output.len(),
                outcome.result.errors.len(),
                outcome.result.warnings.len()
            );
            Ok(outcome)
        }
        Err(error) => {
            tracing::debug!("\"p4 {}\" failed: {}", params.command, error);
            let mut result = run.outcome.result;
            result.errors.push(error.to_string());
            Err(Failure { result, error })
        }
    }
}

struct Run<'a> {
    request_id: String,
    callbacks: Callbacks<'a>,
    outcome: Outcome,
}

impl Run<'_> {
    /// Sends `command.run` and serves the server's messages until it answers.
    async fn complete(
        &mut self,
        conn: &mut Connection,
        params: &CommandParams,
    ) -> Result<CommandComplete, P4Error> {
        let value =
            serde_json::to_value(params).map_err(|e| P4Error::Serialization(e.to_string()))?;
        let mut pending = conn.rpc.start_request("command.run", value).await?;
        self.request_id = pending.id().to_string();
        tracing::debug!("Dispatching \"p4 {}\" as {}", params.command, self.request_id);

        let response = loop {
            tokio::select! {
                biased;
                incoming = conn.incoming.recv() => match incoming {
                    Some(message) => self.handle(&conn.rpc, message).await?,
                    // Connection gone; the pending request fails with ConnectionClosed
                    None => break (&mut pending).await,
                },
                response = &mut pending => break response,
            }
        };

        // Everything the server sent before its response is already queued
        while let Ok(message) = conn.incoming.try_recv() {
            self.handle(&conn.rpc, message).await?;
        }

        match response {
            Ok(value) => {
                serde_json::from_value(value).map_err(|e| P4Error::Serialization(e.to_string()))
            }
            // A cancelled command may be answered with an error instead of a result
            Err(P4Error::JsonRpc { .. }) if self.outcome.cancelled => Ok(CommandComplete::default()),
            Err(e) => Err(e),
        }
    }

    async fn handle(&mut self, rpc: &JsonRpcClient, message: Incoming) -> Result<(), P4Error> {
        match message {
            Incoming::Notification { method, params } => {
                self.handle_notification(rpc, &method, params).await
            }
            Incoming::Request { id, method, params } => {
                let reply = self.handle_request(&method, params);
                rpc.respond(id, reply).await
            }
        }
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    async fn handle_notification(
        &mut self,
        rpc: &JsonRpcClient,
        method: &str,
        params: Value,
    ) -> Result<(), P4Error> {
        match method {
            "command.output" => {
                let Some(event) = parse::<OutputEvent>(method, params) else {
                    return Ok(());
                };
                if !self.is_current(&event.request_id) || self.outcome.cancelled {
                    return Ok(());
                }
                if self.deliver_output(event.payload) == HandlerResult::Cancel {
                    self.outcome.cancelled = true;
                    tracing::debug!("Output handler cancelled \"p4 {}\"", self.outcome.result.command);
                    let cancel = CancelParams {
                        request_id: self.request_id.clone(),
                    };
                    let params = serde_json::to_value(&cancel)
                        .map_err(|e| P4Error::Serialization(e.to_string()))?;
                    rpc.notify("command.cancel", params).await?;
                }
            }
            "command.progress" => {
                let Some(notification) = parse::<ProgressNotification>(method, params) else {
                    return Ok(());
                };
                if !self.is_current(&notification.request_id) || self.outcome.cancelled {
                    return Ok(());
                }
                if let Some(progress) = self.callbacks.progress.as_deref_mut() {
                    deliver_progress(progress, &notification.event);
                }
            }
            other => tracing::debug!("Ignoring notification {}", other),
        }
        Ok(())
    }

    /// Offers one unit of output to the handler and buffers it unless the
    /// handler consumed it.
    fn deliver_output(&mut self, payload: OutputPayload) -> HandlerResult {
        let handler = self.callbacks.handler.as_deref_mut();
        let result = &mut self.outcome.result;

        match payload {
            OutputPayload::Stat { data } => {
                let verdict = handler.map_or(HandlerResult::Report, |h| h.output_stat(&data));
                if verdict == HandlerResult::Report {
                    result.output.push(Output::Stat(data));
                }
                verdict
            }
            OutputPayload::Info { level, text } => {
                let verdict = handler.map_or(HandlerResult::Report, |h| h.output_info(level, &text));
                if verdict == HandlerResult::Report {
                    result.output.push(Output::Info(text));
                }
                verdict
            }
            OutputPayload::Text { text } => {
                let verdict = handler.map_or(HandlerResult::Report, |h| h.output_text(&text));
                if verdict == HandlerResult::Report {
                    result.output.push(Output::Text(text));
                }
                verdict
            }
            OutputPayload::Binary { data } => {
                let verdict = handler.map_or(HandlerResult::Report, |h| h.output_binary(&data));
                if verdict == HandlerResult::Report {
                    result.output.push(Output::Binary(data));
                }
                verdict
            }
            OutputPayload::Message { message } => {
                let verdict =
                    handler.map_or(HandlerResult::Report, |h| h.output_message(&message));
                if verdict == HandlerResult::Report {
                    result.push_message(message);
                }
                verdict
            }
        }
    }

    // ========================================================================
    // Server requests
    // ========================================================================

    fn handle_request(&mut self, method: &str, params: Value) -> Result<Value, JsonRpcError> {
        match method {
            "command.prompt" => {
                let request: PromptRequest = parse_params(params)?;
                self.check_current(&request.request_id)?;
                let response = self
                    .callbacks
                    .input
                    .pop_front()
                    .or_else(|| self.callbacks.password.map(str::to_string))
                    .unwrap_or_default();
                tracing::debug!("Answering prompt \"{}\"", request.prompt.trim());
                to_result(&PromptResponse { response })
            }
            "command.input" => {
                let request: InputRequest = parse_params(params)?;
                self.check_current(&request.request_id)?;
                let data = self.callbacks.input.pop_front().unwrap_or_default();
                to_result(&InputResponse { data })
            }
            "command.resolve" => {
                let request: ResolveRequest = parse_params(params)?;
                self.check_current(&request.request_id)?;
                let hint = request.merge.merge_hint;
                let decision = self.decide(hint, |r| r.resolve(&request.merge))?;
                to_result(&ResolveResponse { action: decision })
            }
            "command.actionResolve" => {
                let request: ActionResolveRequest = parse_params(params)?;
                self.check_current(&request.request_id)?;
                let hint = request.merge.merge_hint;
                let decision = self.decide(hint, |r| r.action_resolve(&request.merge))?;
                to_result(&ResolveResponse { action: decision })
            }
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    /// Asks the resolver for a decision, falling back to the server's hint.
    fn decide<F>(
        &mut self,
        hint: ResolveAction,
        ask: F,
    ) -> Result<ResolveAction, JsonRpcError>
    where
        F: FnOnce(&mut dyn Resolver) -> Result<ResolveAction, P4Error>,
    {
        if self.outcome.cancelled || self.outcome.callback_error.is_some() {
            return Ok(ResolveAction::Quit);
        }
        let Some(resolver) = self.callbacks.resolver.as_deref_mut() else {
            return Ok(hint);
        };
        match ask(resolver) {
            Ok(action) => Ok(action),
            Err(e) => {
                let error = JsonRpcError::internal(e.to_string());
                tracing::debug!("Resolver failed: {}", e);
                self.outcome.callback_error = Some(e);
                Err(error)
            }
        }
    }

    fn is_current(&self, request_id: &str) -> bool {
        if request_id == self.request_id {
            true
        } else {
            tracing::warn!("Ignoring event for stale request {}", request_id);
            false
        }
    }

    fn check_current(&self, request_id: &str) -> Result<(), JsonRpcError> {
        if self.is_current(request_id) {
            Ok(())
        } else {
            Err(JsonRpcError::internal(format!(
                "No command running with id {}",
                request_id
            )))
        }
    }
}

fn parse<T: DeserializeOwned>(method: &str, params: Value) -> Option<T> {
    match serde_json::from_value(params) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Malformed {} notification: {}", method, e);
            None
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(params).map_err(|e| JsonRpcError {
        code: -32602,
        message: format!("Invalid params: {}", e),
        data: None,
    })
}

fn to_result<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jsonrpc::{encode_frame, read_frame};
    use serde_json::json;
    use tokio::io::{duplex, split, AsyncWriteExt, BufReader};

    /// Answers one `command.run`: output for a stale request, output for the
    /// real one, an input request, then completion.
    async fn one_shot_server(stream: tokio::io::DuplexStream) {
        let (reader, mut writer) = split(stream);
        let mut reader = BufReader::new(reader);
        let run: Value = serde_json::from_slice(&read_frame(&mut reader).await.unwrap()).unwrap();
        let id = run["id"].clone();

        for frame in [
            json!({ "jsonrpc": "2.0", "method": "command.output",
                    "params": { "requestId": "stale", "kind": "info", "text": "old" } }),
            json!({ "jsonrpc": "2.0", "method": "command.output",
                    "params": { "requestId": id, "kind": "text", "text": "hello" } }),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "command.input",
                    "params": { "requestId": id } }),
        ] {
            writer.write_all(&encode_frame(&frame).unwrap()).await.unwrap();
        }

        let answer: Value =
            serde_json::from_slice(&read_frame(&mut reader).await.unwrap()).unwrap();
        let done = json!({ "jsonrpc": "2.0", "id": id, "result": { "track": [answer["result"]["data"]] } });
        writer.write_all(&encode_frame(&done).unwrap()).await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_ignores_stale_events() {
        let (client_end, server_end) = duplex(8192);
        tokio::spawn(one_shot_server(server_end));
        let (reader, writer) = split(client_end);
        let (rpc, incoming) = JsonRpcClient::new(reader, writer);
        let mut conn = Connection {
            rpc,
            incoming,
            child: None,
        };

        let mut input = VecDeque::from(["form text".to_string()]);
        let params = CommandParams {
            command: "print".to_string(),
            ..Default::default()
        };
        let callbacks = Callbacks {
            handler: None,
            resolver: None,
            progress: None,
            input: &mut input,
            password: None,
        };

        let outcome = dispatch(&mut conn, params, callbacks).await.unwrap();
        assert_eq!(outcome.result.text(), "hello");
        assert_eq!(outcome.result.output.len(), 1);
        assert_eq!(outcome.result.track, ["form text"]);
        assert!(!outcome.cancelled);
        assert!(input.is_empty());
    }
}
