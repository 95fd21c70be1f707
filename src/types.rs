// Copyright (c) Microsoft Corporation. All rights reserved.

//! Type definitions for the P4 SDK wire protocol.
//!
//! This module contains the payloads exchanged with the server via
//! JSON-RPC 2.0: the handshake, command dispatch, streamed output and
//! progress notifications, and the server-initiated prompt, input and
//! resolve requests.

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::resolve::{ActionMergeData, MergeData, ResolveAction};
use crate::result::Record;

// ============================================================================
// Connection State
// ============================================================================

/// Represents the connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

// ============================================================================
// Handshake
// ============================================================================

/// Parameters of the `protocol.handshake` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeParams {
    pub protocol_version: u32,
    pub prog: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_level: Option<u32>,
    #[serde(default)]
    pub track: bool,
}

/// Response to `protocol.handshake`: the server's capabilities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    #[serde(default)]
    pub unicode: bool,
    #[serde(default)]
    pub case_insensitive: bool,
}

// ============================================================================
// Command Dispatch
// ============================================================================

/// Parameters of the `command.run` request.
///
/// Carries the command together with the session settings that apply to it,
/// so a property change takes effect on the next command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandParams {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub tagged: bool,
    #[serde(default)]
    pub streams: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub prog: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scan_rows: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_lock_time: Option<u32>,
    #[serde(default)]
    pub progress: bool,
}

/// Final response to `command.run`, sent when the server finished the command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandComplete {
    /// Performance tracking lines (only when tracking is enabled).
    #[serde(default)]
    pub track: Vec<String>,
}

/// Parameters of the `command.cancel` notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelParams {
    pub request_id: String,
}

// ============================================================================
// Streamed Output
// ============================================================================

/// A `command.output` notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEvent {
    /// The id of the `command.run` request this output belongs to.
    pub request_id: String,
    #[serde(flatten)]
    pub payload: OutputPayload,
}

/// The unit of output carried by a [`OutputEvent`], tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OutputPayload {
    /// A tagged record.
    Stat { data: Record },
    /// An untagged informational line with its indentation level.
    Info {
        #[serde(default)]
        level: i32,
        text: String,
    },
    /// Text file content (e.g. `print` output).
    Text { text: String },
    /// Binary file content.
    Binary { data: Vec<u8> },
    /// A structured server message.
    Message { message: Message },
}

// ============================================================================
// Progress
// ============================================================================

/// A `command.progress` notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressNotification {
    pub request_id: String,
    pub event: ProgressEvent,
}

/// A progress event reported while a long-running command executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEvent {
    Init { kind: i32 },
    Description { description: String, units: i32 },
    Total { total: i64 },
    Update { position: i64 },
    Done { failed: bool },
}

// ============================================================================
// Server Requests
// ============================================================================

/// Parameters of a `command.prompt` request (passwords, confirmations).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    pub request_id: String,
    pub prompt: String,
    #[serde(default)]
    pub no_echo: bool,
}

/// Response to `command.prompt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptResponse {
    pub response: String,
}

/// Parameters of a `command.input` request (form text for `-i` commands).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRequest {
    pub request_id: String,
}

/// Response to `command.input`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputResponse {
    pub data: String,
}

/// Parameters of a `command.resolve` request (content resolve).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub request_id: String,
    pub merge: MergeData,
}

/// Parameters of a `command.actionResolve` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResolveRequest {
    pub request_id: String,
    pub merge: ActionMergeData,
}

/// Response to `command.resolve` and `command.actionResolve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub action: ResolveAction,
}
