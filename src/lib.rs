// Copyright (c) Microsoft Corporation. All rights reserved.

//! # P4 SDK for Rust
//!
//! A Rust client library for Perforce-style versioning servers.
//!
//! The SDK talks to the server using JSON-RPC 2.0 over TCP, over the stdio of a
//! spawned server process (`rsh:` ports), or over any in-process byte stream,
//! with Content-Length header framing (LSP protocol style).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use p4_sdk::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), P4Error> {
//!     // Create and connect a session
//!     let mut p4 = P4Client::new(P4Config {
//!         port: Some("localhost:1666".to_string()),
//!         user: Some("bruno".to_string()),
//!         ..Default::default()
//!     });
//!     p4.connect().await?;
//!
//!     // Run a command and inspect the tagged records
//!     let info = p4.run_info().await?;
//!     for record in info.records() {
//!         println!("server root: {:?}", record.get_str("serverRoot"));
//!     }
//!
//!     // Edit a client workspace spec and save it back
//!     let mut client = p4.fetch_client(None).await?;
//!     client.set_description("Build workspace\n")?;
//!     p4.save_client(&client).await?;
//!
//!     p4.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod client;
mod command;
pub mod config;
pub mod filelog;
pub mod handler;
pub mod jsonrpc;
pub mod mapping;
pub mod message;
pub mod protocol_version;
pub mod resolve;
pub mod result;
pub mod spec;
pub mod tickets;
pub mod transport;
pub mod types;

// Re-export main types at crate root for convenience
pub use client::{P4Client, SpecIterator};
pub use config::{ExceptionLevel, P4Config};
pub use filelog::{DepotFile, Integration, Revision};
pub use handler::{HandlerResult, OutputHandler, Progress};
pub use mapping::{Direction, MapEntry, MapType, ViewMap};
pub use message::{Generic, Message, Severity};
pub use resolve::{ActionMergeData, MergeData, ResolveAction, Resolver};
pub use result::{CommandResult, FieldValue, Output, Record};
pub use spec::{FieldType, Spec, SpecDef, SpecField, SpecKind, SpecValue, UnknownField};
pub use tickets::Ticket;
pub use transport::Port;
pub use types::*;

/// Error types for the P4 SDK.
#[derive(Debug, thiserror::Error)]
pub enum P4Error {
    /// Malformed local call: bad arguments or a disallowed property change.
    #[error("Usage error: {0}")]
    Usage(String),

    /// Session not connected.
    #[error("Not connected. Call connect() first.")]
    NotConnected,

    /// Link establishment failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Failed to spawn the server process of an `rsh:` port.
    #[error("Process spawn error: {0}")]
    ProcessSpawn(String),

    /// Protocol version mismatch reported by the handshake.
    #[error("Protocol version mismatch: expected {expected}, server reports {actual:?}")]
    ProtocolMismatch {
        expected: u32,
        actual: Option<u32>,
    },

    /// The handshake did not complete in time.
    #[error("Timed out after {0}ms")]
    Timeout(u64),

    /// The server rejected a command (validation failure, permission denial, conflict).
    #[error("{}", describe_rejection(.command, .errors, .warnings))]
    Protocol {
        command: String,
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    /// JSON-RPC error response from the server.
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpc {
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Malformed frames on the wire.
    #[error("Wire error: {0}")]
    Wire(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed local input to a mapping or spec.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An output handler returned [`HandlerResult::Cancel`].
    #[error("Command cancelled by output handler (\"p4 {command}\")")]
    Cancelled { command: String },

    /// A resolver callback failed.
    #[error("Resolve error: {0}")]
    Resolve(String),
}

impl P4Error {
    /// Returns the server errors carried by a rejected command, if any.
    pub fn errors(&self) -> &[String] {
        match self {
            P4Error::Protocol { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Returns the server warnings carried by a rejected command, if any.
    pub fn warnings(&self) -> &[String] {
        match self {
            P4Error::Protocol { warnings, .. } => warnings,
            _ => &[],
        }
    }
}

fn describe_rejection(command: &str, errors: &[String], warnings: &[String]) -> String {
    let mut text = if errors.is_empty() {
        format!("[P4#run] Warnings during command execution( \"p4 {}\" )", command)
    } else {
        format!("[P4#run] Errors during command execution( \"p4 {}\" )", command)
    };
    for error in errors {
        text.push_str("\n\t[Error]: ");
        text.push_str(error);
    }
    for warning in warnings {
        text.push_str("\n\t[Warning]: ");
        text.push_str(warning);
    }
    text
}
