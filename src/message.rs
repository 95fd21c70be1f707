// Copyright (c) Microsoft Corporation. All rights reserved.

//! Server messages: errors, warnings and informational text.
//!
//! Every message carries a [`Severity`], a [`Generic`] category and the
//! server's numeric message identifier, so callers can react to specific
//! conditions (for example "file(s) up-to-date") without matching on text.

use serde::{Deserialize, Serialize};

use crate::result::Record;

// ============================================================================
// Severity
// ============================================================================

/// Severity of a server message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Severity {
    Empty,
    Info,
    Warn,
    Failed,
    Fatal,
}

impl Severity {
    /// Returns true for severities that end up in a result's error list.
    pub fn is_error(self) -> bool {
        self >= Severity::Failed
    }

    /// Returns true for warning severity.
    pub fn is_warning(self) -> bool {
        self == Severity::Warn
    }
}

impl From<i32> for Severity {
    fn from(value: i32) -> Self {
        match value {
            i32::MIN..=0 => Severity::Empty,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Failed,
            4 => Severity::Fatal,
            // Unknown severities fail the command without dropping the link
            _ => Severity::Failed,
        }
    }
}

impl From<Severity> for i32 {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Empty => 0,
            Severity::Info => 1,
            Severity::Warn => 2,
            Severity::Failed => 3,
            Severity::Fatal => 4,
        }
    }
}

// ============================================================================
// Generic
// ============================================================================

/// Generic category of a server message.
///
/// Values the SDK does not know are preserved in [`Generic::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Generic {
    None,
    Usage,
    Unknown,
    Context,
    Illegal,
    NotYet,
    Protect,
    Empty,
    Fault,
    Client,
    Admin,
    Config,
    Upgrade,
    Comm,
    TooBig,
    Other(i32),
}

impl From<i32> for Generic {
    fn from(value: i32) -> Self {
        match value {
            0x00 => Generic::None,
            0x01 => Generic::Usage,
            0x02 => Generic::Unknown,
            0x03 => Generic::Context,
            0x04 => Generic::Illegal,
            0x05 => Generic::NotYet,
            0x06 => Generic::Protect,
            0x11 => Generic::Empty,
            0x21 => Generic::Fault,
            0x22 => Generic::Client,
            0x23 => Generic::Admin,
            0x24 => Generic::Config,
            0x25 => Generic::Upgrade,
            0x26 => Generic::Comm,
            0x27 => Generic::TooBig,
            other => Generic::Other(other),
        }
    }
}

impl From<Generic> for i32 {
    fn from(value: Generic) -> Self {
        match value {
            Generic::None => 0x00,
            Generic::Usage => 0x01,
            Generic::Unknown => 0x02,
            Generic::Context => 0x03,
            Generic::Illegal => 0x04,
            Generic::NotYet => 0x05,
            Generic::Protect => 0x06,
            Generic::Empty => 0x11,
            Generic::Fault => 0x21,
            Generic::Client => 0x22,
            Generic::Admin => 0x23,
            Generic::Config => 0x24,
            Generic::Upgrade => 0x25,
            Generic::Comm => 0x26,
            Generic::TooBig => 0x27,
            Generic::Other(other) => other,
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A structured message reported by the server while running a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub severity: Severity,
    pub generic: Generic,
    pub msgid: i32,
    pub text: String,
    /// Message arguments as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dict: Option<Record>,
}

impl Message {
    /// Creates a message without arguments.
    pub fn new(severity: Severity, generic: Generic, msgid: i32, text: impl Into<String>) -> Self {
        Self {
            severity,
            generic,
            msgid,
            text: text.into(),
            dict: None,
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text.trim_end())
    }
}
