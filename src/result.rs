// Copyright (c) Microsoft Corporation. All rights reserved.

//! Command results: tagged records, text output and routed server messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::message::{Message, Severity};

// ============================================================================
// Records
// ============================================================================

/// A single value in a tagged record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    List(Vec<FieldValue>),
    Record(Record),
}

impl FieldValue {
    /// Returns the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as an integer, parsing text values when needed.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the value as a list, if it is a list.
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            FieldValue::Record(record) => write!(f, "{:?}", record),
        }
    }
}

/// A tagged record: field name to value, as produced by tagged-mode commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Returns a text field.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    /// Returns an integer field, accepting numeric text.
    pub fn get_int(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_int)
    }

    pub fn get_list(&self, field: &str) -> Option<&[FieldValue]> {
        self.get(field).and_then(FieldValue::as_list)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Collects the text values of `prefix0`, `prefix1`, ... in index order,
    /// stopping at the first missing index.
    pub fn indexed(&self, prefix: &str) -> Vec<String> {
        (0..)
            .map(|i| self.get(&format!("{}{}", prefix, i)))
            .take_while(Option::is_some)
            .flatten()
            .map(ToString::to_string)
            .collect()
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Record(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, FieldValue>> for Record {
    fn from(map: BTreeMap<String, FieldValue>) -> Self {
        Record(map)
    }
}

// ============================================================================
// Command Result
// ============================================================================

/// One unit of buffered command output, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Stat(Record),
    Info(String),
    Text(String),
    Binary(Vec<u8>),
}

/// The collected outcome of a single command.
#[derive(Debug, Clone, Default)]
pub struct CommandResult {
    /// The command name, e.g. `"sync"`.
    pub command: String,
    pub output: Vec<Output>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Every message reported by the server, in arrival order.
    pub messages: Vec<Message>,
    /// Performance tracking lines, when tracking is enabled.
    pub track: Vec<String>,
}

impl CommandResult {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Iterates over the tagged records of the output.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.output.iter().filter_map(|o| match o {
            Output::Stat(r) => Some(r),
            _ => None,
        })
    }

    /// Consumes the result, keeping only the tagged records.
    pub fn into_records(self) -> Vec<Record> {
        self.output
            .into_iter()
            .filter_map(|o| match o {
                Output::Stat(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    /// Iterates over informational lines.
    pub fn info(&self) -> impl Iterator<Item = &str> {
        self.output.iter().filter_map(|o| match o {
            Output::Info(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Concatenates all text output.
    pub fn text(&self) -> String {
        self.output
            .iter()
            .filter_map(|o| match o {
                Output::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Buffers a server message, routing it by severity.
    pub(crate) fn push_message(&mut self, message: Message) {
        let text = message.to_string();
        if message.severity.is_error() {
            self.errors.push(text);
        } else if message.severity.is_warning() {
            self.warnings.push(text);
        } else {
            self.output.push(Output::Info(text));
        }
        self.messages.push(message);
    }

    pub(crate) fn has_fatal(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Fatal)
    }
}
