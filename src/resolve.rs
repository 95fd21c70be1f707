// Copyright (c) Microsoft Corporation. All rights reserved.

//! Interactive resolve: merge context handed to a [`Resolver`] and the
//! decisions it returns.

use serde::{Deserialize, Serialize};

use crate::result::Record;
use crate::P4Error;

// ============================================================================
// Resolve Action
// ============================================================================

/// A resolve decision, sent back to the server by its short code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolveAction {
    #[serde(rename = "ay")]
    AcceptYours,
    #[serde(rename = "at")]
    AcceptTheirs,
    #[serde(rename = "am")]
    AcceptMerged,
    #[serde(rename = "ae")]
    AcceptEdit,
    #[serde(rename = "s")]
    Skip,
    #[serde(rename = "q")]
    Quit,
}

impl ResolveAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolveAction::AcceptYours => "ay",
            ResolveAction::AcceptTheirs => "at",
            ResolveAction::AcceptMerged => "am",
            ResolveAction::AcceptEdit => "ae",
            ResolveAction::Skip => "s",
            ResolveAction::Quit => "q",
        }
    }
}

impl std::fmt::Display for ResolveAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResolveAction {
    type Err = P4Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ay" => Ok(ResolveAction::AcceptYours),
            "at" => Ok(ResolveAction::AcceptTheirs),
            "am" => Ok(ResolveAction::AcceptMerged),
            "ae" => Ok(ResolveAction::AcceptEdit),
            "s" => Ok(ResolveAction::Skip),
            "q" => Ok(ResolveAction::Quit),
            other => Err(P4Error::Usage(format!("Unknown resolve action: {}", other))),
        }
    }
}

// ============================================================================
// Merge Context
// ============================================================================

/// Context of a content resolve.
///
/// For binary files the names are empty, both `your_path` and `their_path`
/// are set and there is no base path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeData {
    #[serde(default)]
    pub your_name: String,
    #[serde(default)]
    pub their_name: String,
    #[serde(default)]
    pub base_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub your_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub their_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    /// The action the server would pick on its own.
    pub merge_hint: ResolveAction,
    #[serde(default)]
    pub binary: bool,
}

/// Context of an action resolve (filetype, branch, delete, move).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMergeData {
    pub merge_action: String,
    pub yours_action: String,
    pub their_action: String,
    /// Human readable resolve type, e.g. `"Filetype resolve"`.
    #[serde(rename = "type")]
    pub resolve_type: String,
    pub merge_hint: ResolveAction,
    /// Additional tagged details (`clientFile`, `fromFile`, `resolveType`, ...).
    #[serde(default)]
    pub info: Record,
}

// ============================================================================
// Resolver
// ============================================================================

/// Decides how each scheduled resolve is settled.
///
/// Callbacks run on the task awaiting the command. Returning an error aborts
/// the server's resolve loop; decisions already returned stay in effect.
///
/// Any `FnMut(&MergeData) -> Result<ResolveAction, P4Error>` closure is a
/// resolver that accepts the merge hint for action resolves.
pub trait Resolver: Send {
    fn resolve(&mut self, merge: &MergeData) -> Result<ResolveAction, P4Error>;

    fn action_resolve(&mut self, merge: &ActionMergeData) -> Result<ResolveAction, P4Error> {
        Ok(merge.merge_hint)
    }
}

impl<F> Resolver for F
where
    F: FnMut(&MergeData) -> Result<ResolveAction, P4Error> + Send,
{
    fn resolve(&mut self, merge: &MergeData) -> Result<ResolveAction, P4Error> {
        self(merge)
    }
}
