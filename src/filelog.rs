// Copyright (c) Microsoft Corporation. All rights reserved.

//! Structured file history built from tagged `filelog` output.
//!
//! The server reports a file's revisions as indexed fields (`rev0`,
//! `change0`, ...) and each revision's integrations as doubly indexed fields
//! (`how0,0`, `file0,0`, ...). [`DepotFile::from_record`] turns one record
//! into a tree.

use serde::{Deserialize, Serialize};

use crate::result::Record;

/// An integration record attached to a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    /// How the file was integrated, e.g. `"branch into"` or `"copy from"`.
    pub how: String,
    /// The other file of the integration.
    pub file: String,
    /// Start revision of the integrated range.
    pub srev: i64,
    /// End revision of the integrated range.
    pub erev: i64,
}

/// One revision of a depot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub rev: i64,
    pub change: i64,
    pub action: String,
    pub file_type: String,
    /// Submit time, seconds since the epoch.
    pub time: i64,
    pub user: String,
    pub client: String,
    pub desc: String,
    pub digest: Option<String>,
    pub file_size: Option<i64>,
    pub integrations: Vec<Integration>,
}

/// A depot file with its revisions, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepotFile {
    pub depot_file: String,
    pub revisions: Vec<Revision>,
}

impl DepotFile {
    /// Builds a file history from one tagged `filelog` record. Returns `None`
    /// when the record has no `depotFile`.
    pub fn from_record(record: &Record) -> Option<Self> {
        let depot_file = record.get_str("depotFile")?.to_string();
        let text = |key: String| record.get(&key).map(ToString::to_string);
        let int = |key: String| record.get_int(&key);

        let mut revisions = Vec::new();
        for i in 0.. {
            let Some(rev) = int(format!("rev{}", i)) else {
                break;
            };

            let mut integrations = Vec::new();
            for j in 0.. {
                let Some(how) = text(format!("how{},{}", i, j)) else {
                    break;
                };
                integrations.push(Integration {
                    how,
                    file: text(format!("file{},{}", i, j)).unwrap_or_default(),
                    srev: parse_rev(text(format!("srev{},{}", i, j))),
                    erev: parse_rev(text(format!("erev{},{}", i, j))),
                });
            }

            revisions.push(Revision {
                rev,
                change: int(format!("change{}", i)).unwrap_or_default(),
                action: text(format!("action{}", i)).unwrap_or_default(),
                file_type: text(format!("type{}", i)).unwrap_or_default(),
                time: int(format!("time{}", i)).unwrap_or_default(),
                user: text(format!("user{}", i)).unwrap_or_default(),
                client: text(format!("client{}", i)).unwrap_or_default(),
                desc: text(format!("desc{}", i)).unwrap_or_default(),
                digest: text(format!("digest{}", i)),
                file_size: int(format!("fileSize{}", i)),
                integrations,
            });
        }

        Some(Self {
            depot_file,
            revisions,
        })
    }
}

/// Revision markers arrive as `#3`, `#none` or plain numbers.
fn parse_rev(value: Option<String>) -> i64 {
    value
        .as_deref()
        .map(|v| v.trim_start_matches('#'))
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}
