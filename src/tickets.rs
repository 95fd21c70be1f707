// Copyright (c) Microsoft Corporation. All rights reserved.

//! Local ticket file listing.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::result::Record;
use crate::P4Error;

/// One login ticket stored in the local ticket file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Server address (or server id) the ticket was issued by.
    pub host: String,
    pub user: String,
    pub ticket: String,
}

impl Ticket {
    /// Parses a `host=user:ticket` line.
    pub fn parse_line(line: &str) -> Option<Self> {
        let (host, rest) = line.trim().split_once('=')?;
        let (user, ticket) = rest.rsplit_once(':')?;
        if host.is_empty() || user.is_empty() || ticket.is_empty() {
            return None;
        }
        Some(Self {
            host: host.to_string(),
            user: user.to_string(),
            ticket: ticket.to_string(),
        })
    }

    /// The ticket as a tagged record with `Host`, `User` and `Ticket` fields.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("Host", self.host.as_str());
        record.insert("User", self.user.as_str());
        record.insert("Ticket", self.ticket.as_str());
        record
    }
}

/// Reads all tickets from a ticket file. A missing file holds no tickets.
pub fn read_tickets(path: &Path) -> Result<Vec<Ticket>, P4Error> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(P4Error::Io(e.to_string())),
    };

    Ok(text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let ticket = Ticket::parse_line(line);
            if ticket.is_none() {
                tracing::warn!("Skipping malformed ticket line in {}", path.display());
            }
            ticket
        })
        .collect())
}
