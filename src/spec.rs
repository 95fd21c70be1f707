// Copyright (c) Microsoft Corporation. All rights reserved.

//! Forms ("specs"): clients, changes, labels and the other server objects
//! that are edited as text.
//!
//! The layout of each kind of form is described by a spec definition
//! ([`SpecDef`]), a `;`-separated string the server hands out with every form.
//! [`Spec`] holds the values of one form, typed by its definition, and keeps
//! fields the definition does not know verbatim so they survive a
//! fetch-edit-save cycle unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::result::{FieldValue, Record};
use crate::P4Error;

// ============================================================================
// Spec Kinds
// ============================================================================

/// The kinds of forms a session can fetch, save and iterate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecKind {
    Client,
    Label,
    Branch,
    Change,
    Stream,
    Job,
    User,
    Group,
    Depot,
    Server,
}

impl SpecKind {
    pub const ALL: [SpecKind; 10] = [
        SpecKind::Client,
        SpecKind::Label,
        SpecKind::Branch,
        SpecKind::Change,
        SpecKind::Stream,
        SpecKind::Job,
        SpecKind::User,
        SpecKind::Group,
        SpecKind::Depot,
        SpecKind::Server,
    ];

    /// The command that fetches (`-o`), saves (`-i`) and deletes (`-d`) the form.
    pub fn command(self) -> &'static str {
        match self {
            SpecKind::Client => "client",
            SpecKind::Label => "label",
            SpecKind::Branch => "branch",
            SpecKind::Change => "change",
            SpecKind::Stream => "stream",
            SpecKind::Job => "job",
            SpecKind::User => "user",
            SpecKind::Group => "group",
            SpecKind::Depot => "depot",
            SpecKind::Server => "server",
        }
    }

    /// The command that lists forms of this kind.
    pub fn list_command(self) -> &'static str {
        match self {
            SpecKind::Client => "clients",
            SpecKind::Label => "labels",
            SpecKind::Branch => "branches",
            SpecKind::Change => "changes",
            SpecKind::Stream => "streams",
            SpecKind::Job => "jobs",
            SpecKind::User => "users",
            SpecKind::Group => "groups",
            SpecKind::Depot => "depots",
            SpecKind::Server => "servers",
        }
    }

    /// The field of a list record that holds the form's name.
    pub fn list_key(self) -> &'static str {
        match self {
            SpecKind::Client => "client",
            SpecKind::Label => "label",
            SpecKind::Branch => "branch",
            SpecKind::Change => "change",
            SpecKind::Stream => "Stream",
            SpecKind::Job => "Job",
            SpecKind::User => "User",
            SpecKind::Group => "group",
            SpecKind::Depot => "name",
            SpecKind::Server => "Name",
        }
    }

    /// The form field that holds the form's name.
    pub fn name_field(self) -> &'static str {
        match self {
            SpecKind::Client => "Client",
            SpecKind::Label => "Label",
            SpecKind::Branch => "Branch",
            SpecKind::Change => "Change",
            SpecKind::Stream => "Stream",
            SpecKind::Job => "Job",
            SpecKind::User => "User",
            SpecKind::Group => "Group",
            SpecKind::Depot => "Depot",
            SpecKind::Server => "ServerID",
        }
    }

    /// The definition used until the server supplies one.
    fn default_specdef(self) -> &'static str {
        match self {
            SpecKind::Client => concat!(
                "Client;code:301;rq;ro;fmt:L;len:32;;",
                "Update;code:302;type:date;ro;fmt:L;len:20;;",
                "Access;code:303;type:date;ro;fmt:L;len:20;;",
                "Owner;code:304;fmt:R;len:32;;",
                "Host;code:305;type:word;len:32;;",
                "Description;code:306;type:text;len:128;;",
                "Root;code:307;rq;type:line;len:64;;",
                "AltRoots;code:308;type:llist;len:64;;",
                "Options;code:309;type:line;len:64;",
                "val:noallwrite/allwrite,noclobber/clobber,nocompress/compress,",
                "unlocked/locked,nomodtime/modtime,normdir/rmdir;;",
                "SubmitOptions;code:313;type:select;fmt:L;len:25;",
                "val:submitunchanged/submitunchanged+reopen/revertunchanged/",
                "revertunchanged+reopen/leaveunchanged/leaveunchanged+reopen;;",
                "LineEnd;code:310;type:select;fmt:L;len:12;val:local/unix/mac/win/share;;",
                "Stream;code:314;type:line;len:64;;",
                "View;code:311;type:wlist;words:2;len:64;;",
            ),
            SpecKind::Label => concat!(
                "Label;code:401;rq;ro;fmt:L;len:32;;",
                "Update;code:402;type:date;ro;fmt:L;len:20;;",
                "Access;code:403;type:date;ro;fmt:L;len:20;;",
                "Owner;code:404;fmt:R;len:32;;",
                "Description;code:405;type:text;len:128;;",
                "Options;code:406;type:line;len:64;val:unlocked/locked;;",
                "Revision;code:408;type:word;words:1;len:64;;",
                "View;code:407;type:wlist;len:64;;",
            ),
            SpecKind::Branch => concat!(
                "Branch;code:301;rq;ro;fmt:L;len:32;;",
                "Update;code:302;type:date;ro;fmt:L;len:20;;",
                "Access;code:303;type:date;ro;fmt:L;len:20;;",
                "Owner;code:304;fmt:R;len:32;;",
                "Description;code:306;type:text;len:128;;",
                "Options;code:309;type:line;len:64;val:unlocked/locked;;",
                "View;code:311;type:wlist;words:2;len:64;;",
            ),
            SpecKind::Change => concat!(
                "Change;code:201;rq;ro;fmt:L;seq:1;len:10;;",
                "Date;code:202;type:date;ro;fmt:R;seq:3;len:20;;",
                "Client;code:203;ro;fmt:L;seq:2;len:32;;",
                "User;code:204;ro;fmt:L;seq:4;len:32;;",
                "Status;code:205;ro;fmt:R;seq:5;len:10;;",
                "Type;code:211;seq:6;type:select;fmt:L;len:10;val:public/restricted;;",
                "Description;code:206;type:text;rq;seq:7;;",
                "JobStatus;code:207;fmt:I;type:select;seq:9;;",
                "Jobs;code:208;type:wlist;seq:8;len:32;;",
                "Files;code:210;type:llist;len:64;;",
            ),
            SpecKind::Stream => concat!(
                "Stream;code:701;rq;ro;len:64;;",
                "Update;code:705;type:date;ro;fmt:L;len:20;;",
                "Access;code:706;type:date;ro;fmt:L;len:20;;",
                "Owner;code:704;len:32;;",
                "Name;code:703;rq;type:line;len:32;;",
                "Parent;code:702;rq;len:64;;",
                "Type;code:708;rq;len:32;;",
                "Description;code:709;type:text;len:128;;",
                "Options;code:707;type:line;len:64;",
                "val:allsubmit/ownersubmit,unlocked/locked,toparent/notoparent,",
                "fromparent/nofromparent,mergedown/mergeany;;",
                "Paths;code:710;rq;type:wlist;words:2;maxwords:3;len:64;;",
                "Remapped;code:711;type:wlist;words:2;len:64;;",
                "Ignored;code:712;type:wlist;words:1;len:64;;",
            ),
            SpecKind::Job => concat!(
                "Job;code:101;rq;len:32;;",
                "Status;code:102;type:select;rq;len:10;pre:open;val:open/suspended/closed;;",
                "User;code:103;rq;len:32;pre:$user;;",
                "Date;code:104;type:date;ro;len:20;pre:$now;;",
                "Description;code:105;type:text;rq;pre:$blank;;",
            ),
            SpecKind::User => concat!(
                "User;code:651;rq;ro;seq:1;len:32;;",
                "Type;code:659;ro;fmt:R;len:10;;",
                "Email;code:652;fmt:R;rq;seq:3;len:32;;",
                "Update;code:653;fmt:L;type:date;ro;seq:2;len:20;;",
                "Access;code:654;fmt:L;type:date;ro;len:20;;",
                "FullName;code:655;fmt:R;type:line;rq;len:32;;",
                "JobView;code:656;type:line;len:64;;",
                "Password;code:657;len:32;;",
                "AuthMethod;code:662;fmt:L;len:10;val:perforce/ldap;;",
                "Reviews;code:658;type:wlist;len:64;;",
            ),
            SpecKind::Group => concat!(
                "Group;code:401;rq;ro;len:32;;",
                "MaxResults;code:402;type:word;len:12;;",
                "MaxScanRows;code:403;type:word;len:12;;",
                "MaxLockTime;code:407;type:word;len:12;;",
                "MaxOpenFiles;code:413;type:word;len:12;;",
                "Timeout;code:406;type:word;len:12;;",
                "PasswordTimeout;code:409;type:word;len:12;;",
                "Subgroups;code:404;type:wlist;len:32;opt:default;;",
                "Owners;code:408;type:wlist;len:32;opt:default;;",
                "Users;code:405;type:wlist;len:32;opt:default;;",
            ),
            SpecKind::Depot => concat!(
                "Depot;code:251;rq;ro;len:32;;",
                "Owner;code:252;len:32;;",
                "Date;code:253;type:date;ro;len:20;;",
                "Description;code:254;type:text;len:128;;",
                "Type;code:255;rq;len:10;;",
                "Address;code:256;len:64;;",
                "Suffix;code:258;len:64;;",
                "StreamDepth;code:260;len:64;;",
                "Map;code:257;rq;len:64;;",
            ),
            SpecKind::Server => concat!(
                "ServerID;code:751;rq;ro;len:32;;",
                "Type;code:752;rq;len:32;;",
                "Name;code:753;type:line;len:32;;",
                "Address;code:754;type:line;len:32;;",
                "ExternalAddress;code:755;type:line;len:32;;",
                "Services;code:756;rq;len:128;;",
                "Options;code:757;type:line;len:64;val:nomandatory/mandatory;;",
                "ReplicatingFrom;code:758;type:line;len:32;;",
                "Description;code:759;type:text;len:128;;",
                "User;code:761;type:line;len:64;;",
            ),
        }
    }
}

impl fmt::Display for SpecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for SpecKind {
    type Err = P4Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpecKind::ALL
            .into_iter()
            .find(|k| k.command() == s || k.list_command() == s)
            .ok_or_else(|| P4Error::Usage(format!("Unknown spec kind: {}", s)))
    }
}

// ============================================================================
// Spec Definition
// ============================================================================

/// The data type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Word,
    WordList,
    Select,
    Line,
    LineList,
    Date,
    Text,
    Bulk,
}

impl FieldType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "word" => Some(FieldType::Word),
            "wlist" => Some(FieldType::WordList),
            "select" => Some(FieldType::Select),
            "line" => Some(FieldType::Line),
            "llist" => Some(FieldType::LineList),
            "date" => Some(FieldType::Date),
            "text" => Some(FieldType::Text),
            "bulk" => Some(FieldType::Bulk),
            _ => None,
        }
    }

    /// List fields hold one value per line.
    pub fn is_list(self) -> bool {
        matches!(self, FieldType::WordList | FieldType::LineList)
    }

    /// Multi-line free text fields.
    pub fn is_text(self) -> bool {
        matches!(self, FieldType::Text | FieldType::Bulk)
    }
}

/// One field of a [`SpecDef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecField {
    pub name: String,
    pub code: u32,
    pub field_type: FieldType,
    pub required: bool,
    pub read_only: bool,
}

/// The layout of a kind of form, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecDef {
    fields: Vec<SpecField>,
}

impl SpecDef {
    /// Parses a server spec definition such as
    /// `Client;code:301;rq;ro;len:32;;View;code:311;type:wlist;;`.
    ///
    /// Fields without a `type` attribute are words. Unknown types are
    /// treated as single lines.
    pub fn parse(specdef: &str) -> Result<Self, P4Error> {
        let mut fields = Vec::new();

        for item in specdef.split(";;") {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }

            let mut attributes = item.split(';');
            let name = attributes.next().unwrap_or_default().trim();
            if name.is_empty() || name.contains(':') {
                return Err(P4Error::Parse(format!("Malformed specdef entry: {}", item)));
            }

            let mut field = SpecField {
                name: name.to_string(),
                code: 0,
                field_type: FieldType::Word,
                required: false,
                read_only: false,
            };
            for attribute in attributes {
                match attribute.split_once(':') {
                    Some(("code", code)) => {
                        field.code = code.parse().map_err(|_| {
                            P4Error::Parse(format!("Invalid code for field {}: {}", name, code))
                        })?;
                    }
                    Some(("type", kind)) => {
                        field.field_type = FieldType::from_name(kind).unwrap_or(FieldType::Line);
                    }
                    None if attribute == "rq" => field.required = true,
                    None if attribute == "ro" => field.read_only = true,
                    _ => {}
                }
            }
            fields.push(field);
        }

        if fields.is_empty() {
            return Err(P4Error::Parse("Empty specdef".to_string()));
        }
        Ok(Self { fields })
    }

    /// The definition built into the SDK for `kind`.
    pub fn builtin(kind: SpecKind) -> Self {
        Self::parse(kind.default_specdef()).unwrap_or_default()
    }

    pub fn fields(&self) -> &[SpecField] {
        &self.fields
    }

    /// Looks up a field, ignoring case.
    pub fn field(&self, name: &str) -> Option<&SpecField> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

// ============================================================================
// Spec Values
// ============================================================================

/// The value of a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecValue {
    Text(String),
    List(Vec<String>),
}

impl SpecValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SpecValue::Text(s) => Some(s),
            SpecValue::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            SpecValue::List(items) => Some(items),
            SpecValue::Text(_) => None,
        }
    }
}

impl From<&str> for SpecValue {
    fn from(value: &str) -> Self {
        SpecValue::Text(value.to_string())
    }
}

impl From<String> for SpecValue {
    fn from(value: String) -> Self {
        SpecValue::Text(value)
    }
}

impl From<Vec<String>> for SpecValue {
    fn from(value: Vec<String>) -> Self {
        SpecValue::List(value)
    }
}

impl From<Vec<&str>> for SpecValue {
    fn from(value: Vec<&str>) -> Self {
        SpecValue::List(value.into_iter().map(str::to_string).collect())
    }
}

/// A field the definition does not describe, kept as the text it arrived as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField {
    pub name: String,
    pub raw: String,
}

// ============================================================================
// Spec
// ============================================================================

/// One form: field values typed by a [`SpecDef`].
#[derive(Debug, Clone)]
pub struct Spec {
    kind: SpecKind,
    def: Arc<SpecDef>,
    fields: BTreeMap<String, SpecValue>,
    unknown: Vec<UnknownField>,
}

impl Spec {
    /// Creates an empty form using the built-in definition.
    pub fn new(kind: SpecKind) -> Self {
        Self::with_def(kind, Arc::new(SpecDef::builtin(kind)))
    }

    pub fn with_def(kind: SpecKind, def: Arc<SpecDef>) -> Self {
        Self {
            kind,
            def,
            fields: BTreeMap::new(),
            unknown: Vec::new(),
        }
    }

    /// Parses form text as written by the server's `-o` commands.
    pub fn parse(kind: SpecKind, def: Arc<SpecDef>, text: &str) -> Result<Self, P4Error> {
        let mut spec = Self::with_def(kind, def);
        let mut current: Option<PendingField> = None;

        for line in text.lines() {
            if line.starts_with('#') {
                continue;
            }
            if line.starts_with('\t') || line.starts_with(' ') || line.trim().is_empty() {
                match current.as_mut() {
                    Some(field) => field.push_continuation(line),
                    None if line.trim().is_empty() => {}
                    None => {
                        return Err(P4Error::Parse(format!(
                            "Value outside of a field: {}",
                            line.trim()
                        )))
                    }
                }
                continue;
            }

            let Some((name, value)) = line.split_once(':') else {
                return Err(P4Error::Parse(format!("Malformed spec line: {}", line)));
            };
            if let Some(field) = current.take() {
                spec.finish_field(field);
            }
            current = Some(PendingField::new(name.trim(), value.trim(), line));
        }

        if let Some(field) = current.take() {
            spec.finish_field(field);
        }
        Ok(spec)
    }

    /// Converts tagged form output into a spec.
    ///
    /// List fields arrive as indexed keys (`View0`, `View1`, ...) or as a
    /// single array.
    pub fn from_record(kind: SpecKind, def: Arc<SpecDef>, record: &Record) -> Self {
        let mut spec = Self::with_def(kind, Arc::clone(&def));
        let mut consumed: Vec<&str> = Vec::new();

        for field in def.fields() {
            if field.field_type.is_list() {
                let mut values = record.indexed(&field.name);
                if values.is_empty() {
                    match record.get(&field.name) {
                        Some(FieldValue::List(items)) => {
                            values = items.iter().map(ToString::to_string).collect();
                        }
                        Some(value) => {
                            values = value.to_string().lines().map(str::to_string).collect();
                        }
                        None => {}
                    }
                }
                if record.contains_key(&field.name) {
                    consumed.push(&field.name);
                }
                for key in record.keys() {
                    if is_indexed_key(key, &field.name) {
                        consumed.push(key);
                    }
                }
                if !values.is_empty() {
                    spec.fields.insert(field.name.clone(), SpecValue::List(values));
                }
            } else if let Some(value) = record.get(&field.name) {
                consumed.push(&field.name);
                spec.fields
                    .insert(field.name.clone(), SpecValue::Text(value.to_string()));
            }
        }

        for (key, value) in record.iter() {
            if consumed.contains(&key) || key == "specdef" || key == "data" {
                continue;
            }
            spec.unknown.push(UnknownField {
                name: key.to_string(),
                raw: format_raw(key, value),
            });
        }
        spec
    }

    fn finish_field(&mut self, mut field: PendingField) {
        let Some(def) = self.def.field(&field.name) else {
            while field.raw.last().map_or(false, |l| l.trim().is_empty()) {
                field.raw.pop();
            }
            self.unknown.push(UnknownField {
                name: field.name,
                raw: field.raw.join("\n"),
            });
            return;
        };

        let name = def.name.clone();
        let mut lines = field.values;
        while lines.last().map_or(false, |l| l.trim().is_empty()) {
            lines.pop();
        }

        let value = if def.field_type.is_list() {
            SpecValue::List(
                lines
                    .into_iter()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .collect(),
            )
        } else if def.field_type.is_text() {
            let mut text = lines.join("\n");
            if !text.is_empty() {
                text.push('\n');
            }
            SpecValue::Text(text)
        } else {
            SpecValue::Text(
                lines
                    .into_iter()
                    .map(|l| l.trim().to_string())
                    .find(|l| !l.is_empty())
                    .unwrap_or_default(),
            )
        };
        self.fields.insert(name, value);
    }

    /// Formats the form as text for the server's `-i` commands: known fields
    /// in definition order, then unknown fields as they arrived.
    pub fn format(&self) -> String {
        let mut out = String::new();
        for field in self.def.fields() {
            let Some(value) = self.fields.get(&field.name) else {
                continue;
            };
            match value {
                SpecValue::List(items) => {
                    out.push_str(&field.name);
                    out.push_str(":\n");
                    for item in items {
                        out.push('\t');
                        out.push_str(item);
                        out.push('\n');
                    }
                }
                SpecValue::Text(text) if field.field_type.is_text() => {
                    out.push_str(&field.name);
                    out.push_str(":\n");
                    for line in text.lines() {
                        out.push('\t');
                        out.push_str(line);
                        out.push('\n');
                    }
                }
                SpecValue::Text(text) => {
                    out.push_str(&field.name);
                    out.push_str(":\t");
                    out.push_str(text);
                    out.push('\n');
                }
            }
            out.push('\n');
        }
        for field in &self.unknown {
            out.push_str(&field.raw);
            out.push_str("\n\n");
        }
        out
    }

    pub fn kind(&self) -> SpecKind {
        self.kind
    }

    pub fn def(&self) -> &Arc<SpecDef> {
        &self.def
    }

    /// Gets a field by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&SpecValue> {
        let field = self.def.field(name)?;
        self.fields.get(&field.name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(SpecValue::as_str)
    }

    pub fn get_list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(SpecValue::as_list)
    }

    /// Sets a field. Fails with [`P4Error::Usage`] when the definition has no
    /// such field or the value's shape does not match the field type.
    pub fn set(&mut self, name: &str, value: impl Into<SpecValue>) -> Result<(), P4Error> {
        let field = self.def.field(name).ok_or_else(|| {
            P4Error::Usage(format!("Invalid field '{}' for {} spec", name, self.kind))
        })?;

        let value = value.into();
        match (&value, field.field_type.is_list()) {
            (SpecValue::List(_), false) => {
                return Err(P4Error::Usage(format!("Field '{}' is not a list", field.name)))
            }
            (SpecValue::Text(_), true) => {
                return Err(P4Error::Usage(format!("Field '{}' is a list", field.name)))
            }
            _ => {}
        }
        self.fields.insert(field.name.clone(), value);
        Ok(())
    }

    /// Clears a field, returning its previous value.
    pub fn remove(&mut self, name: &str) -> Option<SpecValue> {
        let field = self.def.field(name)?;
        self.fields.remove(&field.name)
    }

    /// Iterates over the set fields in definition order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &SpecValue)> {
        self.def
            .fields()
            .iter()
            .filter_map(|f| self.fields.get(&f.name).map(|v| (f.name.as_str(), v)))
    }

    pub fn unknown_fields(&self) -> &[UnknownField] {
        &self.unknown
    }

    /// The form's name (client name, change number, label name, ...).
    pub fn name(&self) -> Option<&str> {
        self.get_str(self.kind.name_field())
    }

    pub fn description(&self) -> Option<&str> {
        self.get_str("Description")
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> Result<(), P4Error> {
        self.set("Description", description.into())
    }

    pub fn root(&self) -> Option<&str> {
        self.get_str("Root")
    }

    pub fn set_root(&mut self, root: impl Into<String>) -> Result<(), P4Error> {
        self.set("Root", root.into())
    }

    pub fn view(&self) -> Option<&[String]> {
        self.get_list("View")
    }

    pub fn set_view<I, S>(&mut self, lines: I) -> Result<(), P4Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set("View", lines.into_iter().map(Into::into).collect::<Vec<String>>())
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// A field being collected while parsing form text.
struct PendingField {
    name: String,
    values: Vec<String>,
    raw: Vec<String>,
}

impl PendingField {
    fn new(name: &str, inline: &str, line: &str) -> Self {
        let values = if inline.is_empty() {
            Vec::new()
        } else {
            vec![inline.to_string()]
        };
        Self {
            name: name.to_string(),
            values,
            raw: vec![line.to_string()],
        }
    }

    fn push_continuation(&mut self, line: &str) {
        let value = line.strip_prefix('\t').unwrap_or_else(|| line.trim_start());
        self.values.push(value.to_string());
        self.raw.push(line.to_string());
    }
}

fn is_indexed_key(key: &str, name: &str) -> bool {
    key.strip_prefix(name)
        .map_or(false, |rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

fn format_raw(key: &str, value: &FieldValue) -> String {
    match value {
        FieldValue::List(items) => {
            let mut raw = format!("{}:", key);
            for item in items {
                raw.push_str("\n\t");
                raw.push_str(&item.to_string());
            }
            raw
        }
        other => {
            let text = other.to_string();
            if text.contains('\n') {
                let mut raw = format!("{}:", key);
                for line in text.lines() {
                    raw.push_str("\n\t");
                    raw.push_str(line);
                }
                raw
            } else {
                format!("{}:\t{}", key, text)
            }
        }
    }
}
