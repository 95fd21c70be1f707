// Copyright (c) Microsoft Corporation. All rights reserved.

//! Session configuration: connection parameters, environment and `P4CONFIG`
//! files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::P4Error;

/// Program name reported to the server when none is configured.
pub const DEFAULT_PROG: &str = "unnamed p4-sdk script";

/// Character sets accepted by [`validate_charset`].
pub const KNOWN_CHARSETS: &[&str] = &[
    "none",
    "auto",
    "utf8",
    "utf8-bom",
    "utf8unchecked",
    "utf8unchecked-bom",
    "iso8859-1",
    "iso8859-2",
    "iso8859-5",
    "iso8859-7",
    "iso8859-15",
    "shiftjis",
    "eucjp",
    "winansi",
    "macosroman",
    "koi8-r",
    "cp437",
    "cp737",
    "cp850",
    "cp852",
    "cp858",
    "cp866",
    "cp936",
    "cp949",
    "cp950",
    "cp1250",
    "cp1251",
    "cp1253",
    "utf16",
    "utf16-nobom",
    "utf16le",
    "utf16le-bom",
    "utf16be",
    "utf16be-bom",
    "utf32",
    "utf32-nobom",
    "utf32le",
    "utf32le-bom",
    "utf32be",
    "utf32be-bom",
];

/// Checks a charset name against [`KNOWN_CHARSETS`].
pub fn validate_charset(charset: &str) -> Result<(), P4Error> {
    if KNOWN_CHARSETS.contains(&charset) {
        Ok(())
    } else {
        Err(P4Error::Usage(format!(
            "Unknown or unsupported charset: {}",
            charset
        )))
    }
}

// ============================================================================
// Exception Level
// ============================================================================

/// Which server messages turn a command into an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ExceptionLevel {
    /// Never fail because of server messages; inspect the result instead.
    RaiseNone,
    /// Fail when the server reported errors.
    RaiseErrors,
    /// Fail when the server reported errors or warnings.
    #[default]
    RaiseAll,
}

impl From<u8> for ExceptionLevel {
    fn from(value: u8) -> Self {
        match value {
            0 => ExceptionLevel::RaiseNone,
            1 => ExceptionLevel::RaiseErrors,
            _ => ExceptionLevel::RaiseAll,
        }
    }
}

impl From<ExceptionLevel> for u8 {
    fn from(value: ExceptionLevel) -> Self {
        match value {
            ExceptionLevel::RaiseNone => 0,
            ExceptionLevel::RaiseErrors => 1,
            ExceptionLevel::RaiseAll => 2,
        }
    }
}

// ============================================================================
// P4Config
// ============================================================================

/// Options for creating a [`P4Client`](crate::P4Client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct P4Config {
    /// Server address: `host:port`, `tcp:host:port`, a bare port or `rsh:<command>`.
    pub port: Option<String>,
    pub user: Option<String>,
    /// Client workspace name.
    pub client: Option<String>,
    pub host: Option<String>,
    pub password: Option<String>,
    pub charset: Option<String>,
    pub language: Option<String>,
    /// Working directory reported with each command.
    pub cwd: Option<String>,
    /// Program name reported to the server.
    pub prog: String,
    /// Program version reported to the server.
    pub version: Option<String>,
    pub ticket_file: Option<PathBuf>,
    pub max_results: Option<u32>,
    pub max_scan_rows: Option<u32>,
    pub max_lock_time: Option<u32>,
    /// Request tagged (structured) output (default: true).
    pub tagged: bool,
    /// Enable stream support (default: true).
    pub streams: bool,
    /// Request performance tracking output (default: false).
    pub track: bool,
    pub exception_level: ExceptionLevel,
    /// Client API level announced in the handshake.
    pub api_level: Option<u32>,
    /// Timeout for the TCP connect and for the handshake, each, in
    /// milliseconds (default: 10000).
    pub connect_timeout_ms: u64,
}

impl Default for P4Config {
    fn default() -> Self {
        Self {
            port: None,
            user: None,
            client: None,
            host: None,
            password: None,
            charset: None,
            language: None,
            cwd: None,
            prog: DEFAULT_PROG.to_string(),
            version: None,
            ticket_file: None,
            max_results: None,
            max_scan_rows: None,
            max_lock_time: None,
            tagged: true,
            streams: true,
            track: false,
            exception_level: ExceptionLevel::RaiseAll,
            api_level: None,
            connect_timeout_ms: 10_000,
        }
    }
}

impl P4Config {
    /// Builds a configuration from the process environment.
    ///
    /// Reads `P4PORT`, `P4USER`, `P4CLIENT`, `P4PASSWD`, `P4CHARSET`,
    /// `P4HOST`, `P4LANGUAGE` and `P4TICKETS`. When `P4CONFIG` names a file,
    /// the nearest file of that name in the current directory or its
    /// ancestors is applied on top.
    pub fn from_env() -> Result<Self, P4Error> {
        let cwd = std::env::current_dir().map_err(|e| P4Error::Io(e.to_string()))?;
        Self::from_vars(|name| std::env::var(name).ok(), &cwd)
    }

    /// Like [`from_env`](Self::from_env) with an explicit variable lookup and
    /// starting directory.
    pub fn from_vars<F>(lookup: F, cwd: &Path) -> Result<Self, P4Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        for name in [
            "P4PORT",
            "P4USER",
            "P4CLIENT",
            "P4PASSWD",
            "P4CHARSET",
            "P4HOST",
            "P4LANGUAGE",
            "P4TICKETS",
        ] {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                config.set_variable(name, value);
            }
        }

        if let Some(file_name) = lookup("P4CONFIG").filter(|v| !v.is_empty()) {
            if let Some(path) = find_config_file(cwd, &file_name) {
                tracing::debug!("Applying config file {}", path.display());
                config.apply_config_file(&path)?;
            }
        }
        config.cwd.get_or_insert_with(|| cwd.display().to_string());
        Ok(config)
    }

    /// Applies the `NAME=value` lines of a config file.
    pub fn apply_config_file(&mut self, path: &Path) -> Result<(), P4Error> {
        let text = std::fs::read_to_string(path).map_err(|e| P4Error::Io(e.to_string()))?;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((name, value)) = line.split_once('=') {
                self.set_variable(name.trim(), value.trim().to_string());
            }
        }
        Ok(())
    }

    fn set_variable(&mut self, name: &str, value: String) {
        match name {
            "P4PORT" => self.port = Some(value),
            "P4USER" => self.user = Some(value),
            "P4CLIENT" => self.client = Some(value),
            "P4PASSWD" => self.password = Some(value),
            "P4CHARSET" => self.charset = Some(value),
            "P4HOST" => self.host = Some(value),
            "P4LANGUAGE" => self.language = Some(value),
            "P4TICKETS" => self.ticket_file = Some(PathBuf::from(value)),
            _ => tracing::debug!("Ignoring config variable {}", name),
        }
    }
}

/// The ticket file used when none is configured: `~/.p4tickets`
/// (`%USERPROFILE%\p4tickets.txt` on Windows).
pub fn default_ticket_file() -> Option<PathBuf> {
    let name = if cfg!(windows) {
        "p4tickets.txt"
    } else {
        ".p4tickets"
    };
    dirs::home_dir().map(|home| home.join(name))
}

fn find_config_file(start: &Path, file_name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(file_name))
        .find(|candidate| candidate.is_file())
}
