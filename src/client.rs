// Copyright (c) Microsoft Corporation. All rights reserved.

//! P4Client - Main entry point for the P4 SDK.
//!
//! This module provides the [`P4Client`] struct, which holds the connection
//! parameters of one session, manages its link to the server and dispatches
//! commands over it.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Child;

use crate::command::{self, Callbacks, Connection, Failure, Outcome};
use crate::config::{default_ticket_file, validate_charset, ExceptionLevel, P4Config};
use crate::filelog::DepotFile;
use crate::handler::{OutputHandler, Progress};
use crate::jsonrpc::JsonRpcClient;
use crate::message::Message;
use crate::protocol_version::get_sdk_protocol_version;
use crate::resolve::Resolver;
use crate::result::{CommandResult, Record};
use crate::spec::{Spec, SpecDef, SpecKind};
use crate::tickets::read_tickets;
use crate::transport::{self, Port};
use crate::types::*;
use crate::P4Error;

// ============================================================================
// P4Client
// ============================================================================

/// A session with a versioning server.
///
/// A session is created unconnected from a [`P4Config`]. Parameters can be
/// changed through the setters at any time (see the individual setters for
/// the exceptions) and apply to the next command. Dispatching takes
/// `&mut self`, so a session runs one command at a time; independent sessions
/// can run in parallel on different tasks.
///
/// Dropping a connected session closes its link and kills a spawned server
/// process.
///
/// # Examples
///
/// ```rust,no_run
/// # use p4_sdk::*;
/// # async fn example() -> Result<(), P4Error> {
/// let mut p4 = P4Client::new(P4Config::from_env()?);
/// p4.connect().await?;
///
/// let result = p4.run("opened", &["-a"]).await?;
/// for record in result.records() {
///     println!("{:?} opened by {:?}", record.get_str("depotFile"), record.get_str("user"));
/// }
///
/// p4.disconnect().await;
/// # Ok(())
/// # }
/// ```
pub struct P4Client {
    config: P4Config,
    state: ConnectionState,
    connection: Option<Connection>,
    server: HandshakeResponse,
    handler: Option<Box<dyn OutputHandler>>,
    resolver: Option<Box<dyn Resolver>>,
    progress: Option<Box<dyn Progress>>,
    input: VecDeque<String>,
    last: CommandResult,
    spec_defs: HashMap<SpecKind, Arc<SpecDef>>,
}

impl Default for P4Client {
    fn default() -> Self {
        Self::new(P4Config::default())
    }
}

impl P4Client {
    /// Creates a new unconnected session.
    pub fn new(config: P4Config) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            connection: None,
            server: HandshakeResponse::default(),
            handler: None,
            resolver: None,
            progress: None,
            input: VecDeque::new(),
            last: CommandResult::default(),
            spec_defs: HashMap::new(),
        }
    }

    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the session parameters.
    pub fn config(&self) -> &P4Config {
        &self.config
    }

    // ========================================================================
    // Connect / Disconnect
    // ========================================================================

    /// Connects to the server named by the port parameter.
    ///
    /// Connecting an already connected session does nothing.
    pub async fn connect(&mut self) -> Result<(), P4Error> {
        if self.connection.is_some() {
            tracing::debug!("Already connected to {:?}", self.config.port);
            return Ok(());
        }

        let port: Port = self
            .config
            .port
            .as_deref()
            .ok_or_else(|| P4Error::Usage("No port set".to_string()))?
            .parse()?;

        self.state = ConnectionState::Connecting;
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let link = match transport::open(&port, self.config.cwd.as_deref(), timeout).await {
            Ok(link) => link,
            Err(e) => {
                self.state = ConnectionState::Error;
                return Err(e);
            }
        };
        tracing::debug!("Opened link to {}", port);
        self.establish(link.reader, link.writer, link.child).await
    }

    /// Connects over an already open byte stream, e.g. one half of a
    /// [`tokio::io::duplex`] pipe served in-process.
    pub async fn connect_with_transport<R, W>(&mut self, reader: R, writer: W) -> Result<(), P4Error>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        if self.connection.is_some() {
            tracing::debug!("Already connected");
            return Ok(());
        }
        self.state = ConnectionState::Connecting;
        self.establish(reader, writer, None).await
    }

    async fn establish<R, W>(
        &mut self,
        reader: R,
        writer: W,
        child: Option<Child>,
    ) -> Result<(), P4Error>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (rpc, incoming) = JsonRpcClient::new(reader, writer);
        let mut connection = Connection {
            rpc,
            incoming,
            child,
        };

        match handshake(&self.config, &connection.rpc).await {
            Ok(server) => {
                tracing::debug!(
                    "Connected: server level {:?}, version {:?}",
                    server.server_level,
                    server.server_version
                );
                self.server = server;
                self.connection = Some(connection);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                connection.rpc.stop().await;
                if let Some(child) = connection.child.as_mut() {
                    let _ = child.kill().await;
                }
                self.state = ConnectionState::Error;
                Err(e)
            }
        }
    }

    /// Closes the link to the server. Does nothing when not connected.
    pub async fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
            tracing::debug!("Disconnected from {:?}", self.config.port);
        }
        self.reset();
    }

    /// Returns true while the link to the server is up.
    ///
    /// When the server has dropped the link the session is cleaned up and
    /// reports itself disconnected.
    pub fn connected(&mut self) -> bool {
        let closed = match &self.connection {
            Some(connection) => connection.rpc.is_closed(),
            None => return false,
        };
        if closed {
            tracing::debug!("Server closed the connection");
            self.connection = None;
            self.reset();
        }
        !closed
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.server = HandshakeResponse::default();
        self.spec_defs.clear();
        self.input.clear();
        self.last = CommandResult::default();
    }

    // ========================================================================
    // Server Capabilities
    // ========================================================================

    pub fn server_level(&self) -> Option<u32> {
        self.server.server_level
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server.server_version.as_deref()
    }

    /// True when the server runs in unicode mode.
    pub fn server_unicode(&self) -> bool {
        self.server.unicode
    }

    pub fn server_case_insensitive(&self) -> bool {
        self.server.case_insensitive
    }

    // ========================================================================
    // Command Dispatch
    // ========================================================================

    /// Runs a command.
    ///
    /// Whether server errors and warnings make this return `Err` depends on
    /// the exception level; either way they are available afterwards from
    /// [`errors`](Self::errors), [`warnings`](Self::warnings) and
    /// [`last_result`](Self::last_result).
    pub async fn run(&mut self, command: &str, args: &[&str]) -> Result<CommandResult, P4Error> {
        let tagged = self.config.tagged;
        self.execute(command, to_owned(args), tagged, None).await
    }

    /// Runs a command whose `command.input` requests are answered with `input`.
    pub async fn run_with_input(
        &mut self,
        command: &str,
        args: &[&str],
        input: impl Into<String>,
    ) -> Result<CommandResult, P4Error> {
        self.input.push_back(input.into());
        self.run(command, args).await
    }

    /// Queues answers for the input and prompt requests of the next command.
    /// Unused answers are discarded when that command finishes.
    pub fn set_input<I, S>(&mut self, input: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input = input.into_iter().map(Into::into).collect();
    }

    pub async fn run_info(&mut self) -> Result<CommandResult, P4Error> {
        self.run("info", &[]).await
    }

    /// Submits the default changelist, or the given change form.
    pub async fn run_submit(
        &mut self,
        change: Option<&Spec>,
        args: &[&str],
    ) -> Result<CommandResult, P4Error> {
        match change {
            Some(spec) => {
                let mut args = to_owned(args);
                args.push("-i".to_string());
                self.input.push_back(spec.format());
                let tagged = self.config.tagged;
                self.execute("submit", args, tagged, None).await
            }
            None => self.run("submit", args).await,
        }
    }

    /// Logs in, answering the password prompt with `password` or the
    /// session password.
    pub async fn run_login(
        &mut self,
        password: Option<&str>,
        args: &[&str],
    ) -> Result<CommandResult, P4Error> {
        if let Some(password) = password.or(self.config.password.as_deref()) {
            self.input.push_back(password.to_string());
        }
        self.run("login", args).await
    }

    /// Changes the user's password. An empty `old` password means none is set.
    pub async fn run_password(&mut self, old: &str, new: &str) -> Result<CommandResult, P4Error> {
        if !old.is_empty() {
            self.input.push_back(old.to_string());
        }
        self.input.push_back(new.to_string());
        self.input.push_back(new.to_string());
        self.run("passwd", &[]).await
    }

    /// Runs `resolve` with a resolver used for this command only.
    pub async fn run_resolve(
        &mut self,
        resolver: &mut dyn Resolver,
        args: &[&str],
    ) -> Result<CommandResult, P4Error> {
        let tagged = self.config.tagged;
        self.execute("resolve", to_owned(args), tagged, Some(resolver))
            .await
    }

    /// Runs `filelog` and returns the structured file histories.
    pub async fn run_filelog(&mut self, args: &[&str]) -> Result<Vec<DepotFile>, P4Error> {
        let result = self.execute("filelog", to_owned(args), true, None).await?;
        Ok(result.records().filter_map(DepotFile::from_record).collect())
    }

    /// Lists the tickets in the session's ticket file. Needs no connection.
    pub fn run_tickets(&self) -> Result<Vec<Record>, P4Error> {
        let Some(path) = self.ticket_file() else {
            return Ok(Vec::new());
        };
        Ok(read_tickets(&path)?.iter().map(|t| t.to_record()).collect())
    }

    async fn execute(
        &mut self,
        command: &str,
        args: Vec<String>,
        tagged: bool,
        resolver: Option<&mut dyn Resolver>,
    ) -> Result<CommandResult, P4Error> {
        let command_line = std::iter::once(command)
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        let params = self.command_params(command, args, tagged);

        let Some(connection) = self.connection.as_mut() else {
            self.input.clear();
            return Err(P4Error::NotConnected);
        };
        let callbacks = Callbacks {
            handler: self.handler.as_deref_mut().map(|h| h as &mut dyn OutputHandler),
            resolver: match resolver {
                Some(resolver) => Some(resolver as &mut dyn Resolver),
                None => self.resolver.as_deref_mut().map(|r| r as &mut dyn Resolver),
            },
            progress: self.progress.as_deref_mut().map(|p| p as &mut dyn Progress),
            input: &mut self.input,
            password: self.config.password.as_deref(),
        };

        let dispatched = command::dispatch(connection, params, callbacks).await;
        self.input.clear();
        let Outcome {
            result,
            cancelled,
            callback_error,
        } = match dispatched {
            Ok(outcome) => outcome,
            Err(Failure { result, error }) => {
                if !self.connected() {
                    tracing::debug!("Lost connection during \"p4 {}\"", command_line);
                }
                self.last = result;
                return Err(error);
            }
        };

        self.last = result.clone();
        if result.has_fatal() {
            tracing::warn!("Fatal error from \"p4 {}\", disconnecting", command_line);
            let last = std::mem::take(&mut self.last);
            self.disconnect().await;
            self.last = last;
        }

        if let Some(e) = callback_error {
            return Err(e);
        }
        if cancelled {
            return Err(P4Error::Cancelled {
                command: command_line,
            });
        }

        let rejected = match self.config.exception_level {
            ExceptionLevel::RaiseNone => false,
            ExceptionLevel::RaiseErrors => result.has_errors(),
            ExceptionLevel::RaiseAll => result.has_errors() || result.has_warnings(),
        };
        if rejected {
            return Err(P4Error::Protocol {
                command: command_line,
                errors: result.errors,
                warnings: result.warnings,
            });
        }
        Ok(result)
    }

    fn command_params(&self, command: &str, args: Vec<String>, tagged: bool) -> CommandParams {
        let config = &self.config;
        CommandParams {
            command: command.to_string(),
            args,
            tagged,
            streams: config.streams,
            user: config.user.clone(),
            client: config.client.clone(),
            host: config.host.clone(),
            charset: config.charset.clone(),
            language: config.language.clone(),
            password: config.password.clone(),
            cwd: config.cwd.clone(),
            prog: config.prog.clone(),
            version: config.version.clone(),
            max_results: config.max_results,
            max_scan_rows: config.max_scan_rows,
            max_lock_time: config.max_lock_time,
            progress: self.progress.is_some(),
        }
    }

    // ========================================================================
    // Last Command
    // ========================================================================

    /// The full result of the last command.
    pub fn last_result(&self) -> &CommandResult {
        &self.last
    }

    /// Errors reported by the last command.
    pub fn errors(&self) -> &[String] {
        &self.last.errors
    }

    /// Warnings reported by the last command.
    pub fn warnings(&self) -> &[String] {
        &self.last.warnings
    }

    pub fn messages(&self) -> &[Message] {
        &self.last.messages
    }

    /// Performance tracking lines of the last command.
    pub fn track_output(&self) -> &[String] {
        &self.last.track
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    /// Installs an output handler, returning the previous one.
    pub fn set_handler(
        &mut self,
        handler: impl OutputHandler + 'static,
    ) -> Option<Box<dyn OutputHandler>> {
        self.handler.replace(Box::new(handler))
    }

    pub fn clear_handler(&mut self) -> Option<Box<dyn OutputHandler>> {
        self.handler.take()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Installs the resolver used by `resolve` commands, returning the
    /// previous one. Without a resolver the server's merge hint is accepted.
    pub fn set_resolver(&mut self, resolver: impl Resolver + 'static) -> Option<Box<dyn Resolver>> {
        self.resolver.replace(Box::new(resolver))
    }

    pub fn clear_resolver(&mut self) -> Option<Box<dyn Resolver>> {
        self.resolver.take()
    }

    /// Installs a progress callback. While one is installed commands ask the
    /// server for progress notifications.
    pub fn set_progress(&mut self, progress: impl Progress + 'static) -> Option<Box<dyn Progress>> {
        self.progress.replace(Box::new(progress))
    }

    pub fn clear_progress(&mut self) -> Option<Box<dyn Progress>> {
        self.progress.take()
    }

    // ========================================================================
    // Specs
    // ========================================================================

    /// Fetches a form with `<kind> -o [name]`.
    ///
    /// The form arrives as tagged fields or as form text; a spec definition
    /// sent along with it is cached for the kind.
    pub async fn fetch_spec(&mut self, kind: SpecKind, name: Option<&str>) -> Result<Spec, P4Error> {
        let mut args = vec!["-o".to_string()];
        args.extend(name.map(str::to_string));
        let result = self.execute(kind.command(), args, true, None).await?;

        let Some(record) = result.records().next() else {
            let mut errors = result.errors.clone();
            if errors.is_empty() {
                errors.push(format!("No {} form returned", kind));
            }
            return Err(P4Error::Protocol {
                command: format!("{} -o", kind.command()),
                errors,
                warnings: result.warnings.clone(),
            });
        };

        if let Some(specdef) = record.get_str("specdef") {
            let def = Arc::new(SpecDef::parse(specdef)?);
            self.spec_defs.insert(kind, def);
        }
        let def = self.spec_def(kind);
        match record.get_str("data") {
            Some(text) => Spec::parse(kind, def, text),
            None => Ok(Spec::from_record(kind, def, record)),
        }
    }

    /// Saves a form with `<kind> -i`.
    pub async fn save_spec(&mut self, spec: &Spec) -> Result<CommandResult, P4Error> {
        self.save_spec_with(spec, &[]).await
    }

    /// Saves a form with extra flags, e.g. `-f` to force.
    pub async fn save_spec_with(
        &mut self,
        spec: &Spec,
        args: &[&str],
    ) -> Result<CommandResult, P4Error> {
        let mut args = to_owned(args);
        args.push("-i".to_string());
        self.input.push_back(spec.format());
        let tagged = self.config.tagged;
        self.execute(spec.kind().command(), args, tagged, None)
            .await
    }

    /// Deletes a form with `<kind> -d <name>`.
    pub async fn delete_spec(&mut self, kind: SpecKind, name: &str) -> Result<CommandResult, P4Error> {
        self.run(kind.command(), &["-d", name]).await
    }

    /// Shelves files using a change form.
    pub async fn save_shelve(&mut self, change: &Spec) -> Result<CommandResult, P4Error> {
        self.run_with_input("shelve", &["-i"], change.format())
            .await
    }

    /// Lists the forms of a kind and returns an iterator that fetches each
    /// form when it is reached.
    pub async fn iterate_specs(
        &mut self,
        kind: SpecKind,
        args: &[&str],
    ) -> Result<SpecIterator<'_>, P4Error> {
        let result = self
            .execute(kind.list_command(), to_owned(args), true, None)
            .await?;
        let names: Vec<String> = result
            .records()
            .filter_map(|r| r.get(kind.list_key()).map(ToString::to_string))
            .collect();
        tracing::debug!("Iterating {} {} forms", names.len(), kind);
        Ok(SpecIterator {
            client: self,
            kind,
            names: names.into_iter(),
        })
    }

    /// Parses form text with the session's definition for the kind.
    pub fn parse_spec(&self, kind: SpecKind, text: &str) -> Result<Spec, P4Error> {
        Spec::parse(kind, self.spec_def(kind), text)
    }

    /// Formats a form as the server expects it on input.
    pub fn format_spec(&self, spec: &Spec) -> String {
        spec.format()
    }

    /// The definition for a kind: the one last sent by the server, or the
    /// built-in one.
    pub fn spec_def(&self, kind: SpecKind) -> Arc<SpecDef> {
        self.spec_defs
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(SpecDef::builtin(kind)))
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn port(&self) -> Option<&str> {
        self.config.port.as_deref()
    }

    /// Sets the server address. Fails while connected.
    pub fn set_port(&mut self, port: impl Into<String>) -> Result<(), P4Error> {
        if self.connection.is_some() {
            return Err(P4Error::Usage(
                "Can't change port once you've connected".to_string(),
            ));
        }
        self.config.port = Some(port.into());
        Ok(())
    }

    pub fn charset(&self) -> Option<&str> {
        self.config.charset.as_deref()
    }

    /// Sets the charset used from the next command on.
    pub fn set_charset(&mut self, charset: impl Into<String>) -> Result<(), P4Error> {
        let charset = charset.into();
        validate_charset(&charset)?;
        self.config.charset = Some(charset);
        Ok(())
    }

    pub fn track(&self) -> bool {
        self.config.track
    }

    /// Enables performance tracking. Fails while connected.
    pub fn set_track(&mut self, track: bool) -> Result<(), P4Error> {
        if self.connection.is_some() {
            return Err(P4Error::Usage(
                "Can't change performance tracking once you've connected".to_string(),
            ));
        }
        self.config.track = track;
        Ok(())
    }

    pub fn api_level(&self) -> Option<u32> {
        self.config.api_level
    }

    /// Sets the API level announced in the handshake. Fails while connected.
    pub fn set_api_level(&mut self, level: u32) -> Result<(), P4Error> {
        if self.connection.is_some() {
            return Err(P4Error::Usage(
                "Can't change API level once you've connected".to_string(),
            ));
        }
        self.config.api_level = Some(level);
        Ok(())
    }

    pub fn tagged(&self) -> bool {
        self.config.tagged
    }

    pub fn set_tagged(&mut self, tagged: bool) {
        self.config.tagged = tagged;
    }

    pub fn streams(&self) -> bool {
        self.config.streams
    }

    pub fn set_streams(&mut self, streams: bool) {
        self.config.streams = streams;
    }

    pub fn exception_level(&self) -> ExceptionLevel {
        self.config.exception_level
    }

    pub fn set_exception_level(&mut self, level: ExceptionLevel) {
        self.config.exception_level = level;
    }

    pub fn prog(&self) -> &str {
        &self.config.prog
    }

    pub fn set_prog(&mut self, prog: impl Into<String>) {
        self.config.prog = prog.into();
    }

    /// The ticket file in use: the configured one or the default location.
    pub fn ticket_file(&self) -> Option<PathBuf> {
        self.config.ticket_file.clone().or_else(default_ticket_file)
    }

    pub fn set_ticket_file(&mut self, path: impl Into<PathBuf>) {
        self.config.ticket_file = Some(path.into());
    }

    pub fn max_results(&self) -> Option<u32> {
        self.config.max_results
    }

    pub fn set_max_results(&mut self, limit: u32) {
        self.config.max_results = Some(limit);
    }

    pub fn max_scan_rows(&self) -> Option<u32> {
        self.config.max_scan_rows
    }

    pub fn set_max_scan_rows(&mut self, limit: u32) {
        self.config.max_scan_rows = Some(limit);
    }

    pub fn max_lock_time(&self) -> Option<u32> {
        self.config.max_lock_time
    }

    pub fn set_max_lock_time(&mut self, milliseconds: u32) {
        self.config.max_lock_time = Some(milliseconds);
    }
}

/// String parameters that may change at any time.
macro_rules! string_properties {
    ($($field:ident, $setter:ident;)*) => {
        impl P4Client {
            $(
                pub fn $field(&self) -> Option<&str> {
                    self.config.$field.as_deref()
                }

                pub fn $setter(&mut self, value: impl Into<String>) {
                    self.config.$field = Some(value.into());
                }
            )*
        }
    };
}

string_properties! {
    user, set_user;
    client, set_client;
    host, set_host;
    password, set_password;
    language, set_language;
    cwd, set_cwd;
    version, set_version;
}

/// `fetch_`, `save_`, `delete_` and `iterate_` shortcuts for each form kind.
macro_rules! spec_shortcuts {
    ($($kind:ident: $fetch:ident, $save:ident, $delete:ident, $iterate:ident;)*) => {
        impl P4Client {
            $(
                #[doc = concat!("Fetches a ", stringify!($kind), " form; `None` fetches the default one.")]
                pub async fn $fetch(&mut self, name: Option<&str>) -> Result<Spec, P4Error> {
                    self.fetch_spec(SpecKind::$kind, name).await
                }

                #[doc = concat!("Saves a ", stringify!($kind), " form.")]
                pub async fn $save(&mut self, spec: &Spec) -> Result<CommandResult, P4Error> {
                    if spec.kind() != SpecKind::$kind {
                        return Err(P4Error::Usage(format!(
                            "Expected a {} form, got a {} form",
                            SpecKind::$kind,
                            spec.kind()
                        )));
                    }
                    self.save_spec(spec).await
                }

                #[doc = concat!("Deletes a ", stringify!($kind), " form.")]
                pub async fn $delete(&mut self, name: &str) -> Result<CommandResult, P4Error> {
                    self.delete_spec(SpecKind::$kind, name).await
                }

                #[doc = concat!("Iterates over ", stringify!($kind), " forms.")]
                pub async fn $iterate(&mut self, args: &[&str]) -> Result<SpecIterator<'_>, P4Error> {
                    self.iterate_specs(SpecKind::$kind, args).await
                }
            )*
        }
    };
}

spec_shortcuts! {
    Client: fetch_client, save_client, delete_client, iterate_clients;
    Label: fetch_label, save_label, delete_label, iterate_labels;
    Branch: fetch_branch, save_branch, delete_branch, iterate_branches;
    Change: fetch_change, save_change, delete_change, iterate_changes;
    Stream: fetch_stream, save_stream, delete_stream, iterate_streams;
    Job: fetch_job, save_job, delete_job, iterate_jobs;
    User: fetch_user, save_user, delete_user, iterate_users;
    Group: fetch_group, save_group, delete_group, iterate_groups;
    Depot: fetch_depot, save_depot, delete_depot, iterate_depots;
    Server: fetch_server, save_server, delete_server, iterate_servers;
}

// ============================================================================
// SpecIterator
// ============================================================================

/// Fetches the forms listed by [`P4Client::iterate_specs`] one at a time.
///
/// The listing is taken once; the iterator is finite and cannot be restarted.
pub struct SpecIterator<'a> {
    client: &'a mut P4Client,
    kind: SpecKind,
    names: std::vec::IntoIter<String>,
}

impl SpecIterator<'_> {
    /// Fetches the next form, or returns `None` when all have been fetched.
    pub async fn next(&mut self) -> Option<Result<Spec, P4Error>> {
        let name = self.names.next()?;
        Some(self.client.fetch_spec(self.kind, Some(&name)).await)
    }

    /// Number of forms not fetched yet.
    pub fn remaining(&self) -> usize {
        self.names.len()
    }
}

/// Announces the client and checks that the server speaks the same protocol
/// version.
async fn handshake(config: &P4Config, rpc: &JsonRpcClient) -> Result<HandshakeResponse, P4Error> {
    let params = HandshakeParams {
        protocol_version: get_sdk_protocol_version(),
        prog: config.prog.clone(),
        version: config.version.clone(),
        api_level: config.api_level,
        track: config.track,
    };
    let params =
        serde_json::to_value(&params).map_err(|e| P4Error::Serialization(e.to_string()))?;
    let timeout = Duration::from_millis(config.connect_timeout_ms);
    let response = rpc
        .request("protocol.handshake", params, Some(timeout))
        .await?;
    let response: HandshakeResponse = serde_json::from_value(response)
        .map_err(|e| P4Error::Serialization(e.to_string()))?;

    let expected = get_sdk_protocol_version();
    match response.protocol_version {
        Some(version) if version == expected => Ok(response),
        actual => Err(P4Error::ProtocolMismatch { expected, actual }),
    }
}

fn to_owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}
