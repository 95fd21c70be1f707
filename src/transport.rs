// Copyright (c) Microsoft Corporation. All rights reserved.

//! Server addresses and the byte streams behind them.
//!
//! A port is either a TCP address (`host:port`, `tcp:host:port`, or a bare
//! port on localhost) or `rsh:<command>`, which runs `<command>` through the
//! shell and talks to it over its stdin/stdout.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

use crate::P4Error;

const TCP_PREFIXES: &[&str] = &["tcp:", "tcp4:", "tcp6:", "tcp46:", "tcp64:"];
const SSL_PREFIXES: &[&str] = &["ssl:", "ssl4:", "ssl6:", "ssl46:", "ssl64:"];

/// A parsed server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Port {
    Tcp { host: String, port: u16 },
    Rsh { command: String },
}

impl FromStr for Port {
    type Err = P4Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(command) = s.strip_prefix("rsh:") {
            if command.trim().is_empty() {
                return Err(P4Error::Usage("rsh: port without a command".to_string()));
            }
            return Ok(Port::Rsh {
                command: command.to_string(),
            });
        }
        if SSL_PREFIXES.iter().any(|p| s.starts_with(p)) {
            return Err(P4Error::Connection(format!(
                "SSL connections are not supported: {}",
                s
            )));
        }

        let address = TCP_PREFIXES
            .iter()
            .find_map(|p| s.strip_prefix(p))
            .unwrap_or(s);

        // Just a port number
        if let Ok(port) = address.parse::<u16>() {
            return Ok(Port::Tcp {
                host: "localhost".to_string(),
                port,
            });
        }

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| P4Error::Usage(format!("Invalid port: {}", s)))?;
        let port: u16 = port
            .parse()
            .map_err(|_| P4Error::Usage(format!("Invalid port number in {}", s)))?;
        let host = if host.is_empty() { "localhost" } else { host };

        Ok(Port::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Port::Rsh { command } => write!(f, "rsh:{}", command),
        }
    }
}

// ============================================================================
// Links
// ============================================================================

/// An open byte stream to a server, plus the server process for `rsh:` ports.
pub(crate) struct Link {
    pub reader: Box<dyn AsyncRead + Unpin + Send>,
    pub writer: Box<dyn AsyncWrite + Unpin + Send>,
    pub child: Option<Child>,
}

/// Opens the byte stream for `port`. A TCP connect that takes longer than
/// `timeout` fails with [`P4Error::Timeout`].
pub(crate) async fn open(port: &Port, cwd: Option<&str>, timeout: Duration) -> Result<Link, P4Error> {
    match port {
        Port::Tcp { host, port } => {
            let connect = TcpStream::connect(format!("{}:{}", host, port));
            let stream = tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| P4Error::Timeout(timeout.as_millis() as u64))?
                .map_err(|e| {
                    P4Error::Connection(format!("Failed to connect to {}:{}: {}", host, port, e))
                })?;
            let (reader, writer) = stream.into_split();
            Ok(Link {
                reader: Box::new(reader),
                writer: Box::new(writer),
                child: None,
            })
        }
        Port::Rsh { command } => spawn_rsh(command, cwd),
    }
}

fn spawn_rsh(command: &str, cwd: Option<&str>) -> Result<Link, P4Error> {
    let mut cmd = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    };
    cmd.stdin(std::process::Stdio::piped())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true);

    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }

    let mut child = cmd.spawn().map_err(|e| {
        P4Error::ProcessSpawn(format!("Failed to spawn server process: {}", e))
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| P4Error::ProcessSpawn("Failed to capture stdin".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| P4Error::ProcessSpawn("Failed to capture stdout".to_string()))?;

    // Forward stderr in background
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            use tokio::io::AsyncBufReadExt;
            let reader = tokio::io::BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    tracing::debug!("[server process] {}", line);
                }
            }
        });
    }

    Ok(Link {
        reader: Box::new(stdout),
        writer: Box::new(stdin),
        child: Some(child),
    })
}
