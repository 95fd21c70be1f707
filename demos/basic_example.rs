// Copyright (c) Microsoft Corporation. All rights reserved.

//! Basic example demonstrating the P4 SDK for Rust.
//!
//! This example shows how to:
//! - Configure a session from the environment and connect
//! - Run commands and read tagged records
//! - Stream output through a handler
//! - Fetch and edit a client workspace spec
//! - Translate paths through the workspace view
//!
//! Set `RUST_LOG=p4_sdk=debug` to see the session's logging.

use p4_sdk::*;
use tracing_subscriber::EnvFilter;

/// Prints depot files as they stream in instead of buffering them.
struct PrintFiles {
    count: usize,
}

impl OutputHandler for PrintFiles {
    fn output_stat(&mut self, record: &Record) -> HandlerResult {
        self.count += 1;
        println!(
            "  {}#{}",
            record.get_str("depotFile").unwrap_or("?"),
            record.get("rev").map(ToString::to_string).unwrap_or_default()
        );
        if self.count >= 20 {
            HandlerResult::Cancel
        } else {
            HandlerResult::Handled
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), P4Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // ========================================================================
    // 1. Create and connect the session
    // ========================================================================
    let mut config = P4Config::from_env()?;
    config.prog = "basic_example".to_string();
    config.port.get_or_insert_with(|| "localhost:1666".to_string());

    let mut p4 = P4Client::new(config);
    println!("Connecting to {}...", p4.port().unwrap_or("?"));
    p4.connect().await?;
    println!(
        "Connected (server level {:?}, unicode: {})",
        p4.server_level(),
        p4.server_unicode()
    );

    // ========================================================================
    // 2. Run a command
    // ========================================================================
    let info = p4.run_info().await?;
    for record in info.records() {
        println!("\nServer root: {}", record.get_str("serverRoot").unwrap_or("?"));
        println!("Client root: {}", record.get_str("clientRoot").unwrap_or("?"));
    }

    // Warnings such as "file(s) up-to-date" should not abort the script
    p4.set_exception_level(ExceptionLevel::RaiseErrors);
    let sync = p4.run("sync", &["-n"]).await?;
    for warning in &sync.warnings {
        println!("warning: {}", warning);
    }

    // ========================================================================
    // 3. Stream output through a handler
    // ========================================================================
    println!("\nFirst files in the depot:");
    p4.set_handler(PrintFiles { count: 0 });
    match p4.run("files", &["//..."]).await {
        Ok(_) => {}
        Err(P4Error::Cancelled { .. }) => println!("  (stopped after 20 files)"),
        Err(e) => return Err(e),
    }
    p4.clear_handler();

    // ========================================================================
    // 4. Edit the client workspace spec
    // ========================================================================
    let mut client = p4.fetch_client(None).await?;
    println!("\n{}", client);

    let view = ViewMap::from_lines(client.view().unwrap_or_default())?;
    if let Some(local) = view.translate("//depot/main/README", Direction::LeftToRight) {
        println!("//depot/main/README maps to {}", local);
    }

    client.set_description("Workspace touched by basic_example.\n")?;
    let saved = p4.save_client(&client).await?;
    for line in saved.info() {
        println!("{}", line);
    }

    // ========================================================================
    // 5. Clean up
    // ========================================================================
    p4.disconnect().await;
    println!("\nDisconnected.");

    Ok(())
}
