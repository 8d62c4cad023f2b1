mod config;
mod csv;
mod db;
mod error;
mod import;
mod ipc;
mod model;
mod store;

use clap::Parser;
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

fn main() {
    let cli = config::Cli::parse();

    // stdout carries the protocol.
    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter())
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let mut state = ipc::AppState::default();
    if let Some(path) = cli.workspace.clone() {
        if let Err(e) = state.open_workspace(path) {
            let cause = format!("{e:#}");
            warn!(error = %cause, "startup workspace could not be opened");
        }
    }
    info!("tayarid ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to answer to.
                warn!(error = %e, "unparseable request line");
                let reply = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", reply);
                let _ = stdout.flush();
                continue;
            }
        };

        debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
