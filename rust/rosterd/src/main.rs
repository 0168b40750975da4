mod admin;
mod calc;
mod config;
mod db;
mod delivery;
mod ipc;
mod kv;
mod model;
mod sheet;
mod students;
mod tabular;

use std::io::{self, BufRead, Write};

fn main() {
    let cfg = config::Config::from_env();

    // stdout carries the protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_max_level(cfg.log_level)
        .with_writer(io::stderr)
        .init();

    let mut state = ipc::AppState {
        namespace: cfg.namespace.clone(),
        workspace: None,
    };

    if let Some(path) = cfg.workspace.as_ref() {
        match ipc::open_workspace(path, &cfg.namespace) {
            Ok(ws) => state.workspace = Some(ws),
            Err(e) => tracing::error!(error = %e, "failed to open configured workspace"),
        }
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "rosterd ready");

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
                tracing::warn!(error = %e, "unparseable request line");
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed; shutting down");
}
