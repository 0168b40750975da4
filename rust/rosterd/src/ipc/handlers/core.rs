use crate::admin::AdminControlStore;
use crate::db;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request, Workspace};
use crate::kv::KeyValueStore;
use crate::students::StudentRepository;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Open (creating if needed) the workspace database and load the stores from it.
pub fn open_workspace(path: &Path, namespace: &str) -> anyhow::Result<Workspace> {
    let conn = db::open_db(path)?;
    let kv = KeyValueStore::new(Box::new(db::SqliteStorage::new(conn)), namespace);
    let students = StudentRepository::load(&kv);
    let admin = AdminControlStore::load(&kv);
    tracing::info!(
        workspace = %path.to_string_lossy(),
        namespace,
        students = students.len(),
        "workspace opened"
    );
    Ok(Workspace {
        path: path.to_path_buf(),
        kv,
        students,
        admin,
    })
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|w| w.path.to_string_lossy().to_string()),
            "namespace": state.namespace,
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match get_required_str(&req.params, "path") {
        Ok(p) => PathBuf::from(p),
        Err(e) => return e.response(&req.id),
    };
    if let Some(ns) = req
        .params
        .get("namespace")
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        state.namespace = ns.to_string();
    }

    match open_workspace(&path, &state.namespace) {
        Ok(ws) => {
            let student_count = ws.students.len();
            state.workspace = Some(ws);
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "namespace": state.namespace,
                    "studentCount": student_count,
                }),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to open workspace");
            HandlerErr::new("db_open_failed", format!("{e:#}")).response(&req.id)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
