use crate::admin;
use crate::delivery::{ArtifactSink, DirectorySink};
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, workspace_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn export_failed(out_dir: &str, e: anyhow::Error) -> HandlerErr {
    tracing::error!(out_dir, error = %e, "export failed");
    HandlerErr {
        code: "export_failed",
        message: format!("{e:#}"),
        details: Some(json!({ "outDir": out_dir })),
    }
}

fn handle_sections_get(state: &mut AppState) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    Ok(json!({ "sections": ws.admin.visibility() }))
}

fn handle_sections_toggle(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let section = get_required_str(&req.params, "section")?;
    let visible = ws
        .admin
        .toggle(&ws.kv, &section)
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    Ok(json!({
        "section": section,
        "visible": visible,
        "sections": ws.admin.visibility(),
    }))
}

fn handle_export_csv(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let out_dir = get_required_str(&req.params, "outDir")?;
    let artifact = admin::export_csv(ws.students.all());
    let path = DirectorySink::new(&out_dir)
        .deliver(&artifact)
        .map_err(|e| export_failed(&out_dir, e))?;
    Ok(json!({
        "path": path.to_string_lossy(),
        "rowsExported": ws.students.len(),
    }))
}

fn handle_export_backup(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let out_dir = get_required_str(&req.params, "outDir")?;
    let artifact = admin::export_backup(&ws.kv).map_err(|e| export_failed(&out_dir, e))?;
    let path = DirectorySink::new(&out_dir)
        .deliver(&artifact)
        .map_err(|e| export_failed(&out_dir, e))?;
    Ok(json!({
        "path": path.to_string_lossy(),
        "keys": ws.kv.keys().len(),
        "totalStudents": ws.students.len(),
    }))
}

fn handle_dashboard(state: &mut AppState) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let stats = admin::dashboard(ws.students.all(), ws.admin.visibility());
    Ok(json!(stats))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let res = match req.method.as_str() {
        "admin.sections.get" => handle_sections_get(state),
        "admin.sections.toggle" => handle_sections_toggle(state, req),
        "admin.exportCsv" => handle_export_csv(state, req),
        "admin.exportBackup" => handle_export_backup(state, req),
        "admin.dashboard" => handle_dashboard(state),
        _ => return None,
    };
    Some(match res {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
