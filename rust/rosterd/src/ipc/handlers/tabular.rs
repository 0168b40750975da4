use crate::delivery::{date_stamp, Artifact, ArtifactSink, DirectorySink};
use crate::ipc::error::ok;
use crate::ipc::handlers::setup::import_defaults;
use crate::ipc::helpers::{get_required_str, workspace_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::sheet::{self, SheetRow};
use crate::tabular;
use anyhow::Context;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Cell text for a JSON-shaped spreadsheet row. Numbers keep their plain form.
fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn rows_from_json(params: &Value) -> Result<Vec<SheetRow>, HandlerErr> {
    let rows = params
        .get("rows")
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params("missing/invalid rows"))?;
    let mut out = Vec::with_capacity(rows.len());
    for (i, r) in rows.iter().enumerate() {
        let obj = r.as_object().ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: "each row must be an object".into(),
            details: Some(json!({ "row": i + 1 })),
        })?;
        let mut row = SheetRow::new();
        for (k, v) in obj {
            row.set(k, cell_text(v));
        }
        out.push(row);
    }
    Ok(out)
}

fn read_sheet_file(path: &str) -> anyhow::Result<Vec<SheetRow>> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path))?;
    let text = String::from_utf8(bytes).context("file is not UTF-8 text")?;
    Ok(sheet::parse_sheet(&text).keyed_rows())
}

fn handle_export_rows(state: &mut AppState) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let sheet = tabular::export_sheet(ws.students.all());
    Ok(json!({
        "columns": sheet.headers,
        "rows": sheet.rows,
    }))
}

fn handle_export_file(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let out_dir = get_required_str(&req.params, "outDir")?;
    let sheet = tabular::export_sheet(ws.students.all());
    let rows_exported = sheet.rows.len();
    let artifact = Artifact::text(
        format!("{}students_{}.csv", ws.kv.namespace(), date_stamp()),
        "text/csv;charset=utf-8",
        sheet.to_csv(),
    );
    let path = DirectorySink::new(PathBuf::from(&out_dir))
        .deliver(&artifact)
        .map_err(|e| HandlerErr {
            code: "export_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "outDir": out_dir })),
        })?;
    Ok(json!({
        "path": path.to_string_lossy(),
        "rowsExported": rows_exported,
    }))
}

fn handle_import_rows(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let rows = rows_from_json(&req.params)?;
    let defaults = import_defaults(&ws.kv);
    let summary = tabular::import_rows(&mut ws.students, &ws.kv, &rows, &defaults);
    Ok(json!(summary))
}

fn handle_import_file(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let path = get_required_str(&req.params, "path")?;
    let rows = read_sheet_file(&path).map_err(|e| {
        tracing::error!(path = %path, error = %e, "spreadsheet import failed");
        HandlerErr {
            code: "import_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "path": path })),
        }
    })?;
    let defaults = import_defaults(&ws.kv);
    let summary = tabular::import_rows(&mut ws.students, &ws.kv, &rows, &defaults);
    Ok(json!(summary))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let res = match req.method.as_str() {
        "tabular.exportRows" => handle_export_rows(state),
        "tabular.exportFile" => handle_export_file(state, req),
        "tabular.importRows" => handle_import_rows(state, req),
        "tabular.importFile" => handle_import_file(state, req),
        _ => return None,
    };
    Some(match res {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
