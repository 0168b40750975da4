use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, workspace_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

fn handle_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let key = get_required_str(&req.params, "key")?;
    let value = req
        .params
        .get("value")
        .ok_or_else(|| HandlerErr::bad_params("missing value"))?;
    let saved = ws.kv.save(&key, value);
    Ok(json!({ "saved": saved }))
}

fn handle_load(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let key = get_required_str(&req.params, "key")?;
    let default = req.params.get("default").cloned().unwrap_or(Value::Null);
    let value: Value = ws.kv.load(&key, default);
    Ok(json!({ "value": value }))
}

fn handle_clear(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let key = get_required_str(&req.params, "key")?;
    ws.kv.clear(&key);
    Ok(json!({ "cleared": true }))
}

fn handle_keys(state: &mut AppState) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    Ok(json!({ "keys": ws.kv.keys() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let res = match req.method.as_str() {
        "kv.save" => handle_save(state, req),
        "kv.load" => handle_load(state, req),
        "kv.clear" => handle_clear(state, req),
        "kv.keys" => handle_keys(state),
        _ => return None,
    };
    Some(match res {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
