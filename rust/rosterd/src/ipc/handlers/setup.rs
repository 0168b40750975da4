use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, workspace_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::kv::KeyValueStore;
use crate::tabular::ImportDefaults;
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    ImportDefaults,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "importDefaults" => Some(Self::ImportDefaults),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::ImportDefaults => "setup.importDefaults",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::ImportDefaults => {
            serde_json::to_value(ImportDefaults::default()).unwrap_or_else(|_| json!({}))
        }
    }
}

/// Stored section merged over the built-in defaults.
fn load_section(kv: &KeyValueStore, section: SetupSection) -> Value {
    let mut merged = default_section(section);
    let stored: Value = kv.load(section.key(), Value::Null);
    if let (Some(base), Some(over)) = (merged.as_object_mut(), stored.as_object()) {
        for (k, v) in over {
            if base.contains_key(k) {
                base.insert(k.clone(), v.clone());
            }
        }
    }
    merged
}

pub fn import_defaults(kv: &KeyValueStore) -> ImportDefaults {
    let merged = load_section(kv, SetupSection::ImportDefaults);
    match serde_json::from_value(merged) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, "stored import defaults are invalid; using built-ins");
            ImportDefaults::default()
        }
    }
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match section {
            SetupSection::ImportDefaults => match k.as_str() {
                "class" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 12)?));
                }
                "section" | "bloodGroup" | "house" | "semester" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 64)?));
                }
                "photoUrl" | "fatherPhotoUrl" | "motherPhotoUrl" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 512)?));
                }
                _ => return Err(format!("unknown importDefaults field: {}", k)),
            },
        }
    }
    Ok(())
}

fn parse_section(params: &Value) -> Result<SetupSection, HandlerErr> {
    let name = get_required_str(params, "section")?;
    SetupSection::parse(&name)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown setup section: {}", name)))
}

fn handle_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let section = parse_section(&req.params)?;
    Ok(load_section(&ws.kv, section))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let section = parse_section(&req.params)?;
    let patch = req
        .params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| HandlerErr::bad_params("missing/invalid patch"))?;

    let mut current = load_section(&ws.kv, section);
    merge_section_patch(section, &mut current, patch).map_err(|e| HandlerErr::bad_params(e))?;
    if !ws.kv.save(section.key(), &current) {
        return Err(HandlerErr::new("save_failed", "failed to persist setup section"));
    }
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let res = match req.method.as_str() {
        "setup.get" => handle_get(state, req),
        "setup.update" => handle_update(state, req),
        _ => return None,
    };
    Some(match res {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
