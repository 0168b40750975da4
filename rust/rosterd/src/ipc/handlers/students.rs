use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_str, workspace_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::StudentRecord;
use crate::students::{SortKey, StudentQuery};
use serde_json::{json, Value};

fn parse_query(params: &Value) -> Result<StudentQuery, HandlerErr> {
    let search = params
        .get("search")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    // The site sends the class filter as a string, with "" meaning all classes.
    let class_filter = match params.get("classFilter") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(
            n.as_i64()
                .ok_or_else(|| HandlerErr::bad_params("classFilter must be an integer"))?,
        ),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(
            s.trim()
                .parse::<i64>()
                .map_err(|_| HandlerErr::bad_params("classFilter must be an integer"))?,
        ),
        Some(_) => return Err(HandlerErr::bad_params("classFilter must be an integer")),
    };

    let sort_by = match params.get("sortBy").and_then(|v| v.as_str()) {
        None => SortKey::default(),
        Some(s) => SortKey::parse(s).ok_or_else(|| {
            HandlerErr::bad_params("sortBy must be one of: name, class, performance")
        })?,
    };

    Ok(StudentQuery {
        search,
        class_filter,
        sort_by,
    })
}

fn handle_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let query = parse_query(&req.params)?;
    let matched = ws.students.query(&query);
    Ok(json!({
        "students": matched,
        "matched": matched.len(),
        "total": ws.students.len(),
    }))
}

fn handle_get(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let id = get_required_str(&req.params, "studentId")?;
    let student = ws
        .students
        .get(&id)
        .ok_or_else(|| HandlerErr::new("not_found", "student not found"))?;
    Ok(json!({ "student": student }))
}

fn handle_classes(state: &mut AppState) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    Ok(json!({ "classes": ws.students.classes() }))
}

fn handle_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let raw = req
        .params
        .get("student")
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params("missing student"))?;
    let record: StudentRecord = serde_json::from_value(raw)
        .map_err(|e| HandlerErr::bad_params(format!("invalid student: {}", e)))?;
    if !record.id.is_empty() && ws.students.get(&record.id).is_some() {
        return Err(HandlerErr {
            code: "conflict",
            message: "a student with this id already exists".into(),
            details: Some(json!({ "studentId": record.id })),
        });
    }
    let student_id = ws.students.add(&ws.kv, record);
    Ok(json!({ "studentId": student_id }))
}

fn handle_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let id = get_required_str(&req.params, "studentId")?;
    let patch = req
        .params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| HandlerErr::bad_params("missing/invalid patch"))?;
    let updated = ws
        .students
        .update(&ws.kv, &id, patch)
        .map_err(|e| HandlerErr::bad_params(format!("{e:#}")))?;
    Ok(json!({ "updated": updated }))
}

fn handle_delete(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let ws = workspace_mut(state)?;
    let id = get_required_str(&req.params, "studentId")?;
    let deleted = ws.students.delete(&ws.kv, &id);
    Ok(json!({ "deleted": deleted }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let res = match req.method.as_str() {
        "students.list" => handle_list(state, req),
        "students.get" => handle_get(state, req),
        "students.classes" => handle_classes(state),
        "students.create" => handle_create(state, req),
        "students.update" => handle_update(state, req),
        "students.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(match res {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
