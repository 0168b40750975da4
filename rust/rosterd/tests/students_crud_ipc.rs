use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_rosterd");
    let mut child = Command::new(exe)
        .env_remove("ROSTERD_WORKSPACE")
        .env_remove("ROSTERD_NAMESPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn rosterd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn student_json(name: &str, class_num: i64, roll: &str, pct: Option<f64>) -> serde_json::Value {
    let academic = match pct {
        Some(p) => json!([{
            "semester": "Mid-Term 2024",
            "subjects": [{ "name": "Mathematics", "marks": p, "grade": "A1" }],
            "percentage": p,
            "grade": "A1"
        }]),
        None => json!([]),
    };
    json!({
        "name": name,
        "class": class_num,
        "section": "A",
        "rollNumber": roll,
        "dateOfBirth": "2010-01-15",
        "bloodGroup": "B+",
        "house": "Shiwalik",
        "address": "Main Road",
        "identificationMark": "",
        "hobbies": ["reading"],
        "achievements": [],
        "photo": "",
        "parentDetails": {
            "father": { "name": format!("{} Sr", name), "occupation": "", "contact": "", "email": "", "photo": "" },
            "mother": { "name": "", "occupation": "", "contact": "", "email": "", "photo": "" },
            "emergencyContact": "100"
        },
        "academicRecords": academic
    })
}

fn names(list: &serde_json::Value) -> Vec<String> {
    list.get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
        .iter()
        .filter_map(|s| s.get("name").and_then(|v| v.as_str()).map(|s| s.to_string()))
        .collect()
}

#[test]
fn create_update_delete_and_query() {
    let workspace = temp_dir("rosterd-students-crud");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let (s, r) = (&mut stdin, &mut reader);

    let _ = request_ok(s, r, "1", "workspace.select", json!({ "path": workspace.to_string_lossy() }));

    let meera = request_ok(
        s,
        r,
        "2",
        "students.create",
        json!({ "student": student_json("Meera", 8, "8A-01", Some(80.0)) }),
    );
    let meera_id = meera
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();
    let _ = request_ok(
        s,
        r,
        "3",
        "students.create",
        json!({ "student": student_json("Arjun", 8, "8A-02", Some(95.0)) }),
    );
    let _ = request_ok(
        s,
        r,
        "4",
        "students.create",
        json!({ "student": student_json("Kabir", 6, "6A-01", None) }),
    );

    let all = request_ok(s, r, "5", "students.list", json!({}));
    assert_eq!(all.get("total").and_then(|v| v.as_u64()), Some(3));
    assert_eq!(names(&all), vec!["Arjun", "Kabir", "Meera"]);

    let by_perf = request_ok(s, r, "6", "students.list", json!({ "sortBy": "performance" }));
    assert_eq!(names(&by_perf), vec!["Arjun", "Meera", "Kabir"]);

    let class_eight = request_ok(
        s,
        r,
        "7",
        "students.list",
        json!({ "classFilter": "8", "search": "meera sr" }),
    );
    assert_eq!(names(&class_eight), vec!["Meera"]);
    assert_eq!(class_eight.get("matched").and_then(|v| v.as_u64()), Some(1));

    let classes = request_ok(s, r, "8", "students.classes", json!({}));
    assert_eq!(classes.get("classes"), Some(&json!([6, 8])));

    let upd = request_ok(
        s,
        r,
        "9",
        "students.update",
        json!({ "studentId": meera_id, "patch": { "house": "Nilgiri" } }),
    );
    assert_eq!(upd.get("updated").and_then(|v| v.as_bool()), Some(true));
    let got = request_ok(s, r, "10", "students.get", json!({ "studentId": meera_id }));
    let student = got.get("student").expect("student");
    assert_eq!(student.get("house").and_then(|v| v.as_str()), Some("Nilgiri"));
    assert_eq!(student.get("rollNumber").and_then(|v| v.as_str()), Some("8A-01"));
    assert_eq!(student.get("bloodGroup").and_then(|v| v.as_str()), Some("B+"));

    let missing = request_ok(
        s,
        r,
        "11",
        "students.update",
        json!({ "studentId": "nope", "patch": { "house": "Nilgiri" } }),
    );
    assert_eq!(missing.get("updated").and_then(|v| v.as_bool()), Some(false));

    let bad = request(
        s,
        r,
        "12",
        "students.update",
        json!({ "studentId": meera_id, "patch": { "class": "eight" } }),
    );
    assert_eq!(bad.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        bad.get("error").and_then(|e| e.get("code")).and_then(|v| v.as_str()),
        Some("bad_params")
    );

    let del = request_ok(s, r, "13", "students.delete", json!({ "studentId": meera_id }));
    assert_eq!(del.get("deleted").and_then(|v| v.as_bool()), Some(true));
    let again = request_ok(s, r, "14", "students.delete", json!({ "studentId": meera_id }));
    assert_eq!(again.get("deleted").and_then(|v| v.as_bool()), Some(false));

    let after = request_ok(s, r, "15", "students.list", json!({}));
    assert_eq!(after.get("total").and_then(|v| v.as_u64()), Some(2));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn roster_survives_restart() {
    let workspace = temp_dir("rosterd-students-restart");
    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "students.create",
            json!({ "student": student_json("Asha", 7, "7B-04", Some(72.5)) }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(opened.get("studentCount").and_then(|v| v.as_u64()), Some(1));
    let list = request_ok(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(names(&list), vec!["Asha"]);

    let _ = std::fs::remove_dir_all(workspace);
}
