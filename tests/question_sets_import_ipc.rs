mod test_support;

use serde_json::json;
use std::io::BufReader;
use std::process::{ChildStdin, ChildStdout};
use test_support::{request_err, request_ok, spawn_sidecar, str_field, temp_dir};

fn create_set(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    capacity: i64,
) -> String {
    let created = request_ok(
        stdin,
        reader,
        id,
        "questionSets.create",
        json!({
            "kind": "subject_test",
            "name": "Chemistry Chapter 2",
            "className": "Class 12",
            "subject": "Chemistry",
            "declaredCapacity": capacity
        }),
    );
    str_field(&created["set"], "id")
}

const HEADER: &str = "Question,Option A,Option B,Option C,Option D,Correct Answer (0-3),Marks\n";

#[test]
fn import_respects_capacity_and_recomputes_total() {
    let workspace = temp_dir("tayari-questions-capacity");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let set_id = create_set(&mut stdin, &mut reader, "2", 3);

    let first = format!("{HEADER}Q1,a,b,c,d,0,5\nQ2,a,b,c,d,1,3\n");
    let r1 = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "questionSets.importCsv",
        json!({ "setId": set_id, "csvText": first }),
    );
    assert_eq!(r1["acceptedCount"], 2);
    assert_eq!(r1["set"]["totalPoints"], 8);

    let second = format!("{HEADER}Q3,a,b,c,d,2,4\nQ4,a,b,c,d,3,9\nQ5,a,b,c,d,3,9\n");
    let r2 = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "questionSets.importCsv",
        json!({ "setId": set_id, "csvText": second }),
    );
    assert_eq!(r2["acceptedCount"], 1);
    assert_eq!(r2["truncated"], true);
    assert_eq!(r2["set"]["id"], set_id.as_str());
    assert_eq!(r2["set"]["questions"].as_array().map(|a| a.len()), Some(3));
    assert_eq!(r2["set"]["totalPoints"], 12);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn malformed_rows_are_counted_not_stored() {
    let workspace = temp_dir("tayari-questions-invalid");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let set_id = create_set(&mut stdin, &mut reader, "2", 10);

    let csv = format!(
        "{HEADER}Bad seven,a,b,c,d,7,1\nGood,a,b,c,d,2,\nBad letters,a,b,c,d,abc,1\nMissing option,a,,c,d,1,1\n"
    );
    let r = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "questionSets.importCsv",
        json!({ "setId": set_id, "csvText": csv }),
    );
    assert_eq!(r["acceptedCount"], 1);
    assert_eq!(r["errorCount"], 3);
    assert_eq!(r["truncated"], false);
    assert_eq!(r["set"]["questions"][0]["question"], "Good");
    assert_eq!(r["set"]["questions"][0]["points"], 1);
    assert_eq!(r["set"]["totalPoints"], 1);

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn multi_line_questions_and_huge_marks_import_safely() {
    let workspace = temp_dir("tayari-questions-multiline");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let set_id = create_set(&mut stdin, &mut reader, "2", 5);

    let csv = format!(
        "{HEADER}\"Line one\nline two?\",a,b,c,d,1,2\nOverflow,a,b,c,d,0,9223372036854775807\nTail,a,b,c,d,0,1\n"
    );
    let r = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "questionSets.importCsv",
        json!({ "setId": set_id, "csvText": csv }),
    );
    assert_eq!(r["acceptedCount"], 2);
    assert_eq!(r["errorCount"], 1);
    assert_eq!(r["set"]["questions"][0]["question"], "Line one\nline two?");
    assert_eq!(r["set"]["totalPoints"], 3);

    let health = request_ok(&mut stdin, &mut reader, "4", "health", json!({}));
    assert!(health.get("version").is_some());

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn import_rejects_unknown_set_and_missing_columns() {
    let workspace = temp_dir("tayari-questions-errors");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "questionSets.importCsv",
        json!({ "setId": "missing", "csvText": HEADER }),
    );
    assert_eq!(code, "not_found");

    let set_id = create_set(&mut stdin, &mut reader, "3", 5);
    let (code, error) = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "questionSets.importCsv",
        json!({ "setId": set_id, "csvText": "Question,Option A,Option B\nQ,a,b\n" }),
    );
    assert_eq!(code, "bad_params");
    assert_eq!(
        error["details"]["missing"],
        json!(["Option C", "Option D", "Correct Answer"])
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn sample_file_imports_cleanly() {
    let workspace = temp_dir("tayari-questions-sample");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let set_id = create_set(&mut stdin, &mut reader, "2", 10);

    let out = workspace.join("exports").join("sample_questions.csv");
    let sample = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "questionSets.sampleCsv",
        json!({ "outPath": out.to_string_lossy() }),
    );
    assert_eq!(sample["fileName"], "sample_questions.csv");
    assert!(out.is_file());

    let r = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "questionSets.importCsv",
        json!({ "setId": set_id, "inPath": out.to_string_lossy() }),
    );
    assert_eq!(r["acceptedCount"], 3);
    assert_eq!(r["errorCount"], 0);
    assert_eq!(r["set"]["totalPoints"], 4);

    let _ = std::fs::remove_dir_all(workspace);
}
