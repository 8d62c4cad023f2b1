use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, is_constraint_violation, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::{params_from_iter, types::Value as SqlValue, OptionalExtension};
use serde_json::json;
use uuid::Uuid;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };

    // Subjects and question sets refer to classes by name.
    let mut stmt = match conn.prepare(
        "SELECT
           c.id,
           c.name,
           c.faculty,
           (SELECT COUNT(*) FROM subjects s WHERE s.class_name = c.name) AS subject_count,
           (SELECT COUNT(*) FROM question_sets qs WHERE qs.class_name = c.name) AS set_count
         FROM classes c
         ORDER BY c.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let faculty: Option<String> = row.get(2)?;
            let subject_count: i64 = row.get(3)?;
            let set_count: i64 = row.get(4)?;
            Ok(json!({
                "id": id,
                "name": name,
                "faculty": faculty,
                "subjectCount": subject_count,
                "questionSetCount": set_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(classes) => ok(&req.id, json!({ "classes": classes })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let faculty = optional_str(req, "faculty");

    let class_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO classes(id, name, faculty, created_at) VALUES(?, ?, ?, ?)",
        (&class_id, &name, &faculty, db::now_timestamp()),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }

    ok(&req.id, json!({ "classId": class_id, "name": name }))
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match conn.execute("DELETE FROM classes WHERE id = ?", [&class_id]) {
        Ok(0) => err(&req.id, "not_found", "class not found", None),
        Ok(_) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        ),
    }
}

/// Patch: `name` replaces when given; `faculty` replaces when the key is present and clears
/// when it is null or blank.
fn handle_classes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let current = conn
        .query_row(
            "SELECT name, faculty FROM classes WHERE id = ?",
            [&class_id],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, Option<String>>(1)?)),
        )
        .optional();
    let (name, faculty) = match current {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "not_found", "class not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let name = optional_str(req, "name").unwrap_or(name);
    let faculty = if req.params.get("faculty").is_some() {
        optional_str(req, "faculty")
    } else {
        faculty
    };

    if let Err(e) = conn.execute(
        "UPDATE classes SET name = ?, faculty = ? WHERE id = ?",
        (&name, &faculty, &class_id),
    ) {
        return err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }

    ok(
        &req.id,
        json!({ "classId": class_id, "name": name, "faculty": faculty }),
    )
}

fn handle_faculties_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "faculties": [] }));
    };

    let mut stmt = match conn.prepare("SELECT id, name FROM faculties ORDER BY name") {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            Ok(json!({ "id": id, "name": name }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(faculties) => ok(&req.id, json!({ "faculties": faculties })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_faculties_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let faculty_id = Uuid::new_v4().to_string();
    match conn.execute(
        "INSERT INTO faculties(id, name, created_at) VALUES(?, ?, ?)",
        (&faculty_id, &name, db::now_timestamp()),
    ) {
        Ok(_) => ok(&req.id, json!({ "facultyId": faculty_id, "name": name })),
        Err(e) if is_constraint_violation(&e) => err(
            &req.id,
            "duplicate",
            format!("faculty already exists: {}", name),
            None,
        ),
        Err(e) => err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "faculties" })),
        ),
    }
}

fn handle_faculties_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (faculty_id, name) = match (required_str(req, "facultyId"), required_str(req, "name")) {
        (Ok(id), Ok(n)) => (id, n),
        (Err(e), _) | (_, Err(e)) => return e,
    };

    match conn.execute(
        "UPDATE faculties SET name = ? WHERE id = ?",
        (&name, &faculty_id),
    ) {
        Ok(0) => err(&req.id, "not_found", "faculty not found", None),
        Ok(_) => ok(&req.id, json!({ "facultyId": faculty_id, "name": name })),
        Err(e) if is_constraint_violation(&e) => err(
            &req.id,
            "duplicate",
            format!("faculty already exists: {}", name),
            None,
        ),
        Err(e) => err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "faculties" })),
        ),
    }
}

fn handle_faculties_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let faculty_id = match required_str(req, "facultyId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match conn.execute("DELETE FROM faculties WHERE id = ?", [&faculty_id]) {
        Ok(0) => err(&req.id, "not_found", "faculty not found", None),
        Ok(_) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "faculties" })),
        ),
    }
}

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "subjects": [] }));
    };

    let mut sql = "SELECT id, name, class_name FROM subjects".to_string();
    let mut binds: Vec<SqlValue> = Vec::new();
    if let Some(class_name) = optional_str(req, "className") {
        sql.push_str(" WHERE class_name = ?");
        binds.push(SqlValue::Text(class_name));
    }
    sql.push_str(" ORDER BY name");

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(binds), |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let class_name: String = row.get(2)?;
            Ok(json!({ "id": id, "name": name, "className": class_name }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (name, class_name) = match (required_str(req, "name"), required_str(req, "className")) {
        (Ok(n), Ok(c)) => (n, c),
        (Err(e), _) | (_, Err(e)) => return e,
    };

    let subject_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO subjects(id, name, class_name, created_at) VALUES(?, ?, ?, ?)",
        (&subject_id, &name, &class_name, db::now_timestamp()),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "subjects" })),
        );
    }

    ok(
        &req.id,
        json!({ "subjectId": subject_id, "name": name, "className": class_name }),
    )
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match conn.execute("DELETE FROM subjects WHERE id = ?", [&subject_id]) {
        Ok(0) => err(&req.id, "not_found", "subject not found", None),
        Ok(_) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "subjects" })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.update" => Some(handle_classes_update(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        "faculties.list" => Some(handle_faculties_list(state, req)),
        "faculties.create" => Some(handle_faculties_create(state, req)),
        "faculties.update" => Some(handle_faculties_update(state, req)),
        "faculties.delete" => Some(handle_faculties_delete(state, req)),
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.create" => Some(handle_subjects_create(state, req)),
        "subjects.delete" => Some(handle_subjects_delete(state, req)),
        _ => None,
    }
}
