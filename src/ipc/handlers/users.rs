use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, is_constraint_violation, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use rusqlite::{params_from_iter, types::Value as SqlValue};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

fn status_label(blocked: bool) -> &'static str {
    if blocked {
        "blocked"
    } else {
        "active"
    }
}

fn handle_users_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "users": [] }));
    };

    let mut sql =
        "SELECT id, email, name, class_name, faculty, blocked, status, created_at FROM users WHERE 1 = 1"
            .to_string();
    let mut binds: Vec<SqlValue> = Vec::new();
    if let Some(class_name) = optional_str(req, "className") {
        sql.push_str(" AND class_name = ?");
        binds.push(SqlValue::Text(class_name));
    }
    if let Some(faculty) = optional_str(req, "faculty") {
        sql.push_str(" AND faculty = ?");
        binds.push(SqlValue::Text(faculty));
    }
    sql.push_str(" ORDER BY created_at DESC, rowid DESC");

    let mut stmt = match conn.prepare(&sql) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map(params_from_iter(binds), |row| {
            let id: String = row.get(0)?;
            let email: String = row.get(1)?;
            let name: Option<String> = row.get(2)?;
            let class_name: String = row.get(3)?;
            let faculty: Option<String> = row.get(4)?;
            let blocked: i64 = row.get(5)?;
            let status: String = row.get(6)?;
            let created_at: String = row.get(7)?;
            Ok(json!({
                "id": id,
                "email": email,
                "name": name,
                "className": class_name,
                "faculty": faculty,
                // Either marker means blocked.
                "blocked": blocked != 0 || status == "blocked",
                "status": status,
                "createdAt": created_at,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(users) => ok(&req.id, json!({ "users": users })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

/// Records a sign-up. Accounts start active.
fn handle_users_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (email, class_name) = match (required_str(req, "email"), required_str(req, "className")) {
        (Ok(e), Ok(c)) => (e, c),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let name = optional_str(req, "name");
    let faculty = optional_str(req, "faculty");

    let user_id = Uuid::new_v4().to_string();
    match conn.execute(
        "INSERT INTO users(id, email, name, class_name, faculty, blocked, status, created_at)
         VALUES(?, ?, ?, ?, ?, 0, 'active', ?)",
        (&user_id, &email, &name, &class_name, &faculty, db::now_timestamp()),
    ) {
        Ok(_) => ok(&req.id, json!({ "userId": user_id, "email": email })),
        Err(e) if is_constraint_violation(&e) => err(
            &req.id,
            "duplicate",
            format!("user already registered: {}", email),
            None,
        ),
        Err(e) => err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "users" })),
        ),
    }
}

fn handle_users_set_blocked(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let user_id = match required_str(req, "userId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(blocked) = req.params.get("blocked").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "missing blocked", None);
    };
    let status = status_label(blocked);

    match conn.execute(
        "UPDATE users SET blocked = ?, status = ? WHERE id = ?",
        (blocked as i64, status, &user_id),
    ) {
        Ok(0) => err(&req.id, "not_found", "user not found", None),
        Ok(_) => {
            info!(user_id = %user_id, status, "user access changed");
            ok(
                &req.id,
                json!({ "userId": user_id, "blocked": blocked, "status": status }),
            )
        }
        Err(e) => err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "users" })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.list" => Some(handle_users_list(state, req)),
        "users.register" => Some(handle_users_register(state, req)),
        "users.setBlocked" => Some(handle_users_set_blocked(state, req)),
        _ => None,
    }
}
