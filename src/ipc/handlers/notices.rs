use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{date_param, db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use uuid::Uuid;

fn handle_notices_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "notices": [] }));
    };

    let mut stmt = match conn.prepare(
        "SELECT id, title, description, date
         FROM notices
         ORDER BY date DESC, created_at DESC",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let title: String = row.get(1)?;
            let description: String = row.get(2)?;
            let date: String = row.get(3)?;
            Ok(json!({
                "id": id,
                "title": title,
                "description": description,
                "date": date,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(notices) => ok(&req.id, json!({ "notices": notices })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_notices_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (title, description) = match (required_str(req, "title"), required_str(req, "description"))
    {
        (Ok(t), Ok(d)) => (t, d),
        (Err(e), _) | (_, Err(e)) => return e,
    };
    let date = match date_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let notice_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO notices(id, title, description, date, created_at) VALUES(?, ?, ?, ?, ?)",
        (&notice_id, &title, &description, &date, db::now_timestamp()),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "notices" })),
        );
    }

    ok(&req.id, json!({ "noticeId": notice_id, "date": date }))
}

fn handle_notices_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let notice_id = match required_str(req, "noticeId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match conn.execute("DELETE FROM notices WHERE id = ?", [&notice_id]) {
        Ok(0) => err(&req.id, "not_found", "notice not found", None),
        Ok(_) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "notices" })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "notices.list" => Some(handle_notices_list(state, req)),
        "notices.create" => Some(handle_notices_create(state, req)),
        "notices.delete" => Some(handle_notices_delete(state, req)),
        _ => None,
    }
}
