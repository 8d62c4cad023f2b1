use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{date_param, db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::QuestionRecord;
use serde_json::json;
use uuid::Uuid;

fn handle_mcqs_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_name = match required_str(req, "className") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut stmt = match conn.prepare(
        "SELECT id, question, options_json, answer, points, date, enabled
         FROM daily_mcqs
         WHERE class_name = ?
         ORDER BY date DESC, created_at DESC",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let rows = stmt
        .query_map([&class_name], |row| {
            let id: String = row.get(0)?;
            let question: String = row.get(1)?;
            let options_json: String = row.get(2)?;
            let answer: i64 = row.get(3)?;
            let points: i64 = row.get(4)?;
            let date: String = row.get(5)?;
            let enabled: i64 = row.get(6)?;
            let options: serde_json::Value =
                serde_json::from_str(&options_json).unwrap_or_else(|_| json!([]));
            Ok(json!({
                "id": id,
                "className": class_name,
                "question": question,
                "options": options,
                "answer": answer,
                "points": points,
                "date": date,
                "enabled": enabled != 0,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(mcqs) => ok(&req.id, json!({ "mcqs": mcqs })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_mcqs_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_name = match required_str(req, "className") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(raw_question) = req.params.get("question") else {
        return err(&req.id, "bad_params", "missing question", None);
    };
    let question = match QuestionRecord::from_json(raw_question) {
        Ok(q) => q,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };
    let date = match date_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let options_json = match serde_json::to_string(&question.options) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    let mcq_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO daily_mcqs(id, class_name, question, options_json, answer, points, date, enabled, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, 1, ?)",
        (
            &mcq_id,
            &class_name,
            &question.question,
            &options_json,
            question.answer as i64,
            question.points,
            &date,
            db::now_timestamp(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "daily_mcqs" })),
        );
    }

    ok(&req.id, json!({ "mcqId": mcq_id, "date": date }))
}

fn handle_mcqs_set_enabled(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mcq_id = match required_str(req, "mcqId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(enabled) = req.params.get("enabled").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "missing enabled", None);
    };

    match conn.execute(
        "UPDATE daily_mcqs SET enabled = ? WHERE id = ?",
        (enabled as i64, &mcq_id),
    ) {
        Ok(0) => err(&req.id, "not_found", "daily mcq not found", None),
        Ok(_) => ok(&req.id, json!({ "mcqId": mcq_id, "enabled": enabled })),
        Err(e) => err(
            &req.id,
            "db_update_failed",
            e.to_string(),
            Some(json!({ "table": "daily_mcqs" })),
        ),
    }
}

fn handle_mcqs_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mcq_id = match required_str(req, "mcqId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match conn.execute("DELETE FROM daily_mcqs WHERE id = ?", [&mcq_id]) {
        Ok(0) => err(&req.id, "not_found", "daily mcq not found", None),
        Ok(_) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(
            &req.id,
            "db_delete_failed",
            e.to_string(),
            Some(json!({ "table": "daily_mcqs" })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dailyMcqs.list" => Some(handle_mcqs_list(state, req)),
        "dailyMcqs.create" => Some(handle_mcqs_create(state, req)),
        "dailyMcqs.setEnabled" => Some(handle_mcqs_set_enabled(state, req)),
        "dailyMcqs.delete" => Some(handle_mcqs_delete(state, req)),
        _ => None,
    }
}
