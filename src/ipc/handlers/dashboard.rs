use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

const COUNTED: [(&str, &str); 10] = [
    ("users", "users"),
    ("faculties", "faculties"),
    ("classes", "classes"),
    ("subjects", "subjects"),
    ("questionSets", "question_sets"),
    ("dailyMcqs", "daily_mcqs"),
    ("notices", "notices"),
    ("provinces", "provinces"),
    ("districts", "districts"),
    ("municipalities", "municipalities"),
];

fn handle_dashboard_stats(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut counts = Map::new();
    for (key, table) in COUNTED {
        match db::count_rows(conn, table) {
            Ok(n) => {
                counts.insert(key.to_string(), json!(n));
            }
            Err(e) => {
                return err(
                    &req.id,
                    "db_query_failed",
                    e.to_string(),
                    Some(json!({ "table": table })),
                )
            }
        }
    }

    ok(&req.id, json!({ "counts": counts }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "dashboard.stats" => Some(handle_dashboard_stats(state, req)),
        _ => None,
    }
}
