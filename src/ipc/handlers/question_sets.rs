use crate::csv;
use crate::import::questions::{import_questions, QuestionRow};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    csv_input, db_conn, import_err, optional_str, required_str, sample_response, store_err,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{total_points, QuestionRecord, QuestionSet, SetKind, TEST_PREP_CATEGORIES};
use crate::store::{NewQuestionSet, SetFilter, SqliteStore, Store};
use serde_json::json;
use tracing::info;

const DEFAULT_DURATION_MINUTES: i64 = 60;

fn load_set(store: &SqliteStore<'_>, req: &Request) -> Result<QuestionSet, serde_json::Value> {
    let set_id = required_str(req, "setId")?;
    match store.read_question_set(&set_id) {
        Ok(Some(set)) => Ok(set),
        Ok(None) => Err(err(
            &req.id,
            "not_found",
            "question set not found",
            Some(json!({ "setId": set_id })),
        )),
        Err(e) => Err(store_err(req, "db_query_failed", e)),
    }
}

fn handle_sets_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "sets": [] }));
    };
    let kind = match optional_str(req, "kind") {
        None => None,
        Some(raw) => match SetKind::parse(&raw) {
            Some(k) => Some(k),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "kind must be subject_test or test_prep",
                    None,
                )
            }
        },
    };
    let filter = SetFilter {
        kind,
        class_name: optional_str(req, "className"),
        category: optional_str(req, "category").map(|c| c.to_ascii_lowercase()),
    };

    match SqliteStore::new(conn).list_question_sets(&filter) {
        Ok(sets) => ok(&req.id, json!({ "sets": sets })),
        Err(e) => store_err(req, "db_query_failed", e),
    }
}

/// Validates create params into a new set; the error is a ready IPC response.
fn new_set_from_params(req: &Request) -> Result<NewQuestionSet, serde_json::Value> {
    let kind_raw = required_str(req, "kind")?;
    let Some(kind) = SetKind::parse(&kind_raw) else {
        return Err(err(
            &req.id,
            "bad_params",
            "kind must be subject_test or test_prep",
            None,
        ));
    };
    let name = required_str(req, "name")?;
    let declared_capacity = match req.params.get("declaredCapacity").and_then(|v| v.as_i64()) {
        Some(n) if n >= 1 => n,
        _ => {
            return Err(err(
                &req.id,
                "bad_params",
                "declaredCapacity must be a positive integer",
                None,
            ))
        }
    };

    match kind {
        SetKind::SubjectTest => Ok(NewQuestionSet {
            kind,
            name,
            class_name: Some(required_str(req, "className")?),
            subject: Some(required_str(req, "subject")?),
            category: None,
            duration_minutes: None,
            declared_capacity,
        }),
        SetKind::TestPrep => {
            let category = required_str(req, "category")?.to_ascii_lowercase();
            if !TEST_PREP_CATEGORIES.contains(&category.as_str()) {
                return Err(err(
                    &req.id,
                    "bad_params",
                    "unknown test category",
                    Some(json!({ "allowed": TEST_PREP_CATEGORIES })),
                ));
            }
            let duration_minutes = match req.params.get("durationMinutes") {
                None => DEFAULT_DURATION_MINUTES,
                Some(v) if v.is_null() => DEFAULT_DURATION_MINUTES,
                Some(v) => match v.as_i64() {
                    Some(n) if n > 0 => n,
                    _ => {
                        return Err(err(
                            &req.id,
                            "bad_params",
                            "durationMinutes must be a positive integer",
                            None,
                        ))
                    }
                },
            };
            Ok(NewQuestionSet {
                kind,
                name,
                class_name: optional_str(req, "className"),
                subject: None,
                category: Some(category),
                duration_minutes: Some(duration_minutes),
                declared_capacity,
            })
        }
    }
}

fn handle_sets_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let new_set = match new_set_from_params(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match SqliteStore::new(conn).create_question_set(&new_set) {
        Ok(set) => {
            info!(set_id = %set.id, kind = set.kind.as_str(), "question set created");
            ok(&req.id, json!({ "set": set }))
        }
        Err(e) => store_err(req, "db_insert_failed", e),
    }
}

fn handle_sets_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match load_set(&SqliteStore::new(conn), req) {
        Ok(set) => ok(&req.id, json!({ "set": set })),
        Err(e) => e,
    }
}

fn handle_sets_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let set_id = match required_str(req, "setId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match SqliteStore::new(conn).delete_question_set(&set_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => store_err(req, "db_delete_failed", e),
    }
}

fn question_param(req: &Request) -> Result<QuestionRecord, serde_json::Value> {
    let Some(raw) = req.params.get("question") else {
        return Err(err(&req.id, "bad_params", "missing question", None));
    };
    QuestionRecord::from_json(raw).map_err(|msg| err(&req.id, "bad_params", msg, None))
}

fn handle_add_question(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut store = SqliteStore::new(conn);
    let set = match load_set(&store, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let question = match question_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if set.remaining_capacity() == 0 {
        return err(
            &req.id,
            "set_full",
            "question set is already full",
            Some(json!({ "declaredCapacity": set.declared_capacity })),
        );
    }

    let mut questions = set.questions;
    questions.push(question);
    let total = total_points(&questions);
    if let Err(e) = store.update_question_set(&set.id, &questions, total) {
        return store_err(req, "db_update_failed", e);
    }

    ok(
        &req.id,
        json!({
            "setId": set.id,
            "questionCount": questions.len(),
            "totalPoints": total,
        }),
    )
}

fn handle_update_question(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut store = SqliteStore::new(conn);
    let set = match load_set(&store, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let index = match req
        .params
        .get("index")
        .and_then(|v| v.as_u64())
        .map(usize::try_from)
    {
        Some(Ok(i)) => i,
        Some(Err(_)) => return err(&req.id, "bad_params", "index out of range", None),
        None => return err(&req.id, "bad_params", "missing index", None),
    };
    let question = match question_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let mut questions = set.questions;
    let count = questions.len();
    let Some(slot) = questions.get_mut(index) else {
        return err(
            &req.id,
            "bad_params",
            "question index out of range",
            Some(json!({ "index": index, "questionCount": count })),
        );
    };
    *slot = question;
    let total = total_points(&questions);
    if let Err(e) = store.update_question_set(&set.id, &questions, total) {
        return store_err(req, "db_update_failed", e);
    }

    ok(&req.id, json!({ "setId": set.id, "totalPoints": total }))
}

fn handle_sets_import_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut store = SqliteStore::new(conn);
    let set = match load_set(&store, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let text = match csv_input(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let table = csv::parse_table(&text);
    let mut missing = table.missing_headers(&csv::QUESTION_HEADERS[..5]);
    if !table.has_header_prefix("Correct Answer") {
        missing.push("Correct Answer");
    }
    if !missing.is_empty() {
        return err(
            &req.id,
            "bad_params",
            "csv is missing required columns",
            Some(json!({ "missing": missing })),
        );
    }
    let rows = table
        .rows
        .iter()
        .map(QuestionRow::from_csv)
        .collect::<Vec<_>>();

    let summary = match import_questions(&mut store, &set, &rows) {
        Ok(v) => v,
        Err(e) => return import_err(req, "Failed to import questions", e),
    };
    let updated = match load_set(&store, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    ok(
        &req.id,
        json!({
            "acceptedCount": summary.accepted_count,
            "errorCount": summary.error_count,
            "truncated": summary.truncated,
            "set": updated,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "questionSets.list" => Some(handle_sets_list(state, req)),
        "questionSets.create" => Some(handle_sets_create(state, req)),
        "questionSets.get" => Some(handle_sets_get(state, req)),
        "questionSets.delete" => Some(handle_sets_delete(state, req)),
        "questionSets.addQuestion" => Some(handle_add_question(state, req)),
        "questionSets.updateQuestion" => Some(handle_update_question(state, req)),
        "questionSets.importCsv" => Some(handle_sets_import_csv(state, req)),
        "questionSets.sampleCsv" => Some(sample_response(
            req,
            "sample_questions.csv",
            csv::question_sample_csv(),
        )),
        _ => None,
    }
}
