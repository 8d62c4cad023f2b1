use crate::db;
use crate::error::StoreError;
use crate::import::ImportError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use anyhow::Context;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Trimmed, non-empty string param.
pub fn required_str(req: &Request, key: &str) -> Result<String, Value> {
    optional_str(req, key).ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `date` param as YYYY-MM-DD, defaulting to today.
pub fn date_param(req: &Request) -> Result<String, Value> {
    match optional_str(req, "date") {
        None => Ok(db::today()),
        Some(raw) => db::parse_date_ymd(&raw).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "date must be YYYY-MM-DD",
                Some(json!({ "date": raw })),
            )
        }),
    }
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// UNIQUE/PRIMARY KEY collisions surface as `duplicate` rather than a generic failure.
pub fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

pub fn store_err(req: &Request, code: &str, e: StoreError) -> Value {
    let code = if matches!(e, StoreError::NotFound { .. }) {
        "not_found"
    } else {
        code
    };
    err(&req.id, code, e.to_string(), None)
}

pub fn import_err(req: &Request, message: &str, e: ImportError) -> Value {
    let ImportError::Store {
        completed_rows,
        source,
    } = e;
    err(
        &req.id,
        "import_failed",
        message,
        Some(json!({
            "completedRows": completed_rows,
            "cause": source.to_string(),
        })),
    )
}

/// Upload body: inline `csvText`, or a file at `inPath`.
pub fn csv_input(req: &Request) -> Result<String, Value> {
    if let Some(text) = req.params.get("csvText").and_then(|v| v.as_str()) {
        return Ok(text.to_string());
    }
    let Some(path) = optional_str(req, "inPath") else {
        return Err(err(&req.id, "bad_params", "missing csvText or inPath", None));
    };
    std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path))
        .map_err(|e| err(&req.id, "io_failed", format!("{e:#}"), None))
}

fn write_text_file(path: &Path, text: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    std::fs::write(path, text)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))?;
    Ok(())
}

/// Writes a sample file to `outPath` when given, otherwise returns the text inline.
pub fn sample_response(req: &Request, file_name: &str, text: String) -> Value {
    let Some(out) = optional_str(req, "outPath").map(PathBuf::from) else {
        return ok(&req.id, json!({ "fileName": file_name, "csv": text }));
    };
    match write_text_file(&out, &text) {
        Ok(()) => ok(
            &req.id,
            json!({ "fileName": file_name, "outPath": out.to_string_lossy() }),
        ),
        Err(e) => err(&req.id, "io_failed", format!("{e:#}"), None),
    }
}
