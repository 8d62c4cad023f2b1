//! CSV-driven bulk importers.
//!
//! Both importers are permissive per row: malformed rows are counted and skipped, never
//! raised. Only the store can fail a run.

pub mod hierarchy;
pub mod questions;

use crate::error::StoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub accepted_count: usize,
    pub error_count: usize,
    pub truncated: bool,
}

#[derive(Debug, Error)]
pub enum ImportError {
    /// For the hierarchy importer `completed_rows` counts the rows fully written before the
    /// failure; skipped rows are not included. The question importer reports 0 and commits
    /// nothing.
    #[error("store rejected the import after {completed_rows} rows: {source}")]
    Store {
        completed_rows: usize,
        #[source]
        source: StoreError,
    },
}
