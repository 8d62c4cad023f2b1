use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("malformed stored record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0} requires a parent id")]
    MissingParent(&'static str),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}
