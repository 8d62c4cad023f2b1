//! JSON-lines request/response protocol.
//!
//! Each stdin line is `{id, method, params}`; each reply is `{id, ok: true, result}` or
//! `{id, ok: false, error: {code, message, details?}}`.

mod error;
mod handlers;
mod helpers;
mod router;
mod types;

pub use router::handle_request;
pub use types::{AppState, Request};
