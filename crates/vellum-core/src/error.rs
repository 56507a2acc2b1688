//! Error types for data crossing into the engine from outside.
//!
//! Engine-internal faults (missing ids, operations applied to the wrong node
//! kind, unresolved column kinds) are deliberately not errors: they resolve
//! as no-ops or explicit `None` markers so an interactive editing session can
//! never crash. `FilterError` covers only untrusted input: raw payloads and
//! operator/column codes typed in by a user.

use thiserror::Error;

/// Errors produced when parsing external filter input.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("malformed filter payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("unknown operator code: {0}")]
    UnknownOperator(String),

    #[error("unknown column code: {0}")]
    UnknownColumn(String),
}

pub type Result<T> = std::result::Result<T, FilterError>;
