//! Identifier allow-list
//!
//! Table and column names arrive in request bodies and end up in SQL text.
//! Only names matching `^[A-Za-z_][A-Za-z0-9_]*$` get that far, and they are
//! always emitted double-quoted.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{ApiError, ApiResult};

/// Columns used when a request names none
pub const DEFAULT_COLUMNS: [&str; 7] = [
    "id",
    "user_identifier",
    "sender",
    "admin_name",
    "message",
    "file",
    "created_at",
];

fn ident_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid identifier regex"))
}

pub fn is_valid_ident(name: &str) -> bool {
    ident_regex().is_match(name)
}

/// Reject anything outside the allow-list; `kind` names it in the error
pub fn validate_ident(name: &str, kind: &str) -> ApiResult<()> {
    if is_valid_ident(name) {
        Ok(())
    } else {
        Err(ApiError::invalid(format!("Invalid {kind}")))
    }
}

/// Trimmed table name, falling back to `default` when absent or blank
pub fn resolve_table(requested: Option<&str>, default: &str) -> ApiResult<String> {
    let table = requested
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(default);
    validate_ident(table, "table")?;
    Ok(table.to_string())
}

/// Requested columns in order, or the default schema when none were given
pub fn resolve_columns(requested: Option<Vec<String>>) -> ApiResult<Vec<String>> {
    let columns = match requested {
        Some(cols) if !cols.is_empty() => cols,
        _ => DEFAULT_COLUMNS.iter().map(ToString::to_string).collect(),
    };
    for column in &columns {
        validate_ident(column, "column")?;
    }
    Ok(columns)
}

/// Quote an already validated identifier
pub fn quote(name: &str) -> String {
    debug_assert!(is_valid_ident(name));
    format!("\"{name}\"")
}
