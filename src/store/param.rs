//! Typed bind parameters
//!
//! Request values arrive as JSON strings while the table is defined by the
//! caller. Each value is converted to the type Postgres inferred for its
//! placeholder, so a `bigint` or `uuid` column accepts `"42"` or a uuid
//! string the same way a literal would.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::types::BigDecimal;
use sqlx::Postgres;
use uuid::Uuid;

use super::insert::FieldValue;
use crate::error::{ApiError, ApiResult};
use crate::timefmt;

/// A value ready to bind, already in the placeholder's type
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Numeric(BigDecimal),
    Bool(bool),
    Uuid(Uuid),
    Json(Value),
    Timestamptz(DateTime<Utc>),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Bytes(Option<Vec<u8>>),
}

fn mismatch(column: &str, pg_type: &str) -> ApiError {
    ApiError::invalid(format!(
        "Invalid value for {column}: expected {}",
        pg_type.to_ascii_lowercase()
    ))
}

fn parse<T: FromStr>(column: &str, pg_type: &str, text: &str) -> ApiResult<T> {
    text.parse().map_err(|_| mismatch(column, pg_type))
}

/// Postgres boolean input forms
fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Convert a string for a placeholder of type `pg_type`.
///
/// Types without a conversion here are bound as text and left to the server.
pub fn text_param(column: &str, pg_type: Option<&str>, text: String) -> ApiResult<Param> {
    let Some(pg_type) = pg_type else {
        return Ok(Param::Text(text));
    };
    let trimmed = text.trim();

    let param = match pg_type {
        "INT2" => Param::Int2(parse(column, pg_type, trimmed)?),
        "INT4" => Param::Int4(parse(column, pg_type, trimmed)?),
        "INT8" => Param::Int8(parse(column, pg_type, trimmed)?),
        "FLOAT4" => Param::Float4(parse(column, pg_type, trimmed)?),
        "FLOAT8" => Param::Float8(parse(column, pg_type, trimmed)?),
        "NUMERIC" => Param::Numeric(parse(column, pg_type, trimmed)?),
        "UUID" => Param::Uuid(parse(column, pg_type, trimmed)?),
        "BOOL" => Param::Bool(parse_bool(trimmed).ok_or_else(|| mismatch(column, pg_type))?),
        "JSON" | "JSONB" => Param::Json(
            serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(text.clone())),
        ),
        "TIMESTAMPTZ" | "TIMESTAMP" | "DATE" => {
            timestamp_param(Some(pg_type), timefmt::parse_iso(trimmed)?)
        }
        _ => Param::Text(text),
    };
    Ok(param)
}

/// Convert a UTC timestamp for a placeholder of type `pg_type`.
///
/// Unknown placeholder types keep the timestamp; string-like ones get the
/// ISO-8601 rendering.
pub fn timestamp_param(pg_type: Option<&str>, ts: DateTime<Utc>) -> Param {
    match pg_type {
        None | Some("TIMESTAMPTZ") => Param::Timestamptz(ts),
        Some("TIMESTAMP") => Param::Timestamp(ts.naive_utc()),
        Some("DATE") => Param::Date(ts.date_naive()),
        Some(_) => Param::Text(timefmt::to_iso(ts)),
    }
}

/// Convert one INSERT value for its placeholder
pub fn field_param(column: &str, pg_type: Option<&str>, value: FieldValue) -> ApiResult<Param> {
    match value {
        FieldValue::Text(text) => text_param(column, pg_type, text),
        FieldValue::Bytes(bytes) => Ok(Param::Bytes(bytes)),
        FieldValue::Timestamp(ts) => Ok(timestamp_param(pg_type, ts)),
    }
}

pub fn bind<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: Param,
) -> Query<'q, Postgres, PgArguments> {
    match param {
        Param::Text(v) => query.bind(v),
        Param::Int2(v) => query.bind(v),
        Param::Int4(v) => query.bind(v),
        Param::Int8(v) => query.bind(v),
        Param::Float4(v) => query.bind(v),
        Param::Float8(v) => query.bind(v),
        Param::Numeric(v) => query.bind(v),
        Param::Bool(v) => query.bind(v),
        Param::Uuid(v) => query.bind(v),
        Param::Json(v) => query.bind(v),
        Param::Timestamptz(v) => query.bind(v),
        Param::Timestamp(v) => query.bind(v),
        Param::Date(v) => query.bind(v),
        Param::Bytes(v) => query.bind(v),
    }
}
