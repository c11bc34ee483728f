//! Postgres row to JSON encoding
//!
//! Column types are only known at runtime, so each value is decoded by the
//! Postgres type name reported for its column. Types outside
//! [`decodes_natively`] are selected as `::text` and arrive as strings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::types::BigDecimal;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use crate::error::ApiResult;
use crate::timefmt;

/// Whether a column of this type is decoded directly rather than as text
pub fn decodes_natively(type_name: &str) -> bool {
    matches!(
        type_name.to_ascii_uppercase().as_str(),
        "BYTEA"
            | "TIMESTAMPTZ"
            | "TIMESTAMP"
            | "DATE"
            | "TIME"
            | "INT2"
            | "INT4"
            | "INT8"
            | "FLOAT4"
            | "FLOAT8"
            | "NUMERIC"
            | "BOOL"
            | "UUID"
            | "JSON"
            | "JSONB"
            | "TEXT[]"
            | "VARCHAR[]"
            | "TEXT"
            | "VARCHAR"
            | "BPCHAR"
            | "NAME"
    )
}

/// Encode one row, keyed by the requested column names in order
pub fn row_to_json(row: &PgRow, columns: &[String]) -> ApiResult<Map<String, Value>> {
    let mut item = Map::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate() {
        item.insert(name.clone(), column_to_json(row, idx)?);
    }
    Ok(item)
}

fn column_to_json(row: &PgRow, idx: usize) -> ApiResult<Value> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let type_name = row.column(idx).type_info().name().to_ascii_uppercase();
    let value = match type_name.as_str() {
        "BYTEA" => Value::String(STANDARD.encode(row.try_get::<Vec<u8>, _>(idx)?)),
        "TIMESTAMPTZ" => Value::String(timefmt::to_iso(row.try_get::<DateTime<Utc>, _>(idx)?)),
        "TIMESTAMP" => Value::String(timefmt::naive_to_iso(row.try_get::<NaiveDateTime, _>(idx)?)),
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(idx)?.to_string()),
        "TIME" => Value::String(row.try_get::<NaiveTime, _>(idx)?.to_string()),
        "INT2" => Value::from(row.try_get::<i16, _>(idx)?),
        "INT4" => Value::from(row.try_get::<i32, _>(idx)?),
        "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
        "FLOAT4" => Value::from(f64::from(row.try_get::<f32, _>(idx)?)),
        "FLOAT8" => Value::from(row.try_get::<f64, _>(idx)?),
        // Exact decimal, kept as a string so no precision is lost
        "NUMERIC" => Value::String(row.try_get::<BigDecimal, _>(idx)?.to_string()),
        "BOOL" => Value::Bool(row.try_get::<bool, _>(idx)?),
        "UUID" => Value::String(row.try_get::<uuid::Uuid, _>(idx)?.to_string()),
        "JSON" | "JSONB" => row.try_get::<Value, _>(idx)?,
        "TEXT[]" | "VARCHAR[]" => Value::from(row.try_get::<Vec<String>, _>(idx)?),
        // TEXT, VARCHAR, BPCHAR, NAME and columns cast to text
        other => match row.try_get::<String, _>(idx) {
            Ok(s) => Value::String(s),
            Err(e) => {
                crate::logger::log_debug(&format!(
                    "Column {idx} has unsupported type {other}, returning null: {e}"
                ));
                Value::Null
            }
        },
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Connection, PgConnection};

    /// Runs only when a scratch database is available
    fn test_database_url() -> Option<String> {
        std::env::var("TEST_DATABASE_URL").ok().filter(|u| !u.is_empty())
    }

    #[tokio::test]
    async fn test_encodes_mixed_types() {
        let Some(url) = test_database_url() else {
            return;
        };
        let mut conn = PgConnection::connect(&url).await.unwrap();
        let row = sqlx::query(
            "select 42::int4, 'hi'::text, '\\x0001ff'::bytea, \
             '2024-05-01 10:00:00'::timestamp, '2024-05-01 12:00:00+02'::timestamptz, \
             null::text, true, '{\"a\":1}'::jsonb",
        )
        .fetch_one(&mut conn)
        .await
        .unwrap();
        let names: Vec<String> = ["n", "t", "b", "ts", "tstz", "nul", "flag", "doc"]
            .iter()
            .map(ToString::to_string)
            .collect();

        let item = row_to_json(&row, &names).unwrap();
        assert_eq!(item["n"], 42);
        assert_eq!(item["t"], "hi");
        assert_eq!(item["b"], STANDARD.encode([0x00, 0x01, 0xff]));
        assert_eq!(item["ts"], "2024-05-01T10:00:00+00:00");
        assert_eq!(item["tstz"], "2024-05-01T10:00:00+00:00");
        assert_eq!(item["nul"], Value::Null);
        assert_eq!(item["flag"], true);
        assert_eq!(item["doc"]["a"], 1);
        let keys: Vec<&String> = item.keys().collect();
        assert_eq!(keys, names.iter().collect::<Vec<_>>());

        conn.close().await.unwrap();
    }

    #[test]
    fn test_native_types() {
        for name in ["BYTEA", "timestamptz", "NUMERIC", "INT8", "TEXT[]", "BPCHAR"] {
            assert!(decodes_natively(name), "{name}");
        }
        for name in ["INTERVAL", "INET", "INT4[]", "MONEY", "CITEXT", "mood"] {
            assert!(!decodes_natively(name), "{name}");
        }
    }

    #[tokio::test]
    async fn test_encodes_numeric_as_string() {
        let Some(url) = test_database_url() else {
            return;
        };
        let mut conn = PgConnection::connect(&url).await.unwrap();
        let row = sqlx::query("select 12.5::numeric, 0.10::numeric(6,2), null::numeric")
            .fetch_one(&mut conn)
            .await
            .unwrap();
        let names: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();

        let item = row_to_json(&row, &names).unwrap();
        assert_eq!(item["a"], "12.5");
        assert_eq!(item["b"], "0.10");
        assert_eq!(item["c"], Value::Null);

        conn.close().await.unwrap();
    }
}
