//! Dynamic SQL layer
//!
//! Builds and runs parameterized statements against a table and column set
//! named at request time. Each call opens its own connection and closes it
//! before returning, on success and failure alike.

mod encode;
pub mod ident;
pub mod insert;
mod param;
pub mod select;
mod target;

use serde_json::{Map, Value};
use sqlx::{Column, Connection, Either, Executor, PgConnection, Statement, TypeInfo};

use crate::error::ApiResult;
use crate::logger;

pub use encode::{decodes_natively, row_to_json};
pub use ident::{resolve_columns, resolve_table};
pub use insert::{build_insert, InsertPlan, MessageDraft, SendFields};
pub use select::{build_select, clamp_limit, SelectPlan};
pub use target::resolve_db_url;

async fn connect(db_url: &str) -> ApiResult<PgConnection> {
    Ok(PgConnection::connect(db_url).await?)
}

/// Close without masking the result of the work done on the connection
async fn close(conn: PgConnection) {
    if let Err(e) = conn.close().await {
        logger::log_warning(&format!("Failed to close database connection: {e}"));
    }
}

/// Open a connection, run `select 1`, close it
pub async fn ping(db_url: &str) -> ApiResult<()> {
    let mut conn = connect(db_url).await?;
    let result = sqlx::query("select 1").execute(&mut conn).await;
    close(conn).await;
    result?;
    Ok(())
}

/// Parameter and result column types the server inferred for a statement
struct StatementTypes {
    params: Vec<String>,
    columns: Vec<String>,
}

async fn describe(conn: &mut PgConnection, sql: &str) -> ApiResult<StatementTypes> {
    let statement = (&mut *conn).prepare(sql).await?;
    let params = match statement.parameters() {
        Some(Either::Left(types)) => types.iter().map(|t| t.name().to_string()).collect(),
        _ => Vec::new(),
    };
    let columns = statement
        .columns()
        .iter()
        .map(|c| c.type_info().name().to_string())
        .collect();
    Ok(StatementTypes { params, columns })
}

/// Run a SELECT plan and encode every row
pub async fn fetch_rows(
    db_url: &str,
    plan: &SelectPlan,
    columns: &[String],
) -> ApiResult<Vec<Map<String, Value>>> {
    let mut conn = connect(db_url).await?;
    let result = run_select(&mut conn, plan, columns).await;
    close(conn).await;
    result
}

async fn run_select(
    conn: &mut PgConnection,
    plan: &SelectPlan,
    columns: &[String],
) -> ApiResult<Vec<Map<String, Value>>> {
    let types = describe(conn, &plan.sql).await?;
    let casts: Vec<bool> = types.columns.iter().map(|t| !decodes_natively(t)).collect();
    let sql = if casts.contains(&true) {
        plan.with_text_casts(&casts)
    } else {
        plan.sql.clone()
    };

    let mut query = sqlx::query(&sql);
    if let Some(since) = plan.since {
        let pg_type = types.params.first().map(String::as_str);
        query = param::bind(query, param::timestamp_param(pg_type, since));
    }
    let rows = query.bind(plan.limit).fetch_all(&mut *conn).await?;

    logger::log_debug(&format!("{sql} -> {} row(s)", rows.len()));
    rows.iter().map(|row| row_to_json(row, columns)).collect()
}

/// Run an INSERT plan; the `returning *` row is fetched and discarded
pub async fn insert_row(db_url: &str, plan: InsertPlan) -> ApiResult<()> {
    let mut conn = connect(db_url).await?;
    let result = run_insert(&mut conn, plan).await;
    close(conn).await;
    result
}

async fn run_insert(conn: &mut PgConnection, plan: InsertPlan) -> ApiResult<()> {
    let InsertPlan {
        sql,
        columns,
        values,
    } = plan;
    let types = describe(conn, &sql).await?;

    let mut query = sqlx::query(&sql);
    for (idx, (column, value)) in columns.iter().zip(values).enumerate() {
        let pg_type = types.params.get(idx).map(String::as_str);
        query = param::bind(query, param::field_param(column, pg_type, value)?);
    }
    query.fetch_one(&mut *conn).await?;

    logger::log_debug(&format!("{sql} -> 1 row"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use chrono::{Duration, Utc};

    fn test_database_url() -> Option<String> {
        std::env::var("TEST_DATABASE_URL").ok().filter(|u| !u.is_empty())
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    async fn create_table_with(url: &str, table: &str, ddl: &str) {
        let mut conn = connect(url).await.unwrap();
        sqlx::query(&format!("drop table if exists {table}"))
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query(&format!("create table {table} ({ddl})"))
            .execute(&mut conn)
            .await
            .unwrap();
        close(conn).await;
    }

    async fn create_table(url: &str, table: &str) {
        create_table_with(
            url,
            table,
            "id bigserial primary key, user_identifier text not null, sender text, \
             admin_name text, message text, file bytea, created_at timestamptz not null",
        )
        .await;
    }

    #[tokio::test]
    async fn test_ping_rejects_unreachable_host() {
        let err = ping("postgres://nobody@127.0.0.1:1/none").await.unwrap_err();
        assert!(matches!(err, crate::error::ApiError::BackendFailure(_)));
    }

    #[tokio::test]
    async fn test_send_then_query_round_trip() {
        let Some(url) = test_database_url() else {
            return;
        };
        let table = "bridge_round_trip";
        create_table(&url, table).await;
        ping(&url).await.unwrap();

        let before = Utc::now() - Duration::seconds(5);
        let attachment = STANDARD.encode(b"\x89PNG\r\n");
        let draft = MessageDraft::from_fields(&SendFields {
            user_identifier: Some("user-7"),
            message: Some("hello"),
            file_base64: Some(attachment.as_str()),
            ..SendFields::default()
        })
        .unwrap();
        let columns = resolve_columns(None).unwrap();
        insert_row(&url, build_insert(table, &columns, &draft).unwrap())
            .await
            .unwrap();

        let plan = build_select(table, &columns, Some(before), clamp_limit(None));
        let rows = fetch_rows(&url, &plan, &columns).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["user_identifier"], "user-7");
        assert_eq!(row["sender"], "admin");
        assert_eq!(row["message"], "hello");
        assert_eq!(row["file"], attachment);
        let created_at = row["created_at"].as_str().unwrap();
        assert!(created_at.ends_with("+00:00"), "not UTC: {created_at}");

        let later = build_select(table, &columns, Some(Utc::now() + Duration::hours(1)), 10);
        assert!(fetch_rows(&url, &later, &columns).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_only_requested_columns() {
        let Some(url) = test_database_url() else {
            return;
        };
        let table = "bridge_partial_insert";
        create_table(&url, table).await;

        let draft = MessageDraft::from_fields(&SendFields {
            user_identifier: Some("user-8"),
            message: Some("hi"),
            ..SendFields::default()
        })
        .unwrap();
        let requested = cols(&["id", "user_identifier", "message", "created_at"]);
        insert_row(&url, build_insert(table, &requested, &draft).unwrap())
            .await
            .unwrap();

        let projection = cols(&["sender", "message", "file"]);
        let plan = build_select(table, &projection, None, 10);
        let rows = fetch_rows(&url, &plan, &projection).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["sender"], Value::Null);
        assert_eq!(rows[0]["message"], "hi");
        assert_eq!(rows[0]["file"], Value::Null);
    }

    #[tokio::test]
    async fn test_insert_converts_strings_to_column_types() {
        let Some(url) = test_database_url() else {
            return;
        };
        let table = "bridge_typed_columns";
        create_table_with(
            &url,
            table,
            "id bigserial primary key, user_identifier bigint not null, sender uuid, \
             message text, created_at timestamp not null",
        )
        .await;

        let sender = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        let draft = MessageDraft::from_fields(&SendFields {
            user_identifier: Some("42"),
            sender: Some(sender),
            message: Some("typed"),
            created_at: Some("2024-05-01T12:00:00+02:00"),
            ..SendFields::default()
        })
        .unwrap();
        let columns = cols(&["user_identifier", "sender", "message", "created_at"]);
        insert_row(&url, build_insert(table, &columns, &draft).unwrap())
            .await
            .unwrap();

        let plan = build_select(table, &columns, None, 10);
        let rows = fetch_rows(&url, &plan, &columns).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user_identifier"], 42);
        assert_eq!(rows[0]["sender"], sender);
        assert_eq!(rows[0]["created_at"], "2024-05-01T10:00:00+00:00");

        let bad = MessageDraft::from_fields(&SendFields {
            user_identifier: Some("not-a-number"),
            message: Some("typed"),
            ..SendFields::default()
        })
        .unwrap();
        let err = insert_row(&url, build_insert(table, &columns, &bad).unwrap())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for user_identifier: expected int8"
        );
    }

    #[tokio::test]
    async fn test_query_returns_values_without_a_native_decoder() {
        let Some(url) = test_database_url() else {
            return;
        };
        let table = "bridge_exotic_columns";
        create_table_with(
            &url,
            table,
            "id numeric, wait interval, peer inet, tags int4[], message text, \
             created_at timestamptz not null default now()",
        )
        .await;
        let mut conn = connect(&url).await.unwrap();
        sqlx::query(&format!(
            "insert into {table} (id, wait, peer, tags, message) \
             values (12.5, '90 minutes', '10.0.0.1', '{{1,2}}', 'x')"
        ))
        .execute(&mut conn)
        .await
        .unwrap();
        close(conn).await;

        let columns = cols(&["id", "wait", "peer", "tags", "message"]);
        let plan = build_select(table, &columns, None, 10);
        let rows = fetch_rows(&url, &plan, &columns).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["id"], "12.5");
        assert_eq!(row["wait"], "01:30:00");
        assert_eq!(row["peer"], "10.0.0.1");
        assert_eq!(row["tags"], "{1,2}");
        assert_eq!(row["message"], "x");
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, columns.iter().collect::<Vec<_>>());
    }
}
