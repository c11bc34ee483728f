//! SELECT construction for the query endpoint

use chrono::{DateTime, Utc};

use super::ident::quote;

pub const DEFAULT_LIMIT: i64 = 2000;
pub const MAX_LIMIT: i64 = 5000;

const CREATED_AT: &str = "created_at";

/// Parameterized SELECT plus the values to bind, in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectPlan {
    pub sql: String,
    pub since: Option<DateTime<Utc>>,
    pub limit: i64,
    table: String,
    columns: Vec<String>,
}

impl SelectPlan {
    /// The same statement with each flagged column projected as `::text`
    pub fn with_text_casts(&self, casts: &[bool]) -> String {
        render(&self.table, &self.columns, casts, self.since.is_some())
    }
}

/// Missing means the default; anything given is clamped to [1, 5000]
pub fn clamp_limit(requested: Option<i64>) -> i64 {
    requested.map_or(DEFAULT_LIMIT, |n| n.clamp(1, MAX_LIMIT))
}

/// Build the SELECT for already validated identifiers.
///
/// The `since` filter only applies when `created_at` is projected. Rows are
/// always ordered by `created_at`, so the table must have that column even
/// when it is not selected.
pub fn build_select(
    table: &str,
    columns: &[String],
    since: Option<DateTime<Utc>>,
    limit: i64,
) -> SelectPlan {
    let since = since.filter(|_| columns.iter().any(|c| c == CREATED_AT));
    SelectPlan {
        sql: render(table, columns, &[], since.is_some()),
        since,
        limit,
        table: table.to_string(),
        columns: columns.to_vec(),
    }
}

fn render(table: &str, columns: &[String], casts: &[bool], filter_since: bool) -> String {
    let projection = columns
        .iter()
        .enumerate()
        .map(|(idx, c)| {
            if casts.get(idx).copied().unwrap_or(false) {
                format!("{}::text as {}", quote(c), quote(c))
            } else {
                quote(c)
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    let created_at = quote(CREATED_AT);
    let base = format!("select {projection} from {}", quote(table));

    if filter_since {
        format!("{base} where {created_at} > $1 order by {created_at} asc limit $2")
    } else {
        format!("{base} order by {created_at} asc limit $1")
    }
}
