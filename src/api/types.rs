// API types module
// Request bodies and response payloads for the message endpoints

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// `POST /api/db-test`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DbTestRequest {
    pub db_url: Option<String>,
}

/// `POST /api/messages/query`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QueryRequest {
    pub db_url: Option<String>,
    pub table: Option<String>,
    pub columns: Option<Vec<String>>,
    pub since: Option<String>,
    #[serde(deserialize_with = "lenient_limit")]
    pub limit: Option<i64>,
}

/// `POST /api/messages/send`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    pub db_url: Option<String>,
    pub table: Option<String>,
    pub columns: Option<Vec<String>>,
    pub user_identifier: Option<String>,
    pub sender: Option<String>,
    pub admin_name: Option<String>,
    pub message: Option<String>,
    pub file_base64: Option<String>,
    pub created_at: Option<String>,
}

/// Accept `limit` as an integer, a whole float, or a numeric string.
///
/// Falsy JSON values (`null`, `0`, `false`, `""`) mean "not given"; the
/// string `"0"` is a real zero and gets clamped later.
#[allow(clippy::cast_possible_truncation)]
fn lenient_limit<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null | Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some(1)),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(|n| (n != 0).then_some(n))
            .ok_or_else(|| D::Error::custom("limit must be an integer")),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| D::Error::custom("limit must be an integer")),
        Some(_) => Err(D::Error::custom("limit must be an integer")),
    }
}

/// `GET /api/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub ts: String,
}

/// `GET /api/render-status`
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub ok: bool,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /api/db-test`
#[derive(Debug, Serialize)]
pub struct DbTestResponse {
    pub ok: bool,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `POST /api/messages/query`
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub ok: bool,
    pub rows: Vec<Map<String, Value>>,
}

/// `POST /api/messages/send`
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub ok: bool,
    pub inserted: bool,
}

/// Failure body shared by query and send
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            ok: false,
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_defaults() {
        let req: QueryRequest = serde_json::from_str("{}").unwrap();
        assert!(req.db_url.is_none());
        assert!(req.columns.is_none());
        assert!(req.limit.is_none());
    }

    #[test]
    fn test_limit_forms() {
        let parse = |body: &str| serde_json::from_str::<QueryRequest>(body).map(|r| r.limit);
        assert_eq!(parse(r#"{"limit": 25}"#).unwrap(), Some(25));
        assert_eq!(parse(r#"{"limit": -5}"#).unwrap(), Some(-5));
        assert_eq!(parse(r#"{"limit": 30.0}"#).unwrap(), Some(30));
        assert_eq!(parse(r#"{"limit": "40"}"#).unwrap(), Some(40));
        assert_eq!(parse(r#"{"limit": null}"#).unwrap(), None);
        assert_eq!(parse(r#"{"limit": ""}"#).unwrap(), None);
        assert!(parse(r#"{"limit": "many"}"#).is_err());
        assert!(parse(r#"{"limit": [1]}"#).is_err());
    }

    #[test]
    fn test_limit_zero_number_vs_zero_string() {
        let parse = |body: &str| serde_json::from_str::<QueryRequest>(body).unwrap().limit;
        assert_eq!(parse(r#"{"limit": 0}"#), None);
        assert_eq!(parse(r#"{"limit": 0.0}"#), None);
        assert_eq!(parse(r#"{"limit": false}"#), None);
        assert_eq!(parse(r#"{"limit": "0"}"#), Some(0));
        assert_eq!(crate::store::clamp_limit(parse(r#"{"limit": "0"}"#)), 1);
        assert_eq!(crate::store::clamp_limit(parse(r#"{"limit": 0}"#)), 2000);
    }

    #[test]
    fn test_send_request_nulls_and_columns() {
        let req: SendRequest =
            serde_json::from_str(r#"{"user_identifier":"u","message":null,"columns":["id"]}"#)
                .unwrap();
        assert_eq!(req.user_identifier.as_deref(), Some("u"));
        assert!(req.message.is_none());
        assert_eq!(req.columns.unwrap(), ["id"]);
    }

    #[test]
    fn test_probe_response_omits_absent_fields() {
        let body = serde_json::to_value(ProbeResponse {
            ok: true,
            connected: true,
            status: Some(200),
            error: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"ok": true, "connected": true, "status": 200}));
    }
}
