// Endpoint handlers
//
// Each endpoint runs its steps as `ApiResult` values and translates the outcome
// into a response exactly once, at the end.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use std::time::Duration;

use super::body::decode_json;
use super::types::{
    DbTestRequest, DbTestResponse, ErrorResponse, HealthResponse, ProbeResponse, QueryRequest,
    QueryResponse, SendRequest, SendResponse,
};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::http::json_response;
use crate::{logger, probe, store, timefmt};

pub const HEALTH_PATH: &str = "/api/health";
pub const RENDER_STATUS_PATH: &str = "/api/render-status";
pub const DB_TEST_PATH: &str = "/api/db-test";
pub const QUERY_PATH: &str = "/api/messages/query";
pub const SEND_PATH: &str = "/api/messages/send";

/// `GET /api/health`
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            ok: true,
            ts: timefmt::now_iso(),
        },
    )
}

/// `GET /api/render-status`, failures reported in-band with 200
pub async fn handle_render_status(config: &Config) -> Response<Full<Bytes>> {
    let Some(url) = config.render_api_url() else {
        return json_response(
            StatusCode::OK,
            &ProbeResponse {
                ok: false,
                connected: false,
                status: None,
                error: Some("RENDER_API_URL not set".to_string()),
            },
        );
    };

    let timeout = Duration::from_secs(config.upstream.timeout_secs);
    let body = match probe::probe(url, timeout).await {
        Ok(outcome) => ProbeResponse {
            ok: true,
            connected: outcome.connected,
            status: Some(outcome.status),
            error: None,
        },
        Err(e) => {
            logger::log_api_failure(RENDER_STATUS_PATH, e.kind(), &e.to_string());
            ProbeResponse {
                ok: false,
                connected: false,
                status: None,
                error: Some(e.to_string()),
            }
        }
    };
    json_response(StatusCode::OK, &body)
}

/// `POST /api/db-test`, always `ok:true`; `connected` carries the result
pub async fn handle_db_test(body: &[u8], config: &Config) -> Response<Full<Bytes>> {
    let body = match db_test(body, config).await {
        Ok(()) => DbTestResponse {
            ok: true,
            connected: true,
            error: None,
        },
        Err(e) => {
            logger::log_api_failure(DB_TEST_PATH, e.kind(), &e.to_string());
            DbTestResponse {
                ok: true,
                connected: false,
                error: Some(e.to_string()),
            }
        }
    };
    json_response(StatusCode::OK, &body)
}

async fn db_test(body: &[u8], config: &Config) -> ApiResult<()> {
    let req: DbTestRequest = decode_json(body)?;
    let db_url = store::resolve_db_url(req.db_url.as_deref(), config.database_url())?;
    store::ping(&db_url).await
}

/// `POST /api/messages/query`
pub async fn handle_query(body: &[u8], config: &Config) -> Response<Full<Bytes>> {
    match query_messages(body, config).await {
        Ok(rows) => json_response(StatusCode::OK, &QueryResponse { ok: true, rows }),
        Err(e) => failure(QUERY_PATH, &e),
    }
}

async fn query_messages(
    body: &[u8],
    config: &Config,
) -> ApiResult<Vec<serde_json::Map<String, serde_json::Value>>> {
    let req: QueryRequest = decode_json(body)?;

    let db_url = store::resolve_db_url(req.db_url.as_deref(), config.database_url())?;
    let table = store::resolve_table(req.table.as_deref(), &config.database.default_table)?;
    let columns = store::resolve_columns(req.columns)?;
    let since = timefmt::parse_optional(req.since.as_deref())?;
    let limit = store::clamp_limit(req.limit);

    let plan = store::build_select(&table, &columns, since, limit);
    store::fetch_rows(&db_url, &plan, &columns).await
}

/// `POST /api/messages/send`
pub async fn handle_send(body: &[u8], config: &Config) -> Response<Full<Bytes>> {
    match send_message(body, config).await {
        Ok(()) => json_response(
            StatusCode::OK,
            &SendResponse {
                ok: true,
                inserted: true,
            },
        ),
        Err(e) => failure(SEND_PATH, &e),
    }
}

async fn send_message(body: &[u8], config: &Config) -> ApiResult<()> {
    let req: SendRequest = decode_json(body)?;

    let db_url = store::resolve_db_url(req.db_url.as_deref(), config.database_url())?;
    let table = store::resolve_table(req.table.as_deref(), &config.database.default_table)?;
    let columns = store::resolve_columns(req.columns)?;

    let draft = store::MessageDraft::from_fields(&store::SendFields {
        user_identifier: req.user_identifier.as_deref(),
        sender: req.sender.as_deref(),
        admin_name: req.admin_name.as_deref(),
        message: req.message.as_deref(),
        file_base64: req.file_base64.as_deref(),
        created_at: req.created_at.as_deref(),
    })?;

    let plan = store::build_insert(&table, &columns, &draft)?;
    store::insert_row(&db_url, plan).await
}

/// Translate a query/send error into `{ok:false, error}` with 400
fn failure(path: &str, err: &ApiError) -> Response<Full<Bytes>> {
    logger::log_api_failure(path, err.kind(), &err.to_string());
    json_response(StatusCode::BAD_REQUEST, &ErrorResponse::from(err))
}
