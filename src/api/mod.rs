// API module entry
// Routes requests to the message endpoints and writes the access log

mod body;
mod handlers;
pub mod types;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{header, Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AppState;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use body::{read_body, BodyError};
use handlers::{DB_TEST_PATH, HEALTH_PATH, QUERY_PATH, RENDER_STATUS_PATH, SEND_PATH};

/// Main entry point for HTTP request handling
///
/// Generic over the body so the router can be driven without a socket.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let mut entry = state.access_log_enabled().then(|| access_entry(&req, remote_addr));

    let mut response = route(req, &state).await;
    http::apply_common_headers(&mut response, &state.config.http.server_name);

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.request_time_us =
            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Dispatch on method and path
async fn route<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let config = &state.config;
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (&method, path.as_str()) {
        (&Method::OPTIONS, _) => http::build_preflight_response(req.headers()),
        (&Method::GET, HEALTH_PATH) => handlers::handle_health(),
        (&Method::GET, RENDER_STATUS_PATH) => handlers::handle_render_status(config).await,
        (&Method::POST, DB_TEST_PATH | QUERY_PATH | SEND_PATH) => {
            let bytes = match read_body(req.into_body(), config.http.max_body_size).await {
                Ok(bytes) => bytes,
                Err(BodyError::TooLarge) => {
                    logger::log_warning(&format!(
                        "Request body too large on {path} (max: {})",
                        config.http.max_body_size
                    ));
                    return http::build_413_response(config.http.max_body_size);
                }
                Err(BodyError::Read(e)) => {
                    logger::log_warning(&format!("Failed to read request body on {path}: {e}"));
                    return http::error_response(
                        hyper::StatusCode::BAD_REQUEST,
                        "Failed to read request body",
                    );
                }
            };
            match path.as_str() {
                DB_TEST_PATH => handlers::handle_db_test(&bytes, config).await,
                QUERY_PATH => handlers::handle_query(&bytes, config).await,
                _ => handlers::handle_send(&bytes, config).await,
            }
        }
        (_, HEALTH_PATH | RENDER_STATUS_PATH) => http::build_405_response("GET, OPTIONS"),
        (_, DB_TEST_PATH | QUERY_PATH | SEND_PATH) => http::build_405_response("POST, OPTIONS"),
        _ => http::build_404_response(),
    }
}

fn access_entry<B>(req: &Request<B>, remote_addr: SocketAddr) -> AccessLogEntry {
    let header_value = |name: header::HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.http_version = http_version(req.version()).to_string();
    entry.origin = header_value(header::ORIGIN);
    entry.user_agent = header_value(header::USER_AGENT);
    entry
}

fn http_version(version: hyper::Version) -> &'static str {
    if version == hyper::Version::HTTP_10 {
        "1.0"
    } else if version == hyper::Version::HTTP_2 {
        "2"
    } else {
        "1.1"
    }
}
