//! Cross-origin support
//!
//! The admin panel is served from an arbitrary origin, so every response
//! allows any origin and preflights are answered without routing.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const DEFAULT_ALLOWED_HEADERS: &str = "Content-Type";

/// Stamp the headers every response carries
pub fn apply_common_headers(resp: &mut Response<Full<Bytes>>, server_name: &str) {
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    if let Ok(value) = HeaderValue::from_str(server_name) {
        headers.insert(header::SERVER, value);
    }
}

/// Build OPTIONS response (preflight request)
///
/// Echoes `Access-Control-Request-Headers` so custom headers sent by the
/// panel are accepted.
pub fn build_preflight_response(request_headers: &HeaderMap) -> Response<Full<Bytes>> {
    let allow_headers = request_headers
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_ALLOWED_HEADERS));

    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(header::ALLOW, ALLOWED_METHODS)
        .header(header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS)
        .header(header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers)
        .header(header::ACCESS_CONTROL_MAX_AGE, "86400")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            crate::logger::log_error(&format!("Failed to build OPTIONS response: {e}"));
            Response::new(Full::new(Bytes::new()))
        })
}
