//! Connection target resolution
//!
//! A request may carry its own `db_url`; otherwise the configured fallback is
//! used. Either way only Postgres URLs are accepted.

use crate::error::{ApiError, ApiResult};

const ACCEPTED_SCHEMES: [&str; 2] = ["postgres://", "postgresql://"];

/// Pick the request value, else the fallback, and check the scheme
pub fn resolve_db_url(requested: Option<&str>, fallback: Option<&str>) -> ApiResult<String> {
    let url = requested
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .or_else(|| fallback.map(str::trim).filter(|u| !u.is_empty()))
        .ok_or_else(|| ApiError::invalid("DATABASE_URL is not set and no db_url was provided"))?;

    if !ACCEPTED_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        return Err(ApiError::invalid("Invalid Postgres URL"));
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_value_wins() {
        let url = resolve_db_url(Some("postgres://a/db"), Some("postgres://b/db")).unwrap();
        assert_eq!(url, "postgres://a/db");
    }

    #[test]
    fn test_blank_request_value_falls_back() {
        let url = resolve_db_url(Some("  "), Some(" postgresql://b/db ")).unwrap();
        assert_eq!(url, "postgresql://b/db");
    }

    #[test]
    fn test_missing_everywhere() {
        let err = resolve_db_url(None, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "DATABASE_URL is not set and no db_url was provided"
        );
    }

    #[test]
    fn test_wrong_scheme() {
        let err = resolve_db_url(Some("mysql://a/db"), None).unwrap_err();
        assert!(matches!(err, ApiError::InvalidConfig(_)));
        assert_eq!(err.to_string(), "Invalid Postgres URL");
    }
}
