//! Request-scoped error type
//!
//! Every validation and database step returns `Result<_, ApiError>`. The
//! endpoint boundary in `api::handlers` turns the error into a JSON body.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed connection string, identifier, payload or attachment
    #[error("{0}")]
    InvalidConfig(String),
    /// Database or upstream HTTP failure
    #[error("{0}")]
    BackendFailure(String),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::BackendFailure(_) => "backend_failure",
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::BackendFailure(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::BackendFailure(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
