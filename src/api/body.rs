// Request body reading and JSON decoding

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

/// Why a body could not be read
#[derive(Debug)]
pub enum BodyError {
    TooLarge,
    Read(String),
}

/// Collect the whole body, refusing anything over `max_size` bytes
pub async fn read_body<B>(body: B, max_size: u64) -> Result<Bytes, BodyError>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limit = usize::try_from(max_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(BodyError::TooLarge),
        Err(e) => Err(BodyError::Read(e.to_string())),
    }
}

/// Decode a JSON object body; an empty body is the default request
pub fn decode_json<T>(bytes: &[u8]) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::invalid(format!("Invalid JSON body: {e}")))
}
