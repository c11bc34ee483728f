//! Upstream liveness probe

use std::time::Duration;

use crate::error::ApiResult;

/// A response was received; `connected` unless the status is 5xx or below 200
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: u16,
    pub connected: bool,
}

impl ProbeOutcome {
    pub const fn from_status(status: u16) -> Self {
        Self {
            status,
            connected: status >= 200 && status < 500,
        }
    }
}

/// GET `url` once, bounded by `timeout`
pub async fn probe(url: &str, timeout: Duration) -> ApiResult<ProbeOutcome> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client.get(url).send().await?;
    Ok(ProbeOutcome::from_status(response.status().as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[test]
    fn test_connected_range() {
        assert!(ProbeOutcome::from_status(200).connected);
        assert!(ProbeOutcome::from_status(404).connected);
        assert!(ProbeOutcome::from_status(499).connected);
        assert!(!ProbeOutcome::from_status(500).connected);
        assert!(!ProbeOutcome::from_status(503).connected);
        assert!(!ProbeOutcome::from_status(101).connected);
    }

    #[tokio::test]
    async fn test_probe_reports_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let _ = stream
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await;
        });

        let outcome = probe(&format!("http://{addr}/"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(outcome, ProbeOutcome { status: 404, connected: true });
    }

    #[tokio::test]
    async fn test_probe_transport_failure() {
        let err = probe("http://127.0.0.1:1/", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BackendFailure(_)));
    }
}
