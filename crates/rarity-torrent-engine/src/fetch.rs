//! HTTP retrieval of `.torrent` files.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rarity_torrent_core::{MetainfoFetcher, TorrentError, TorrentResult};
use tracing::debug;

use crate::error::SessionError;

/// Request timeout applied when none is configured.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Largest metainfo body accepted.
pub const MAX_METAINFO_BYTES: usize = 8 * 1024 * 1024;

/// [`MetainfoFetcher`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFetcher {
    /// Build a fetcher with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rarity/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build metainfo HTTP client")?;
        Ok(Self {
            client,
            max_bytes: MAX_METAINFO_BYTES,
        })
    }

    /// Override the body size cap.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl MetainfoFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> TorrentResult<Vec<u8>> {
        let transport = |source: Box<dyn std::error::Error + Send + Sync>| {
            TorrentError::Transport {
                url: url.to_string(),
                source,
            }
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| transport(Box::new(err)))?;

        let too_large = || {
            transport(Box::new(SessionError::BodyTooLarge {
                limit: self.max_bytes,
            }))
        };
        let limit = u64::try_from(self.max_bytes).unwrap_or(u64::MAX);
        if response
            .content_length()
            .is_some_and(|length| length > limit)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| transport(Box::new(err)))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        debug!(url = %url, bytes = body.len(), "fetched torrent metainfo");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn fetch_returns_body_bytes() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/sample.torrent");
                then.status(200).body("d4:infode");
            })
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5))?;
        let bytes = fetcher.fetch(&server.url("/sample.torrent")).await?;
        assert_eq!(bytes, b"d4:infode".to_vec());
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.torrent");
                then.status(404);
            })
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5))?;
        let url = server.url("/missing.torrent");
        match fetcher.fetch(&url).await {
            Err(TorrentError::Transport { url: failed, .. }) => assert_eq!(failed, url),
            other => panic!("expected transport error, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() -> Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/huge.torrent");
                then.status(200).body(vec![b'x'; 64]);
            })
            .await;

        let fetcher = HttpFetcher::new(Duration::from_secs(5))?.with_max_bytes(16);
        let err = fetcher
            .fetch(&server.url("/huge.torrent"))
            .await
            .err()
            .context("expected size failure")?;
        assert!(err.detail().contains("size limit"));
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() -> Result<()> {
        let fetcher = HttpFetcher::new(Duration::from_millis(500))?;
        assert!(matches!(
            fetcher.fetch("http://127.0.0.1:9/unreachable.torrent").await,
            Err(TorrentError::Transport { .. })
        ));
        Ok(())
    }
}
