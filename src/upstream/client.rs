use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use std::time::Duration;

use crate::config::UpstreamConfig;
use crate::upstream::path::progressive_url;
use crate::upstream::{
    ByteStream, GatewayError, MediaGateway, PlaylistPath, UpstreamPlaylist, UpstreamProgressive,
};

/// go2rtc HTTP API client.
#[derive(Clone)]
pub struct Go2rtcClient {
    base_url: String,
    http_client: Client,
    request_timeout: Duration,
}

impl Go2rtcClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        // No client-wide timeout: it would also cap long-lived MP4 bodies.
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.base_url(),
            http_client,
            request_timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn check_status(response: Response, stream_key: &str) -> Result<Response, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                "Media server returned error status {} for stream {}",
                status,
                stream_key
            );
            return Err(GatewayError::Status(status.as_u16()));
        }
        Ok(response)
    }
}

fn read_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Read(err.to_string())
    }
}

/// Ends `body` with [`GatewayError::Timeout`] once no chunk has arrived for
/// `idle`. A stalled media server must not pin the caller's connection.
fn idle_bounded<S>(body: S, idle: Duration) -> ByteStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    futures::stream::unfold(Some(body.boxed()), move |state| async move {
        let mut body = match state {
            Some(body) => body,
            None => return None,
        };
        match tokio::time::timeout(idle, body.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(body))),
            Ok(Some(Err(e))) => Some((Err(read_error(e)), None)),
            Ok(None) => None,
            Err(_) => {
                tracing::warn!("Media server sent nothing for {:?}, closing stream", idle);
                Some((Err(GatewayError::Timeout), None))
            }
        }
    })
    .boxed()
}

fn invalid_url(err: url::ParseError) -> GatewayError {
    GatewayError::Unreachable(format!("invalid media server URL: {}", err))
}

#[async_trait]
impl MediaGateway for Go2rtcClient {
    async fn fetch_playlist(
        &self,
        stream_key: &str,
        path: &PlaylistPath,
    ) -> Result<UpstreamPlaylist, GatewayError> {
        let url = path
            .upstream_url(&self.base_url, stream_key)
            .map_err(invalid_url)?;

        tracing::debug!("Fetching playlist resource from {}", url);

        let response = self
            .http_client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = Self::check_status(response, stream_key)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(read_error)?;

        tracing::trace!("Received {} bytes from media server", body.len());

        Ok(UpstreamPlaylist {
            status,
            content_type,
            body,
        })
    }

    async fn fetch_progressive(&self, stream_key: &str) -> Result<UpstreamProgressive, GatewayError> {
        let url = progressive_url(&self.base_url, stream_key).map_err(invalid_url)?;

        tracing::debug!("Opening progressive stream from {}", url);

        // The head is bounded as a whole, the body only between chunks.
        let response = tokio::time::timeout(self.request_timeout, self.http_client.get(url).send())
            .await
            .map_err(|_| GatewayError::Timeout)??;
        let response = Self::check_status(response, stream_key)?;

        let status = response.status().as_u16();
        let body = idle_bounded(response.bytes_stream(), self.request_timeout);

        Ok(UpstreamProgressive { status, body })
    }
}
