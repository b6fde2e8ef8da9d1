use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::BytesMut;
use engine_logging::engine_debug;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

/// Variants tried in order; the first one the host has wins.
const VARIANTS: &[&str] = &["maxresdefault.jpg", "hqdefault.jpg"];

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("no thumbnail available for {0}")]
    NotFound(String),
    #[error("thumbnail request failed with status {0}")]
    HttpStatus(u16),
    #[error("thumbnail exceeds {max_bytes} bytes")]
    TooLarge { max_bytes: u64 },
    #[error("unsupported thumbnail content type {0}")]
    UnsupportedContentType(String),
    #[error("network error: {0}")]
    Network(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Best-effort cover image download for one item.
#[async_trait::async_trait]
pub trait ThumbnailFetcher: Send + Sync {
    async fn fetch_thumbnail(
        &self,
        video_id: &str,
        title: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf, ThumbnailError>;
}

#[derive(Debug, Clone)]
pub struct ThumbnailSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            base_url: "https://i.ytimg.com".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestThumbnailFetcher {
    settings: ThumbnailSettings,
}

impl ReqwestThumbnailFetcher {
    pub fn new(settings: ThumbnailSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, ThumbnailError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| ThumbnailError::Network(err.to_string()))
    }

    fn variant_url(&self, video_id: &str, variant: &str) -> String {
        format!(
            "{}/vi/{}/{}",
            self.settings.base_url.trim_end_matches('/'),
            video_id,
            variant
        )
    }

    /// `Ok(None)` when the host has no such variant.
    async fn download(
        &self,
        client: &reqwest::Client,
        url: &str,
    ) -> Result<Option<BytesMut>, ThumbnailError> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|err| ThumbnailError::Network(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ThumbnailError::HttpStatus(status.as_u16()));
        }

        let max_bytes = self.settings.max_bytes;
        if response
            .content_length()
            .is_some_and(|content_len| content_len > max_bytes)
        {
            return Err(ThumbnailError::TooLarge { max_bytes });
        }

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
        {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or(content_type)
                .trim();
            if !essence.to_ascii_lowercase().starts_with("image/") {
                return Err(ThumbnailError::UnsupportedContentType(essence.to_string()));
            }
        }

        let mut bytes = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| ThumbnailError::Network(err.to_string()))?;
            if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(ThumbnailError::TooLarge { max_bytes });
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(Some(bytes))
    }
}

#[async_trait::async_trait]
impl ThumbnailFetcher for ReqwestThumbnailFetcher {
    async fn fetch_thumbnail(
        &self,
        video_id: &str,
        title: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf, ThumbnailError> {
        let client = self.build_client()?;
        for variant in VARIANTS {
            let url = self.variant_url(video_id, variant);
            engine_debug!("Requesting thumbnail {}", url);
            if let Some(bytes) = self.download(&client, &url).await? {
                let writer = AtomicFileWriter::new(dest_dir.to_path_buf());
                return Ok(writer.write_thumbnail(title, video_id, &bytes)?);
            }
        }
        Err(ThumbnailError::NotFound(video_id.to_string()))
    }
}
