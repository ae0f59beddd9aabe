//! Client for the highlight service HTTP endpoints.
//!
//! Wraps `POST /upload`, `POST /run` and `GET /results`, plus plain `GET`s of the clip files the
//! results point at, using [`reqwest`].

use crate::error::ServiceError;
use crate::model::{ClientConfig, ResultSet, VideoAsset};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Url;

/// Multipart field the server reads the uploaded video from.
pub const UPLOAD_FIELD: &str = "video";

/// The remote collaborator the workflow drives.
#[async_trait]
pub trait HighlightService: Send + Sync {
    async fn upload(&self, asset: VideoAsset) -> Result<(), ServiceError>;

    /// Resolves once the server reports processing done.
    async fn run(&self) -> Result<(), ServiceError>;

    async fn results(&self) -> Result<ResultSet, ServiceError>;

    /// Download one clip. `clip_url` may be relative to the service base URL.
    async fn fetch_clip(&self, clip_url: &str) -> Result<Bytes, ServiceError>;
}

/// HTTP implementation of [`HighlightService`].
#[derive(Clone)]
pub struct HttpHighlightService {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpHighlightService {
    pub fn new(cfg: &ClientConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let mut base_url = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid base URL {}", cfg.base_url))?;
        // Url::join drops the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder().user_agent(cfg.user_agent.clone());
        if let Some(timeout) = cfg.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build().context("build HTTP client")?;

        Ok(Self::with_client(http, base_url))
    }

    /// Reuse an existing client (connection pool shared with other callers).
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.resolve(path.trim_start_matches('/'))
    }

    /// Resolve a server-provided locator; root-relative paths stay under the base host.
    pub fn resolve(&self, locator: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(locator)
            .map_err(|e| ServiceError::Malformed(format!("bad URL {locator}: {e}")))
    }

    /// Pass 2xx responses through; turn anything else into [`ServiceError::Status`].
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .ok()
            .filter(|t| !t.trim().is_empty());
        tracing::warn!(status = status.as_u16(), body = ?body, "highlight service rejected request");
        Err(ServiceError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl HighlightService for HttpHighlightService {
    async fn upload(&self, asset: VideoAsset) -> Result<(), ServiceError> {
        let url = self.endpoint("upload")?;
        let part = Part::stream_with_length(asset.contents.clone(), asset.contents.len() as u64)
            .file_name(asset.file_name.clone())
            .mime_str(asset.mime_type)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        tracing::debug!(%url, file = %asset.file_name, "POST upload");
        let response = self.http.post(url).multipart(form).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn run(&self) -> Result<(), ServiceError> {
        let url = self.endpoint("run")?;
        tracing::debug!(%url, "POST run");
        let response = self.http.post(url).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn results(&self) -> Result<ResultSet, ServiceError> {
        let url = self.endpoint("results")?;
        tracing::debug!(%url, "GET results");
        let response = self.http.get(url).send().await?;
        let text = Self::ensure_success(response).await?.text().await?;
        serde_json::from_str::<ResultSet>(&text).map_err(|e| ServiceError::Malformed(e.to_string()))
    }

    async fn fetch_clip(&self, clip_url: &str) -> Result<Bytes, ServiceError> {
        let url = self.resolve(clip_url)?;
        tracing::debug!(%url, "GET clip");
        let response = self.http.get(url).send().await?;
        Ok(Self::ensure_success(response).await?.bytes().await?)
    }
}
