//! Client for the canvas artifact service: mint requests and paint confirmation.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{ArtifactRequest, ArtifactResponse, Receipt, UnsignedArtifact};

pub const DEFAULT_API_URL: &str = "https://www.onemillionnfts.page/api";

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("already painted")]
    AlreadyPainted,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("invalid txn data")]
    InvalidArtifact,
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait ArtifactService: Send + Sync {
    /// Fetch the unsigned transaction that paints one pixel.
    async fn request_artifact(&self, req: &ArtifactRequest) -> Result<UnsignedArtifact, ArtifactError>;

    /// Build the URI that reports a submitted paint back to the service.
    fn confirmation_uri(&self, req: &ArtifactRequest, receipt: &Receipt) -> Result<String, ArtifactError>;

    /// Call a URI built by [`ArtifactService::confirmation_uri`]. Only 200 counts.
    async fn confirm(&self, uri: &str) -> Result<(), ArtifactError>;
}

pub struct HttpArtifactService {
    client: reqwest::Client,
    base: String,
}

impl HttpArtifactService {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base = base_url.into().trim_end_matches('/').to_string();
        Self { client, base }
    }

    pub fn mint_uri(&self, req: &ArtifactRequest) -> Result<String, ArtifactError> {
        self.endpoint("mint", &[
            ("x", req.x.to_string()),
            ("y", req.y.to_string()),
            ("color", req.color.to_string()),
            ("pubkey", req.pubkey.clone()),
        ])
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<String, ArtifactError> {
        let url = Url::parse_with_params(&format!("{}/{}", self.base, path), params)
            .map_err(|e| ArtifactError::Url(e.to_string()))?;
        Ok(url.into())
    }
}

#[async_trait]
impl ArtifactService for HttpArtifactService {
    async fn request_artifact(&self, req: &ArtifactRequest) -> Result<UnsignedArtifact, ArtifactError> {
        info!(x = req.x, y = req.y, color = %req.color, "Painting");
        let uri = self.mint_uri(req)?;

        let resp = self.client.get(&uri).send().await?;
        match resp.status() {
            StatusCode::OK => {}
            StatusCode::BAD_REQUEST => return Err(ArtifactError::AlreadyPainted),
            status => {
                warn!(%uri, %status, "mint request rejected");
                return Err(ArtifactError::Status(status.as_u16()));
            }
        }

        let body = resp.bytes().await?;
        let parsed: ArtifactResponse = serde_json::from_slice(&body)?;
        if !parsed.message.is_empty() {
            debug!(x = req.x, y = req.y, message = %parsed.message, "mint response");
        }
        UnsignedArtifact::new(parsed.transaction).ok_or(ArtifactError::InvalidArtifact)
    }

    fn confirmation_uri(&self, req: &ArtifactRequest, receipt: &Receipt) -> Result<String, ArtifactError> {
        self.endpoint("success", &[
            ("x", req.x.to_string()),
            ("y", req.y.to_string()),
            ("color", req.color.to_string()),
            ("transaction", receipt.0.clone()),
            ("pubkey", req.pubkey.clone()),
        ])
    }

    async fn confirm(&self, uri: &str) -> Result<(), ArtifactError> {
        info!(%uri, "confirming paint");
        let resp = self.client.get(uri).send().await?;
        if resp.status() != StatusCode::OK {
            return Err(ArtifactError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}
