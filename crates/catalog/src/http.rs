use crate::{urls, CatalogError, CatalogService};
use async_trait::async_trait;
use lyric_bridge_core::{CatalogCandidate, CatalogConfig, LyricPayload};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Client for a NetEase Cloud Music API compatible server.
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
    search_limit: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    songs: Option<Vec<CatalogCandidate>>,
}

impl HttpCatalog {
    pub fn new(cfg: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            search_limit: cfg.search_limit.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CatalogError> {
        debug!(url = %url, "catalog request");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: preview(&body),
            });
        }
        debug!(body = %preview(&body), "catalog response");
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl CatalogService for HttpCatalog {
    async fn search(&self, keyword: &str) -> Result<Vec<CatalogCandidate>, CatalogError> {
        let url = urls::search_url(&self.base_url, keyword, self.search_limit)?;
        let parsed: SearchResponse = self.get_json(url).await?;
        if parsed.code != 0 && parsed.code != 200 {
            return Err(CatalogError::Api(parsed.code));
        }
        Ok(parsed.result.and_then(|r| r.songs).unwrap_or_default())
    }

    async fn lyric(&self, song_id: u64) -> Result<LyricPayload, CatalogError> {
        let url = urls::lyric_url(&self.base_url, song_id)?;
        let payload: LyricPayload = self.get_json(url).await?;
        if payload.code != 0 && payload.code != 200 {
            return Err(CatalogError::Api(payload.code));
        }
        Ok(payload)
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        let url = urls::search_url(&self.base_url, "test", 1)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CatalogError::Status {
                status: status.as_u16(),
                body: preview(&response.text().await.unwrap_or_default()),
            })
        }
    }
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
