use async_trait::async_trait;
use lyric_bridge_core::{CatalogCandidate, LyricPayload};
use thiserror::Error;

pub mod http;
pub mod matcher;
pub mod urls;

pub use http::HttpCatalog;
pub use matcher::{MatchOutcome, MatchRule, MetadataMatcher};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog url: {0}")]
    Url(#[from] url::ParseError),

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("catalog returned api code {0}")]
    Api(i32),

    #[error("catalog response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Song search and lyric lookup against the external catalog.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Candidates in service ranking order; possibly empty.
    async fn search(&self, keyword: &str) -> Result<Vec<CatalogCandidate>, CatalogError>;

    async fn lyric(&self, song_id: u64) -> Result<LyricPayload, CatalogError>;

    /// Checks that the service answers at all.
    async fn ping(&self) -> Result<(), CatalogError> {
        self.search("test").await.map(|_| ())
    }
}
