use anyhow::{bail, Result};
use async_trait::async_trait;
use lyric_bridge_core::{SourceConfig, SourceKind};

pub mod ingest;

mod command;
mod reader;

pub use command::CommandSource;
pub use ingest::ingest_line;
pub use reader::ReaderSource;

/// An ordered stream of raw device log lines.
#[async_trait]
pub trait LogSource: Send {
    fn name(&self) -> &'static str;

    /// Next line, or `Ok(None)` once the stream has ended.
    async fn next_line(&mut self) -> Result<Option<String>>;
}

#[async_trait]
impl LogSource for Box<dyn LogSource> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        (**self).next_line().await
    }
}

pub async fn build_log_source(cfg: &SourceConfig) -> Result<Box<dyn LogSource>> {
    match cfg.kind {
        SourceKind::Command => Ok(Box::new(CommandSource::spawn(&cfg.command)?)),
        SourceKind::Stdin => Ok(Box::new(ReaderSource::stdin())),
        SourceKind::File => match cfg.path.as_deref() {
            Some(path) => Ok(Box::new(ReaderSource::open(path).await?)),
            None => bail!("source kind 'file' requires `path`"),
        },
    }
}
