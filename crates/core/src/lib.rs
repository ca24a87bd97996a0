pub mod config;
pub mod error;
pub mod lrc;
pub mod model;
pub mod time;

pub use config::{AppConfig, CatalogConfig, ExportConfig, MatchingConfig, SourceConfig, SourceKind};
pub use error::RecoverableError;
pub use model::{
    clean_title, AlbumRef, ArtistRef, CatalogCandidate, LyricBlock, LyricDocument, LyricLine,
    LyricPayload, PlaybackState, TrackKey,
};
