use crate::session::TrackSession;
use lyric_bridge_core::lrc::{write_lrc, LrcHeader};
use lyric_bridge_core::{CatalogCandidate, LyricDocument, RecoverableError};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXPORT_AUTHOR: &str = "lyric-bridge";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LrcExport {
    pub file_name: String,
    pub contents: String,
}

pub fn export_document(
    candidate: &CatalogCandidate,
    document: &LyricDocument,
    include_translation: bool,
) -> LrcExport {
    let header = LrcHeader {
        title: candidate.name.clone(),
        artist: candidate.artist_names(),
        album: candidate.album_name().unwrap_or_default().to_string(),
        by: EXPORT_AUTHOR.to_string(),
    };
    LrcExport {
        file_name: lrc_file_name(candidate),
        contents: write_lrc(&header, document, include_translation),
    }
}

/// Export of the session's matched song and loaded lyrics.
pub fn export_lrc(
    session: &TrackSession,
    include_translation: bool,
) -> Result<LrcExport, RecoverableError> {
    let candidate = session
        .match_result()
        .ok_or(RecoverableError::NothingToExport)?;
    if session.document().is_empty() {
        return Err(RecoverableError::LyricUnavailable {
            song_id: candidate.id,
            reason: "no lyrics loaded".to_string(),
        });
    }
    Ok(export_document(candidate, session.document(), include_translation))
}

/// `"{name} - {artists}.lrc"` with path-hostile characters replaced.
pub fn lrc_file_name(candidate: &CatalogCandidate) -> String {
    let stem = format!("{} - {}", candidate.name, candidate.artist_names());
    let cleaned: String = stem
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{}.lrc", cleaned.trim())
}

pub async fn write_export(dir: &Path, export: &LrcExport) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&export.file_name);
    tokio::fs::write(&path, export.contents.as_bytes()).await?;
    info!(path = %path.display(), bytes = export.contents.len(), "lyrics exported");
    Ok(path)
}
