use thiserror::Error;

/// Failures the pipeline absorbs without stopping. Each one is logged and
/// reported to observers, then processing continues with the next input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecoverableError {
    #[error("malformed playback report: {reason}")]
    MalformedInputLine { reason: String },

    #[error("catalog search unavailable for '{keyword}': {reason}")]
    SearchUnavailable { keyword: String, reason: String },

    #[error("no catalog match for '{keyword}'")]
    NoMatchFound { keyword: String },

    #[error("lyrics unavailable for song {song_id}: {reason}")]
    LyricUnavailable { song_id: u64, reason: String },

    #[error("malformed timed-text fragment '{fragment}' on line {line}")]
    LineParseMalformed { line: usize, fragment: String },

    #[error("no matched song to export")]
    NothingToExport,
}
