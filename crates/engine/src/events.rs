use lyric_bridge_catalog::MatchRule;
use lyric_bridge_core::{CatalogCandidate, LyricLine, PlaybackState, RecoverableError, TrackKey};

/// Outbound notifications, published in the order the session changed.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    TrackChanged {
        key: TrackKey,
        state: PlaybackState,
    },
    PlaybackUpdated {
        state: PlaybackState,
    },
    MatchResolved {
        key: TrackKey,
        candidate: CatalogCandidate,
        rule: MatchRule,
    },
    MatchFailed {
        key: TrackKey,
        error: RecoverableError,
    },
    LyricsLoaded {
        key: TrackKey,
        lines: usize,
        has_translation: bool,
    },
    ActiveLineChanged {
        index: Option<usize>,
        line: Option<LyricLine>,
    },
    Recovered(RecoverableError),
    Idle,
}
