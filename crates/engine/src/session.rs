use crate::sync::{LineChange, PlaybackSynchronizer};
use lyric_bridge_core::{CatalogCandidate, LyricDocument, LyricLine, PlaybackState, TrackKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Tracking,
}

/// Catalog lookup progress for the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    NotSearched,
    Searching,
    Matched,
    Unmatched,
}

/// Everything known about the track currently playing on the device.
///
/// Only the engine mutates a session; observers get clones.
#[derive(Debug, Clone)]
pub struct TrackSession {
    phase: SessionPhase,
    key: Option<TrackKey>,
    playback: Option<PlaybackState>,
    match_result: Option<CatalogCandidate>,
    search: SearchState,
    protected_duration_ms: Option<u64>,
    sync: PlaybackSynchronizer,
}

impl Default for TrackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            key: None,
            playback: None,
            match_result: None,
            search: SearchState::NotSearched,
            protected_duration_ms: None,
            sync: PlaybackSynchronizer::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn key(&self) -> Option<&TrackKey> {
        self.key.as_ref()
    }

    pub fn playback(&self) -> Option<&PlaybackState> {
        self.playback.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.phase == SessionPhase::Tracking && self.playback.as_ref().is_some_and(|p| p.is_playing)
    }

    pub fn match_result(&self) -> Option<&CatalogCandidate> {
        self.match_result.as_ref()
    }

    pub fn search_state(&self) -> SearchState {
        self.search
    }

    /// Track length, preferring the catalog value once one is known.
    pub fn duration_ms(&self) -> u64 {
        self.protected_duration_ms
            .or_else(|| self.playback.as_ref().map(|p| p.duration_ms))
            .unwrap_or(0)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.sync.elapsed_ms()
    }

    pub fn document(&self) -> &LyricDocument {
        self.sync.document()
    }

    pub fn active_line_index(&self) -> Option<usize> {
        self.sync.active_index()
    }

    pub fn active_line(&self) -> Option<&LyricLine> {
        self.sync.active_line()
    }

    /// Starts over for a newly detected track.
    pub(crate) fn begin_track(&mut self, key: TrackKey, state: PlaybackState) -> Option<LineChange> {
        *self = Self::new();
        self.phase = SessionPhase::Tracking;
        self.key = Some(key);
        self.search = SearchState::Searching;
        let position = state.position_ms;
        self.playback = Some(state);
        self.sync.seek(position)
    }

    /// Same track, fresh report: match and learned duration carry over.
    pub(crate) fn update_track(&mut self, mut state: PlaybackState) -> Option<LineChange> {
        let previous_duration = self.playback.as_ref().map(|p| p.duration_ms).unwrap_or(0);
        state.duration_ms = match self.protected_duration_ms {
            Some(learned) => learned,
            None if state.duration_ms == 0 => previous_duration,
            None => state.duration_ms,
        };
        let position = state.position_ms;
        self.playback = Some(state);
        self.sync.seek(position)
    }

    /// Report without a title: keep identity fields, take position and
    /// playing flag.
    pub(crate) fn update_transport(&mut self, state: &PlaybackState) -> Option<LineChange> {
        let playback = self.playback.as_mut()?;
        playback.position_ms = state.position_ms;
        playback.is_playing = state.is_playing;
        self.sync.seek(state.position_ms)
    }

    pub(crate) fn set_match(&mut self, candidate: CatalogCandidate) {
        if candidate.duration_ms > 0 {
            self.protected_duration_ms = Some(candidate.duration_ms);
            if let Some(playback) = self.playback.as_mut() {
                playback.duration_ms = candidate.duration_ms;
            }
        }
        self.match_result = Some(candidate);
        self.search = SearchState::Matched;
    }

    /// `clear_match` drops a stale match; service failures keep it.
    pub(crate) fn mark_unmatched(&mut self, clear_match: bool) {
        if clear_match {
            self.match_result = None;
        }
        self.search = SearchState::Unmatched;
    }

    pub(crate) fn set_document(&mut self, document: LyricDocument) -> Option<LineChange> {
        self.sync.set_document(document)
    }

    pub(crate) fn advance(&mut self, delta_ms: u64) -> Option<LineChange> {
        self.sync.on_tick(delta_ms)
    }

    pub(crate) fn end(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::{SearchState, SessionPhase, TrackSession};
    use lyric_bridge_core::{CatalogCandidate, PlaybackState};

    fn state(title: &str, position_ms: u64, duration_ms: u64) -> PlaybackState {
        PlaybackState {
            title: title.to_string(),
            artist: "A".to_string(),
            album: String::new(),
            position_ms,
            is_playing: true,
            duration_ms,
        }
    }

    #[test]
    fn learned_duration_survives_placeholder_reports() {
        let mut session = TrackSession::new();
        let s = state("Song", 0, 0);
        session.begin_track(s.track_key(), s);
        session.set_match(CatalogCandidate {
            id: 1,
            name: "Song".to_string(),
            duration_ms: 180_000,
            ..CatalogCandidate::default()
        });

        session.update_track(state("Song", 1_000, 0));
        assert_eq!(session.duration_ms(), 180_000);
        assert_eq!(session.playback().unwrap().duration_ms, 180_000);

        session.update_track(state("Song", 2_000, 99));
        assert_eq!(session.playback().unwrap().duration_ms, 180_000);
        assert_eq!(session.search_state(), SearchState::Matched);
    }

    #[test]
    fn device_duration_is_kept_until_catalog_knows_better() {
        let mut session = TrackSession::new();
        let s = state("Song", 0, 200_000);
        session.begin_track(s.track_key(), s);
        session.update_track(state("Song", 1_000, 0));
        assert_eq!(session.duration_ms(), 200_000);
    }

    #[test]
    fn service_failure_keeps_match_but_no_match_clears_it() {
        let mut session = TrackSession::new();
        let s = state("Song", 0, 0);
        session.begin_track(s.track_key(), s);
        session.set_match(CatalogCandidate::default());

        session.mark_unmatched(false);
        assert!(session.match_result().is_some());
        session.mark_unmatched(true);
        assert!(session.match_result().is_none());
        assert_eq!(session.search_state(), SearchState::Unmatched);
    }

    #[test]
    fn end_returns_to_idle() {
        let mut session = TrackSession::new();
        let s = state("Song", 0, 0);
        session.begin_track(s.track_key(), s);
        assert_eq!(session.phase(), SessionPhase::Tracking);
        assert!(session.is_playing());

        session.end();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.key().is_none());
        assert!(!session.is_playing());
    }
}
