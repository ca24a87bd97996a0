use crate::detector::TrackChangeDetector;
use crate::events::PipelineEvent;
use crate::session::{SessionPhase, TrackSession};
use crate::sync::LineChange;
use lyric_bridge_catalog::MatchOutcome;
use lyric_bridge_core::{time::format_time, LyricDocument, PlaybackState, RecoverableError, TrackKey};
use lyric_bridge_source::ingest_line;
use tracing::{debug, info, trace, warn};

/// Side effects the runner performs on the engine's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAction {
    StartClock,
    StopClock,
    Search {
        key: TrackKey,
        title: String,
        artist: String,
    },
    CancelSearch,
}

#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    pub events: Vec<PipelineEvent>,
    pub actions: Vec<EngineAction>,
}

impl EngineOutput {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.actions.is_empty()
    }
}

/// Results of a background search, tagged with the key it was started for.
#[derive(Debug, Clone)]
pub enum SearchMessage {
    Matched {
        key: TrackKey,
        outcome: MatchOutcome,
    },
    Unmatched {
        key: TrackKey,
        error: RecoverableError,
    },
    LyricsReady {
        key: TrackKey,
        document: LyricDocument,
    },
    LyricsFailed {
        key: TrackKey,
        error: RecoverableError,
    },
}

impl SearchMessage {
    pub fn key(&self) -> &TrackKey {
        match self {
            SearchMessage::Matched { key, .. }
            | SearchMessage::Unmatched { key, .. }
            | SearchMessage::LyricsReady { key, .. }
            | SearchMessage::LyricsFailed { key, .. } => key,
        }
    }
}

/// Synchronous core of the pipeline: owns the session and turns inputs into
/// events and actions. It performs no I/O.
#[derive(Debug, Default)]
pub struct SessionEngine {
    detector: TrackChangeDetector,
    session: TrackSession,
}

impl SessionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> &TrackSession {
        &self.session
    }

    pub fn ingest_line(&mut self, line: &str) -> EngineOutput {
        match ingest_line(line) {
            Ok(Some(state)) => self.ingest(state),
            Ok(None) => EngineOutput::default(),
            Err(err) => {
                warn!(error = %err, "dropping malformed log line");
                EngineOutput {
                    events: vec![PipelineEvent::Recovered(err)],
                    actions: Vec::new(),
                }
            }
        }
    }

    pub fn ingest(&mut self, state: PlaybackState) -> EngineOutput {
        let mut out = EngineOutput::default();
        let evaluation = self.detector.evaluate(&state, &self.session);

        let change = if !state.has_title() {
            if self.session.phase() == SessionPhase::Idle {
                trace!("untitled report while idle; ignoring");
                return out;
            }
            let change = self.session.update_transport(&state);
            if let Some(playback) = self.session.playback() {
                out.events.push(PipelineEvent::PlaybackUpdated {
                    state: playback.clone(),
                });
            }
            change
        } else if evaluation.is_new_track {
            let key = state.track_key();
            info!(
                track = %key,
                album = %state.album,
                position = %format_time(state.position_ms),
                playing = state.is_playing,
                "new track detected"
            );
            let title = state.title.clone();
            let artist = state.artist.clone();
            let change = self.session.begin_track(key.clone(), state.clone());
            out.events.push(PipelineEvent::TrackChanged {
                key: key.clone(),
                state,
            });
            out.actions.push(EngineAction::Search { key, title, artist });
            change
        } else {
            debug_assert!(evaluation.preserve_match);
            let change = self.session.update_track(state);
            if let Some(playback) = self.session.playback() {
                debug!(
                    position = %format_time(playback.position_ms),
                    duration = %format_time(playback.duration_ms),
                    playing = playback.is_playing,
                    "same track update"
                );
                out.events.push(PipelineEvent::PlaybackUpdated {
                    state: playback.clone(),
                });
            }
            change
        };

        self.push_line_change(&mut out, change);
        out.actions.push(if self.session.is_playing() {
            EngineAction::StartClock
        } else {
            EngineAction::StopClock
        });
        out
    }

    pub fn tick(&mut self, delta_ms: u64) -> EngineOutput {
        let mut out = EngineOutput::default();
        if !self.session.is_playing() {
            return out;
        }
        let change = self.session.advance(delta_ms);
        self.push_line_change(&mut out, change);
        out
    }

    pub fn apply_search(&mut self, msg: SearchMessage) -> EngineOutput {
        let mut out = EngineOutput::default();
        if self.session.key() != Some(msg.key()) {
            debug!(track = %msg.key(), "discarding search result for a previous track");
            return out;
        }

        match msg {
            SearchMessage::Matched { key, outcome } => {
                info!(
                    track = %key,
                    id = outcome.candidate.id,
                    name = %outcome.candidate.name,
                    duration = %format_time(outcome.candidate.duration_ms),
                    "match applied"
                );
                self.session.set_match(outcome.candidate.clone());
                out.events.push(PipelineEvent::MatchResolved {
                    key,
                    candidate: outcome.candidate,
                    rule: outcome.rule,
                });
            }
            SearchMessage::Unmatched { key, error } => {
                warn!(track = %key, error = %error, "track left unmatched");
                let stale = matches!(error, RecoverableError::NoMatchFound { .. });
                self.session.mark_unmatched(stale);
                out.events.push(PipelineEvent::MatchFailed { key, error });
            }
            SearchMessage::LyricsReady { key, document } => {
                let lines = document.len();
                let has_translation = document.has_translation();
                info!(track = %key, lines, has_translation, "lyrics loaded");
                let change = self.session.set_document(document);
                out.events.push(PipelineEvent::LyricsLoaded {
                    key,
                    lines,
                    has_translation,
                });
                self.push_line_change(&mut out, change);
            }
            SearchMessage::LyricsFailed { key, error } => {
                warn!(track = %key, error = %error, "continuing without lyrics");
                out.events.push(PipelineEvent::Recovered(error));
            }
        }
        out
    }

    /// Ends monitoring: clock off, pending search abandoned, session idle.
    pub fn stop(&mut self) -> EngineOutput {
        let was_tracking = self.session.phase() == SessionPhase::Tracking;
        self.session.end();
        if was_tracking {
            info!("session returned to idle");
        }
        EngineOutput {
            events: vec![PipelineEvent::Idle],
            actions: vec![EngineAction::StopClock, EngineAction::CancelSearch],
        }
    }

    fn push_line_change(&self, out: &mut EngineOutput, change: Option<LineChange>) {
        if let Some(LineChange { index }) = change {
            let line = self.session.active_line().cloned();
            if let Some(l) = &line {
                debug!(index = ?index, text = %l.text, "active line changed");
            }
            out.events.push(PipelineEvent::ActiveLineChanged { index, line });
        }
    }
}
