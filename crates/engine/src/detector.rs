use crate::session::TrackSession;
use lyric_bridge_core::PlaybackState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub is_new_track: bool,
    pub preserve_match: bool,
}

/// Decides whether a report starts a new track. The engine only searches the
/// catalog when this says so, which bounds searches to one per key change.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackChangeDetector;

impl TrackChangeDetector {
    pub fn evaluate(&self, new_state: &PlaybackState, session: &TrackSession) -> Evaluation {
        // An untitled report is "no track": it neither resets nor searches.
        if !new_state.has_title() {
            return Evaluation {
                is_new_track: false,
                preserve_match: true,
            };
        }

        let key = new_state.track_key();
        match session.key() {
            Some(prev) if *prev == key => Evaluation {
                is_new_track: false,
                preserve_match: true,
            },
            _ => Evaluation {
                is_new_track: true,
                preserve_match: false,
            },
        }
    }
}
