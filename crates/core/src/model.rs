use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// One playback report from the companion device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PlaybackState {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(rename = "position", default, deserialize_with = "clamped_ms")]
    pub position_ms: u64,
    #[serde(rename = "state", default)]
    pub is_playing: bool,
    #[serde(rename = "duration", default, deserialize_with = "clamped_ms")]
    pub duration_ms: u64,
}

/// Android reports `-1` for an unknown position; negatives read as 0.
fn clamped_ms<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(u64::try_from(raw).unwrap_or(0))
}

impl PlaybackState {
    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }

    pub fn track_key(&self) -> TrackKey {
        TrackKey::new(&self.title, &self.artist)
    }
}

/// Drops a trailing parenthetical (usually a translated title) and trims.
pub fn clean_title(title: &str) -> &str {
    match title.find('(') {
        Some(idx) => title[..idx].trim(),
        None => title.trim(),
    }
}

/// Normalized (title, artist) identity used for change detection.
///
/// Equality and hashing ignore case.
#[derive(Debug, Clone)]
pub struct TrackKey {
    title: String,
    artist: String,
    folded: String,
}

impl TrackKey {
    pub fn new(title: &str, artist: &str) -> Self {
        let title = clean_title(title).to_string();
        let artist = artist.trim().to_string();
        let folded = format!("{} - {}", title, artist).to_lowercase();
        Self {
            title,
            artist,
            folded,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }
}

impl PartialEq for TrackKey {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for TrackKey {}

impl Hash for TrackKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl fmt::Display for TrackKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ArtistRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AlbumRef {
    #[serde(default)]
    pub name: String,
}

/// A song entry as returned by the catalog search, in service order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CatalogCandidate {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: Option<AlbumRef>,
    #[serde(rename = "duration", alias = "duration_ms", alias = "dt", default)]
    pub duration_ms: u64,
}

impl CatalogCandidate {
    pub fn artist_names(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn album_name(&self) -> Option<&str> {
        self.album.as_ref().map(|a| a.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LyricBlock {
    #[serde(default)]
    pub lyric: Option<String>,
}

/// Lyric lookup response: the primary timed text and an optional translation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LyricPayload {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub lrc: Option<LyricBlock>,
    #[serde(default)]
    pub tlyric: Option<LyricBlock>,
}

impl LyricPayload {
    pub fn original(&self) -> Option<&str> {
        self.lrc
            .as_ref()
            .and_then(|b| b.lyric.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn translation(&self) -> Option<&str> {
        self.tlyric
            .as_ref()
            .and_then(|b| b.lyric.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LyricLine {
    pub time_seconds: f64,
    pub text: String,
    pub translation: Option<String>,
}

impl LyricLine {
    pub fn new(time_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            time_seconds,
            text: text.into(),
            translation: None,
        }
    }

    pub fn has_translation(&self) -> bool {
        self.translation.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Line text, followed by the translation on its own line when present.
    pub fn display_text(&self) -> String {
        match self.translation.as_deref() {
            Some(t) if !t.is_empty() => format!("{}\n{}", self.text, t),
            _ => self.text.clone(),
        }
    }
}

/// Lyric lines ordered by time. Construct through `from_lines` or the parser
/// so the ordering holds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LyricDocument {
    lines: Vec<LyricLine>,
}

impl LyricDocument {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Stable sort: lines sharing a timestamp keep their input order.
    pub fn from_lines(mut lines: Vec<LyricLine>) -> Self {
        lines.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
        Self { lines }
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    pub fn get(&self, index: usize) -> Option<&LyricLine> {
        self.lines.get(index)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn has_translation(&self) -> bool {
        self.lines.iter().any(LyricLine::has_translation)
    }

    pub(crate) fn lines_mut(&mut self) -> &mut [LyricLine] {
        &mut self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::{clean_title, CatalogCandidate, LyricDocument, LyricLine, PlaybackState, TrackKey};

    #[test]
    fn track_key_ignores_parenthetical_and_case() {
        assert_eq!(
            TrackKey::new("Song (English)", "Artist"),
            TrackKey::new("Song", "Artist")
        );
        assert_eq!(
            TrackKey::new("SONG", " artist "),
            TrackKey::new("song", "Artist")
        );
        assert_ne!(TrackKey::new("Song", "A"), TrackKey::new("Song", "B"));
        assert_eq!(TrackKey::new("Song (Eng)", "A").to_string(), "Song - A");
    }

    #[test]
    fn clean_title_cuts_at_first_paren() {
        assert_eq!(clean_title("  Hello (Live) (Remix)"), "Hello");
        assert_eq!(clean_title("(Intro)"), "");
        assert_eq!(clean_title("Plain"), "Plain");
    }

    #[test]
    fn playback_state_reads_device_json() {
        let state: PlaybackState = serde_json::from_str(
            r#"{"title":"T","artist":"A","album":"B","position":1500,"state":true}"#,
        )
        .unwrap();
        assert_eq!(state.position_ms, 1500);
        assert!(state.is_playing);
        assert_eq!(state.duration_ms, 0);
    }

    #[test]
    fn unknown_position_reads_as_zero() {
        let state: PlaybackState = serde_json::from_str(
            r#"{"title":"New Song","artist":"A","position":-1,"state":true,"duration":-1}"#,
        )
        .unwrap();
        assert_eq!(state.title, "New Song");
        assert_eq!(state.position_ms, 0);
        assert_eq!(state.duration_ms, 0);
    }

    #[test]
    fn candidate_accepts_duration_aliases() {
        let a: CatalogCandidate =
            serde_json::from_str(r#"{"id":1,"name":"x","duration":1000}"#).unwrap();
        let b: CatalogCandidate =
            serde_json::from_str(r#"{"id":1,"name":"x","duration_ms":2000}"#).unwrap();
        assert_eq!(a.duration_ms, 1000);
        assert_eq!(b.duration_ms, 2000);
        assert!(a.artists.is_empty());
    }

    #[test]
    fn document_sort_is_stable() {
        let doc = LyricDocument::from_lines(vec![
            LyricLine::new(5.0, "b"),
            LyricLine::new(1.0, "a"),
            LyricLine::new(5.0, "c"),
        ]);
        let texts: Vec<_> = doc.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }
}
