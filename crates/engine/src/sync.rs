use lyric_bridge_core::{LyricDocument, LyricLine};

/// A change of the highlighted line. `None` means no line has started yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineChange {
    pub index: Option<usize>,
}

/// Maps elapsed playback time onto the active lyric line.
///
/// Changes are reported only when the active index differs from the last one
/// reported, so repeated ticks inside one line stay silent.
#[derive(Debug, Clone, Default)]
pub struct PlaybackSynchronizer {
    elapsed_ms: u64,
    document: LyricDocument,
    last_emitted: Option<usize>,
}

impl PlaybackSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn document(&self) -> &LyricDocument {
        &self.document
    }

    pub fn active_index(&self) -> Option<usize> {
        self.last_emitted
    }

    pub fn active_line(&self) -> Option<&LyricLine> {
        self.last_emitted.and_then(|i| self.document.get(i))
    }

    pub fn on_tick(&mut self, delta_ms: u64) -> Option<LineChange> {
        self.elapsed_ms = self.elapsed_ms.saturating_add(delta_ms);
        self.refresh()
    }

    /// Re-anchors elapsed time to a position reported by the device.
    pub fn seek(&mut self, position_ms: u64) -> Option<LineChange> {
        self.elapsed_ms = position_ms;
        self.refresh()
    }

    /// Swaps in a new document and recomputes right away.
    pub fn set_document(&mut self, document: LyricDocument) -> Option<LineChange> {
        self.document = document;
        self.last_emitted = None;
        self.refresh()
    }

    /// Greatest index whose time is at or before the elapsed time.
    pub fn compute_active_index(&self) -> Option<usize> {
        let now = self.elapsed_ms as f64 / 1_000.0;
        let started = self
            .document
            .lines()
            .partition_point(|line| line.time_seconds <= now);
        started.checked_sub(1)
    }

    fn refresh(&mut self) -> Option<LineChange> {
        let index = self.compute_active_index();
        if index == self.last_emitted {
            return None;
        }
        self.last_emitted = index;
        Some(LineChange { index })
    }
}

#[cfg(test)]
mod tests {
    use super::{LineChange, PlaybackSynchronizer};
    use lyric_bridge_core::{LyricDocument, LyricLine};

    fn doc() -> LyricDocument {
        LyricDocument::from_lines(vec![
            LyricLine::new(0.0, "a"),
            LyricLine::new(5.0, "b"),
            LyricLine::new(10.0, "c"),
        ])
    }

    #[test]
    fn emits_each_index_once() {
        let mut sync = PlaybackSynchronizer::new();
        assert_eq!(sync.set_document(doc()), Some(LineChange { index: Some(0) }));

        let mut emitted = vec![0];
        let mut last = 0;
        for secs in [0u64, 3, 5, 8, 12] {
            let target = secs * 1_000;
            if let Some(change) = sync.on_tick(target - last) {
                emitted.push(change.index.unwrap());
            }
            last = target;
        }
        assert_eq!(emitted, vec![0, 1, 2]);
        assert_eq!(sync.active_line().map(|l| l.text.as_str()), Some("c"));
    }

    #[test]
    fn nothing_active_before_first_line() {
        let mut sync = PlaybackSynchronizer::new();
        let late = LyricDocument::from_lines(vec![LyricLine::new(2.0, "x")]);
        assert_eq!(sync.set_document(late), None);
        assert_eq!(sync.compute_active_index(), None);
        assert_eq!(sync.on_tick(1_999), None);
        assert_eq!(sync.on_tick(1), Some(LineChange { index: Some(0) }));
    }

    #[test]
    fn empty_document_never_emits() {
        let mut sync = PlaybackSynchronizer::new();
        for _ in 0..10 {
            assert_eq!(sync.on_tick(1_000), None);
        }
        assert_eq!(sync.active_index(), None);
    }

    #[test]
    fn seeking_backwards_moves_the_line_back() {
        let mut sync = PlaybackSynchronizer::new();
        sync.set_document(doc());
        sync.seek(11_000);
        assert_eq!(sync.active_index(), Some(2));
        assert_eq!(sync.seek(6_000), Some(LineChange { index: Some(1) }));
        assert_eq!(sync.seek(6_500), None);
    }

    #[test]
    fn new_document_recomputes_immediately() {
        let mut sync = PlaybackSynchronizer::new();
        sync.seek(7_000);
        assert_eq!(sync.active_index(), None);
        assert_eq!(sync.set_document(doc()), Some(LineChange { index: Some(1) }));

        // Same position, same index, but the document changed: report again.
        assert_eq!(sync.set_document(doc()), Some(LineChange { index: Some(1) }));
    }

    #[test]
    fn equal_timestamps_resolve_to_the_last_of_the_group() {
        let mut sync = PlaybackSynchronizer::new();
        sync.set_document(LyricDocument::from_lines(vec![
            LyricLine::new(1.0, "first"),
            LyricLine::new(1.0, "second"),
        ]));
        sync.seek(1_000);
        assert_eq!(sync.active_index(), Some(1));
    }
}
