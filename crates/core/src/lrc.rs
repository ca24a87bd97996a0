//! Timed-text (LRC) parsing, bilingual merge and export.
//!
//! A line carries one or more `[mm:ss]`, `[mm:ss.cc]` or `[mm:ss.ccc]` tags
//! followed by its text. Every tag yields one [`LyricLine`] sharing that text.

use crate::error::RecoverableError;
use crate::model::{LyricDocument, LyricLine, LyricPayload};
use crate::time::format_lrc_tag;
use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Largest gap between an original line and its translation.
pub const TRANSLATION_TOLERANCE_SECS: f64 = 0.5;

/// Anything bracketed that starts like a timestamp, well-formed or not.
static TIME_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+:[^\[\]]*)\]").expect("time fragment regex"));

static TIME_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}):(\d{2})(?:\.(\d{2,3}))?$").expect("time tag regex")
});

pub fn parse(raw: &str) -> LyricDocument {
    let mut lines = Vec::new();
    let mut skipped = 0usize;

    for (idx, raw_line) in raw.lines().enumerate() {
        for issue in scan_line(raw_line, idx + 1, &mut lines) {
            skipped += 1;
            debug!(error = %issue, "skipping timed-text fragment");
        }
    }

    trace!(lines = lines.len(), skipped, "parsed timed text");
    LyricDocument::from_lines(lines)
}

/// Parses `translation_raw` and attaches each translation to the original
/// line within [`TRANSLATION_TOLERANCE_SECS`]. Never adds or removes lines.
pub fn merge_with_translation(original: LyricDocument, translation_raw: &str) -> LyricDocument {
    merge_with_translation_within(original, translation_raw, TRANSLATION_TOLERANCE_SECS)
}

pub fn merge_with_translation_within(
    mut original: LyricDocument,
    translation_raw: &str,
    tolerance_secs: f64,
) -> LyricDocument {
    if translation_raw.trim().is_empty() {
        return original;
    }

    let translation = parse(translation_raw);
    for line in original.lines_mut() {
        let found = translation
            .lines()
            .iter()
            .find(|t| (t.time_seconds - line.time_seconds).abs() < tolerance_secs);
        if let Some(t) = found {
            line.translation = Some(t.text.clone());
        }
    }
    original
}

/// Builds the display document from a catalog lyric response.
pub fn from_payload(payload: &LyricPayload, tolerance_secs: f64) -> LyricDocument {
    let Some(original) = payload.original() else {
        return LyricDocument::empty();
    };
    let doc = parse(original);
    match payload.translation() {
        Some(translation) => merge_with_translation_within(doc, translation, tolerance_secs),
        None => doc,
    }
}

fn scan_line(line: &str, line_no: usize, out: &mut Vec<LyricLine>) -> Vec<RecoverableError> {
    let line = line.trim();
    let mut issues = Vec::new();
    if line.is_empty() {
        return issues;
    }

    let mut times = Vec::new();
    for cap in TIME_FRAGMENT.captures_iter(line) {
        let inner = &cap[1];
        match parse_tag(inner) {
            Some(t) => times.push(t),
            None => issues.push(RecoverableError::LineParseMalformed {
                line: line_no,
                fragment: cap[0].to_string(),
            }),
        }
    }
    if times.is_empty() {
        return issues;
    }

    let text = TIME_FRAGMENT.replace_all(line, "");
    let text = text.trim();
    if text.is_empty() {
        return issues;
    }

    out.extend(times.into_iter().map(|t| LyricLine::new(t, text)));
    issues
}

fn parse_tag(inner: &str) -> Option<f64> {
    let cap = TIME_TAG.captures(inner)?;
    let minutes: u32 = cap[1].parse().ok()?;
    let seconds: u32 = cap[2].parse().ok()?;
    let millis: u32 = match cap.get(3) {
        Some(frac) if frac.as_str().len() == 2 => frac.as_str().parse::<u32>().ok()? * 10,
        Some(frac) => frac.as_str().parse().ok()?,
        None => 0,
    };
    Some(f64::from(minutes * 60 + seconds) + f64::from(millis) / 1_000.0)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LrcHeader {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub by: String,
}

/// Renders an LRC file: metadata header, primary lines, then the translation
/// block (same timestamps) when requested and present.
pub fn write_lrc(header: &LrcHeader, doc: &LyricDocument, include_translation: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[ti:{}]", header.title);
    let _ = writeln!(out, "[ar:{}]", header.artist);
    let _ = writeln!(out, "[al:{}]", header.album);
    let _ = writeln!(out, "[by:{}]", header.by);
    out.push('\n');

    for line in doc.lines() {
        let _ = writeln!(out, "[{}]{}", format_lrc_tag(line.time_seconds), line.text);
    }

    if include_translation && doc.has_translation() {
        out.push('\n');
        for line in doc.lines() {
            if let Some(t) = line.translation.as_deref().filter(|t| !t.is_empty()) {
                let _ = writeln!(out, "[{}]{}", format_lrc_tag(line.time_seconds), t);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{
        from_payload, merge_with_translation, merge_with_translation_within, parse, write_lrc,
        LrcHeader, TRANSLATION_TOLERANCE_SECS,
    };
    use crate::model::{LyricBlock, LyricPayload};

    fn texts(doc: &crate::LyricDocument) -> Vec<&str> {
        doc.lines().iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn parses_single_line_with_centiseconds() {
        let doc = parse("[01:02.50]hello");
        assert_eq!(doc.len(), 1);
        assert!((doc.lines()[0].time_seconds - 62.5).abs() < 1e-9);
        assert_eq!(doc.lines()[0].text, "hello");
        assert!(doc.lines()[0].translation.is_none());
    }

    #[test]
    fn pure_timestamp_line_is_ignored() {
        assert!(parse("[00:00]").is_empty());
        assert!(parse("[00:00.00]   ").is_empty());
    }

    #[test]
    fn empty_input_is_empty_document() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n  \r\n").is_empty());
    }

    #[test]
    fn milliseconds_and_bare_tags() {
        let doc = parse("[00:01.234]a\n[00:03]b");
        assert!((doc.lines()[0].time_seconds - 1.234).abs() < 1e-9);
        assert!((doc.lines()[1].time_seconds - 3.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_tags_emit_one_line_each_and_sort() {
        let doc = parse("[00:30.00]chorus\n[00:10.00][00:50.00]hook\n[ti:Title]\nplain text");
        assert_eq!(texts(&doc), vec!["hook", "chorus", "hook"]);
        let times: Vec<f64> = doc.lines().iter().map(|l| l.time_seconds).collect();
        assert_eq!(times, vec![10.0, 30.0, 50.0]);
    }

    #[test]
    fn ties_keep_input_order() {
        let doc = parse("[00:05.00]first\n[00:05.00]second\n[00:01.00]zero");
        assert_eq!(texts(&doc), vec!["zero", "first", "second"]);
    }

    #[test]
    fn malformed_fragments_do_not_abort_document() {
        let doc = parse("[00:01.5]bad fraction\n[0x:10]junk\n[00:02.00][1:2x]good");
        assert_eq!(texts(&doc), vec!["good"]);
        assert!((doc.lines()[0].time_seconds - 2.0).abs() < 1e-9);
    }

    #[test]
    fn crlf_input_is_accepted() {
        let doc = parse("[00:01.00]a\r\n[00:02.00]b\r\n");
        assert_eq!(texts(&doc), vec!["a", "b"]);
    }

    #[test]
    fn merge_attaches_translation_within_tolerance() {
        let original = parse("[00:01.00]one\n[00:05.00]two\n[00:09.00]three");
        let merged = merge_with_translation(original, "[00:01.20]uno\n[00:05.60]dos\n[00:20.00]extra");
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.lines()[0].translation.as_deref(), Some("uno"));
        assert_eq!(merged.lines()[1].translation, None);
        assert_eq!(merged.lines()[2].translation, None);
    }

    #[test]
    fn merge_never_changes_line_count() {
        let cases = [
            ("", "[00:01.00]x"),
            ("[00:01.00]a", ""),
            ("[00:01.00]a\n[00:01.10]b", "[00:01.05]t\n[00:01.06]u\n[00:09.00]v"),
            ("[00:01.00][00:02.00]a", "not timed at all"),
        ];
        for (orig, trans) in cases {
            let original = parse(orig);
            let count = original.len();
            let merged = merge_with_translation(original, trans);
            assert_eq!(merged.len(), count, "original={orig:?}");
        }
    }

    #[test]
    fn merge_tolerance_is_overridable() {
        let original = parse("[00:01.00]one");
        let merged = merge_with_translation_within(original, "[00:01.80]uno", 1.0);
        assert_eq!(merged.lines()[0].translation.as_deref(), Some("uno"));
        assert!(TRANSLATION_TOLERANCE_SECS < 0.8);
    }

    #[test]
    fn payload_with_translation_is_merged() {
        let payload = LyricPayload {
            code: 200,
            lrc: Some(LyricBlock {
                lyric: Some("[00:01.00]hello".to_string()),
            }),
            tlyric: Some(LyricBlock {
                lyric: Some("[00:01.00]bonjour".to_string()),
            }),
        };
        let doc = from_payload(&payload, TRANSLATION_TOLERANCE_SECS);
        assert_eq!(doc.lines()[0].display_text(), "hello\nbonjour");

        let empty = from_payload(&LyricPayload::default(), TRANSLATION_TOLERANCE_SECS);
        assert!(empty.is_empty());
    }

    #[test]
    fn reparsing_exported_text_is_stable() {
        let doc = parse("[00:03.10]c\n[00:01.00]a\n[00:02.25]b\n[00:02.25]b2");
        let header = LrcHeader {
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            by: "lyric-bridge".to_string(),
        };
        let text = write_lrc(&header, &doc, false);
        assert!(text.starts_with("[ti:Song]\n[ar:Artist]\n[al:Album]\n[by:lyric-bridge]\n"));

        let reparsed = parse(&text);
        assert_eq!(reparsed.len(), doc.len());
        assert_eq!(texts(&reparsed), texts(&doc));
    }

    #[test]
    fn export_appends_translation_block() {
        let doc = merge_with_translation(parse("[00:01.00]hello\n[00:02.00]world"), "[00:01.00]salut");
        let text = write_lrc(&LrcHeader::default(), &doc, true);
        assert!(text.ends_with("[00:01.00]hello\n[00:02.00]world\n\n[00:01.00]salut\n"));

        let without = write_lrc(&LrcHeader::default(), &doc, false);
        assert!(!without.contains("salut"));
    }
}
