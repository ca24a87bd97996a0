use lyric_bridge_core::{PlaybackState, RecoverableError};

/// Extracts a playback report from one raw log line.
///
/// Lines without a `{` are not reports and yield `Ok(None)`. The JSON object
/// starts at the first `{`; anything before it (logcat prefix, tag) is ignored.
pub fn ingest_line(line: &str) -> Result<Option<PlaybackState>, RecoverableError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(start) = line.find('{') else {
        return Ok(None);
    };

    // Only the first value counts; trailing log noise is ignored.
    let mut values = serde_json::Deserializer::from_str(&line[start..]).into_iter::<PlaybackState>();
    match values.next() {
        Some(Ok(state)) => Ok(Some(state)),
        Some(Err(err)) => Err(RecoverableError::MalformedInputLine {
            reason: err.to_string(),
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::ingest_line;
    use lyric_bridge_core::RecoverableError;

    #[test]
    fn reads_report_after_logcat_prefix() {
        let line = r#"10-19 12:00:01.123  4242  4242 I USB_MUSIC: {"title":"Song (Eng)","artist":"A","album":"Alb","position":0,"state":true,"duration":0}"#;
        let state = ingest_line(line).unwrap().unwrap();
        assert_eq!(state.title, "Song (Eng)");
        assert_eq!(state.artist, "A");
        assert_eq!(state.album, "Alb");
        assert!(state.is_playing);
        assert_eq!(state.duration_ms, 0);
    }

    #[test]
    fn non_report_lines_are_skipped_silently() {
        assert_eq!(ingest_line("--------- beginning of main"), Ok(None));
        assert_eq!(ingest_line("   "), Ok(None));
    }

    #[test]
    fn broken_json_is_reported() {
        let err = ingest_line(r#"USB_MUSIC: {"title":"x","position":"#).unwrap_err();
        assert!(matches!(err, RecoverableError::MalformedInputLine { .. }));

        let err = ingest_line(r#"{"title":"x","position":"soon"}"#).unwrap_err();
        assert!(matches!(err, RecoverableError::MalformedInputLine { .. }));
    }

    #[test]
    fn trailing_noise_after_object_is_ignored() {
        let state = ingest_line(r#"{"title":"t","artist":"a","position":7,"state":true} (pid 12)"#)
            .unwrap()
            .unwrap();
        assert_eq!(state.position_ms, 7);
    }

    #[test]
    fn duration_is_optional() {
        let state = ingest_line(r#"{"title":"t","artist":"a","album":"b","position":42,"state":false}"#)
            .unwrap()
            .unwrap();
        assert_eq!(state.position_ms, 42);
        assert!(!state.is_playing);
        assert_eq!(state.duration_ms, 0);
    }

    #[test]
    fn unknown_position_still_reports_the_track() {
        let line = r#"I USB_MUSIC: {"title":"New Song","artist":"A","album":"","position":-1,"state":true}"#;
        let state = ingest_line(line).unwrap().unwrap();
        assert_eq!(state.title, "New Song");
        assert_eq!(state.position_ms, 0);
        assert!(state.is_playing);
    }
}
