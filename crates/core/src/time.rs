/// Formats a millisecond offset as `m:ss`.
pub fn format_time(ms: u64) -> String {
    if ms == 0 {
        return "0:00".to_string();
    }
    let total_secs = ms / 1_000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Formats seconds as an LRC time tag body, `mm:ss.cc`.
pub fn format_lrc_tag(time_seconds: f64) -> String {
    let centis = (time_seconds.max(0.0) * 100.0).round() as u64;
    let minutes = centis / 6_000;
    let seconds = (centis / 100) % 60;
    format!("{:02}:{:02}.{:02}", minutes, seconds, centis % 100)
}
