//! Human-readable show time formatting
//!
//! Playlist and step durations are reported to remote control surfaces as
//! `M:SS.mmm` strings. Minutes are not wrapped into hours.

/// Format a millisecond duration as `M:SS.mmm`.
///
/// # Examples
///
/// ```
/// use lss_common::human_time::format_show_time;
///
/// assert_eq!(format_show_time(0), "0:00.000");
/// assert_eq!(format_show_time(1_500), "0:01.500");
/// assert_eq!(format_show_time(4_500), "0:04.500");
/// assert_eq!(format_show_time(61_001), "1:01.001");
/// ```
pub fn format_show_time(ms: u64) -> String {
    format!("{}:{:02}.{:03}", ms / 60_000, (ms % 60_000) / 1000, ms % 1000)
}

/// Format a millisecond duration as a coarse `M:SS` string for log lines.
pub fn format_show_time_coarse(ms: u64) -> String {
    format!("{}:{:02}", ms / 60_000, (ms % 60_000) / 1000)
}
