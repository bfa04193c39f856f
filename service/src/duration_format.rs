use std::time::Duration;

/// Formats a duration the way it appears in the report and status artifact:
/// seconds only under a minute, minutes and seconds under an hour, hours,
/// minutes and seconds beyond that.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    if total_seconds < 60 {
        format!("{total_seconds} seconds")
    } else if total_seconds < 3600 {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        format!("{minutes} minutes {seconds} seconds")
    } else {
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;
        format!("{hours} hours {minutes} minutes {seconds} seconds")
    }
}
