//! Human-readable duration formatting
//!
//! Used to render remaining limiter waits and deadlines in error detail.

use std::time::Duration;

/// Format a duration with whole-unit components, e.g. `1m 5s`
///
/// Sub-second durations fall back to milliseconds, or microseconds when
/// shorter than a millisecond.
///
/// ```
/// use std::time::Duration;
///
/// use breakwater_common::time::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
/// assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();

    if total_secs == 0 {
        let millis = duration.as_millis();
        if millis == 0 {
            return format!("{}us", duration.as_micros());
        }
        return format!("{millis}ms");
    }

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, _) => format!("{minutes}m {seconds}s"),
        _ => format!("{hours}h {minutes}m {seconds}s"),
    }
}

/// Format a duration keeping millisecond precision, e.g. `1s 500ms`
///
/// ```
/// use std::time::Duration;
///
/// use breakwater_common::time::format_duration_ms;
///
/// assert_eq!(format_duration_ms(Duration::from_millis(1500)), "1s 500ms");
/// assert_eq!(format_duration_ms(Duration::from_millis(40)), "40ms");
/// ```
pub fn format_duration_ms(duration: Duration) -> String {
    let millis = duration.subsec_millis();

    if duration.as_secs() == 0 {
        return format!("{millis}ms");
    }

    let whole = format_duration(Duration::from_secs(duration.as_secs()));
    if millis > 0 {
        format!("{whole} {millis}ms")
    } else {
        whole
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for time::format.
    use super::*;

    #[test]
    fn test_format_sub_second() {
        assert_eq!(format_duration(Duration::from_micros(90)), "90us");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
    }

    /// Validates that leading zero components are omitted but inner zeros
    /// are kept.
    #[test]
    fn test_format_components() {
        assert_eq!(format_duration(Duration::from_secs(3)), "3s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m 0s");
        assert_eq!(format_duration(Duration::from_secs(3605)), "1h 0m 5s");
    }

    #[test]
    fn test_format_ms_precision() {
        assert_eq!(format_duration_ms(Duration::ZERO), "0ms");
        assert_eq!(format_duration_ms(Duration::from_secs(2)), "2s");
        assert_eq!(format_duration_ms(Duration::from_millis(61_020)), "1m 1s 20ms");
    }
}
