//! Human-readable sizes, speeds and durations.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const SECONDS_PER_DAY: u64 = 86_400;

/// Format a byte count with the largest binary unit that keeps it under 1024.
///
/// Units stop at TB; anything larger is shown as a big TB figure.
///
/// ```
/// use parcel_library::format_bytes;
/// assert_eq!(format_bytes(0), "0B");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// assert_eq!(format_bytes(1073741824), "1.00 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    format_magnitude(bytes as f64)
}

/// Format a transfer rate in bytes per second, e.g. `"3.50 MB/s"`.
pub fn format_speed(bytes_per_second: f64) -> String {
    format!("{}/s", format_magnitude(bytes_per_second.max(0.0)))
}

fn format_magnitude(mut value: f64) -> String {
    if value == 0.0 {
        return "0B".to_string();
    }
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Format an elapsed number of seconds as `HH:MM:SS`, with a leading day
/// count once it reaches a day.
///
/// ```
/// use parcel_library::format_uptime;
/// assert_eq!(format_uptime(3_725), "01:02:05");
/// assert_eq!(format_uptime(90_061), "1d 01:01:01");
/// ```
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / SECONDS_PER_DAY;
    let rest = seconds % SECONDS_PER_DAY;
    let clock = format!("{:02}:{:02}:{:02}", rest / 3600, rest % 3600 / 60, rest % 60);
    match days {
        0 => clock,
        days => format!("{days}d {clock}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    #[rstest]
    #[case(0, "0B")]
    #[case(1, "1.00 B")]
    #[case(1023, "1023.00 B")]
    #[case(1024, "1.00 KB")]
    #[case(1536, "1.50 KB")]
    // Rounding happens after the unit is picked, so one byte short of a
    // MB still reads as 1024 KB.
    #[case(MB - 1, "1024.00 KB")]
    #[case(MB, "1.00 MB")]
    #[case(3 * MB + MB / 2, "3.50 MB")]
    #[case(GB, "1.00 GB")]
    #[case(TB, "1.00 TB")]
    #[case(1024 * TB, "1024.00 TB")]
    #[case(5000 * TB, "5000.00 TB")]
    fn test_format_bytes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(format_bytes(bytes), expected);
    }

    #[test]
    fn test_format_bytes_extremes_do_not_panic() {
        let formatted = format_bytes(u64::MAX);
        assert!(formatted.ends_with(" TB"));
    }

    #[rstest]
    #[case(KB, " KB")]
    #[case(KB * 1000, " KB")]
    #[case(MB * 17, " MB")]
    #[case(GB * 999, " GB")]
    #[case(TB * 1023, " TB")]
    fn test_format_bytes_numeric_part_below_1024(#[case] bytes: u64, #[case] unit: &str) {
        let formatted = format_bytes(bytes);
        let number: f64 = formatted.strip_suffix(unit).unwrap().parse().unwrap();
        assert!((0.0..1024.0).contains(&number), "{formatted}");
    }

    #[rstest]
    #[case(0.0, "0B/s")]
    #[case(-5.0, "0B/s")]
    #[case(512.0, "512.00 B/s")]
    #[case(1536.0, "1.50 KB/s")]
    fn test_format_speed(#[case] rate: f64, #[case] expected: &str) {
        assert_eq!(format_speed(rate), expected);
    }

    #[rstest]
    #[case(0, "00:00:00")]
    #[case(59, "00:00:59")]
    #[case(3_600, "01:00:00")]
    #[case(86_399, "23:59:59")]
    #[case(86_400, "1d 00:00:00")]
    #[case(3 * 86_400 + 4 * 3_600 + 5 * 60 + 6, "3d 04:05:06")]
    fn test_format_uptime(#[case] seconds: u64, #[case] expected: &str) {
        assert_eq!(format_uptime(seconds), expected);
    }
}
