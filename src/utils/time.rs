/// This is the standard way of converting tracked seconds to a string in timekeeper: `45s`,
/// `3:07` or `1:02:03`. Fractions are dropped.
pub fn format_seconds(seconds: f64) -> String {
    let total = seconds.max(0.) as u64;
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else if minutes > 0 {
        format!("{minutes}:{seconds:02}")
    } else {
        format!("{seconds}s")
    }
}
