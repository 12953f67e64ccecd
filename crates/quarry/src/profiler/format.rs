use std::time::Duration;

/// Format a duration as `12ms`, `1s 200ms`, `2m 3s 0ms` or `1h 0m 5s 7ms`.
pub fn format_exec_time(d: Duration) -> String {
    let total_ms = d.as_millis();
    let ms = total_ms % 1_000;
    let total_s = total_ms / 1_000;
    let s = total_s % 60;
    let total_m = total_s / 60;
    let m = total_m % 60;
    let h = total_m / 60;

    if h > 0 {
        format!("{h}h {m}m {s}s {ms}ms")
    } else if total_m > 0 {
        format!("{m}m {s}s {ms}ms")
    } else if total_s > 0 {
        format!("{s}s {ms}ms")
    } else {
        format!("{ms}ms")
    }
}
