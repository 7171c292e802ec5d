/// 将设备运行时间（毫秒）格式化为 HH:MM:SS.mmm
///
/// The IMU clock starts at power-on, so hours are not wrapped at 24.
pub fn format_uptime(uptime_ms: i64) -> String {
    if uptime_ms < 0 {
        return format!("Invalid timestamp: {}", uptime_ms);
    }

    let ms = uptime_ms % 1000;
    let total_secs = uptime_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let secs = total_secs % 60;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
}

/// Samples per second over a window of device timestamps (milliseconds).
pub fn sample_rate_hz(first_ms: i64, last_ms: i64, count: usize) -> Option<f64> {
    let span_ms = last_ms - first_ms;
    if count < 2 || span_ms <= 0 {
        return None;
    }
    Some((count - 1) as f64 * 1000.0 / span_ms as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_uptime() {
        assert_eq!(format_uptime(0), "00:00:00.000");
        assert_eq!(format_uptime(3_723_045), "01:02:03.045");
        assert_eq!(format_uptime(90_000_000), "25:00:00.000");
        assert_eq!(format_uptime(-5), "Invalid timestamp: -5");
    }

    #[test]
    fn sample_rate_needs_two_distinct_times() {
        assert_eq!(sample_rate_hz(0, 0, 5), None);
        assert_eq!(sample_rate_hz(0, 100, 1), None);
        assert_eq!(sample_rate_hz(1000, 2000, 101), Some(100.0));
    }
}
