//! Time formatting for log and CLI output

/// Format a millisecond offset as `mm:ss.mmm`
///
/// Minutes are not wrapped into hours, so a 75 minute offset reads `75:00.000`.
pub fn format_ms(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{:02}:{:02}.{:03}", seconds / 60, seconds % 60, ms % 1000)
}
