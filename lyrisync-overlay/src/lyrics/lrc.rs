//! LRC lyric parsing
//!
//! Accepts `[mm:ss]`, `[mm:ss.xx]` and `[mm:ss.xxx]` tags, several tags per
//! row (repeated choruses), and skips metadata tags such as `[ar:Artist]` as
//! well as rows without any timestamp.

use super::line::TimedText;

/// Parse LRC text into start-time-only lines, sorted by start
///
/// Rows whose text is empty after the tags are kept only if `keep_blank` is
/// set; instrumental gaps in synced lyrics are commonly encoded that way.
pub fn parse_lrc(raw: &str, keep_blank: bool) -> Vec<TimedText> {
    let mut lines = Vec::new();

    for row in raw.lines() {
        let mut rest = row.trim();
        if rest.is_empty() {
            continue;
        }

        let mut timestamps = Vec::new();
        while rest.starts_with('[') {
            let Some(end_idx) = rest.find(']') else {
                break;
            };
            if let Some(ms) = parse_timestamp_tag(&rest[1..end_idx]) {
                timestamps.push(ms);
            }
            rest = rest[end_idx + 1..].trim_start();
        }

        if timestamps.is_empty() || (rest.is_empty() && !keep_blank) {
            continue;
        }

        for start_ms in timestamps {
            lines.push(TimedText::new(start_ms, rest.trim_end()));
        }
    }

    lines.sort_by_key(|l| l.start_ms);
    lines
}

/// Parse the inside of one `[...]` tag as `mm:ss(.fraction)`
///
/// Tags whose offset does not fit in `u64` milliseconds are rejected.
fn parse_timestamp_tag(tag: &str) -> Option<u64> {
    let (min_part, sec_part) = tag.split_once(':')?;
    let minutes: u64 = min_part.trim().parse().ok()?;

    let (sec_str, frac_str) = match sec_part.split_once('.') {
        Some((sec, frac)) => (sec, frac),
        None => (sec_part, ""),
    };
    let seconds: u64 = sec_str.parse().ok()?;
    if seconds >= 60 {
        return None;
    }

    if !frac_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut frac_digits: String = frac_str.chars().take(3).collect();
    while frac_digits.len() < 3 {
        frac_digits.push('0');
    }
    let frac_ms: u64 = frac_digits.parse().ok()?;

    minutes
        .checked_mul(60_000)?
        .checked_add(seconds * 1_000 + frac_ms)
}
