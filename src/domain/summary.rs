use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SUMMARY_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Roughly 1024 tokens at 4 chars per token.
pub const MAX_INPUT_CHARS: usize = 1024 * 4;
pub const MIN_INPUT_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub summary: String,
    /// Unix milliseconds at `put` time.
    pub timestamp: i64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp <= SUMMARY_TTL.as_millis() as i64
    }
}

pub fn now_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Cut `text` to the provider budget, preferring the last sentence end.
///
/// Counts characters, not bytes. Falls back to a hard cut when the kept prefix
/// has no `.` after its first character.
pub fn truncate_for_provider(text: &str) -> &str {
    let Some((cut, _)) = text.char_indices().nth(MAX_INPUT_CHARS) else {
        return text;
    };
    let head = &text[..cut];
    match head.rfind('.') {
        Some(pos) if pos > 0 => &head[..=pos],
        _ => head,
    }
}

pub fn is_too_short(text: &str) -> bool {
    text.chars().count() < MIN_INPUT_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_for_provider("One. Two."), "One. Two.");
    }

    #[test]
    fn cuts_at_last_period_within_budget() {
        let sentence = "The quick brown fox jumps over the lazy dog. ";
        let text = sentence.repeat(5000 / sentence.len() + 1);
        assert!(text.len() >= 5000);
        let out = truncate_for_provider(&text);
        assert!(out.chars().count() <= MAX_INPUT_CHARS);
        assert!(out.ends_with('.'));
        let last_period = text[..MAX_INPUT_CHARS].rfind('.').unwrap();
        assert_eq!(out.len(), last_period + 1);
    }

    #[test]
    fn hard_cut_without_period() {
        let text = "a".repeat(5000);
        assert_eq!(truncate_for_provider(&text).len(), MAX_INPUT_CHARS);
    }

    #[test]
    fn budget_counts_chars_not_bytes() {
        let text = "é".repeat(5000);
        let out = truncate_for_provider(&text);
        assert_eq!(out.chars().count(), MAX_INPUT_CHARS);
    }

    #[test]
    fn freshness_window() {
        let now = now_ms();
        let hour = 60 * 60 * 1000;
        assert!(CacheEntry { summary: "s".into(), timestamp: now - hour }.is_fresh(now));
        assert!(!CacheEntry { summary: "s".into(), timestamp: now - 25 * hour }.is_fresh(now));
    }

    #[test]
    fn minimum_length() {
        assert!(is_too_short(""));
        assert!(is_too_short("short"));
        assert!(!is_too_short(&"x".repeat(MIN_INPUT_CHARS)));
    }
}
