//! Common time and text helpers for powder_core.

/// Whether a periodic job is due. A job that never ran is always due.
#[inline]
pub fn is_due(now_ms: u64, last_ms: Option<u64>, period_ms: u64) -> bool {
    last_ms.is_none_or(|last| now_ms.saturating_sub(last) >= period_ms)
}

/// Milliseconds from `since` to `now`, saturating at 0.
#[inline]
pub const fn elapsed_ms(now_ms: u64, since_ms: u64) -> u64 {
    now_ms.saturating_sub(since_ms)
}

/// `s` cut to at most `max` characters (never splits a code point).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte, _)) => s[..byte].to_string(),
        None => s.to_string(),
    }
}
