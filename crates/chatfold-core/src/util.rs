//! Shared helper utilities used across chatfold components.

const DEFAULT_LOG_LIMIT: usize = 120;

/// Sanitizes a log string by stripping newlines and capping length.
///
/// Chat text is untrusted and can be arbitrarily long or multi-line; log
/// lines must stay single-line and bounded.
pub fn sanitize_log_value(value: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }
    let mut cleaned = String::with_capacity(max_len.min(value.len()));
    let mut count = 0usize;
    let mut truncated = false;
    for ch in value.chars() {
        let ch = if ch == '\n' || ch == '\r' { ' ' } else { ch };
        cleaned.push(ch);
        count += 1;
        if count >= max_len {
            truncated = true;
            break;
        }
    }
    let trimmed = cleaned.trim();
    if truncated {
        format!("{trimmed}...")
    } else {
        trimmed.to_string()
    }
}

/// Produces a safe log snippet with the default length cap.
pub fn log_snippet(value: &str) -> String {
    sanitize_log_value(value, DEFAULT_LOG_LIMIT)
}
