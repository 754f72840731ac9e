//! Filesystem-safe names from arbitrary titles.

/// Characters that are reserved in file names on at least one major platform.
pub const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Map an arbitrary title to a safe file stem.
///
/// Reserved and control characters are dropped, whitespace runs become a
/// single `_`, repeated underscores collapse, the result is cut to
/// `max_len` characters and stripped of leading/trailing underscores.
/// Total and idempotent; may return an empty string.
#[must_use]
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(name.len().min(max_len * 4));
    let mut last_was_underscore = false;

    for c in name.chars() {
        let mapped = if c.is_whitespace() {
            '_'
        } else if RESERVED_CHARS.contains(&c) || c.is_control() {
            continue;
        } else {
            c
        };

        if mapped == '_' {
            if last_was_underscore {
                continue;
            }
            last_was_underscore = true;
        } else {
            last_was_underscore = false;
        }
        out.push(mapped);
    }

    let truncated: String = out.chars().take(max_len).collect();
    truncated.trim_matches('_').to_string()
}
