//! Path-component sanitization for values substituted into naming templates.

/// Longest file name Linux accepts, in bytes.
pub(crate) const NAME_MAX: usize = 255;

/// Cuts `s` to at most `max` bytes without splitting a character.
pub(crate) fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut take = max;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    &s[..take]
}

/// Sanitizes one path component (artist, album, title...).
///
/// - Replaces NUL, `/`, `\`, control characters and `<>:"|?*` with `_`
/// - Trims leading/trailing spaces and trailing dots
/// - Limits length to 255 bytes (Linux NAME_MAX)
/// - Empty, `.` and `..` become `_`
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '\0' | '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = replaced.trim().trim_end_matches('.').trim_end();

    let mut out = truncate_on_char_boundary(trimmed, NAME_MAX).to_string();

    if out.is_empty() || out == "." || out == ".." {
        out = "_".to_string();
    }
    out
}
