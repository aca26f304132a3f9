//! Backslash-escaped delimiter lists, e.g. `a,b\,c` or `0:x,1:y;0:z`.

/// Split on every `delim` not preceded by a backslash.
///
/// Escape sequences are left in the pieces so an outer split doesn't disturb
/// an inner one; call [`unescape`] on the innermost values.
pub fn split_unescaped(s: &str, delim: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delim {
            parts.push(&s[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Replace `\x` with `x` for each `x` in `chars`, and `\\` with `\`.
/// Other backslashes are kept.
pub fn unescape(s: &str, chars: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    let mut it = s.chars().peekable();
    while let Some(c) = it.next() {
        if c == '\\' {
            if let Some(&next) = it.peek() {
                if next == '\\' || chars.contains(&next) {
                    out.push(next);
                    it.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}
