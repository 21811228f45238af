// Low-level scanning helpers for PHP source text
//
// All helpers work on byte offsets and keep the input length intact, so
// offsets found in a blanked copy are valid in the original text.

/// Replace comments with spaces, keeping newlines and string literals.
///
/// `#[` starts an attribute, not a comment.
pub fn strip_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => i = skip_string(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = blank_line(&mut out, bytes, i),
            b'#' if bytes.get(i + 1) != Some(&b'[') => i = blank_line(&mut out, bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = find_bytes(bytes, i + 2, b"*/").map_or(bytes.len(), |e| e + 2);
                for slot in out.iter_mut().take(end).skip(i) {
                    if *slot != b'\n' {
                        *slot = b' ';
                    }
                }
                i = end;
            }
            _ => i += 1,
        }
    }

    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

fn blank_line(out: &mut [u8], bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && bytes[i] != b'\n' {
        out[i] = b' ';
        i += 1;
    }
    i
}

fn find_bytes(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Index just past the string literal starting at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn is_open(b: u8) -> bool {
    matches!(b, b'(' | b'[' | b'{')
}

fn is_close(b: u8) -> bool {
    matches!(b, b')' | b']' | b'}')
}

/// Offset of the delimiter closing the one at `open`.
///
/// Assumes comments were already blanked.
pub fn matching_delimiter(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if open >= bytes.len() || !is_open(bytes[open]) {
        return None;
    }
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' || b == b'"' {
            i = skip_string(bytes, i);
            continue;
        }
        if is_open(b) {
            depth += 1;
        } else if is_close(b) {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// First occurrence of `pattern` outside strings and nested delimiters
pub fn find_top_level(text: &str, pattern: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let needle = pattern.as_bytes();
    if needle.is_empty() {
        return None;
    }
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' || b == b'"' {
            if depth == 0 && bytes[i..].starts_with(needle) {
                return Some(i);
            }
            i = skip_string(bytes, i);
            continue;
        }
        if depth == 0 && bytes[i..].starts_with(needle) {
            return Some(i);
        }
        if is_open(b) {
            depth += 1;
        } else if is_close(b) {
            depth = depth.saturating_sub(1);
        }
        i += 1;
    }
    None
}

/// Split on `separator` where it appears outside strings and nesting
pub fn split_top_level(text: &str, separator: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' || b == b'"' {
            i = skip_string(bytes, i);
            continue;
        }
        if is_open(b) {
            depth += 1;
        } else if is_close(b) {
            depth = depth.saturating_sub(1);
        } else if b == separator && depth == 0 {
            parts.push(&text[start..i]);
            start = i + 1;
        }
        i += 1;
    }
    parts.push(&text[start.min(text.len())..]);
    parts
}

/// Blank everything inside nested `{ }` blocks, keeping the braces.
/// String contents at the top level are blanked too, quotes kept.
///
/// Applied to a class body this leaves only member declarations visible.
pub fn mask_nested_blocks(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = bytes.to_vec();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' || b == b'"' {
            let end = skip_string(bytes, i);
            if depth > 0 {
                blank(&mut out, i, end);
            } else {
                blank(&mut out, i + 1, end.saturating_sub(1).max(i + 1));
            }
            i = end;
            continue;
        }
        match b {
            b'{' => {
                if depth > 0 {
                    out[i] = b' ';
                }
                depth += 1;
            }
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth > 0 {
                    out[i] = b' ';
                }
            }
            b'\n' => {}
            _ if depth > 0 => out[i] = b' ',
            _ => {}
        }
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| text.to_string())
}

fn blank(out: &mut [u8], from: usize, to: usize) {
    for slot in out.iter_mut().take(to).skip(from) {
        if *slot != b'\n' {
            *slot = b' ';
        }
    }
}

/// Value of a single- or double-quoted literal, `None` for anything else
pub fn unquote(raw: &str) -> Option<String> {
    let s = raw.trim();
    let quote = s.chars().next()?;
    if (quote != '\'' && quote != '"') || s.len() < 2 || !s.ends_with(quote) {
        return None;
    }
    let inner = &s[1..s.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match (quote, chars.next()) {
            (_, Some('\\')) => out.push('\\'),
            ('\'', Some('\'')) => out.push('\''),
            ('"', Some('"')) => out.push('"'),
            ('"', Some('n')) => out.push('\n'),
            ('"', Some('t')) => out.push('\t'),
            ('"', Some('$')) => out.push('$'),
            (_, Some(other)) => {
                out.push('\\');
                out.push(other);
            }
            (_, None) => out.push('\\'),
        }
    }
    Some(out)
}

/// 1-based line number of a byte offset
pub fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
