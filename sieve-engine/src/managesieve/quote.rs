//! The ManageSieve string-quoting utility.
//!
//! One scan decides quoted-vs-literal form: a bare CR or LF anywhere in the
//! value forces literal form (`{N}\r\n` + raw bytes); otherwise the value is
//! emitted as a quoted string with `"`/`\` escaped. Bytes that aren't part
//! of a complete UTF-8 sequence are dropped, including a sequence truncated
//! at the end of the input — `quote_append` never produces invalid UTF-8
//! output even when handed invalid UTF-8 input.

/// Collapses runs of space/tab to a single space, used when rendering
/// ManageSieve human-readable reason strings.
pub fn compress_lwsp(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_run = false;
    for ch in input.chars() {
        if ch == ' ' || ch == '\t' {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// Drops any trailing byte sequence in `bytes` that isn't a complete,
/// valid UTF-8 character, then returns the valid prefix as a `String`.
fn sanitize_utf8(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) => {
            let valid_len = e.valid_up_to();
            // SAFETY-free: no unsafe, just re-check; `valid_up_to` already
            // guarantees `bytes[..valid_len]` is valid UTF-8.
            String::from_utf8(bytes[..valid_len].to_vec()).unwrap_or_default()
        }
    }
}

/// Appends `value` to `out` in either quoted or literal ManageSieve form
/// (RFC 5804 §1.3).
pub fn quote_append(out: &mut String, value: &[u8]) {
    let clean = sanitize_utf8(value);
    let needs_literal = clean.bytes().any(|b| b == b'\r' || b == b'\n');

    if needs_literal {
        out.push('{');
        out.push_str(&clean.len().to_string());
        out.push_str("}\r\n");
        out.push_str(&clean);
        return;
    }

    out.push('"');
    for ch in clean.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
}

pub fn quote(value: &str) -> String {
    let mut out = String::new();
    quote_append(&mut out, value.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_plain_strings() {
        assert_eq!(quote("hello"), "\"hello\"");
    }

    #[test]
    fn escapes_quote_and_backslash() {
        assert_eq!(quote("a\"b\\c"), "\"a\\\"b\\\\c\"");
    }

    #[test]
    fn falls_back_to_literal_form_on_line_breaks() {
        assert_eq!(quote("a\nb"), "{3}\r\na\nb");
    }

    #[test]
    fn drops_incomplete_trailing_utf8_sequence() {
        let mut bytes = b"hello".to_vec();
        bytes.push(0xC3); // lead byte of a 2-byte sequence, no continuation
        let mut out = String::new();
        quote_append(&mut out, &bytes);
        assert_eq!(out, "\"hello\"");
    }

    #[test]
    fn compresses_whitespace_runs() {
        assert_eq!(compress_lwsp("a   b\t\t c"), "a b c");
    }
}
