//! The ManageSieve command-line parser (RFC 5804 §4).
//!
//! A resumable state machine: the caller accumulates bytes from the wire
//! into a buffer and calls [`Parser::read_args`] again whenever more data
//! arrives, using a `{n, -1, -2}` result contract so no blocking I/O ever
//! happens inside the parser itself.

use crate::error::ManageSieveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Atom(String),
    Str(String),
    /// A literal at least as long as the parser's configured stream
    /// threshold (RFC 5804 §3's `string-stream`), handed back unbuffered
    /// rather than materialized as an [`Arg::Str`].
    Stream(StreamArg),
}

/// Describes a literal too large to buffer whole: `prefix` is whatever of
/// its payload was already sitting in the buffer passed to
/// [`Parser::read_args`]; `remaining` is how many more bytes the caller must
/// read directly off the wire before resuming argument parsing. The parser
/// will not parse any further argument on the line until then.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamArg {
    pub prefix: Vec<u8>,
    pub remaining: usize,
}

impl Arg {
    /// The atom/quoted-string/literal contents. Empty for [`Arg::Stream`],
    /// whose payload is read directly off the wire rather than through this
    /// buffered accessor.
    pub fn as_str(&self) -> &str {
        match self {
            Arg::Atom(s) | Arg::Str(s) => s,
            Arg::Stream(_) => "",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReadArgsResult {
    /// Full set of arguments for one command line, plus the number of bytes
    /// of `buf` consumed (including the trailing line break).
    Args(Vec<Arg>, usize),
    /// Not enough bytes buffered yet; call again once more data arrives.
    NeedMoreData,
    /// A synchronizing `{N}` literal header was read in full. The caller
    /// must send the ManageSieve continuation response (`"+ ...\r\n"`) and
    /// call `read_args` again with `continuation_sent: true` once more data
    /// arrives; the literal's bytes are not consumed until then.
    NeedContinuation,
    /// Arguments read so far on this line, then a literal at or above the
    /// stream threshold. `consumed` is how much of `buf` this call used
    /// (the header plus whatever prefix of the payload was already
    /// buffered). The caller drains `stream.remaining` bytes directly off
    /// the wire before calling `read_args` again for whatever follows the
    /// literal on the line.
    Streaming { args: Vec<Arg>, stream: StreamArg, consumed: usize },
    /// A protocol violation severe enough that the connection must close
    /// with `BYE` (`managesieve_parser_literal_end`'s "Literal size too
    /// large", or malformed UTF-8 the C parser's `uni_utf8_data_is_valid`
    /// would reject).
    Fatal(ManageSieveError),
    /// A recoverable syntax error; the caller replies `NO` and may attempt
    /// to resynchronize on the next line.
    Error(ManageSieveError),
}

/// A single command-name token, read separately from the rest of a line's
/// arguments (`managesieve_parser_read_word` in the C source).
pub fn read_word(buf: &[u8]) -> Option<(String, usize)> {
    let end = buf.iter().position(|&b| b == b' ' || b == b'\r' || b == b'\n')?;
    let word = std::str::from_utf8(&buf[..end]).ok()?.to_string();
    let mut consumed = end;
    if buf.get(consumed) == Some(&b' ') {
        consumed += 1;
    }
    Some((word, consumed))
}

#[derive(Debug, Clone, Copy)]
pub struct Parser {
    max_line_length: usize,
    stream_threshold: Option<usize>,
}

impl Parser {
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length, stream_threshold: None }
    }

    /// A literal at or above `threshold` bytes comes back as
    /// [`Arg::Stream`] instead of being buffered whole.
    pub fn with_stream_threshold(max_line_length: usize, threshold: usize) -> Self {
        Self { max_line_length, stream_threshold: Some(threshold) }
    }

    /// `continuation_sent` must be `true` once the caller has already sent
    /// the ManageSieve continuation line for a pending synchronizing
    /// literal (see [`ReadArgsResult::NeedContinuation`]); it is ignored
    /// otherwise.
    pub fn read_args(&self, buf: &[u8], continuation_sent: bool) -> ReadArgsResult {
        let mut args = Vec::new();
        let mut pos = 0usize;

        loop {
            while buf.get(pos) == Some(&b' ') {
                pos += 1;
            }

            match buf.get(pos) {
                None => return ReadArgsResult::NeedMoreData,
                Some(b'\r') | Some(b'\n') => {
                    let mut end = pos;
                    if buf.get(end) == Some(&b'\r') {
                        end += 1;
                    }
                    if buf.get(end) == Some(&b'\n') {
                        end += 1;
                    } else if buf.get(pos) == Some(&b'\r') {
                        return ReadArgsResult::NeedMoreData;
                    }
                    return ReadArgsResult::Args(args, end);
                }
                Some(b'"') => match self.read_quoted(buf, pos) {
                    Ok(Some((s, next))) => {
                        args.push(Arg::Str(s));
                        pos = next;
                    }
                    Ok(None) => return ReadArgsResult::NeedMoreData,
                    Err(e) => return ReadArgsResult::Error(e),
                },
                Some(b'{') => match self.read_literal(buf, pos, continuation_sent) {
                    Ok(LiteralOutcome::Value(s, next)) => {
                        args.push(Arg::Str(s));
                        pos = next;
                    }
                    Ok(LiteralOutcome::Stream(stream, consumed)) => {
                        return ReadArgsResult::Streaming { args, stream, consumed };
                    }
                    Ok(LiteralOutcome::NeedContinuation) => return ReadArgsResult::NeedContinuation,
                    Ok(LiteralOutcome::NeedMoreData) => return ReadArgsResult::NeedMoreData,
                    Err(fatal) => return ReadArgsResult::Fatal(fatal),
                },
                Some(_) => match read_atom(buf, pos) {
                    Some((s, next)) => {
                        args.push(Arg::Atom(s));
                        pos = next;
                    }
                    None => return ReadArgsResult::NeedMoreData,
                },
            }

            if pos >= self.max_line_length {
                return ReadArgsResult::Fatal(ManageSieveError::LineTooLong);
            }
        }
    }

    /// Reads a `"..."` quoted string starting at `buf[start]`. `Ok(None)`
    /// means more data is needed; escapes other than `\"`/`\\` and bare
    /// CR/LF are parse errors, matching the C parser exactly.
    fn read_quoted(&self, buf: &[u8], start: usize) -> Result<Option<(String, usize)>, ManageSieveError> {
        let mut i = start + 1;
        let mut bytes = Vec::new();
        loop {
            match buf.get(i) {
                None => return Ok(None),
                Some(b'"') => {
                    let s = String::from_utf8(bytes).map_err(|_| ManageSieveError::InvalidUtf8)?;
                    return Ok(Some((s, i + 1)));
                }
                Some(b'\\') => match buf.get(i + 1) {
                    None => return Ok(None),
                    Some(&b @ b'"') | Some(&b @ b'\\') => {
                        bytes.push(b);
                        i += 2;
                    }
                    Some(_) => return Err(ManageSieveError::InvalidEscape),
                },
                Some(b'\r') | Some(b'\n') => return Err(ManageSieveError::BareLineBreak),
                Some(&b) => {
                    bytes.push(b);
                    i += 1;
                }
            }
            if i - start > self.max_line_length {
                return Err(ManageSieveError::LineTooLong);
            }
        }
    }

    /// Reads a `{N}` or `{N+}` literal header followed by exactly `N` raw
    /// bytes. Oversized literals are a *fatal* error
    /// (`managesieve_parser_literal_end`'s "Literal size too large"). A
    /// synchronizing header (`{N}`, no `+`) without `continuation_sent` set
    /// stops right after the header: the payload, even if already
    /// buffered, is not consumed until the caller has sent a continuation.
    fn read_literal(&self, buf: &[u8], start: usize, continuation_sent: bool) -> Result<LiteralOutcome, ManageSieveError> {
        let close = match buf[start..].iter().position(|&b| b == b'}') {
            Some(idx) => start + idx,
            None => {
                if buf.len() - start > 20 {
                    return Err(ManageSieveError::BadLiteralSize);
                }
                return Ok(LiteralOutcome::NeedMoreData);
            }
        };
        let header = &buf[start + 1..close];
        let (digits, nonsync) = if header.last() == Some(&b'+') {
            (&header[..header.len() - 1], true)
        } else {
            (header, false)
        };
        if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
            return Err(ManageSieveError::BadLiteralSize);
        }
        let size: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(ManageSieveError::BadLiteralSize)?;
        if size > self.max_line_length {
            return Err(ManageSieveError::BadLiteralSize);
        }

        if !nonsync && !continuation_sent {
            return Ok(LiteralOutcome::NeedContinuation);
        }

        let mut data_start = close + 1;
        if buf.get(data_start) == Some(&b'\r') {
            data_start += 1;
        }
        match buf.get(data_start) {
            Some(b'\n') => data_start += 1,
            Some(_) => return Err(ManageSieveError::BadLiteralSize),
            None => return Ok(LiteralOutcome::NeedMoreData),
        }

        if let Some(threshold) = self.stream_threshold {
            if size >= threshold {
                let available = buf.len().saturating_sub(data_start).min(size);
                let prefix = buf[data_start..data_start + available].to_vec();
                return Ok(LiteralOutcome::Stream(
                    StreamArg { prefix, remaining: size - available },
                    data_start + available,
                ));
            }
        }

        if buf.len() < data_start + size {
            return Ok(LiteralOutcome::NeedMoreData);
        }
        let data = &buf[data_start..data_start + size];
        let s = String::from_utf8(data.to_vec()).map_err(|_| ManageSieveError::InvalidUtf8)?;
        Ok(LiteralOutcome::Value(s, data_start + size))
    }
}

enum LiteralOutcome {
    Value(String, usize),
    Stream(StreamArg, usize),
    NeedContinuation,
    NeedMoreData,
}

fn read_atom(buf: &[u8], start: usize) -> Option<(String, usize)> {
    let mut i = start;
    while let Some(&b) = buf.get(i) {
        if b == b' ' || b == b'\r' || b == b'\n' || b == b')' || b == b'(' {
            break;
        }
        i += 1;
    }
    if i == buf.len() {
        return None;
    }
    let s = std::str::from_utf8(&buf[start..i]).ok()?.to_string();
    Some((s, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_atoms_and_quoted_strings() {
        let parser = Parser::new(4096);
        let result = parser.read_args(b"foo \"bar baz\"\r\n", false);
        assert_eq!(
            result,
            ReadArgsResult::Args(vec![Arg::Atom("foo".into()), Arg::Str("bar baz".into())], 15)
        );
    }

    #[test]
    fn needs_more_data_without_a_line_terminator() {
        let parser = Parser::new(4096);
        assert_eq!(parser.read_args(b"foo bar", false), ReadArgsResult::NeedMoreData);
    }

    #[test]
    fn synchronizing_literal_waits_for_a_continuation_before_reading_data() {
        let parser = Parser::new(4096);
        // The payload is already fully buffered, but a sync literal must
        // still wait for the server to grant the continuation.
        assert_eq!(parser.read_args(b"{5}\r\nhello\r\n", false), ReadArgsResult::NeedContinuation);

        let result = parser.read_args(b"{5}\r\nhello\r\n", true);
        assert_eq!(result, ReadArgsResult::Args(vec![Arg::Str("hello".into())], 12));
    }

    #[test]
    fn non_synchronizing_literal_streams_without_a_continuation() {
        let parser = Parser::new(4096);
        let result = parser.read_args(b"{5+}\r\nhello\r\n", false);
        assert_eq!(result, ReadArgsResult::Args(vec![Arg::Str("hello".into())], 13));
    }

    #[test]
    fn waits_for_literal_data_to_arrive() {
        let parser = Parser::new(4096);
        assert_eq!(parser.read_args(b"{5+}\r\nhel", false), ReadArgsResult::NeedMoreData);
    }

    #[test]
    fn oversized_literal_is_fatal() {
        let parser = Parser::new(10);
        assert_eq!(
            parser.read_args(b"{100}\r\n", false),
            ReadArgsResult::Fatal(ManageSieveError::BadLiteralSize)
        );
    }

    #[test]
    fn bad_escape_in_quoted_string_is_an_error() {
        let parser = Parser::new(4096);
        assert_eq!(
            parser.read_args(b"\"a\\nb\"\r\n", false),
            ReadArgsResult::Error(ManageSieveError::InvalidEscape)
        );
    }

    #[test]
    fn bare_line_break_in_quoted_string_is_an_error() {
        let parser = Parser::new(4096);
        assert_eq!(
            parser.read_args(b"\"a\nb\"\r\n", false),
            ReadArgsResult::Error(ManageSieveError::BareLineBreak)
        );
    }

    #[test]
    fn read_word_splits_command_name() {
        assert_eq!(read_word(b"PUTSCRIPT foo\r\n"), Some(("PUTSCRIPT".to_string(), 10)));
    }

    #[test]
    fn large_literal_streams_above_the_threshold() {
        let parser = Parser::with_stream_threshold(4096, 4);
        let result = parser.read_args(b"{5+}\r\nhel", false);
        match result {
            ReadArgsResult::Streaming { args, stream, consumed } => {
                assert!(args.is_empty());
                assert_eq!(stream.prefix, b"hel");
                assert_eq!(stream.remaining, 2);
                assert_eq!(consumed, 9);
            }
            other => panic!("expected Streaming, got {other:?}"),
        }
    }

    #[test]
    fn literal_below_the_threshold_is_buffered_normally() {
        let parser = Parser::with_stream_threshold(4096, 4096);
        let result = parser.read_args(b"{5+}\r\nhello\r\n", false);
        assert_eq!(result, ReadArgsResult::Args(vec![Arg::Str("hello".into())], 13));
    }
}
