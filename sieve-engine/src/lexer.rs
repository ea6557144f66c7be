//! The token layer.
//!
//! Hand-written rather than built on `nom`'s combinators: Sieve's lexical
//! grammar (RFC 5228 §2.1-2.4) is a single left-to-right scan with no
//! backtracking, and `nom` earns its keep one layer up, in [`crate::parser`],
//! where the grammar really does need alternation and repetition combinators.

use sieve_types::SourceLocation;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Tag(String),
    Number(u64),
    QuotedString(String),
    MultiLine(String),
    LBrace,
    RBrace,
    LParen,
    RParen,
    Semicolon,
    Comma,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

/// RFC 5228 §1.6: `1K = 1024`, `1M = 1024K`, `1G = 1024M`.
fn apply_scale(value: u64, scale: Option<char>) -> Option<u64> {
    let factor: u64 = match scale {
        None => 1,
        Some('K') | Some('k') => 1024,
        Some('M') | Some('m') => 1024 * 1024,
        Some('G') | Some('g') => 1024 * 1024 * 1024,
        Some(_) => return None,
    };
    value.checked_mul(factor)
}

pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    loc: SourceLocation,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            input: source.as_bytes(),
            pos: 0,
            loc: SourceLocation::START,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        self.loc.advance(b as char);
        Some(b)
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'#') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.loc;
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => return Err(ParseError::UnterminatedComment(start)),
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                Some(0) => return Err(ParseError::NulByte(self.loc)),
                _ => return Ok(()),
            }
        }
    }

    fn lex_identifier_or_number(&mut self) -> Result<Token, ParseError> {
        let start = self.loc;
        let start_pos = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        let raw = std::str::from_utf8(&self.input[start_pos..self.pos])
            .map_err(|_| ParseError::InvalidUtf8(start))?;

        if raw.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            let digits_end = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
            let (digits, rest) = raw.split_at(digits_end);
            let scale = match rest {
                "" => None,
                s if s.len() == 1 => Some(s.chars().next().unwrap()),
                _ => return Err(ParseError::InvalidNumber(start, raw.to_string())),
            };
            if let Some(c) = scale {
                if !matches!(c, 'K' | 'k' | 'M' | 'm' | 'G' | 'g') {
                    return Err(ParseError::InvalidNumber(start, raw.to_string()));
                }
            }
            let value: u64 = digits
                .parse()
                .map_err(|_| ParseError::InvalidNumber(start, raw.to_string()))?;
            let scaled = apply_scale(value, scale)
                .ok_or_else(|| ParseError::InvalidNumber(start, raw.to_string()))?;
            return Ok(Token {
                kind: TokenKind::Number(scaled),
                location: start,
            });
        }

        Ok(Token {
            kind: TokenKind::Identifier(raw.to_string()),
            location: start,
        })
    }

    fn lex_tag(&mut self) -> Result<Token, ParseError> {
        let start = self.loc;
        self.advance(); // ':'
        let start_pos = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start_pos {
            return Err(ParseError::UnexpectedChar(start, ':'));
        }
        let raw = std::str::from_utf8(&self.input[start_pos..self.pos])
            .map_err(|_| ParseError::InvalidUtf8(start))?;
        Ok(Token {
            kind: TokenKind::Tag(raw.to_string()),
            location: start,
        })
    }

    /// `"..."` with `\"` and `\\` escapes only; the closing quote must yield
    /// a fully valid UTF-8 string.
    fn lex_quoted_string(&mut self) -> Result<Token, ParseError> {
        let start = self.loc;
        self.advance(); // opening '"'
        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                None => return Err(ParseError::UnterminatedString(start)),
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(b @ b'"') | Some(b @ b'\\') => bytes.push(b),
                    _ => return Err(ParseError::UnexpectedChar(self.loc, '\\')),
                },
                Some(b) => bytes.push(b),
            }
        }
        let s = String::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8(start))?;
        Ok(Token {
            kind: TokenKind::QuotedString(s),
            location: start,
        })
    }

    /// `text:` multi-line literal terminated by a line containing only `.`
    /// (RFC 5228 §2.4.2); a leading `..` on a data line is unescaped to `.`.
    fn lex_multiline(&mut self) -> Result<Token, ParseError> {
        let start = self.loc;
        // consume "text:" identifier already matched by caller; skip to EOL
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.advance();
        }
        self.advance(); // '\n'

        let mut out = String::new();
        loop {
            let line_start = self.pos;
            while let Some(b) = self.peek() {
                if b == b'\n' {
                    break;
                }
                self.advance();
            }
            let line = std::str::from_utf8(&self.input[line_start..self.pos])
                .map_err(|_| ParseError::InvalidUtf8(start))?;
            let had_newline = self.peek() == Some(b'\n');
            if had_newline {
                self.advance();
            }
            if line == "." {
                break;
            }
            if !had_newline && self.pos >= self.input.len() {
                return Err(ParseError::UnterminatedString(start));
            }
            if let Some(stripped) = line.strip_prefix("..") {
                out.push('.');
                out.push_str(stripped);
            } else {
                out.push_str(line);
            }
            out.push('\n');
        }
        Ok(Token {
            kind: TokenKind::MultiLine(out),
            location: start,
        })
    }

    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia()?;
        let loc = self.loc;
        match self.peek() {
            None => Ok(Token {
                kind: TokenKind::Eof,
                location: loc,
            }),
            Some(b'{') => {
                self.advance();
                Ok(Token {
                    kind: TokenKind::LBrace,
                    location: loc,
                })
            }
            Some(b'}') => {
                self.advance();
                Ok(Token {
                    kind: TokenKind::RBrace,
                    location: loc,
                })
            }
            Some(b'(') => {
                self.advance();
                Ok(Token {
                    kind: TokenKind::LParen,
                    location: loc,
                })
            }
            Some(b')') => {
                self.advance();
                Ok(Token {
                    kind: TokenKind::RParen,
                    location: loc,
                })
            }
            Some(b';') => {
                self.advance();
                Ok(Token {
                    kind: TokenKind::Semicolon,
                    location: loc,
                })
            }
            Some(b',') => {
                self.advance();
                Ok(Token {
                    kind: TokenKind::Comma,
                    location: loc,
                })
            }
            Some(b':') => self.lex_tag(),
            Some(b'"') => self.lex_quoted_string(),
            Some(b) if b.is_ascii_digit() => self.lex_identifier_or_number(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                let save = self.pos;
                let save_loc = self.loc;
                let tok = self.lex_identifier_or_number()?;
                if let TokenKind::Identifier(ref name) = tok.kind {
                    if name == "text" && self.peek() == Some(b':') {
                        self.advance();
                        return self.lex_multiline();
                    }
                }
                let _ = (save, save_loc);
                Ok(tok)
            }
            Some(b) => Err(ParseError::UnexpectedChar(loc, b as char)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn scales_numbers_per_rfc5228() {
        assert_eq!(kinds("1K"), vec![TokenKind::Number(1024)]);
        assert_eq!(kinds("2M"), vec![TokenKind::Number(2 * 1024 * 1024)]);
        assert_eq!(kinds("100"), vec![TokenKind::Number(100)]);
    }

    #[test]
    fn parses_quoted_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\\c""#),
            vec![TokenKind::QuotedString("a\"b\\c".to_string())]
        );
    }

    #[test]
    fn rejects_bad_escape() {
        let mut lexer = Lexer::new(r#""a\nb""#);
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn strips_hash_and_bracket_comments() {
        assert_eq!(
            kinds("# comment\nif /* inline */ true"),
            vec![
                TokenKind::Identifier("if".into()),
                TokenKind::Identifier("true".into())
            ]
        );
    }

    #[test]
    fn reads_multiline_text_with_dot_unescape() {
        assert_eq!(
            kinds("text:\nhello\n..world\n.\n"),
            vec![TokenKind::MultiLine("hello\n.world\n".to_string())]
        );
    }

    #[test]
    fn lexes_tags_and_punctuation() {
        assert_eq!(
            kinds(":contains \"x\", 5;"),
            vec![
                TokenKind::Tag("contains".into()),
                TokenKind::QuotedString("x".into()),
                TokenKind::Comma,
                TokenKind::Number(5),
                TokenKind::Semicolon,
            ]
        );
    }
}
