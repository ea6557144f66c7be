//! Top-level error types.
//!
//! Compile-time problems accumulate as [`sieve_types::Diagnostic`]s via
//! [`crate::validator::ErrorHandler`]; this module holds the smaller error
//! enums raised by individual subsystems along the way, plus the crate-wide
//! [`EngineError`] that wraps them for callers that just want one `?`-able
//! type.

use thiserror::Error;

use sieve_types::SourceLocation;

/// Lexer/parser failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{0}: unexpected end of script")]
    UnexpectedEof(SourceLocation),
    #[error("{0}: unexpected character {1:?}")]
    UnexpectedChar(SourceLocation, char),
    #[error("{0}: unterminated string literal")]
    UnterminatedString(SourceLocation),
    #[error("{0}: unterminated bracketed comment")]
    UnterminatedComment(SourceLocation),
    #[error("{0}: invalid number literal {1:?}")]
    InvalidNumber(SourceLocation, String),
    #[error("{0}: NUL byte in script")]
    NulByte(SourceLocation),
    #[error("{0}: script is not valid UTF-8")]
    InvalidUtf8(SourceLocation),
    #[error("{0}: expected {1}, found {2}")]
    Expected(SourceLocation, &'static str, String),
    #[error("{0}: script exceeds the maximum size")]
    ScriptTooLarge(SourceLocation),
}

/// Binary (`.sievec`) format failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BinaryError {
    #[error("bad magic number")]
    BadMagic,
    #[error("unsupported ABI version {0}")]
    UnsupportedAbi(u8),
    #[error("truncated binary: wanted {wanted} bytes, had {available}")]
    Truncated { wanted: usize, available: usize },
    #[error("block index {0} out of range")]
    BadBlockIndex(u32),
    #[error("unknown extension index {0} for this runtime's active extension set")]
    UnknownExtension(u16),
    #[error("malformed variable-length integer")]
    BadVarint,
    #[error("string is not valid UTF-8")]
    BadString,
    #[error("unknown opcode byte {0:#04x}")]
    UnknownOpcode(u8),
}

/// ManageSieve protocol-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManageSieveError {
    #[error("line exceeds the maximum line length")]
    LineTooLong,
    #[error("invalid character in atom")]
    InvalidAtom,
    #[error("invalid escape sequence in quoted string")]
    InvalidEscape,
    #[error("quoted string is not valid UTF-8")]
    InvalidUtf8,
    #[error("bare CR or LF inside a quoted string")]
    BareLineBreak,
    #[error("malformed literal size")]
    BadLiteralSize,
    #[error("too many consecutive invalid commands")]
    TooManyBadCommands,
}

/// `sieve://` URL parsing failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("not a sieve:// url")]
    BadScheme,
    #[error("invalid percent-encoding")]
    BadPercentEncoding,
    #[error("query or fragment components are not allowed")]
    QueryOrFragment,
    #[error("invalid character {0:?} in {1}")]
    InvalidChar(char, &'static str),
    #[error("invalid port")]
    BadPort,
}

/// The crate-wide error type most callers interact with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("compilation failed with {0} error(s)")]
    Validation(usize),
}

/// Everything that can go wrong end to end, for callers who don't want to
/// match on the individual subsystem errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Binary(#[from] BinaryError),
    #[error(transparent)]
    ManageSieve(#[from] ManageSieveError),
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error(transparent)]
    Runtime(#[from] sieve_types::Failure),
}
