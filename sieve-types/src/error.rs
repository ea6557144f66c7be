//! Error-related types shared across the compiler and the VM.

use std::fmt;

use thiserror::Error;

use crate::location::SourceLocation;

/// The severity of a [`Diagnostic`]: warnings never count toward a
/// compilation's error cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single compile diagnostic, rendered as `file:line:col: severity: message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub location: SourceLocation,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn error(file: impl Into<String>, location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            location,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(file: impl Into<String>, location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            location,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.file, self.location, self.severity, self.message
        )
    }
}

/// An error produced while validating a single AST node.
///
/// Distinct from [`Diagnostic`]: this is the typed error a `CommandDef`
/// validator callback returns; the validator pass turns it into a
/// `Diagnostic` once it knows the node's location.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("unknown test {0:?}")]
    UnknownTest(String),
    #[error("extension {0:?} is not activated")]
    ExtensionNotActive(String),
    #[error("unknown extension {0:?}")]
    UnknownExtension(String),
    #[error("unexpected tag {0:?}")]
    UnexpectedTag(String),
    #[error("expected {expected} positional argument(s), found {found}")]
    ArgumentCount { expected: &'static str, found: usize },
    #[error("argument has wrong type: expected {expected}, found {found}")]
    ArgumentType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("reference to undefined variable {0:?}")]
    UndefinedVariable(String),
    #[error("modifiers {0:?} and {1:?} have equal precedence")]
    EqualModifierPrecedence(String, String),
    #[error("{0}")]
    Other(String),
}
