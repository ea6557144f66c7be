#![deny(missing_debug_implementations)]

//! Compiler, bytecode VM and ManageSieve wire protocol for the Sieve
//! mail-filtering language (RFC 5228) and its extensions.
//!
//! ```text
//! source -> lexer -> parser -> validator -> codegen -> binary (save)
//!        -> binary (load) -> interpreter -> Result
//! ```
//!
//! The ManageSieve layer (`managesieve`) sits alongside: it receives scripts
//! over the wire and hands them to [`compile`]/the binary format, but does
//! not itself know how to run a script.

pub mod actions;
pub mod binary;
pub mod codegen;
pub mod error;
pub mod host;
pub mod interp;
pub mod lexer;
pub mod managesieve;
pub mod match_engine;
pub mod parser;
pub mod registry;
pub mod validator;
pub mod variables;

pub mod extensions;

pub use error::{CompileError, EngineError};
pub use host::{Host, SmtpHandle};
pub use interp::{Interpreter, RuntimeEnv};

use sieve_types::{Diagnostic, Limits, Script};

/// A compiled script plus the diagnostics produced while compiling it; a
/// count of errors and warnings is always returned alongside the binary.
#[derive(Debug)]
pub struct CompileOutcome {
    pub binary: Option<binary::Binary>,
    pub diagnostics: Vec<Diagnostic>,
    pub error_count: usize,
    pub warning_count: usize,
}

impl CompileOutcome {
    pub fn succeeded(&self) -> bool {
        self.binary.is_some()
    }
}

/// Lex, parse, validate and generate code for `script`, against the given
/// extension `registry` and resource `limits`: source, tokens, validated
/// AST, bytecode, then a saved [`binary::Binary`].
pub fn compile(
    script: &mut Script,
    registry: &registry::Registry,
    limits: &Limits,
) -> CompileOutcome {
    let mut errors = validator::ErrorHandler::new(limits.max_compile_errors);

    match parser::parse(script) {
        Ok(()) => {}
        Err(diag) => {
            errors.push(diag);
            return finish(errors);
        }
    }

    let validated = match validator::validate(script, registry, limits, &mut errors) {
        Some(v) => v,
        None => return finish(errors),
    };

    if errors.error_count() > 0 {
        return finish(errors);
    }

    let binary = codegen::generate(script, &validated, registry);
    let (diagnostics, error_count, warning_count) = errors.into_parts();
    CompileOutcome {
        binary: Some(binary),
        diagnostics,
        error_count,
        warning_count,
    }
}

fn finish(errors: validator::ErrorHandler) -> CompileOutcome {
    let (diagnostics, error_count, warning_count) = errors.into_parts();
    CompileOutcome {
        binary: None,
        diagnostics,
        error_count,
        warning_count,
    }
}
