#![deny(missing_debug_implementations)]

//! Core, parser-agnostic data types for the Sieve mail-filtering language
//! (RFC 5228) and its compiled bytecode form.
//!
//! This crate holds *data*: AST nodes, the bytecode operand vocabulary,
//! action/result types, extension descriptors, resource limits and the
//! shared error types. Parsing, code generation and execution live in
//! `sieve-engine`.

pub mod action;
pub mod ast;
pub mod error;
pub mod extension;
pub mod failure;
pub mod limits;
pub mod location;
pub mod opcode;

pub use action::{ActionEntry, ActionKind, ActionParams, CommitPhase, ResultSet};
pub use ast::{Arena, Argument, Node, NodeId, NodeKind, Script, ScriptLocation, StringLit, StringPart, TagArg};
pub use error::{Diagnostic, Severity, ValidationError};
pub use extension::{ExtensionId, ExtensionName};
pub use failure::{Failure, VmResult};
pub use limits::Limits;
pub use location::SourceLocation;
