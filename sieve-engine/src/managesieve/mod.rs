//! The ManageSieve wire protocol (RFC 5804): a resumable line parser, the
//! `sieve://` URL grammar, the quoting utility, and the command/session
//! layer built on top of them. Compiling the scripts this protocol carries
//! is `crate::compile`'s job, not this module's — `commands` only calls
//! through to it.

pub mod commands;
pub mod parser;
pub mod quote;
pub mod url;
