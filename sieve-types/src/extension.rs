//! Extension identity. The registration tables themselves —
//! which commands/tests/operations an extension contributes, and the
//! validator/generator/interpreter hooks behind them — live in
//! `sieve-engine`, since they close over engine-internal types. This module
//! only carries the identity an extension is addressed by, because that
//! identity is shared between the AST (`require` names), the binary
//! format's extension table, and the bytecode's extension-marker +
//! extension-index operand.

use std::fmt;

/// A script-visible extension name, e.g. `"fileinto"`, `"variables"`,
/// `"imap4flags"`. Extensions are activated per-script via `require` and
/// per-instance via a configured enable-set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionName(pub String);

impl ExtensionName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtensionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ExtensionName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A compile-time id assigned by the engine's extension registry.
/// Stable for the lifetime of one compilation; the per-binary index
/// recorded in the extension table is a separate, binary-local
/// renumbering so that two binaries built with different activation sets
/// stay comparable only by name, never by raw id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(pub u16);

impl ExtensionId {
    pub const CORE: ExtensionId = ExtensionId(0);
}
