//! The bytecode operand vocabulary.
//!
//! A *code byte* names either a core opcode or an
//! `extension-marker + extension-index + sub-opcode` triple. The
//! core set below covers everything RFC 5228 requires without a `require`;
//! extension-registered operations (including `fileinto`, `envelope`,
//! `variables`, …, even though they ship enabled by default in this crate)
//! are addressed by [`ObjectTag::Extension`] and dispatched through the
//! registry, keeping the interpreter's dispatch table uniform regardless of
//! which extensions an instance enabled.

use crate::extension::ExtensionId;

/// The single byte that begins every instruction.
pub const EXTENSION_MARKER: u8 = 0xFF;

/// Opcodes available without activating any extension (RFC 5228 core).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CoreOp {
    /// Unconditional jump to a resolved address.
    Jmp = 0x00,
    /// Jump iff the current test result register is `true`.
    JmpTrue = 0x01,
    /// Jump iff the current test result register is `false`.
    JmpFalse = 0x02,
    /// Invert the test result register in place (`not`).
    Not = 0x03,
    /// `address [:comparator] [:address-part] <match-type> header-list key-list`
    TestAddress = 0x04,
    /// `exists header-names`
    TestExists = 0x05,
    /// `header [:comparator] <match-type> header-names key-list`
    TestHeader = 0x06,
    /// `size :over/:under number`
    TestSize = 0x07,
    /// Always-true test.
    TestTrue = 0x08,
    /// Always-false test.
    TestFalse = 0x09,
    /// `keep [:flags string-list]`
    Keep = 0x0A,
    /// `discard`
    Discard = 0x0B,
    /// `redirect [:copy] address`
    Redirect = 0x0C,
    /// `stop`
    Stop = 0x0D,
    /// Pop and discard the current block's local scope (emitted at the end
    /// of an `if`/`elsif`/`else` arm when variables are active).
    EndBlock = 0x0E,
}

impl CoreOp {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use CoreOp::*;
        Some(match byte {
            0x00 => Jmp,
            0x01 => JmpTrue,
            0x02 => JmpFalse,
            0x03 => Not,
            0x04 => TestAddress,
            0x05 => TestExists,
            0x06 => TestHeader,
            0x07 => TestSize,
            0x08 => TestTrue,
            0x09 => TestFalse,
            0x0A => Keep,
            0x0B => Discard,
            0x0C => Redirect,
            0x0D => Stop,
            0x0E => EndBlock,
            _ => return None,
        })
    }
}

/// How a pluggable object (comparator, match-type, address-part, action,
/// modifier, namespace) is addressed on the wire: either one of the small
/// closed core set, or `(extension, sub-id)` for anything a registered
/// extension contributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectTag {
    Core(u16),
    Extension(ExtensionId, u16),
}

/// Match-type tags. `:is`, `:contains`, `:matches` are core; `:regex` ships
/// with the `regex` extension.
pub mod match_type {
    pub const IS: u16 = 0;
    pub const CONTAINS: u16 = 1;
    pub const MATCHES: u16 = 2;
    pub const REGEX: u16 = 3;
}

/// Distinguishes an ordinary `match_type` test from the RFC 5231 relational
/// forms, which compare a count or an ordered value rather than a pattern.
/// Every `header`/`address`/`envelope`/`body` test operand starts with one
/// of these tags.
pub mod match_kind {
    pub const MATCH_TYPE: u16 = 0;
    pub const COUNT: u16 = 1;
    pub const VALUE: u16 = 2;
}

/// `:count`/`:value` relational operators (RFC 5231 §4).
pub mod relation {
    pub const GT: u16 = 0;
    pub const GE: u16 = 1;
    pub const LT: u16 = 2;
    pub const LE: u16 = 3;
    pub const EQ: u16 = 4;
    pub const NE: u16 = 5;
}

/// Comparator tags.
pub mod comparator {
    pub const I_OCTET: u16 = 0;
    pub const I_ASCII_CASEMAP: u16 = 1;
}

/// Address-part tags.
pub mod address_part {
    pub const ALL: u16 = 0;
    pub const LOCALPART: u16 = 1;
    pub const DOMAIN: u16 = 2;
    /// RFC 5233 `:user` — the `user` half of a `user+detail` localpart.
    pub const USER: u16 = 3;
    /// RFC 5233 `:detail` — the `detail` half, or empty if the localpart
    /// carries no separator.
    pub const DETAIL: u16 = 4;
}
