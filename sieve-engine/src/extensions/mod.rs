//! Per-extension Cargo features, one `ext_*` module per RFC extension.
//! Most extensions' wire encoding and dispatch live directly in
//! [`crate::codegen`] and
//! [`crate::interp`] (the opcode set is small and shared); the modules here
//! hold the extension-specific *logic* that doesn't belong in the generic
//! codegen/interpreter dispatch — validation rules, helper parsing, and
//! anything RFC-specific enough to read strangely next to the core VM.

#[cfg(feature = "ext_fileinto")]
pub mod fileinto;
#[cfg(feature = "ext_envelope")]
pub mod envelope;
#[cfg(feature = "ext_copy")]
pub mod copy;
#[cfg(feature = "ext_reject")]
pub mod reject;
#[cfg(feature = "ext_imap4flags")]
pub mod imap4flags;
#[cfg(feature = "ext_body")]
pub mod body;
#[cfg(feature = "ext_relational")]
pub mod relational;
// Always compiled, same reasoning as `regex_ext`: `interp::ops::address_part_of`
// calls `subaddress::split_localpart` unconditionally for the `:user`/`:detail`
// address parts, and a script can only produce those opcodes if
// `require "subaddress"` resolved in the first place.
pub mod subaddress;
// Always compiled: `codegen`/`interp` call `vacation::clamp_days` on every
// `vacation` action regardless of feature, same reasoning as `regex_ext`.
pub mod vacation;
#[cfg(feature = "ext_include")]
pub mod include;
// Not feature-gated at the module level: `match_engine::run_match` calls
// `regex_ext::match_value` unconditionally for `MatchOp::Regex`, and the
// function itself degrades to "never matches" when `ext_regex` is off (a
// script can only reach `MatchOp::Regex` if `require "regex"` resolved,
// which it can't without the feature, but the call site stays uniform).
pub mod regex_ext;
#[cfg(feature = "ext_date")]
pub mod date;
#[cfg(feature = "ext_index")]
pub mod index;
#[cfg(feature = "ext_mailbox")]
pub mod mailbox;
