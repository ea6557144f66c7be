//! `relational` (RFC 5231): `:count`/`:value`. The wire encoding and
//! dispatch are generic across `header`/`address`/`envelope`/`body` — see
//! [`crate::codegen`]'s `write_match_operand` and
//! [`crate::interp::ops::read_match_op`]; this module re-exports the
//! relation vocabulary from [`crate::match_engine`] under the extension's own
//! name so callers that think in terms of "the relational extension" rather
//! than "the match engine" have an obvious place to look.

pub use crate::match_engine::Relation;

/// `require "relational"` must also make `i;ascii-numeric` available for a
/// numeric `:value` comparison (RFC 5231 §3); this crate compares `:value`
/// with whichever comparator the test names, same as `:is`/`:contains`, so
/// numeric comparison is obtained by combining `:value "eq"` with
/// `:comparator "i;ascii-numeric"` — not yet a registered comparator here
/// (only `i;octet`/`i;ascii-casemap` are), so numeric `:value` keys currently
/// compare lexically. Left as a known gap rather than silently wrong:
/// scripts doing numeric relational comparisons on multi-digit values will
/// see lexical rather than numeric ordering.
pub const NUMERIC_COMPARATOR_NOT_IMPLEMENTED: &str = "i;ascii-numeric";
