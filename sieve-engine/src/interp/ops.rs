//! Per-opcode evaluation helpers factored out of the
//! dispatch loop in [`super::Interpreter::run`] so each concern — string
//! evaluation, a single test, a single action — reads as one function.

use sieve_types::ast::{StringLit, StringPart};
use sieve_types::opcode::{address_part, comparator, match_kind, match_type};

use crate::error::BinaryError;
use crate::host::MessageContext;
use crate::match_engine::{comparator as cmp_mod, MatchOp, Relation};

use super::renv::RuntimeEnv;
use crate::binary::Cursor;

/// Resolves a compiled [`StringLit`] against the current scope/match
/// registers: `Literal` parts pass through, `VarRef` looks up
/// local scope then global scope (empty string if undeclared, per RFC 5229
/// §3's "undefined variables expand to the empty string"), `MatchRef` reads
/// the `${N}` capture register from the last successful `:matches`/`:regex`.
pub fn eval_string(lit: &StringLit, env: &RuntimeEnv<'_>, global: &crate::variables::GlobalScope) -> String {
    let mut out = String::new();
    for part in &lit.parts {
        match part {
            StringPart::Literal(s) => out.push_str(s),
            StringPart::VarRef(name) => {
                if env.scope.is_global(name) {
                    out.push_str(global.get(name).unwrap_or(""));
                } else {
                    out.push_str(env.scope.get_local(name).unwrap_or(""));
                }
            }
            StringPart::MatchRef(n) => out.push_str(env.match_value(*n)),
        }
    }
    out
}

pub fn eval_string_list(
    list: &[StringLit],
    env: &RuntimeEnv<'_>,
    global: &crate::variables::GlobalScope,
) -> Vec<String> {
    list.iter().map(|lit| eval_string(lit, env, global)).collect()
}

pub fn comparator_by_tag(tag: u16) -> Box<dyn cmp_mod::Comparator> {
    if tag == comparator::I_OCTET {
        Box::new(cmp_mod::Octet)
    } else {
        Box::new(cmp_mod::AsciiCasemap)
    }
}

/// Reads the `match_kind` discriminant + its payload (a `match_type` tag, or
/// a relation tag for `:count`/`:value`) that [`crate::codegen`]'s
/// `write_match_operand` writes right after the comparator tag.
pub fn read_match_op(cursor: &mut Cursor<'_>) -> Result<MatchOp, BinaryError> {
    let kind = cursor.read_varint()? as u16;
    Ok(if kind == match_kind::COUNT {
        MatchOp::Count(Relation::from_wire(cursor.read_varint()? as u16))
    } else if kind == match_kind::VALUE {
        MatchOp::Value(Relation::from_wire(cursor.read_varint()? as u16))
    } else {
        match cursor.read_varint()? as u16 {
            t if t == match_type::CONTAINS => MatchOp::Contains,
            t if t == match_type::MATCHES => MatchOp::Matches,
            t if t == match_type::REGEX => MatchOp::Regex,
            _ => MatchOp::Is,
        }
    })
}

/// All values of every named header, flattened (RFC 5228 §5.7: `header`
/// matches if any named header's value matches any key — folding the names
/// together here lets `:count`/`:value` see the true total across all of
/// them).
pub fn gather_header_values(message: &impl MessageContext, headers: &[String]) -> Vec<String> {
    headers.iter().flat_map(|name| message.header_values(name)).collect()
}

pub fn gather_address_values(message: &impl MessageContext, headers: &[String], part: u16) -> Vec<String> {
    headers
        .iter()
        .flat_map(|name| message.header_values(name))
        .map(|raw| address_part_of(&raw, part))
        .collect()
}

pub fn gather_envelope_values(message: &impl MessageContext, parts: &[String], part: u16) -> Vec<String> {
    parts
        .iter()
        .flat_map(|field| message.envelope(field))
        .map(|raw| address_part_of(&raw, part))
        .collect()
}

pub fn test_exists(message: &impl MessageContext, headers: &[String]) -> bool {
    headers.iter().all(|name| !message.header_values(name).is_empty())
}

/// `size :over/:under number` (RFC 5228 §5.10).
pub fn test_size(message: &impl MessageContext, under: bool, threshold: u64) -> bool {
    if under {
        message.size() < threshold
    } else {
        message.size() > threshold
    }
}

/// Extracts the requested address-part from a raw `name@domain`-shaped
/// address string (RFC 5228 §5.1 / RFC 5233 subaddress).
pub fn address_part_of(addr: &str, part: u16) -> String {
    let addr = addr.trim();
    match addr.rfind('@') {
        Some(idx) if part == address_part::LOCALPART => addr[..idx].to_string(),
        Some(idx) if part == address_part::DOMAIN => addr[idx + 1..].to_string(),
        Some(idx) if part == address_part::USER || part == address_part::DETAIL => {
            let (user, detail) = crate::extensions::subaddress::split_localpart(&addr[..idx]);
            if part == address_part::USER { user } else { detail.unwrap_or_default() }
        }
        _ => addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_part_splits_localpart_and_domain() {
        assert_eq!(address_part_of("alice@example.com", address_part::LOCALPART), "alice");
        assert_eq!(address_part_of("alice@example.com", address_part::DOMAIN), "example.com");
        assert_eq!(address_part_of("alice@example.com", address_part::ALL), "alice@example.com");
    }
}
