//! The variables subsystem.
//!
//! Two responsibilities live here: rewriting `${...}` references in string
//! literals once the `variables` extension is confirmed active (called from
//! [`crate::validator::validate`]), and the runtime scope + modifier-
//! application logic the interpreter's `set` handler drives.

use std::collections::HashMap;

use sieve_types::ast::{Argument, StringPart};
use sieve_types::{Limits, Script};

use crate::validator::split_variable_refs;

/// Rewrites every string-shaped argument in `script`'s arena that contains
/// `${...}` into its [`StringPart`] decomposition. Safe to call unlinked
/// from parsing: a string with no substitution round-trips to the same
/// single-`Literal` shape it started as.
pub fn substitute_script(script: &mut Script) {
    let len = script.arena.len();
    for id in 0..len {
        let positional_count = script.arena.get(id).positional.len();
        for i in 0..positional_count {
            let new_arg = {
                let node = script.arena.get(id);
                match &node.positional[i] {
                    Argument::String(lit) => lit.as_literal().map(|text| {
                        let parts = split_variable_refs(text);
                        Argument::String(sieve_types::ast::StringLit { parts })
                    }),
                    Argument::StringList(list) => {
                        let mut changed = false;
                        let rewritten: Vec<_> = list
                            .iter()
                            .map(|lit| match lit.as_literal() {
                                Some(text) => {
                                    let parts = split_variable_refs(text);
                                    if parts.len() != 1 || !matches!(parts[0], StringPart::Literal(_)) {
                                        changed = true;
                                    }
                                    sieve_types::ast::StringLit { parts }
                                }
                                None => lit.clone(),
                            })
                            .collect();
                        if changed {
                            Some(Argument::StringList(rewritten))
                        } else {
                            None
                        }
                    }
                    _ => None,
                }
            };
            if let Some(arg) = new_arg {
                script.arena.get_mut(id).positional[i] = arg;
            }
        }
    }
}

/// Modifier application order for `set` (RFC 5229 §4). Lower runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Modifier {
    Length,
    EncodeUrl,
    QuoteWildcard,
    UpperFirst,
    LowerFirst,
    Upper,
    Lower,
}

impl Modifier {
    pub fn precedence(self) -> u8 {
        match self {
            Modifier::Length => 10,
            Modifier::EncodeUrl => 15,
            Modifier::QuoteWildcard => 20,
            Modifier::UpperFirst | Modifier::LowerFirst => 30,
            Modifier::Upper | Modifier::Lower => 40,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "length" => Modifier::Length,
            "encodeurl" => Modifier::EncodeUrl,
            "quotewildcard" => Modifier::QuoteWildcard,
            "upperfirst" => Modifier::UpperFirst,
            "lowerfirst" => Modifier::LowerFirst,
            "upper" => Modifier::Upper,
            "lower" => Modifier::Lower,
            _ => return None,
        })
    }
}

/// `:upperfirst` and `:lowerfirst` share precedence 30 but are mutually
/// exclusive (as are `:upper`/`:lower` at 40) — applying both is a compile
/// error (RFC 5229 §4).
pub fn conflicting_modifiers(tags: &[&str]) -> Option<(&'static str, &'static str)> {
    let has = |name: &str| tags.contains(&name);
    if has("upperfirst") && has("lowerfirst") {
        return Some(("upperfirst", "lowerfirst"));
    }
    if has("upper") && has("lower") {
        return Some(("upper", "lower"));
    }
    None
}

pub fn apply_modifier(modifier: Modifier, value: &str) -> String {
    match modifier {
        Modifier::Length => value.chars().count().to_string(),
        Modifier::EncodeUrl => crate::managesieve::url::percent_encode_ochar(value),
        Modifier::QuoteWildcard => value.replace('\\', "\\\\").replace('*', "\\*").replace('?', "\\?"),
        Modifier::UpperFirst => {
            let mut chars = value.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
        Modifier::LowerFirst => {
            let mut chars = value.chars();
            match chars.next() {
                Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
        Modifier::Upper => value.to_uppercase(),
        Modifier::Lower => value.to_lowercase(),
    }
}

/// Per-script-execution variable storage: a local scope (this script or the
/// current `include`d one) and a pointer to the shared global scope (spec
/// §5: "per-interpreter variable storage, a shared global storage pointer
/// across sub-interpreters").
#[derive(Debug, Default)]
pub struct Scope {
    local: HashMap<String, String>,
    /// Names declared `global` in this script and therefore resolved
    /// against the shared global map instead of `local`.
    imported: HashMap<String, ()>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_global(&mut self, name: &str) {
        self.imported.insert(name.to_string(), ());
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.imported.contains_key(name)
    }

    pub fn set_local(&mut self, name: &str, value: String, limits: &Limits) {
        let truncated = limits.truncate_variable(&value).to_string();
        self.local.insert(name.to_string(), truncated);
    }

    pub fn get_local(&self, name: &str) -> Option<&str> {
        self.local.get(name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.local.len()
    }
}

#[derive(Debug, Default)]
pub struct GlobalScope {
    values: HashMap<String, String>,
}

impl GlobalScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: String, limits: &Limits) {
        let truncated = limits.truncate_variable(&value).to_string();
        self.values.insert(name.to_string(), truncated);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_precedence_matches_rfc5229() {
        assert!(Modifier::Length.precedence() < Modifier::EncodeUrl.precedence());
        assert!(Modifier::EncodeUrl.precedence() < Modifier::QuoteWildcard.precedence());
        assert!(Modifier::QuoteWildcard.precedence() < Modifier::UpperFirst.precedence());
        assert!(Modifier::UpperFirst.precedence() < Modifier::Upper.precedence());
    }

    #[test]
    fn upperfirst_and_lowerfirst_conflict() {
        assert_eq!(
            conflicting_modifiers(&["upperfirst", "lowerfirst"]),
            Some(("upperfirst", "lowerfirst"))
        );
        assert_eq!(conflicting_modifiers(&["upperfirst", "upper"]), None);
    }

    #[test]
    fn scope_truncates_via_limits() {
        let mut limits = Limits::default();
        limits.max_variable_size = 4;
        let mut scope = Scope::new();
        scope.set_local("x", "hello".to_string(), &limits);
        assert_eq!(scope.get_local("x"), Some("hell"));
    }
}
