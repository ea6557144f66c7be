//! The match engine.
//!
//! `match_begin`/`match_value`/`match_end` drive comparator + match-type
//! pairs the way the interpreter's `TestHeader`/`TestAddress` opcodes need
//! them: feed candidate/key pairs one at a time, get a boolean per pair plus
//! (for `:matches`/`:regex`) captured match values for `${1}`, `${2}`, ...

pub mod comparator;
pub mod match_type;

pub use comparator::Comparator;
pub use match_type::MatchType;

/// The result of a single `match_value` call: whether it matched, and any
/// captured strings (`:matches`'s wildcard groups, `:regex`'s capture
/// groups) to be exposed as `${1}..${N}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    pub captures: Vec<String>,
}

impl MatchOutcome {
    pub fn bare(matched: bool) -> Self {
        Self {
            matched,
            captures: Vec::new(),
        }
    }
}

/// Runs one `match-type` test between a single candidate value and a list of
/// keys, using `comparator` for equality-ish comparisons. Short-circuits on
/// the first matching key (a match succeeds as soon as any key matches),
/// but for `:matches`/`:regex` the caller wants the capture from
/// the key that matched, not just `true`.
pub fn match_value(
    match_type: &MatchType,
    comparator: &dyn Comparator,
    candidate: &str,
    keys: &[String],
) -> MatchOutcome {
    for key in keys {
        let outcome = match_type.test(comparator, candidate, key);
        if outcome.matched {
            return outcome;
        }
    }
    MatchOutcome::bare(false)
}

/// `:count`/`:value` relational tests (RFC 5231), operating over the full
/// candidate/key cross product rather than short-circuiting on the first
/// key, since `:count` needs the total.
pub fn match_count(relation: Relation, candidates: &[String], keys: &[String]) -> bool {
    let count = candidates.len() as i64;
    keys.iter().any(|key| {
        key.parse::<i64>()
            .map(|k| relation.holds(count, k))
            .unwrap_or(false)
    })
}

pub fn match_value_relational(
    relation: Relation,
    comparator: &dyn Comparator,
    candidates: &[String],
    keys: &[String],
) -> bool {
    candidates.iter().any(|candidate| {
        keys.iter()
            .any(|key| relation.holds_ordering(comparator.compare(candidate, key)))
    })
}

/// Every shape a `header`/`address`/`envelope`/`body` test operand can take
///: the three `match-type`s plus the two RFC 5231 relational
/// forms. Unified here so the interpreter's four test opcodes (`TestHeader`,
/// `TestAddress`, and the `envelope`/`body` extension ops) share one
/// evaluation path instead of four near-identical copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOp {
    Is,
    Contains,
    Matches,
    Regex,
    Count(Relation),
    Value(Relation),
}

/// Runs a [`MatchOp`] over the full candidate list (all values of every
/// named header/envelope-part, or the single body text) against the key
/// list. `:count` ignores `comparator`/keys' text and compares cardinality;
/// everything else short-circuits on the first matching candidate/key pair.
pub fn run_match(op: &MatchOp, comparator: &dyn Comparator, candidates: &[String], keys: &[String]) -> MatchOutcome {
    match op {
        MatchOp::Is => match_value_list(&MatchType::Is, comparator, candidates, keys),
        MatchOp::Contains => match_value_list(&MatchType::Contains, comparator, candidates, keys),
        MatchOp::Matches => match_value_list(&MatchType::Matches, comparator, candidates, keys),
        MatchOp::Regex => {
            for candidate in candidates {
                for key in keys {
                    if let Some(captures) = crate::extensions::regex_ext::match_value(key, candidate) {
                        return MatchOutcome { matched: true, captures };
                    }
                }
            }
            MatchOutcome::bare(false)
        }
        MatchOp::Count(rel) => MatchOutcome::bare(match_count(*rel, candidates, keys)),
        MatchOp::Value(rel) => MatchOutcome::bare(match_value_relational(*rel, comparator, candidates, keys)),
    }
}

/// Short-circuiting `match_type` test over a *list* of candidates (one per
/// named header/part), not just a single value.
fn match_value_list(match_type: &MatchType, comparator: &dyn Comparator, candidates: &[String], keys: &[String]) -> MatchOutcome {
    for candidate in candidates {
        let outcome = match_value(match_type, comparator, candidate, keys);
        if outcome.matched {
            return outcome;
        }
    }
    MatchOutcome::bare(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Relation {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "gt" => Relation::Gt,
            "ge" => Relation::Ge,
            "lt" => Relation::Lt,
            "le" => Relation::Le,
            "eq" => Relation::Eq,
            "ne" => Relation::Ne,
            _ => return None,
        })
    }

    /// Wire encoding used by [`sieve_types::opcode::relation`].
    pub fn to_wire(self) -> u16 {
        match self {
            Relation::Gt => sieve_types::opcode::relation::GT,
            Relation::Ge => sieve_types::opcode::relation::GE,
            Relation::Lt => sieve_types::opcode::relation::LT,
            Relation::Le => sieve_types::opcode::relation::LE,
            Relation::Eq => sieve_types::opcode::relation::EQ,
            Relation::Ne => sieve_types::opcode::relation::NE,
        }
    }

    pub fn from_wire(tag: u16) -> Self {
        use sieve_types::opcode::relation::*;
        match tag {
            GT => Relation::Gt,
            GE => Relation::Ge,
            LT => Relation::Lt,
            LE => Relation::Le,
            EQ => Relation::Eq,
            _ => Relation::Ne,
        }
    }

    fn holds(self, a: i64, b: i64) -> bool {
        match self {
            Relation::Gt => a > b,
            Relation::Ge => a >= b,
            Relation::Lt => a < b,
            Relation::Le => a <= b,
            Relation::Eq => a == b,
            Relation::Ne => a != b,
        }
    }

    fn holds_ordering(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            Relation::Gt => ord == Greater,
            Relation::Ge => ord != Less,
            Relation::Lt => ord == Less,
            Relation::Le => ord != Greater,
            Relation::Eq => ord == Equal,
            Relation::Ne => ord != Equal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comparator::AsciiCasemap;

    #[test]
    fn match_value_short_circuits_on_first_key() {
        let mt = MatchType::Is;
        let cmp = AsciiCasemap;
        let outcome = match_value(&mt, &cmp, "Hello", &["bye".into(), "HELLO".into()]);
        assert!(outcome.matched);
    }

    #[test]
    fn count_relation_compares_candidate_count() {
        assert!(match_count(Relation::Eq, &["a".into(), "b".into()], &["2".into()]));
        assert!(!match_count(Relation::Eq, &["a".into()], &["2".into()]));
    }

    #[test]
    fn run_match_dispatches_count_without_touching_text() {
        let cmp = AsciiCasemap;
        let outcome = run_match(
            &MatchOp::Count(Relation::Ge),
            &cmp,
            &["a".into(), "b".into(), "c".into()],
            &["2".into()],
        );
        assert!(outcome.matched);
        assert!(outcome.captures.is_empty());
    }

    #[test]
    fn run_match_value_relational_compares_ordering() {
        let cmp = AsciiCasemap;
        let outcome = run_match(&MatchOp::Value(Relation::Gt), &cmp, &["10".into()], &["2".into()]);
        // Lexical comparator, not numeric: "10" < "2".
        assert!(!outcome.matched);
    }
}
