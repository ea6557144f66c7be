//! `include` (RFC 6609): dedup bookkeeping for `:once` across
//! `:personal`/`:global` locations. Consulted by
//! [`crate::interp::Interpreter::exec_extension`]'s `"include"` arm, which
//! fetches, compiles and runs the included script as a sub-interpreter
//! sharing the parent's `RuntimeEnv`/`GlobalScope`.

use std::collections::BTreeSet;
use sieve_types::ScriptLocation;

/// Tracks which `(location, name)` pairs have already been included with
/// `:once` during one compilation, so a second `:once` include of the same
/// script is silently skipped rather than re-run (RFC 6609 §3.2).
#[derive(Debug, Default)]
pub struct IncludeTable {
    seen_once: BTreeSet<(LocationKey, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LocationKey {
    Personal,
    Global,
}

impl From<ScriptLocation> for LocationKey {
    fn from(loc: ScriptLocation) -> Self {
        match loc {
            ScriptLocation::Personal => LocationKey::Personal,
            ScriptLocation::Global => LocationKey::Global,
        }
    }
}

impl IncludeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records any `include` of `(location, name)`, tagged `:once` or not;
    /// returns `false` if this pair was already recorded, meaning a `:once`
    /// include should skip it. Plain includes call this to keep the record
    /// current but ignore the return value, so they always run regardless
    /// of what ran before them.
    pub fn mark_once(&mut self, location: ScriptLocation, name: &str) -> bool {
        self.seen_once.insert((location.into(), name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_once_include_of_same_script_is_rejected() {
        let mut table = IncludeTable::new();
        assert!(table.mark_once(ScriptLocation::Personal, "sub.sieve"));
        assert!(!table.mark_once(ScriptLocation::Personal, "sub.sieve"));
    }

    #[test]
    fn same_name_in_different_locations_is_distinct() {
        let mut table = IncludeTable::new();
        assert!(table.mark_once(ScriptLocation::Personal, "sub.sieve"));
        assert!(table.mark_once(ScriptLocation::Global, "sub.sieve"));
    }
}
