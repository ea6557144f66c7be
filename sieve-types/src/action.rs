//! The action/result model.

use crate::location::SourceLocation;

/// When, relative to other actions, a committed action takes effect.
/// Side-effect-only actions (flag changes) apply before delivery; delivery
/// actions apply before side-outputs (vacation auto-replies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommitPhase {
    SideEffect,
    Delivery,
    SideOutput,
}

/// The kind of side effect one [`ActionEntry`] proposes. Actions for which
/// `may_coexist` is `false` are deduplicated down to at most one surviving
/// entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Keep,
    FileInto,
    Redirect,
    Discard,
    Reject,
    Vacation,
    SetFlag,
    AddFlag,
    RemoveFlag,
}

impl ActionKind {
    pub fn may_coexist(self) -> bool {
        !matches!(self, ActionKind::Discard | ActionKind::Vacation)
    }

    pub fn commit_phase(self) -> CommitPhase {
        match self {
            ActionKind::SetFlag | ActionKind::AddFlag | ActionKind::RemoveFlag => {
                CommitPhase::SideEffect
            }
            ActionKind::Keep | ActionKind::FileInto | ActionKind::Redirect | ActionKind::Discard => {
                CommitPhase::Delivery
            }
            ActionKind::Reject | ActionKind::Vacation => CommitPhase::SideOutput,
        }
    }

    /// Whether this action kind counts as "delivering" for the purpose of
    /// implicit-keep suppression (`store`/`redirect`/`reject`/`discard`/
    /// `fileinto`).
    pub fn suppresses_implicit_keep(self) -> bool {
        matches!(
            self,
            ActionKind::FileInto | ActionKind::Redirect | ActionKind::Reject | ActionKind::Discard
        )
    }
}

/// Free-form parameters attached to an [`ActionEntry`]. Kept as simple
/// key/value pairs rather than one struct per action kind so the
/// action/result layer can stay generic over which actions an extension
/// contributes; `sieve-engine::actions` interprets these per `ActionKind`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionParams {
    pub strings: Vec<(&'static str, String)>,
    pub flags: Vec<(&'static str, bool)>,
}

impl ActionParams {
    pub fn with_string(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.strings.push((key, value.into()));
        self
    }

    pub fn with_flag(mut self, key: &'static str, value: bool) -> Self {
        self.flags.push((key, value));
        self
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.strings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.flags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or(false)
    }
}

/// One proposed side effect, plus the bookkeeping the action/result layer
/// needs to dedupe, order and conflict-check it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEntry {
    pub kind: ActionKind,
    pub params: ActionParams,
    pub location: SourceLocation,
    /// True once this action kind has been committed by [`crate::Limits`]-
    /// governed execution; only meaningful after `Result::commit_all`.
    pub committed: bool,
}

impl ActionEntry {
    pub fn new(kind: ActionKind, params: ActionParams, location: SourceLocation) -> Self {
        Self {
            kind,
            params,
            location,
            committed: false,
        }
    }
}

/// The ordered, conflict-checked collection of actions a script run
/// produces. `sieve-engine::actions` owns the dedup/conflict
/// predicates and the commit loop; this type is the data they operate on.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub entries: Vec<ActionEntry>,
    /// Conflicts detected while appending entries, e.g. `discard` alongside
    /// `redirect`.
    pub conflicts: Vec<String>,
    pub implicit_keep: bool,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_delivering_action(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.kind.suppresses_implicit_keep())
    }

    /// Entries in commit order: stable within a phase, `SideEffect` before
    /// `Delivery` before `SideOutput`.
    pub fn commit_order(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.entries.len()).collect();
        indices.sort_by_key(|&i| self.entries[i].kind.commit_phase());
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;

    #[test]
    fn implicit_keep_only_without_a_delivering_action() {
        let mut result = ResultSet::new();
        assert!(!result.has_delivering_action());
        result.entries.push(ActionEntry::new(
            ActionKind::FileInto,
            ActionParams::default().with_string("mailbox", "INBOX"),
            SourceLocation::START,
        ));
        assert!(result.has_delivering_action());
    }

    #[test]
    fn commit_order_is_side_effect_then_delivery_then_side_output() {
        let mut result = ResultSet::new();
        result.entries.push(ActionEntry::new(
            ActionKind::Vacation,
            ActionParams::default(),
            SourceLocation::START,
        ));
        result.entries.push(ActionEntry::new(
            ActionKind::SetFlag,
            ActionParams::default(),
            SourceLocation::START,
        ));
        result.entries.push(ActionEntry::new(
            ActionKind::Keep,
            ActionParams::default(),
            SourceLocation::START,
        ));
        let order = result.commit_order();
        let kinds: Vec<_> = order.iter().map(|&i| result.entries[i].kind).collect();
        assert_eq!(
            kinds,
            vec![ActionKind::SetFlag, ActionKind::Keep, ActionKind::Vacation]
        );
    }
}
