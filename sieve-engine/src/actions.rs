//! The action/result layer.
//!
//! [`sieve_types::ResultSet`] holds the data; this module owns the
//! behavior: appending an action with dedup/conflict checks, synthesizing
//! the implicit `keep`, and committing in `CommitPhase` order through a
//! [`crate::host::Host`].

use sieve_types::{ActionEntry, ActionKind, ActionParams, Failure, ResultSet, SourceLocation, VmResult};

/// Appends `entry` to `result`, applying the dedup/conflict rules:
/// actions whose kind doesn't `may_coexist` replace any earlier entry of the
/// same kind rather than accumulating (`discard` after `discard` is one
/// `discard`, not two); `discard` together with any delivering action is
/// recorded as a conflict for the host to decide how to surface.
pub fn append_action(result: &mut ResultSet, entry: ActionEntry) {
    if !entry.kind.may_coexist() {
        if let Some(existing) = result.entries.iter().position(|e| e.kind == entry.kind) {
            result.entries[existing] = entry;
            return;
        }
    }

    if entry.kind == ActionKind::Discard && result.has_delivering_action() {
        result.conflicts.push(format!(
            "{}: discard conflicts with an earlier delivering action",
            entry.location
        ));
    }
    if entry.kind.suppresses_implicit_keep()
        && result
            .entries
            .iter()
            .any(|e| e.kind == ActionKind::Discard)
    {
        result.conflicts.push(format!(
            "{}: {:?} conflicts with an earlier discard",
            entry.location,
            entry.kind
        ));
    }

    result.entries.push(entry);
}

/// Synthesizes an implicit `keep` iff no delivering action is present (spec
/// §3: `store|redirect|reject|discard|fileinto` all suppress it). Call
/// immediately before committing.
pub fn finalize(result: &mut ResultSet) {
    result.implicit_keep = !result.has_delivering_action();
    if result.implicit_keep {
        result.entries.push(ActionEntry::new(
            ActionKind::Keep,
            ActionParams::default(),
            SourceLocation::START,
        ));
    }
}

/// Commits every entry in `result` in `CommitPhase` order (side-effects,
/// then delivery, then side-outputs; stable within a phase).
/// `commit_one` receives each entry in turn; a failure marks that single
/// action failed, the interpreter proceeds to an implicit keep, but does not
/// abort the whole commit loop unless `commit_one` returns a fatal
/// [`Failure`].
pub fn commit_all<F>(result: &mut ResultSet, mut commit_one: F) -> VmResult<()>
where
    F: FnMut(&ActionEntry) -> VmResult<()>,
{
    for index in result.commit_order() {
        match commit_one(&result.entries[index]) {
            Ok(()) => result.entries[index].committed = true,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(kind: ActionKind) -> ActionEntry {
        ActionEntry::new(kind, ActionParams::default(), SourceLocation::START)
    }

    #[test]
    fn non_coexisting_actions_replace_rather_than_accumulate() {
        let mut result = ResultSet::new();
        append_action(&mut result, action(ActionKind::Discard));
        append_action(&mut result, action(ActionKind::Discard));
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn discard_after_fileinto_is_a_conflict() {
        let mut result = ResultSet::new();
        append_action(&mut result, action(ActionKind::FileInto));
        append_action(&mut result, action(ActionKind::Discard));
        assert_eq!(result.conflicts.len(), 1);
    }

    #[test]
    fn finalize_adds_keep_only_when_nothing_delivers() {
        let mut result = ResultSet::new();
        finalize(&mut result);
        assert!(result.implicit_keep);
        assert_eq!(result.entries.len(), 1);

        let mut result = ResultSet::new();
        append_action(&mut result, action(ActionKind::FileInto));
        finalize(&mut result);
        assert!(!result.implicit_keep);
        assert_eq!(result.entries.len(), 1);
    }

    #[test]
    fn commit_all_skips_non_fatal_failures_and_keeps_going() {
        let mut result = ResultSet::new();
        append_action(&mut result, action(ActionKind::SetFlag));
        append_action(&mut result, action(ActionKind::Keep));
        let mut seen = Vec::new();
        commit_all(&mut result, |entry| {
            seen.push(entry.kind);
            if entry.kind == ActionKind::SetFlag {
                Err(Failure::Failure)
            } else {
                Ok(())
            }
        })
        .unwrap();
        assert_eq!(seen, vec![ActionKind::SetFlag, ActionKind::Keep]);
        assert!(!result.entries[0].committed);
        assert!(result.entries[1].committed);
    }
}
