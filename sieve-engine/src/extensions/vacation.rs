//! `vacation` (RFC 5230): day-count clamping and the duplicate-suppression
//! key. Auto-reply generation itself (building the MIME reply, deciding
//! whether to quote the original) is left to the host, same as
//! [`super::reject`] — the interpreter only records a
//! [`sieve_types::ActionKind::Vacation`] action with its parameters.

/// RFC 5230 §4.7: `:days` defaults to 7, and implementations MUST clamp it
/// to at least 1; this crate also caps it at 60 to bound how long a single
/// directive can suppress replies, a limit the RFC leaves open.
const MIN_DAYS: u64 = 1;
const MAX_DAYS: u64 = 60;

pub fn clamp_days(days: u64) -> u64 {
    days.clamp(MIN_DAYS, MAX_DAYS)
}

/// RFC 5230 §4.1: at minimum, the suppression period is keyed on the
/// recipient and the reason text; `:handle` overrides this with an explicit
/// label so scripts that vary the reason by condition can still share one
/// duplicate-tracking bucket.
pub fn duplicate_key(recipient: &str, reason: &str, handle: Option<&str>) -> String {
    match handle {
        Some(h) => format!("vacation:{recipient}:{h}"),
        None => format!("vacation:{recipient}:{reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_into_range() {
        assert_eq!(clamp_days(0), 1);
        assert_eq!(clamp_days(7), 7);
        assert_eq!(clamp_days(1000), 60);
    }

    #[test]
    fn handle_overrides_reason_in_key() {
        let by_reason = duplicate_key("alice@example.com", "on leave", None);
        let by_handle = duplicate_key("alice@example.com", "on leave", Some("leave-2026"));
        assert_ne!(by_reason, by_handle);
        assert!(by_handle.ends_with("leave-2026"));
    }
}
