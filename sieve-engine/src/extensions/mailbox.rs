//! `mailbox` (RFC 5490): `mailboxexists`, and `:create` on `fileinto`. This
//! crate doesn't add a mailbox-existence query to [`crate::host::Host`] —
//! that's a round trip to whatever store backs the mailbox, which the
//! generic `Host` trait has no hook for — so `mailboxexists` isn't wired
//! into [`crate::codegen`]/[`crate::interp`] yet. What's here is the one
//! piece of logic that doesn't need a host round trip: validating and
//! normalizing the mailbox-name list `mailboxexists` takes before a host
//! ever sees it.

/// RFC 5490 §4 hierarchy separator used by `mailboxexists`'s folder-name
/// arguments; strips a trailing separator so `"INBOX/"` and `"INBOX"`
/// compare equal.
pub fn normalize_name(name: &str) -> &str {
    name.strip_suffix('/').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_separator() {
        assert_eq!(normalize_name("INBOX/Archive/"), "INBOX/Archive");
        assert_eq!(normalize_name("INBOX"), "INBOX");
    }
}
