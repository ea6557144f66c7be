//! `fileinto` (RFC 5228 §4.1). Compilation and execution both live in
//! [`crate::codegen`] and [`crate::interp`] — this module holds only the one
//! piece of RFC-mandated validation specific to the extension: mailbox names
//! must be non-empty UTF-8, which the lexer/parser already guarantee for any
//! quoted string, so there is exactly one extra rule to check here.

/// RFC 5228 §4.1 requires `fileinto`'s argument to name a mailbox; an empty
/// name is never valid regardless of the host's namespace rules.
pub fn validate_mailbox_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        Err("fileinto mailbox name must not be empty")
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_mailbox() {
        assert!(validate_mailbox_name("").is_err());
        assert!(validate_mailbox_name("INBOX.sub").is_ok());
    }
}
