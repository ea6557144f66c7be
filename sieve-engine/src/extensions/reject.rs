//! `reject`/`ereject` (RFC 5429). Both compile to the same extension op with
//! a sub-opcode distinguishing "MIME-wrapped, multipart/report" (`ereject`,
//! `sub_op == 1`) from plain-text (`reject`, `sub_op == 0`); see
//! [`crate::codegen`]'s `"reject" | "ereject"` arm. The only behavior left
//! to this module is trimming the reason text a host hands to its bounce
//! generator, since RFC 5429 leaves surrounding whitespace unspecified.

/// Collapses leading/trailing whitespace from a `reject`/`ereject` reason,
/// matching what hosts typically do before embedding it in a bounce message.
pub fn normalize_reason(reason: &str) -> String {
    reason.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(normalize_reason("  no thanks\n"), "no thanks");
    }
}
