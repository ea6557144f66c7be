//! `imap4flags` (RFC 5232): `setflag`/`addflag`/`removeflag`/`hasflag`.
//! `setflag`/`addflag`/`removeflag` compile and run through
//! [`crate::codegen`]/[`crate::interp`]'s shared `sub_op`-dispatched arm;
//! this module holds the one piece of RFC-mandated validation that belongs
//! to the extension rather than the generic action machinery: IMAP flag
//! names must be either a system flag (`\Seen`, `\Answered`, `\Flagged`,
//! `\Deleted`, `\Draft`) or an RFC 3501 `atom` keyword.

/// RFC 5232 §3 / RFC 3501 `flag`: a backslash-prefixed system flag, or a bare
/// keyword atom (no control characters, space, or `()%*"\`).
pub fn is_valid_flag_name(flag: &str) -> bool {
    if let Some(rest) = flag.strip_prefix('\\') {
        matches!(rest, "Seen" | "Answered" | "Flagged" | "Deleted" | "Draft")
    } else {
        !flag.is_empty() && flag.chars().all(is_atom_char)
    }
}

fn is_atom_char(c: char) -> bool {
    !c.is_control() && !matches!(c, ' ' | '(' | ')' | '%' | '*' | '"' | '\\' | '{')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_system_flags_and_keywords() {
        assert!(is_valid_flag_name(r"\Seen"));
        assert!(is_valid_flag_name("$MDNSent"));
        assert!(!is_valid_flag_name(r"\Bogus"));
        assert!(!is_valid_flag_name("has space"));
        assert!(!is_valid_flag_name(""));
    }
}
