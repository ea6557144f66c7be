//! Comparators (RFC 4790): `i;octet` is exact byte equality, `i;ascii-casemap`
//! case-folds ASCII before comparing. Both are core; further comparators
//! (`i;ascii-numeric`, RFC 4790) would register the same way an extension
//! registers a match-type, via a `dyn Comparator` object — trait objects
//! where the set is open-ended, closed enums where it isn't.

use std::cmp::Ordering;
use std::fmt;

pub trait Comparator: fmt::Debug {
    fn name(&self) -> &'static str;
    fn eq(&self, a: &str, b: &str) -> bool;
    fn compare(&self, a: &str, b: &str) -> Ordering;
    /// Whether `haystack` contains `needle` under this comparator's notion
    /// of character equivalence (used by `:contains`).
    fn contains(&self, haystack: &str, needle: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct Octet;

impl Comparator for Octet {
    fn name(&self) -> &'static str {
        "i;octet"
    }

    fn eq(&self, a: &str, b: &str) -> bool {
        a == b
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.as_bytes().cmp(b.as_bytes())
    }

    fn contains(&self, haystack: &str, needle: &str) -> bool {
        haystack.contains(needle)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AsciiCasemap;

fn fold(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

impl Comparator for AsciiCasemap {
    fn name(&self) -> &'static str {
        "i;ascii-casemap"
    }

    fn eq(&self, a: &str, b: &str) -> bool {
        fold(a) == fold(b)
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        fold(a).cmp(&fold(b))
    }

    fn contains(&self, haystack: &str, needle: &str) -> bool {
        fold(haystack).contains(&fold(needle))
    }
}

pub fn by_name(name: &str) -> Option<Box<dyn Comparator>> {
    match name {
        "i;octet" => Some(Box::new(Octet)),
        "i;ascii-casemap" => Some(Box::new(AsciiCasemap)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octet_is_byte_exact() {
        assert!(!Octet.eq("Hello", "hello"));
    }

    #[test]
    fn ascii_casemap_folds_only_ascii() {
        assert!(AsciiCasemap.eq("HELLO", "hello"));
        assert!(AsciiCasemap.contains("Subject: HELLO world", "hello"));
    }
}
