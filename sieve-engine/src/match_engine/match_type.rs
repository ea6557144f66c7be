//! Match-types (RFC 5228 §2.7.1, RFC 5231). `:is` and `:contains` are
//! straightforward comparator calls; `:matches` implements RFC 5228's
//! `*`/`?` wildcard glob with backtracking and captures the `*` groups for
//! `${1}..${N}` (RFC 5229 §3). Ties are broken leftmost-longest: among the
//! wildcard placements that make the pattern match, the one that lets each
//! `*` (in left-to-right order) consume as much as possible wins, matching
//! the common glob-matcher convention.

use super::comparator::Comparator;
use super::MatchOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchType {
    Is,
    Contains,
    Matches,
}

impl MatchType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "is" => MatchType::Is,
            "contains" => MatchType::Contains,
            "matches" => MatchType::Matches,
            _ => return None,
        })
    }

    pub fn test(&self, comparator: &dyn Comparator, candidate: &str, key: &str) -> MatchOutcome {
        match self {
            MatchType::Is => MatchOutcome::bare(comparator.eq(candidate, key)),
            MatchType::Contains => MatchOutcome::bare(comparator.contains(candidate, key)),
            MatchType::Matches => match wildcard_match(key, candidate, comparator) {
                Some(captures) => MatchOutcome { matched: true, captures },
                None => MatchOutcome::bare(false),
            },
        }
    }
}

/// RFC 5228 `*` (any run, greedy-longest) / `?` (exactly one char) /
/// `\*`, `\?`, `\\` literal escapes. Returns the `*` captures in
/// left-to-right order on a match.
pub fn wildcard_match(pattern: &str, text: &str, comparator: &dyn Comparator) -> Option<Vec<String>> {
    let pat: Vec<char> = unescape_pattern(pattern);
    let txt: Vec<char> = text.chars().collect();
    let mut captures = Vec::new();
    if match_from(&pat, 0, &txt, 0, comparator, &mut captures) {
        Some(captures)
    } else {
        None
    }
}

fn unescape_pattern(pattern: &str) -> Vec<char> {
    let mut out = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn char_eq(comparator: &dyn Comparator, a: char, b: char) -> bool {
    comparator.eq(&a.to_string(), &b.to_string())
}

/// Backtracking matcher. `pat[pi]` is either a literal char, `'*'`, or `'?'`
/// (wildcard metacharacters survive `unescape_pattern` only when not
/// preceded by `\`). Greedy: tries to consume as much as possible for `*`
/// before backing off, which yields the leftmost-longest capture.
fn match_from(
    pat: &[char],
    pi: usize,
    txt: &[char],
    ti: usize,
    comparator: &dyn Comparator,
    captures: &mut Vec<String>,
) -> bool {
    if pi == pat.len() {
        return ti == txt.len();
    }

    match pat[pi] {
        '*' => {
            // Greedy: try consuming the longest possible run first.
            for take in (0..=(txt.len() - ti)).rev() {
                let mut trial = captures.clone();
                trial.push(txt[ti..ti + take].iter().collect());
                if match_from(pat, pi + 1, txt, ti + take, comparator, &mut trial) {
                    *captures = trial;
                    return true;
                }
            }
            false
        }
        '?' => {
            if ti < txt.len() {
                match_from(pat, pi + 1, txt, ti + 1, comparator, captures)
            } else {
                false
            }
        }
        literal => {
            if ti < txt.len() && char_eq(comparator, txt[ti], literal) {
                match_from(pat, pi + 1, txt, ti + 1, comparator, captures)
            } else {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_engine::comparator::AsciiCasemap;

    #[test]
    fn star_matches_empty_and_full_run() {
        let cmp = AsciiCasemap;
        assert!(wildcard_match("*", "anything", &cmp).is_some());
        assert_eq!(wildcard_match("*", "", &cmp), Some(vec![String::new()]));
    }

    #[test]
    fn captures_star_groups_in_order() {
        let cmp = AsciiCasemap;
        let captures = wildcard_match("foo*bar*baz", "fooXXXbarYYbaz", &cmp).unwrap();
        assert_eq!(captures, vec!["XXX".to_string(), "YY".to_string()]);
    }

    #[test]
    fn question_mark_matches_exactly_one_char() {
        let cmp = AsciiCasemap;
        assert!(wildcard_match("a?c", "abc", &cmp).is_some());
        assert!(wildcard_match("a?c", "ac", &cmp).is_none());
    }

    #[test]
    fn escaped_star_is_literal() {
        let cmp = AsciiCasemap;
        assert!(wildcard_match(r"100\%", "100%", &cmp).is_some());
    }

    #[test]
    fn case_insensitive_under_ascii_casemap() {
        let cmp = AsciiCasemap;
        assert!(wildcard_match("HELLO*", "hello world", &cmp).is_some());
    }
}
