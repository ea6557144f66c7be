//! `index` (RFC 5260 §4): `:index`/`:last` on `header`/`address` tests,
//! selecting a single occurrence out of a repeated header instead of
//! matching across all of them. Same status as [`super::date`]: the
//! selection logic lives here, but [`crate::codegen`]/[`crate::interp`]
//! still gather every occurrence of a named header
//! ([`crate::interp::ops::gather_header_values`]) rather than threading an
//! index argument through the match-operand wire format.

/// Picks the Nth occurrence (1-based, RFC 5260 §4.1) of a header from the
/// list of values a host returned for one header name, or the last one if
/// `last` is set. Returns `None` for an out-of-range index rather than
/// panicking, matching RFC 5260's "test does not match" behavior for an
/// index beyond the number of occurrences.
pub fn select(values: &[String], index: u32, last: bool) -> Option<&String> {
    if last {
        return values.last();
    }
    let idx = index.checked_sub(1)? as usize;
    values.get(idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_one_based_index() {
        let values = vec!["first".to_string(), "second".to_string(), "third".to_string()];
        assert_eq!(select(&values, 2, false), Some(&"second".to_string()));
    }

    #[test]
    fn last_ignores_index() {
        let values = vec!["first".to_string(), "second".to_string()];
        assert_eq!(select(&values, 1, true), Some(&"second".to_string()));
    }

    #[test]
    fn zero_and_out_of_range_index_yield_none() {
        let values = vec!["only".to_string()];
        assert_eq!(select(&values, 0, false), None);
        assert_eq!(select(&values, 5, false), None);
    }
}
