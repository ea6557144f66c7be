//! `subaddress` (RFC 5233): `:user`/`:detail` address-parts. Splits an
//! already-extracted localpart on the first `+` into `user` and `detail`
//! halves. The wire encoding and dispatch ride the same `address`/`envelope`
//! opcode as `:localpart`/`:domain` — see
//! [`crate::interp::ops::address_part_of`] and
//! [`sieve_types::opcode::address_part`] — this module holds only the split
//! itself.

/// Splits `user+detail` into `("user", Some("detail"))`, or `(localpart,
/// None)` if there's no separator. RFC 5233 §2 leaves the separator
/// character to the implementation; `+` is the common convention and the
/// one this crate fixes.
pub fn split_localpart(localpart: &str) -> (String, Option<String>) {
    match localpart.split_once('+') {
        Some((user, detail)) => (user.to_string(), Some(detail.to_string())),
        None => (localpart.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_plus_only() {
        assert_eq!(split_localpart("alice+lists+extra"), ("alice".to_string(), Some("lists+extra".to_string())));
    }

    #[test]
    fn no_separator_is_user_with_no_detail() {
        assert_eq!(split_localpart("alice"), ("alice".to_string(), None));
    }

    #[test]
    fn empty_detail_after_trailing_plus() {
        assert_eq!(split_localpart("alice+"), ("alice".to_string(), Some(String::new())));
    }
}
