//! `:copy` (RFC 3894). Not a command of its own: a tag accepted by
//! `fileinto` and `redirect`, compiled as a one-byte flag right next to the
//! action it modifies ([`crate::codegen`]'s `"fileinto"`/`"redirect"` arms)
//! and read back the same way in [`crate::interp`]. Keeping `:copy` out of
//! the action's "does this suppress implicit keep" accounting is handled in
//! [`crate::actions`] via `ActionKind::may_coexist`, not here.
