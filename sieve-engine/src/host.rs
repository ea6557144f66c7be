//! External interfaces.
//!
//! The interpreter never talks to a mail store, an SMTP submission client,
//! or a duplicate-suppression database directly — those are out-of-scope
//! external collaborators this crate only needs to call through.
//! [`Host`] is the seam: the interpreter is generic over (or holds) a
//! `&dyn Host`, and calls back into it for every action that has a
//! real-world side effect.

use std::time::Duration;

use sieve_types::{ScriptLocation, VmResult};

/// A message being filtered: enough of a raw RFC 5322 message for the
/// interpreter's tests (`header`, `exists`, `address`, `envelope`, `body`,
/// `size`) to run against, supplied by the host.
pub trait MessageContext {
    fn header_values(&self, name: &str) -> Vec<String>;
    fn envelope(&self, part: &str) -> Vec<String>;
    fn size(&self) -> u64;
    fn body_text(&self) -> &str;
}

/// An in-flight SMTP submission a `vacation`/`redirect` action can drive.
/// Kept as a handle rather than one-shot function calls so a host can
/// stream a large body.
pub trait SmtpHandle {
    fn set_from(&mut self, from: &str) -> VmResult<()>;
    fn add_recipient(&mut self, to: &str) -> VmResult<()>;
    fn write_body(&mut self, chunk: &[u8]) -> VmResult<()>;
    fn finish(self: Box<Self>) -> VmResult<()>;
}

/// An open duplicate-suppression check/mark transaction, used by
/// `vacation` to avoid re-sending within `:days`.
pub trait DuplicateTransaction {
    fn check(&mut self, key: &str) -> VmResult<bool>;
    fn mark(&mut self, key: &str, period: Duration) -> VmResult<()>;
}

/// The interpreter's external-world seam. A production host backs this with
/// a real mail store and SMTP client; tests back it with an in-memory fake.
pub trait Host {
    type Message: MessageContext;
    type Smtp: SmtpHandle;
    type Duplicate: DuplicateTransaction;

    /// Loads an `include`d script by (location, name). Returns `None` if
    /// it doesn't exist — the caller decides whether that's fatal based on
    /// `:optional`.
    fn open_script(&self, location: ScriptLocation, name: &str) -> VmResult<Option<String>>;

    fn open_smtp(&self) -> VmResult<Box<Self::Smtp>>;

    fn open_duplicate_transaction(&self) -> VmResult<Self::Duplicate>;

    /// Host-level logging; the engine itself only ever emits through the
    /// `log` crate's facade, so this is for host-specific audit trails
    /// layered on top, not a replacement for it.
    fn log(&self, level: log::Level, message: &str);

    /// A host-supplied cooperative cancellation budget; `None` means run to
    /// completion.
    fn time_budget(&self) -> Option<Duration> {
        None
    }
}
