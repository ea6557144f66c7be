//! `body` (RFC 5173). Compiles and runs through the same match-operand path
//! as `header`/`address`/`envelope` ([`crate::codegen`]'s `"body"` arm,
//! [`crate::interp::Interpreter::exec_extension`]'s `"body"` arm), applied
//! against [`crate::host::MessageContext::body_text`]. This crate doesn't
//! implement `:raw`/`:content <mime-type>` (RFC 5173 §3) — the host is
//! expected to hand back whichever body representation the deployment
//! wants matched, not the interpreter.
