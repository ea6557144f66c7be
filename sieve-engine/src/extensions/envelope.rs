//! `envelope` (RFC 5228 §5.4). The test itself compiles and runs entirely
//! through the generic match-operand path shared with `header`/`address`
//! (see [`crate::codegen::generate`]'s `"envelope"` arm and
//! [`crate::interp::Interpreter::exec_extension`]'s `"envelope"` arm); there
//! is no extension-specific logic left over to hold here beyond naming the
//! extension and documenting why.
