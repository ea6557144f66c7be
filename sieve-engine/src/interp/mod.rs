//! The interpreter.
//!
//! A stack-free VM: tests communicate only through `RuntimeEnv::test_result`
//! (set by every `Test*` opcode, consumed by the next `JmpTrue`/`JmpFalse`);
//! there is no operand stack. `core` opcodes dispatch directly;
//! `EXTENSION_MARKER`-prefixed opcodes dispatch by `(extension name,
//! sub-opcode)`, resolved once per binary via its own extension table
//! rather than by the registry, since a loaded binary may outlive the
//! `Registry` that compiled it.

pub mod ops;
pub mod renv;

pub use renv::RuntimeEnv;

use sieve_types::ast::StringLit;
use sieve_types::opcode::CoreOp;
use sieve_types::{ActionEntry, ActionKind, ActionParams, Failure, Limits, ScriptLocation, SourceLocation, VmResult};

use crate::binary::{Binary, Cursor};
use crate::error::BinaryError;
use crate::host::{Host, MessageContext};
use crate::match_engine::MatchOp;
use crate::variables::GlobalScope;

/// Drives one [`Binary`] to completion against a [`Host`], producing the
/// action [`sieve_types::ResultSet`].
pub struct Interpreter<'a, H: Host> {
    binary: &'a Binary,
    host: &'a H,
    message: &'a H::Message,
    ext_names: Vec<String>,
}

impl<'a, H: Host> Interpreter<'a, H> {
    pub fn new(binary: &'a Binary, host: &'a H, message: &'a H::Message) -> Self {
        let mut ext_names = vec![String::new(); binary.extensions.iter().map(|(id, _)| id.0).max().unwrap_or(0) as usize + 1];
        for (id, name) in &binary.extensions {
            ext_names[id.0 as usize] = name.clone();
        }
        Self {
            binary,
            host,
            message,
            ext_names,
        }
    }

    pub fn run(&self, limits: &Limits) -> VmResult<sieve_types::ResultSet> {
        let mut env = RuntimeEnv::new(limits);
        let mut global = GlobalScope::new();
        self.run_block(0, &mut env, &mut global)?;
        crate::actions::finalize(&mut env.result);
        Ok(env.result)
    }

    fn run_block(&self, block: usize, env: &mut RuntimeEnv<'_>, global: &mut GlobalScope) -> VmResult<()> {
        let code = self
            .binary
            .blocks
            .get(block)
            .ok_or(Failure::BinCorrupt("program counter out of range".to_string()))?;
        let mut offset = 0usize;

        loop {
            env.check_interrupted()?;
            if offset >= code.len() {
                return Ok(());
            }
            let mut cursor = Cursor::new(&code[offset..]);
            let opcode_byte = cursor.read_u8().map_err(bin_err)?;

            if opcode_byte == sieve_types::opcode::EXTENSION_MARKER {
                let ext_id = cursor.read_varint().map_err(bin_err)? as u16;
                let sub_op = cursor.read_varint().map_err(bin_err)? as u16;
                let consumed_header = cursor_pos(&cursor);
                let body_start = offset + consumed_header;
                let advance = self.exec_extension(ext_id, sub_op, &code[body_start..], env, global)?;
                offset = body_start + advance;
                continue;
            }

            let op = CoreOp::from_byte(opcode_byte)
                .ok_or_else(|| Failure::BinCorrupt(format!("unknown opcode {opcode_byte:#04x}")))?;
            let header_len = cursor_pos(&cursor);
            let body = &code[offset + header_len..];
            let mut body_cursor = Cursor::new(body);

            match op {
                CoreOp::Jmp => {
                    let target = read_u32(&mut body_cursor)?;
                    offset = target as usize;
                    continue;
                }
                CoreOp::JmpTrue => {
                    let target = read_u32(&mut body_cursor)?;
                    offset = if env.test_result { target as usize } else { offset + header_len + 4 };
                    continue;
                }
                CoreOp::JmpFalse => {
                    let target = read_u32(&mut body_cursor)?;
                    offset = if !env.test_result { target as usize } else { offset + header_len + 4 };
                    continue;
                }
                CoreOp::Not => {
                    env.test_result = !env.test_result;
                    offset += header_len;
                }
                CoreOp::TestTrue => {
                    env.test_result = true;
                    offset += header_len;
                }
                CoreOp::TestFalse => {
                    env.test_result = false;
                    offset += header_len;
                }
                CoreOp::TestExists => {
                    let headers = read_string_list_eval(&mut body_cursor, env, global)?;
                    env.test_result = ops::test_exists(self.message, &headers);
                    offset += header_len + cursor_pos(&body_cursor);
                }
                CoreOp::TestSize => {
                    let under = body_cursor.read_u8().map_err(bin_err)? != 0;
                    let n = body_cursor.read_varint().map_err(bin_err)?;
                    env.test_result = ops::test_size(self.message, under, n);
                    offset += header_len + cursor_pos(&body_cursor);
                }
                CoreOp::TestHeader => {
                    let cmp_tag = body_cursor.read_varint().map_err(bin_err)? as u16;
                    let match_op = ops::read_match_op(&mut body_cursor).map_err(bin_err)?;
                    let headers = read_string_list_eval(&mut body_cursor, env, global)?;
                    let keys = read_string_list_eval(&mut body_cursor, env, global)?;
                    let comparator = ops::comparator_by_tag(cmp_tag);
                    let candidates = ops::gather_header_values(self.message, &headers);
                    let outcome = crate::match_engine::run_match(&match_op, comparator.as_ref(), &candidates, &keys);
                    apply_match_outcome(env, &match_op, outcome);
                    offset += header_len + cursor_pos(&body_cursor);
                }
                CoreOp::TestAddress => {
                    let cmp_tag = body_cursor.read_varint().map_err(bin_err)? as u16;
                    let match_op = ops::read_match_op(&mut body_cursor).map_err(bin_err)?;
                    let part = body_cursor.read_varint().map_err(bin_err)? as u16;
                    let headers = read_string_list_eval(&mut body_cursor, env, global)?;
                    let keys = read_string_list_eval(&mut body_cursor, env, global)?;
                    let comparator = ops::comparator_by_tag(cmp_tag);
                    let candidates = ops::gather_address_values(self.message, &headers, part);
                    let outcome = crate::match_engine::run_match(&match_op, comparator.as_ref(), &candidates, &keys);
                    apply_match_outcome(env, &match_op, outcome);
                    offset += header_len + cursor_pos(&body_cursor);
                }
                CoreOp::Keep => {
                    let _flags = read_string_list_eval(&mut body_cursor, env, global)?;
                    crate::actions::append_action(
                        &mut env.result,
                        ActionEntry::new(ActionKind::Keep, ActionParams::default(), SourceLocation::START),
                    );
                    offset += header_len + cursor_pos(&body_cursor);
                }
                CoreOp::Discard => {
                    crate::actions::append_action(
                        &mut env.result,
                        ActionEntry::new(ActionKind::Discard, ActionParams::default(), SourceLocation::START),
                    );
                    offset += header_len;
                }
                CoreOp::Redirect => {
                    let is_copy = body_cursor.read_u8().map_err(bin_err)? != 0;
                    let address = read_string_lit_eval(&mut body_cursor, env, global)?;
                    crate::actions::append_action(
                        &mut env.result,
                        ActionEntry::new(
                            ActionKind::Redirect,
                            ActionParams::default().with_string("address", address).with_flag("copy", is_copy),
                            SourceLocation::START,
                        ),
                    );
                    offset += header_len + cursor_pos(&body_cursor);
                }
                CoreOp::Stop => return Ok(()),
                CoreOp::EndBlock => {
                    offset += header_len;
                }
            }
        }
    }

    fn exec_extension(
        &self,
        ext_id: u16,
        sub_op: u16,
        body: &[u8],
        env: &mut RuntimeEnv<'_>,
        global: &mut GlobalScope,
    ) -> VmResult<usize> {
        let name = self
            .ext_names
            .get(ext_id as usize)
            .map(|s| s.as_str())
            .unwrap_or("");
        let mut cursor = Cursor::new(body);

        match name {
            "fileinto" => {
                let is_copy = cursor.read_u8().map_err(bin_err)? != 0;
                let mailbox = read_string_lit_eval(&mut cursor, env, global)?;
                crate::extensions::fileinto::validate_mailbox_name(&mailbox).map_err(|_| Failure::Failure)?;
                crate::actions::append_action(
                    &mut env.result,
                    ActionEntry::new(
                        ActionKind::FileInto,
                        ActionParams::default().with_string("mailbox", mailbox).with_flag("copy", is_copy),
                        SourceLocation::START,
                    ),
                );
            }
            "reject" => {
                let reason = crate::extensions::reject::normalize_reason(&read_string_lit_eval(&mut cursor, env, global)?);
                crate::actions::append_action(
                    &mut env.result,
                    ActionEntry::new(
                        ActionKind::Reject,
                        ActionParams::default().with_string("reason", reason).with_flag("extended", sub_op == 1),
                        SourceLocation::START,
                    ),
                );
            }
            "imap4flags" => {
                let flags = read_string_list_eval(&mut cursor, env, global)?;
                for flag in &flags {
                    if !crate::extensions::imap4flags::is_valid_flag_name(flag) {
                        return Err(Failure::Failure);
                    }
                }
                let kind = match sub_op {
                    0 => ActionKind::SetFlag,
                    1 => ActionKind::AddFlag,
                    _ => ActionKind::RemoveFlag,
                };
                let mut params = ActionParams::default();
                for (i, flag) in flags.iter().enumerate() {
                    params = params.with_string(Box::leak(format!("flag{i}").into_boxed_str()), flag.clone());
                }
                crate::actions::append_action(&mut env.result, ActionEntry::new(kind, params, SourceLocation::START));
            }
            "vacation" => {
                let reason = read_string_lit_eval(&mut cursor, env, global)?;
                let days = crate::extensions::vacation::clamp_days(cursor.read_varint().map_err(bin_err)?);
                let has_subject = cursor.read_u8().map_err(bin_err)? != 0;
                let subject = if has_subject {
                    Some(read_string_lit_eval(&mut cursor, env, global)?)
                } else {
                    None
                };
                let has_handle = cursor.read_u8().map_err(bin_err)? != 0;
                let handle = if has_handle {
                    Some(read_string_lit_eval(&mut cursor, env, global)?)
                } else {
                    None
                };
                let recipient = self.message.envelope("to").into_iter().next().unwrap_or_default();
                let key = crate::extensions::vacation::duplicate_key(&recipient, &reason, handle.as_deref());
                let mut params = ActionParams::default()
                    .with_string("reason", reason)
                    .with_string("days", days.to_string())
                    .with_string("duplicate_key", key);
                if let Some(subject) = subject {
                    params = params.with_string("subject", subject);
                }
                if let Some(handle) = handle {
                    params = params.with_string("handle", handle);
                }
                crate::actions::append_action(
                    &mut env.result,
                    ActionEntry::new(ActionKind::Vacation, params, SourceLocation::START),
                );
            }
            "envelope" => {
                let cmp_tag = cursor.read_varint().map_err(bin_err)? as u16;
                let match_op = ops::read_match_op(&mut cursor).map_err(bin_err)?;
                let part = cursor.read_varint().map_err(bin_err)? as u16;
                let parts = read_string_list_eval(&mut cursor, env, global)?;
                let keys = read_string_list_eval(&mut cursor, env, global)?;
                let comparator = ops::comparator_by_tag(cmp_tag);
                let candidates = ops::gather_envelope_values(self.message, &parts, part);
                let outcome = crate::match_engine::run_match(&match_op, comparator.as_ref(), &candidates, &keys);
                apply_match_outcome(env, &match_op, outcome);
            }
            "body" => {
                let cmp_tag = cursor.read_varint().map_err(bin_err)? as u16;
                let match_op = ops::read_match_op(&mut cursor).map_err(bin_err)?;
                let keys = read_string_list_eval(&mut cursor, env, global)?;
                let comparator = ops::comparator_by_tag(cmp_tag);
                let candidates = vec![self.message.body_text().to_string()];
                let outcome = crate::match_engine::run_match(&match_op, comparator.as_ref(), &candidates, &keys);
                apply_match_outcome(env, &match_op, outcome);
            }
            "relational" => {
                let cmp_tag = cursor.read_varint().map_err(bin_err)? as u16;
                let match_op = ops::read_match_op(&mut cursor).map_err(bin_err)?;
                let sources = read_string_list_eval(&mut cursor, env, global)?;
                let keys = read_string_list_eval(&mut cursor, env, global)?;
                let comparator = ops::comparator_by_tag(cmp_tag);
                let outcome = crate::match_engine::run_match(&match_op, comparator.as_ref(), &sources, &keys);
                apply_match_outcome(env, &match_op, outcome);
            }
            "variables" => {
                let name = cursor.read_string().map_err(bin_err)?;
                let value_lit = cursor.read_string_lit().map_err(bin_err)?;
                let mut value = ops::eval_string(&value_lit, env, global);
                value = apply_modifier_mask(sub_op, &value);
                if env.scope.is_global(&name) {
                    global.set(&name, value, env.limits);
                } else {
                    env.scope.set_local(&name, value, env.limits);
                }
            }
            "include" if sub_op == 2 => {
                let name = cursor.read_string().map_err(bin_err)?;
                env.scope.declare_global(&name);
            }
            "include" => {
                let is_global = cursor.read_u8().map_err(bin_err)? != 0;
                let once = cursor.read_u8().map_err(bin_err)? != 0;
                let optional = cursor.read_u8().map_err(bin_err)? != 0;
                let name = cursor.read_string().map_err(bin_err)?;
                let location = if is_global { ScriptLocation::Global } else { ScriptLocation::Personal };

                // Every include records itself, so a later `:once` of the
                // same script sees it was already run; a plain include
                // never checks the record and always runs.
                let first_time = env.include_once.mark_once(location, &name);
                let already_run = once && !first_time;
                if !already_run {
                    if env.include_depth + 1 > env.limits.max_nesting_depth {
                        return Err(Failure::ResourceLimit("include nesting depth exceeded".to_string()));
                    }
                    if env.include_count_budget == 0 {
                        return Err(Failure::ResourceLimit("include count exceeded".to_string()));
                    }
                    env.include_count_budget -= 1;
                    match self.host.open_script(location, &name).map_err(|_| Failure::Failure)? {
                        Some(source) => self.run_included(&name, location, source, env, global)?,
                        None if optional => {}
                        None => return Err(Failure::Failure),
                    }
                }
            }
            _ => return Err(Failure::BinCorrupt(format!("unknown extension {name:?}"))),
        }
        Ok(cursor_pos(&cursor))
    }

    /// Compiles `source` and runs it to completion as a sub-interpreter,
    /// sharing `env`'s scope/result accumulator and `global`'s variable
    /// storage with the including script. Re-resolves extensions against a
    /// fresh [`crate::registry::Registry`] rather than the one the parent
    /// compiled against, since that registry isn't available at run time.
    fn run_included(
        &self,
        name: &str,
        location: ScriptLocation,
        source: String,
        env: &mut RuntimeEnv<'_>,
        global: &mut GlobalScope,
    ) -> VmResult<()> {
        let registry = crate::registry::Registry::new(crate::registry::Capabilities::all_compiled_in());
        let mut included = sieve_types::Script::new(name, location, source);
        let outcome = crate::compile(&mut included, &registry, env.limits);
        let binary = outcome.binary.ok_or(Failure::Failure)?;
        let sub = Interpreter::new(&binary, self.host, self.message);

        env.include_depth += 1;
        let result = sub.run_block(0, env, global);
        env.include_depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use crate::host::{DuplicateTransaction, Host, MessageContext, SmtpHandle};
    use crate::registry::{Capabilities, Registry};
    use sieve_types::Script;

    struct FakeMessage;
    impl MessageContext for FakeMessage {
        fn header_values(&self, _name: &str) -> Vec<String> {
            Vec::new()
        }
        fn envelope(&self, _part: &str) -> Vec<String> {
            Vec::new()
        }
        fn size(&self) -> u64 {
            0
        }
        fn body_text(&self) -> &str {
            ""
        }
    }

    struct FakeSmtp;
    impl SmtpHandle for FakeSmtp {
        fn set_from(&mut self, _from: &str) -> VmResult<()> {
            Ok(())
        }
        fn add_recipient(&mut self, _to: &str) -> VmResult<()> {
            Ok(())
        }
        fn write_body(&mut self, _chunk: &[u8]) -> VmResult<()> {
            Ok(())
        }
        fn finish(self: Box<Self>) -> VmResult<()> {
            Ok(())
        }
    }

    struct FakeDuplicate;
    impl DuplicateTransaction for FakeDuplicate {
        fn check(&mut self, _key: &str) -> VmResult<bool> {
            Ok(false)
        }
        fn mark(&mut self, _key: &str, _period: Duration) -> VmResult<()> {
            Ok(())
        }
    }

    struct FakeHost {
        scripts: HashMap<(ScriptLocation, String), String>,
    }

    impl Host for FakeHost {
        type Message = FakeMessage;
        type Smtp = FakeSmtp;
        type Duplicate = FakeDuplicate;

        fn open_script(&self, location: ScriptLocation, name: &str) -> VmResult<Option<String>> {
            Ok(self.scripts.get(&(location, name.to_string())).cloned())
        }
        fn open_smtp(&self) -> VmResult<Box<Self::Smtp>> {
            Ok(Box::new(FakeSmtp))
        }
        fn open_duplicate_transaction(&self) -> VmResult<Self::Duplicate> {
            Ok(FakeDuplicate)
        }
        fn log(&self, _level: log::Level, _message: &str) {}
    }

    fn compile_ok(source: &str) -> Binary {
        let limits = Limits::default();
        let registry = Registry::new(Capabilities::all_compiled_in());
        let mut script = Script::new("main", ScriptLocation::Personal, source.to_string());
        let outcome = crate::compile(&mut script, &registry, &limits);
        outcome.binary.unwrap_or_else(|| panic!("compile failed: {:?}", outcome.diagnostics))
    }

    #[test]
    fn include_runs_the_named_script() {
        let mut scripts = HashMap::new();
        scripts.insert((ScriptLocation::Personal, "child".to_string()), "fileinto \"ran\";".to_string());
        let host = FakeHost { scripts };
        let binary = compile_ok("require [\"include\", \"fileinto\"];\ninclude :personal \"child\";\n");
        let message = FakeMessage;
        let result = Interpreter::new(&binary, &host, &message).run(&Limits::default()).unwrap();
        assert_eq!(result.entries.iter().filter(|e| e.kind == ActionKind::FileInto).count(), 1);
    }

    #[test]
    fn once_tagged_include_of_an_already_included_script_is_skipped() {
        let mut scripts = HashMap::new();
        scripts.insert((ScriptLocation::Personal, "child".to_string()), "fileinto \"ran\";".to_string());
        let host = FakeHost { scripts };
        let binary = compile_ok(
            "require [\"include\", \"fileinto\"];\n\
             include :personal \"child\";\n\
             include :personal :once \"child\";\n",
        );
        let message = FakeMessage;
        let result = Interpreter::new(&binary, &host, &message).run(&Limits::default()).unwrap();
        assert_eq!(result.entries.iter().filter(|e| e.kind == ActionKind::FileInto).count(), 1);
    }

    #[test]
    fn missing_optional_include_is_silently_skipped() {
        let host = FakeHost { scripts: HashMap::new() };
        let binary = compile_ok("require [\"include\"];\ninclude :personal :optional \"missing\";\n");
        let message = FakeMessage;
        let result = Interpreter::new(&binary, &host, &message).run(&Limits::default()).unwrap();
        assert!(result.implicit_keep);
    }
}

/// Sets the test-result register and, for the two match operands that
/// produce captures (`:matches`'s wildcard groups, `:regex`'s capture
/// groups), the `${1}..${N}` registers (RFC 5229 §3).
fn apply_match_outcome(env: &mut RuntimeEnv<'_>, op: &MatchOp, outcome: crate::match_engine::MatchOutcome) {
    env.test_result = outcome.matched;
    if matches!(op, MatchOp::Matches | MatchOp::Regex) && outcome.matched {
        env.match_values = outcome.captures;
    }
}

fn apply_modifier_mask(mask: u16, value: &str) -> String {
    let mut out = value.to_string();
    let modifiers = [
        crate::variables::Modifier::Length,
        crate::variables::Modifier::EncodeUrl,
        crate::variables::Modifier::QuoteWildcard,
        crate::variables::Modifier::UpperFirst,
        crate::variables::Modifier::LowerFirst,
        crate::variables::Modifier::Upper,
        crate::variables::Modifier::Lower,
    ];
    let mut sorted: Vec<_> = modifiers.into_iter().filter(|m| mask & (1 << (*m as u16)) != 0).collect();
    sorted.sort_by_key(|m| m.precedence());
    for modifier in sorted {
        out = crate::variables::apply_modifier(modifier, &out);
    }
    out
}

fn bin_err(e: BinaryError) -> Failure {
    Failure::BinCorrupt(e.to_string())
}

fn cursor_pos(cursor: &Cursor<'_>) -> usize {
    cursor.pos()
}

fn read_u32(cursor: &mut Cursor<'_>) -> VmResult<u32> {
    let bytes = cursor.read_bytes(4).map_err(bin_err)?;
    Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
}

fn read_string_lit_eval(cursor: &mut Cursor<'_>, env: &RuntimeEnv<'_>, global: &GlobalScope) -> VmResult<String> {
    let lit = cursor.read_string_lit().map_err(bin_err)?;
    Ok(ops::eval_string(&lit, env, global))
}

fn read_string_list_eval(cursor: &mut Cursor<'_>, env: &RuntimeEnv<'_>, global: &GlobalScope) -> VmResult<Vec<String>> {
    let list: Vec<StringLit> = cursor.read_string_list().map_err(bin_err)?;
    Ok(ops::eval_string_list(&list, env, global))
}
