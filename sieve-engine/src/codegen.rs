//! The code generator.
//!
//! Walks the validated arena and emits the linear bytecode the interpreter
//! runs. `anyof`/`allof` compile to jump lists, with a one-test elision when
//! a test list has exactly one member. `if`/`elsif`/`else` chains share one
//! exit address. Never consults wall-clock time, randomness, or hash-map
//! iteration order, so two compiles of the same source are byte-identical.

use sieve_types::ast::{Argument, Node, NodeKind, StringLit, StringPart};
use sieve_types::{NodeId, Script};

use crate::binary::encode::{write_string, write_varint};
use crate::binary::Binary;
use crate::registry::{Extension, Registry};
use sieve_types::opcode::{address_part, comparator, match_kind, match_type, CoreOp};
use crate::validator::ValidatedAst;

pub fn generate(script: &Script, validated: &ValidatedAst, registry: &Registry) -> Binary {
    let mut gen = CodeGen::new();
    gen.emit_commands(script, &script.roots, validated, registry);
    gen.emit_op(CoreOp::Stop);

    let extensions: Vec<_> = registry
        .ordered_extensions()
        .into_iter()
        .filter(|(_, ext)| validated.is_active(*ext))
        .map(|(id, ext)| (id, ext.name().to_string()))
        .collect();

    Binary::new(extensions, gen.buf)
}

struct CodeGen {
    buf: Vec<u8>,
}

impl CodeGen {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn here(&self) -> u32 {
        self.buf.len() as u32
    }

    fn emit_op(&mut self, op: CoreOp) {
        self.buf.push(op as u8);
    }

    fn emit_ext_op(&mut self, registry: &Registry, ext: Extension, sub_op: u16) {
        self.buf.push(sieve_types::opcode::EXTENSION_MARKER);
        let id = registry.id_of(ext).expect("extension must be registered to be emitted");
        write_varint(&mut self.buf, id.0 as u64);
        write_varint(&mut self.buf, sub_op as u64);
    }

    /// Emits a jump opcode with a placeholder 4-byte target; returns the
    /// placeholder's offset for [`Self::patch_jump`].
    fn emit_jump(&mut self, op: CoreOp) -> usize {
        self.emit_op(op);
        let pos = self.buf.len();
        self.buf.extend_from_slice(&[0u8; 4]);
        pos
    }

    fn patch_jump(&mut self, pos: usize, target: u32) {
        self.buf[pos..pos + 4].copy_from_slice(&target.to_le_bytes());
    }

    fn write_string_lit(&mut self, lit: &StringLit) {
        write_varint(&mut self.buf, lit.parts.len() as u64);
        for part in &lit.parts {
            match part {
                StringPart::Literal(s) => {
                    self.buf.push(0);
                    write_string(&mut self.buf, s);
                }
                StringPart::VarRef(name) => {
                    self.buf.push(1);
                    write_string(&mut self.buf, name);
                }
                StringPart::MatchRef(n) => {
                    self.buf.push(2);
                    write_varint(&mut self.buf, *n as u64);
                }
            }
        }
    }

    fn write_string_list(&mut self, list: &[StringLit]) {
        write_varint(&mut self.buf, list.len() as u64);
        for lit in list {
            self.write_string_lit(lit);
        }
    }

    fn positional_string_list<'a>(&self, node: &'a Node, index: usize) -> Vec<StringLit> {
        match node.positional.get(index) {
            Some(Argument::StringList(list)) => list.clone(),
            Some(Argument::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Emits a run of sibling commands, grouping `if`/`elsif`*/`else?` into
    /// one conditional chain.
    fn emit_commands(
        &mut self,
        script: &Script,
        ids: &[NodeId],
        validated: &ValidatedAst,
        registry: &Registry,
    ) {
        let mut i = 0;
        while i < ids.len() {
            let node = script.arena.get(ids[i]);
            if node.name == "if" {
                let mut arms = vec![ids[i]];
                i += 1;
                while i < ids.len() && script.arena.get(ids[i]).name == "elsif" {
                    arms.push(ids[i]);
                    i += 1;
                }
                let else_arm = if i < ids.len() && script.arena.get(ids[i]).name == "else" {
                    let id = ids[i];
                    i += 1;
                    Some(id)
                } else {
                    None
                };
                self.emit_if_chain(script, &arms, else_arm, validated, registry);
            } else {
                self.emit_command(script, node, validated, registry);
                i += 1;
            }
        }
    }

    fn emit_if_chain(
        &mut self,
        script: &Script,
        arms: &[NodeId],
        else_arm: Option<NodeId>,
        validated: &ValidatedAst,
        registry: &Registry,
    ) {
        let mut end_jumps = Vec::new();
        for &arm_id in arms {
            let arm = script.arena.get(arm_id);
            let Some(Argument::Test(test_id)) = arm.positional.first() else {
                continue;
            };
            self.emit_test(script, script.arena.get(*test_id), validated, registry);
            let skip_pos = self.emit_jump(CoreOp::JmpFalse);
            if let Some(block) = &arm.block {
                self.emit_commands(script, block, validated, registry);
            }
            end_jumps.push(self.emit_jump(CoreOp::Jmp));
            let here = self.here();
            self.patch_jump(skip_pos, here);
        }
        if let Some(else_id) = else_arm {
            let else_node = script.arena.get(else_id);
            if let Some(block) = &else_node.block {
                self.emit_commands(script, block, validated, registry);
            }
        }
        let end = self.here();
        for pos in end_jumps {
            self.patch_jump(pos, end);
        }
    }

    fn emit_command(&mut self, script: &Script, node: &Node, validated: &ValidatedAst, registry: &Registry) {
        match node.name.as_str() {
            "keep" => {
                self.emit_op(CoreOp::Keep);
                let flags = node.tag("flags").and_then(|t| t.param.as_ref());
                self.write_flags_operand(flags);
            }
            "discard" => self.emit_op(CoreOp::Discard),
            "stop" => self.emit_op(CoreOp::Stop),
            "redirect" => {
                self.emit_op(CoreOp::Redirect);
                self.buf.push(if node.tag("copy").is_some() { 1 } else { 0 });
                let addr = match node.positional.first() {
                    Some(Argument::String(s)) => s.clone(),
                    _ => StringLit::literal(""),
                };
                self.write_string_lit(&addr);
            }
            "require" => {}
            "fileinto" => {
                self.emit_ext_op(registry, Extension::Fileinto, 0);
                self.buf.push(if node.tag("copy").is_some() { 1 } else { 0 });
                let mailbox = match node.positional.first() {
                    Some(Argument::String(s)) => s.clone(),
                    _ => StringLit::literal(""),
                };
                self.write_string_lit(&mailbox);
            }
            "reject" | "ereject" => {
                self.emit_ext_op(registry, Extension::Reject, if node.name == "ereject" { 1 } else { 0 });
                let reason = match node.positional.first() {
                    Some(Argument::String(s)) => s.clone(),
                    _ => StringLit::literal(""),
                };
                self.write_string_lit(&reason);
            }
            "setflag" | "addflag" | "removeflag" => {
                let sub = match node.name.as_str() {
                    "setflag" => 0,
                    "addflag" => 1,
                    _ => 2,
                };
                self.emit_ext_op(registry, Extension::Imap4Flags, sub);
                let flags = self.positional_string_list(node, node.positional.len().saturating_sub(1));
                self.write_string_list(&flags);
            }
            "vacation" => {
                self.emit_ext_op(registry, Extension::Vacation, 0);
                let reason = match node.positional.first() {
                    Some(Argument::String(s)) => s.clone(),
                    _ => StringLit::literal(""),
                };
                self.write_string_lit(&reason);
                let days = node
                    .tag("days")
                    .and_then(|t| t.param.as_ref())
                    .and_then(|a| match a {
                        Argument::Number(n) => Some(*n),
                        _ => None,
                    })
                    .unwrap_or(7);
                write_varint(&mut self.buf, crate::extensions::vacation::clamp_days(days));
                let subject = node
                    .tag("subject")
                    .and_then(|t| t.param.as_ref())
                    .and_then(|a| match a {
                        Argument::String(s) => Some(s.clone()),
                        _ => None,
                    });
                self.buf.push(subject.is_some() as u8);
                if let Some(subject) = subject {
                    self.write_string_lit(&subject);
                }
                let handle = node
                    .tag("handle")
                    .and_then(|t| t.param.as_ref())
                    .and_then(|a| match a {
                        Argument::String(s) => Some(s.clone()),
                        _ => None,
                    });
                self.buf.push(handle.is_some() as u8);
                if let Some(handle) = handle {
                    self.write_string_lit(&handle);
                }
            }
            "set" => {
                let sub = self.variables_modifier_mask(node);
                self.emit_ext_op(registry, Extension::Variables, sub);
                let name = match node.positional.first() {
                    Some(Argument::String(s)) => s.as_literal().unwrap_or_default().to_string(),
                    _ => String::new(),
                };
                write_string(&mut self.buf, &name);
                let value = match node.positional.get(1) {
                    Some(Argument::String(s)) => s.clone(),
                    _ => StringLit::literal(""),
                };
                self.write_string_lit(&value);
            }
            "global" => {
                self.emit_ext_op(registry, Extension::Include, 2);
                let name = match node.positional.first() {
                    Some(Argument::String(s)) => s.as_literal().unwrap_or_default().to_string(),
                    _ => String::new(),
                };
                write_string(&mut self.buf, &name);
            }
            "include" => {
                self.emit_ext_op(registry, Extension::Include, 0);
                self.buf.push(if node.tag("global").is_some() { 1 } else { 0 });
                self.buf.push(if node.tag("once").is_some() { 1 } else { 0 });
                self.buf.push(if node.tag("optional").is_some() { 1 } else { 0 });
                let name = match node.positional.first() {
                    Some(Argument::String(s)) => s.as_literal().unwrap_or_default().to_string(),
                    _ => String::new(),
                };
                write_string(&mut self.buf, &name);
            }
            _ => {
                // Unknown by this pass (should have been rejected earlier);
                // emit a no-op-equivalent stop to keep offsets sane rather
                // than panic on a defect elsewhere in the pipeline.
                self.emit_op(CoreOp::Stop);
            }
        }
        let _ = validated;
    }

    fn variables_modifier_mask(&self, node: &Node) -> u16 {
        let mut mask = 0u16;
        for tag in &node.tags {
            if let Some(modifier) = crate::variables::Modifier::from_tag(&tag.name) {
                mask |= 1 << (modifier as u16);
            }
        }
        mask
    }

    fn write_flags_operand(&mut self, flags: Option<&Argument>) {
        match flags {
            Some(Argument::StringList(list)) => self.write_string_list(list),
            Some(Argument::String(s)) => self.write_string_list(std::slice::from_ref(s)),
            _ => write_varint(&mut self.buf, 0),
        }
    }

    fn emit_test(&mut self, script: &Script, node: &Node, validated: &ValidatedAst, registry: &Registry) {
        match node.name.as_str() {
            "true" => self.emit_op(CoreOp::TestTrue),
            "false" => self.emit_op(CoreOp::TestFalse),
            "not" => {
                if let Some(Argument::Test(inner)) = node.positional.first() {
                    self.emit_test(script, script.arena.get(*inner), validated, registry);
                }
                self.emit_op(CoreOp::Not);
            }
            "anyof" => self.emit_test_list(script, node, validated, registry, true),
            "allof" => self.emit_test_list(script, node, validated, registry, false),
            "exists" => {
                self.emit_op(CoreOp::TestExists);
                let headers = self.positional_string_list(node, 0);
                self.write_string_list(&headers);
            }
            "size" => {
                self.emit_op(CoreOp::TestSize);
                self.buf.push(if node.tag("under").is_some() { 1 } else { 0 });
                let n = node.positional.first().and_then(|a| match a {
                    Argument::Number(n) => Some(*n),
                    _ => None,
                });
                write_varint(&mut self.buf, n.unwrap_or(0));
            }
            "header" => {
                self.emit_op(CoreOp::TestHeader);
                self.write_match_operand(node);
                let headers = self.positional_string_list(node, 0);
                let keys = self.positional_string_list(node, 1);
                self.write_string_list(&headers);
                self.write_string_list(&keys);
            }
            "address" => {
                self.emit_op(CoreOp::TestAddress);
                self.write_match_operand(node);
                write_varint(&mut self.buf, self.address_part_of(node) as u64);
                let headers = self.positional_string_list(node, 0);
                let keys = self.positional_string_list(node, 1);
                self.write_string_list(&headers);
                self.write_string_list(&keys);
            }
            "envelope" => {
                self.emit_ext_op(registry, Extension::Envelope, 0);
                self.write_match_operand(node);
                write_varint(&mut self.buf, self.address_part_of(node) as u64);
                let parts = self.positional_string_list(node, 0);
                let keys = self.positional_string_list(node, 1);
                self.write_string_list(&parts);
                self.write_string_list(&keys);
            }
            "body" => {
                self.emit_ext_op(registry, Extension::Body, 0);
                self.write_match_operand(node);
                let keys = self.positional_string_list(node, node.positional.len().saturating_sub(1));
                self.write_string_list(&keys);
            }
            "string" => {
                self.emit_ext_op(registry, Extension::Relational, 0);
                self.write_match_operand(node);
                let sources = self.positional_string_list(node, 0);
                let keys = self.positional_string_list(node, 1);
                self.write_string_list(&sources);
                self.write_string_list(&keys);
            }
            _ => self.emit_op(CoreOp::TestFalse),
        }
    }

    /// Writes a `header`/`address`/`envelope`/`body` test's comparator and
    /// match operand: comparator tag, then a [`match_kind`] discriminant
    /// followed by either a `match_type` tag or (for `:count`/`:value`) a
    /// relation tag.
    fn write_match_operand(&mut self, node: &Node) {
        let cmp = match node.tag("comparator").and_then(|t| t.param.as_ref()) {
            Some(Argument::String(s)) if s.as_literal() == Some("i;octet") => comparator::I_OCTET,
            _ => comparator::I_ASCII_CASEMAP,
        };
        write_varint(&mut self.buf, cmp as u64);

        if let Some(relation) = self.relation_tag(node, "count") {
            write_varint(&mut self.buf, match_kind::COUNT as u64);
            write_varint(&mut self.buf, relation as u64);
        } else if let Some(relation) = self.relation_tag(node, "value") {
            write_varint(&mut self.buf, match_kind::VALUE as u64);
            write_varint(&mut self.buf, relation as u64);
        } else {
            write_varint(&mut self.buf, match_kind::MATCH_TYPE as u64);
            let mt = if node.tag("contains").is_some() {
                match_type::CONTAINS
            } else if node.tag("matches").is_some() {
                match_type::MATCHES
            } else if node.tag("regex").is_some() {
                match_type::REGEX
            } else {
                match_type::IS
            };
            write_varint(&mut self.buf, mt as u64);
        }
    }

    /// `:count "ge"` / `:value "ge"` (RFC 5231 §4): the tag's string param
    /// names the relational operator.
    fn relation_tag(&self, node: &Node, tag_name: &str) -> Option<u16> {
        let param = node.tag(tag_name)?.param.as_ref()?;
        let Argument::String(s) = param else { return None };
        let text = s.as_literal()?;
        Some(crate::match_engine::Relation::from_tag(text)?.to_wire())
    }

    fn address_part_of(&self, node: &Node) -> u16 {
        if node.tag("localpart").is_some() {
            address_part::LOCALPART
        } else if node.tag("domain").is_some() {
            address_part::DOMAIN
        } else if node.tag("user").is_some() {
            address_part::USER
        } else if node.tag("detail").is_some() {
            address_part::DETAIL
        } else {
            address_part::ALL
        }
    }

    fn emit_test_list(
        &mut self,
        script: &Script,
        node: &Node,
        validated: &ValidatedAst,
        registry: &Registry,
        is_any: bool,
    ) {
        let Some(Argument::TestList(list)) = node.positional.first() else {
            self.emit_op(CoreOp::TestFalse);
            return;
        };
        // One-element elision: no jump list
        // needed, the lone test's result is already the chain's result.
        if list.len() == 1 {
            self.emit_test(script, script.arena.get(list[0]), validated, registry);
            return;
        }

        let short_circuit_op = if is_any { CoreOp::JmpTrue } else { CoreOp::JmpFalse };
        let mut short_circuit_jumps = Vec::new();
        for &test_id in &list[..list.len() - 1] {
            self.emit_test(script, script.arena.get(test_id), validated, registry);
            short_circuit_jumps.push(self.emit_jump(short_circuit_op));
        }
        self.emit_test(script, script.arena.get(*list.last().unwrap()), validated, registry);
        let end_jump = self.emit_jump(CoreOp::Jmp);
        let shortcut_target = self.here();
        self.emit_op(if is_any { CoreOp::TestTrue } else { CoreOp::TestFalse });
        let end = self.here();
        for pos in short_circuit_jumps {
            self.patch_jump(pos, shortcut_target);
        }
        self.patch_jump(end_jump, end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Capabilities;
    use crate::validator::{validate, ErrorHandler};
    use sieve_types::{Limits, ScriptLocation};

    fn compile_ok(src: &str, caps: Capabilities) -> Binary {
        let mut script = Script::new("t", ScriptLocation::Personal, src);
        crate::parser::parse(&mut script).unwrap();
        let registry = Registry::new(caps);
        let limits = Limits::default();
        let mut errors = ErrorHandler::new(limits.max_compile_errors);
        let validated = validate(&mut script, &registry, &limits, &mut errors).unwrap();
        generate(&script, &validated, &registry)
    }

    #[test]
    fn repeated_compiles_are_byte_identical() {
        let src = r#"if header :contains "subject" "sale" { discard; } else { keep; }"#;
        let a = compile_ok(src, Capabilities::none());
        let b = compile_ok(src, Capabilities::none());
        assert_eq!(a, b);
    }

    #[test]
    fn single_test_anyof_elides_the_jump_list() {
        let with_list = compile_ok("if anyof (true) { stop; }", Capabilities::none());
        let bare = compile_ok("if true { stop; }", Capabilities::none());
        assert_eq!(with_list.main_code(), bare.main_code());
    }

    #[test]
    fn emits_stop_at_end_of_script() {
        let binary = compile_ok("keep;", Capabilities::none());
        assert_eq!(*binary.main_code().last().unwrap(), CoreOp::Stop as u8);
    }
}
