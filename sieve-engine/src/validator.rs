//! The validator.
//!
//! Walks the arena reachable from `script.roots`, resolves `require`
//! against the [`crate::registry::Registry`], checks every command/test name
//! against the core set or an active extension, and rewrites string
//! arguments containing `${...}` into [`sieve_types::ast::StringPart`] lists
//! when the `variables` extension is active. Produces a [`ValidatedAst`] on
//! success or accumulates [`sieve_types::Diagnostic`]s (capped by
//! `max_compile_errors`, warnings excluded from the cap).

use std::collections::BTreeSet;

use sieve_types::ast::{Argument, StringPart};
use sieve_types::{Diagnostic, Limits, NodeId, Script, Severity};

use crate::registry::{Extension, Registry, RequireResolution};
use crate::variables;

/// Accumulates diagnostics during compilation, capping errors (not
/// warnings) at `max_compile_errors`.
#[derive(Debug)]
pub struct ErrorHandler {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
    cap: usize,
}

impl ErrorHandler {
    pub fn new(cap: usize) -> Self {
        Self {
            diagnostics: Vec::new(),
            error_count: 0,
            warning_count: 0,
            cap,
        }
    }

    pub fn push(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => {
                self.error_count += 1;
                if self.error_count <= self.cap {
                    self.diagnostics.push(diag);
                }
            }
            Severity::Warning => {
                self.warning_count += 1;
                self.diagnostics.push(diag);
            }
        }
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn into_parts(self) -> (Vec<Diagnostic>, usize, usize) {
        (self.diagnostics, self.error_count, self.warning_count)
    }
}

/// The validator's output: the set of extensions this script activated via
/// `require`, confirmed against the engine's active [`crate::registry::Capabilities`].
/// Codegen re-derives per-node opcode assignment from the (now validated)
/// arena plus this set.
#[derive(Debug, Clone)]
pub struct ValidatedAst {
    pub active: BTreeSet<Extension>,
}

impl ValidatedAst {
    pub fn is_active(&self, ext: Extension) -> bool {
        self.active.contains(&ext)
    }
}

/// Core command names (RFC 5228 §4 and §2.10.3's `stop`/`if`).
const CORE_COMMANDS: &[&str] = &["if", "elsif", "else", "require", "stop", "keep", "discard", "redirect"];

/// Core test names (RFC 5228 §5).
const CORE_TESTS: &[&str] = &[
    "address", "allof", "anyof", "exists", "false", "header", "not", "size", "true",
];

fn extension_for_command(name: &str) -> Option<Extension> {
    match name {
        "fileinto" => Some(Extension::Fileinto),
        "vacation" => Some(Extension::Vacation),
        "setflag" | "addflag" | "removeflag" | "hasflag" => Some(Extension::Imap4Flags),
        "reject" | "ereject" => Some(Extension::Reject),
        "set" => Some(Extension::Variables),
        "include" | "import" | "export" | "global" | "return" => Some(Extension::Include),
        _ => None,
    }
}

fn extension_for_test(name: &str) -> Option<Extension> {
    match name {
        "envelope" => Some(Extension::Envelope),
        "body" => Some(Extension::Body),
        "date" | "currentdate" => Some(Extension::Date),
        "string" => Some(Extension::Relational),
        _ => None,
    }
}

pub fn validate(
    script: &mut Script,
    registry: &Registry,
    limits: &Limits,
    errors: &mut ErrorHandler,
) -> Option<ValidatedAst> {
    let active = collect_requires(script, registry, errors);

    let roots = script.roots.clone();
    let mut depth_budget = limits.max_nesting_depth;
    for root in &roots {
        check_node(script, *root, &active, errors, &mut depth_budget, 0);
    }

    if errors.error_count() > 0 {
        return None;
    }

    if active.contains(&Extension::Variables) {
        variables::substitute_script(script);
    }

    Some(ValidatedAst { active })
}

fn collect_requires(script: &Script, registry: &Registry, errors: &mut ErrorHandler) -> BTreeSet<Extension> {
    let mut active = BTreeSet::new();
    for node in script.arena.iter() {
        if node.name != "require" {
            continue;
        }
        let names: Vec<&str> = node
            .positional
            .iter()
            .flat_map(|arg| match arg {
                Argument::String(s) => s.as_literal().into_iter().collect::<Vec<_>>(),
                Argument::StringList(list) => list.iter().filter_map(|s| s.as_literal()).collect(),
                _ => Vec::new(),
            })
            .collect();
        for name in names {
            match registry.resolve_require(name) {
                RequireResolution::Ok(ext) => {
                    active.insert(ext);
                }
                RequireResolution::NotEnabled => errors.push(Diagnostic::error(
                    script.name.clone(),
                    node.location,
                    format!("extension {name:?} is not enabled on this engine instance"),
                )),
                RequireResolution::Unknown => errors.push(Diagnostic::error(
                    script.name.clone(),
                    node.location,
                    format!("unknown extension {name:?}"),
                )),
            }
        }
    }
    active
}

fn check_node(
    script: &Script,
    id: NodeId,
    active: &BTreeSet<Extension>,
    errors: &mut ErrorHandler,
    depth_budget: &mut u32,
    depth: u32,
) {
    if depth > *depth_budget {
        errors.push(Diagnostic::error(
            script.name.clone(),
            script.arena.get(id).location,
            "nesting depth limit exceeded",
        ));
        return;
    }

    let node = script.arena.get(id);

    match node.kind {
        sieve_types::ast::NodeKind::Command => {
            if node.name == "require" {
                // Already handled by collect_requires; require itself is
                // always recognized regardless of extension activation.
            } else if !CORE_COMMANDS.contains(&node.name.as_str()) {
                match extension_for_command(&node.name) {
                    Some(ext) if active.contains(&ext) => {}
                    Some(_) => errors.push(Diagnostic::error(
                        script.name.clone(),
                        node.location,
                        format!("command {:?} requires an extension not required by this script", node.name),
                    )),
                    None => errors.push(Diagnostic::error(
                        script.name.clone(),
                        node.location,
                        format!("unknown command {:?}", node.name),
                    )),
                }
            }
        }
        sieve_types::ast::NodeKind::Test => {
            if !CORE_TESTS.contains(&node.name.as_str()) {
                match extension_for_test(&node.name) {
                    Some(ext) if active.contains(&ext) => {}
                    Some(_) => errors.push(Diagnostic::error(
                        script.name.clone(),
                        node.location,
                        format!("test {:?} requires an extension not required by this script", node.name),
                    )),
                    None => errors.push(Diagnostic::error(
                        script.name.clone(),
                        node.location,
                        format!("unknown test {:?}", node.name),
                    )),
                }
            }
            if matches!(node.name.as_str(), "header" | "address" | "envelope" | "body" | "string") {
                check_match_operand_tags(script, node, active, errors);
            }
        }
    }

    for arg in &node.positional {
        match arg {
            Argument::Test(t) => check_node(script, *t, active, errors, depth_budget, depth + 1),
            Argument::TestList(list) => {
                for t in list {
                    check_node(script, *t, active, errors, depth_budget, depth + 1);
                }
            }
            _ => {}
        }
    }

    if let Some(block) = &node.block {
        for child in block {
            check_node(script, *child, active, errors, depth_budget, depth + 1);
        }
    }
}

/// `:count`/`:value` (RFC 5231) and `:regex` (draft-ietf-sieve-regex) need
/// their own `require`, separate from whichever extension the enclosing
/// test itself belongs to.
fn check_match_operand_tags(
    script: &Script,
    node: &sieve_types::ast::Node,
    active: &BTreeSet<Extension>,
    errors: &mut ErrorHandler,
) {
    if (node.tag("count").is_some() || node.tag("value").is_some()) && !active.contains(&Extension::Relational) {
        errors.push(Diagnostic::error(
            script.name.clone(),
            node.location,
            "\":count\"/\":value\" require \"relational\" to be required by this script",
        ));
    }
    if node.tag("regex").is_some() && !active.contains(&Extension::Regex) {
        errors.push(Diagnostic::error(
            script.name.clone(),
            node.location,
            "\":regex\" requires \"regex\" to be required by this script",
        ));
    }
    if (node.tag("user").is_some() || node.tag("detail").is_some()) && !active.contains(&Extension::Subaddress) {
        errors.push(Diagnostic::error(
            script.name.clone(),
            node.location,
            "\":user\"/\":detail\" require \"subaddress\" to be required by this script",
        ));
    }
}

/// Splits a literal string on `${name}`/`${N}` references. Only
/// called when the `variables` extension is active; otherwise `${...}` is
/// left as ordinary text.
pub fn split_variable_refs(s: &str) -> Vec<StringPart> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = s[i + 2..].find('}') {
                let name = &s[i + 2..i + 2 + end];
                if is_valid_ref_name(name) {
                    if !literal.is_empty() {
                        parts.push(StringPart::Literal(std::mem::take(&mut literal)));
                    }
                    if let Ok(n) = name.parse::<usize>() {
                        parts.push(StringPart::MatchRef(n));
                    } else {
                        parts.push(StringPart::VarRef(name.to_string()));
                    }
                    i += 2 + end + 1;
                    continue;
                }
            }
        }
        let ch_len = s[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        literal.push_str(&s[i..i + ch_len]);
        i += ch_len;
    }
    if !literal.is_empty() || parts.is_empty() {
        parts.push(StringPart::Literal(literal));
    }
    parts
}

fn is_valid_ref_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == ':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_types::ScriptLocation;

    #[test]
    fn unknown_command_is_an_error() {
        let mut script = Script::new("t", ScriptLocation::Personal, "frobnicate;");
        crate::parser::parse(&mut script).unwrap();
        let registry = Registry::new(crate::registry::Capabilities::none());
        let limits = Limits::default();
        let mut errors = ErrorHandler::new(limits.max_compile_errors);
        let result = validate(&mut script, &registry, &limits, &mut errors);
        assert!(result.is_none());
        assert_eq!(errors.error_count(), 1);
    }

    #[test]
    fn fileinto_requires_extension_to_be_required() {
        let mut script = Script::new("t", ScriptLocation::Personal, r#"fileinto "INBOX";"#);
        crate::parser::parse(&mut script).unwrap();
        let mut caps = crate::registry::Capabilities::none();
        caps.enable(Extension::Fileinto);
        let registry = Registry::new(caps);
        let limits = Limits::default();
        let mut errors = ErrorHandler::new(limits.max_compile_errors);
        assert!(validate(&mut script, &registry, &limits, &mut errors).is_none());

        let mut script = Script::new(
            "t",
            ScriptLocation::Personal,
            r#"require "fileinto"; fileinto "INBOX";"#,
        );
        crate::parser::parse(&mut script).unwrap();
        let mut errors = ErrorHandler::new(limits.max_compile_errors);
        assert!(validate(&mut script, &registry, &limits, &mut errors).is_some());
    }

    #[test]
    fn count_tag_requires_relational_extension() {
        let mut script = Script::new(
            "t",
            ScriptLocation::Personal,
            r#"if header :count "ge" ["x-spam-score"] ["2"] { discard; }"#,
        );
        crate::parser::parse(&mut script).unwrap();
        let registry = Registry::new(crate::registry::Capabilities::none());
        let limits = Limits::default();
        let mut errors = ErrorHandler::new(limits.max_compile_errors);
        assert!(validate(&mut script, &registry, &limits, &mut errors).is_none());
        assert_eq!(errors.error_count(), 1);
    }

    #[test]
    fn splits_variable_and_match_references() {
        assert_eq!(
            split_variable_refs("hello ${name}, match ${1}"),
            vec![
                StringPart::Literal("hello ".to_string()),
                StringPart::VarRef("name".to_string()),
                StringPart::Literal(", match ".to_string()),
                StringPart::MatchRef(1),
            ]
        );
    }

    #[test]
    fn leaves_malformed_reference_as_literal_text() {
        assert_eq!(
            split_variable_refs("cost: ${"),
            vec![StringPart::Literal("cost: ${".to_string())]
        );
    }
}
