//! The untyped AST produced by the lexer/parser and the
//! per-script arena it lives in.
//!
//! Commands and tests share one node shape: both are "a name, positional
//! arguments, tag arguments, and maybe a block" (RFC 5228's grammar does not
//! distinguish them syntactically — the validator is what knows a `test`
//! name from a `command` name). Cyclic parent pointers are modeled
//! as arena indices rather than `Rc`/`RefCell`.

use crate::location::SourceLocation;

pub type NodeId = usize;

/// Whether a [`Node`] is a command (a statement, may own a block) or a test
/// (a boolean-valued expression inside `if`/`anyof`/`allof`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Command,
    Test,
}

/// One command or test invocation: `identifier arguments (block | ";")`.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub location: SourceLocation,
    pub positional: Vec<Argument>,
    pub tags: Vec<TagArg>,
    /// Present only for commands that accept a block (`if`, `require` never
    /// does, `fileinto` never does, but `if`/`elsif`/`else` and any
    /// extension-defined block command do).
    pub block: Option<Vec<NodeId>>,
}

impl Node {
    pub fn tag(&self, name: &str) -> Option<&TagArg> {
        self.tags.iter().find(|t| t.name == name)
    }
}

/// A `:name [param]` tagged argument.
#[derive(Debug, Clone)]
pub struct TagArg {
    pub name: String,
    pub location: SourceLocation,
    pub param: Option<Argument>,
}

/// One piece of a possibly-interpolated string: a literal run of bytes known
/// at compile time, a `${name}` variable reference, or a `${N}` match-value
/// reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringPart {
    Literal(String),
    VarRef(String),
    MatchRef(usize),
}

/// A Sieve string literal: either purely literal (a single `Literal` part)
/// or a variable-string composite the validator produced by splitting on
/// `${...}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringLit {
    pub parts: Vec<StringPart>,
}

impl StringLit {
    pub fn literal(s: impl Into<String>) -> Self {
        Self {
            parts: vec![StringPart::Literal(s.into())],
        }
    }

    /// `Some(text)` iff this string contains no `${...}` substitution and
    /// its value is therefore known at compile time.
    pub fn as_literal(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [StringPart::Literal(s)] => Some(s),
            [] => Some(""),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        self.as_literal().is_some()
    }
}

impl From<&str> for StringLit {
    fn from(s: &str) -> Self {
        Self::literal(s)
    }
}

/// One positional argument's parsed shape: `{atom, string-literal,
/// string-list, number, tag, block}`, plus test/test-list since `anyof`,
/// `allof` and a handful of extensions take a nested test or list of tests
/// in positional position.
#[derive(Debug, Clone)]
pub enum Argument {
    Number(u64),
    String(StringLit),
    StringList(Vec<StringLit>),
    Tag(String),
    Test(NodeId),
    TestList(Vec<NodeId>),
    Block(Vec<NodeId>),
}

impl Argument {
    pub fn type_name(&self) -> &'static str {
        match self {
            Argument::Number(_) => "number",
            Argument::String(_) => "string",
            Argument::StringList(_) => "string-list",
            Argument::Tag(_) => "tag",
            Argument::Test(_) => "test",
            Argument::TestList(_) => "test-list",
            Argument::Block(_) => "block",
        }
    }
}

/// A per-script arena of [`Node`]s, freed together with the script that owns
/// it.
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, mut node: Node) -> NodeId {
        let id = self.nodes.len();
        node.id = id;
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}

/// Where a [`Script`] is stored; a script's identity is the (location, name)
/// pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptLocation {
    Personal,
    Global,
}

/// An addressable source artifact. `Script` owns its arena; both
/// are dropped together when the last reference goes away (callers
/// typically hold it behind an `Rc`/`Arc` once it's refcounted and
/// immutable).
#[derive(Debug)]
pub struct Script {
    pub name: String,
    pub location: ScriptLocation,
    pub source: String,
    pub arena: Arena,
    /// Top-level commands, in source order.
    pub roots: Vec<NodeId>,
}

impl Script {
    pub fn new(name: impl Into<String>, location: ScriptLocation, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location,
            source: source.into(),
            arena: Arena::new(),
            roots: Vec::new(),
        }
    }
}

impl PartialEq for Script {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location && self.name == other.name
    }
}
impl Eq for Script {}
