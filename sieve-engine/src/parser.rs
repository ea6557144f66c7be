//! The parser half of the token/AST layer.
//!
//! Builds the untyped [`sieve_types::ast`] shape by recursive descent over
//! the [`crate::lexer::Lexer`]'s token stream. RFC 5228's grammar nests
//! blocks inside commands inside blocks; `nom`'s combinators shine one layer
//! down (see `managesieve::url` and `managesieve::quote` for where this
//! crate does reach for them) but buy little here over a direct recursive
//! descent, so this module mixes both styles depending on the shape of the
//! grammar at hand.

use sieve_types::ast::{Argument, Node, NodeKind, StringLit, TagArg};
use sieve_types::{NodeId, Script, SourceLocation};

use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenKind};

pub fn parse(script: &mut Script) -> Result<(), ParseError> {
    let mut parser = Parser::new(&script.source);
    let roots = parser.parse_commands(true)?;
    script.arena = parser.arena;
    script.roots = roots;
    Ok(())
}

/// Commands that take a nested block of commands rather than a terminating
/// `;` (RFC 5228: `if`/`elsif`/`else`; extensions may add more, but the core
/// grammar only defines these three).
fn takes_block(name: &str) -> bool {
    matches!(name, "if" | "elsif" | "else")
}

/// Tests that take a test-list rather than a single test (`anyof`/`allof`).
fn takes_test_list(name: &str) -> bool {
    matches!(name, "anyof" | "allof")
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Token,
    arena: sieve_types::ast::Arena,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let lookahead = lexer.next_token().unwrap_or(Token {
            kind: TokenKind::Eof,
            location: SourceLocation::START,
        });
        Self {
            lexer,
            lookahead,
            arena: sieve_types::ast::Arena::new(),
        }
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.lookahead, next))
    }

    fn expect_ident(&mut self) -> Result<(String, SourceLocation), ParseError> {
        match self.bump()? {
            Token {
                kind: TokenKind::Identifier(name),
                location,
            } => Ok((name, location)),
            tok => Err(ParseError::Expected(tok.location, "identifier", describe(&tok.kind))),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool, ParseError> {
        if std::mem::discriminant(&self.lookahead.kind) == std::mem::discriminant(kind) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &'static str) -> Result<SourceLocation, ParseError> {
        if std::mem::discriminant(&self.lookahead.kind) == std::mem::discriminant(&kind) {
            Ok(self.bump()?.location)
        } else {
            Err(ParseError::Expected(
                self.lookahead.location,
                what,
                describe(&self.lookahead.kind),
            ))
        }
    }

    /// Parses a sequence of commands, stopping at `}` or EOF.
    fn parse_commands(&mut self, top_level: bool) -> Result<Vec<NodeId>, ParseError> {
        let mut out = Vec::new();
        loop {
            match &self.lookahead.kind {
                TokenKind::Eof => {
                    if !top_level {
                        return Err(ParseError::Expected(
                            self.lookahead.location,
                            "'}'",
                            "end of script".to_string(),
                        ));
                    }
                    break;
                }
                TokenKind::RBrace => {
                    if top_level {
                        return Err(ParseError::UnexpectedChar(self.lookahead.location, '}'));
                    }
                    break;
                }
                _ => out.push(self.parse_command()?),
            }
        }
        Ok(out)
    }

    fn parse_command(&mut self) -> Result<NodeId, ParseError> {
        let (name, location) = self.expect_ident()?;
        let mut positional = Vec::new();
        let mut tags = Vec::new();

        loop {
            match &self.lookahead.kind {
                TokenKind::Tag(_) => {
                    let TokenKind::Tag(tag_name) = self.bump()?.kind else { unreachable!() };
                    let tag_location = self.lookahead.location;
                    // A tag may itself carry one parameter argument (e.g.
                    // `:comparator "i;octet"`); only string/number args do.
                    let param = match &self.lookahead.kind {
                        TokenKind::QuotedString(_) | TokenKind::MultiLine(_) | TokenKind::Number(_) => {
                            Some(self.parse_scalar_argument()?)
                        }
                        _ => None,
                    };
                    tags.push(TagArg {
                        name: tag_name,
                        location: tag_location,
                        param,
                    });
                }
                TokenKind::Identifier(test_name) if takes_test_list(test_name) => {
                    break;
                }
                TokenKind::Number(_) | TokenKind::QuotedString(_) | TokenKind::MultiLine(_) => {
                    positional.push(self.parse_scalar_argument()?);
                }
                TokenKind::LBrace if self.is_string_list_start() => {
                    positional.push(self.parse_string_list()?);
                }
                TokenKind::Identifier(inner) if takes_test_list(inner) => break,
                TokenKind::Identifier(_) if self.looks_like_nested_test() => {
                    positional.push(self.parse_test_argument()?);
                }
                _ => break,
            }
        }

        // `anyof`/`allof` appearing as the sole test body of an `if` is
        // handled in parse_test; top-level bare test-list commands don't
        // exist in the core grammar, so nothing else to do here.

        let block = if takes_block(&name) {
            self.expect(TokenKind::LBrace, "'{'")?;
            let body = self.parse_commands(false)?;
            self.expect(TokenKind::RBrace, "'}'")?;
            Some(body)
        } else if self.eat(&TokenKind::LBrace)? {
            let body = self.parse_commands(false)?;
            self.expect(TokenKind::RBrace, "'}'")?;
            Some(body)
        } else {
            self.expect(TokenKind::Semicolon, "';'")?;
            None
        };

        // `if`/`elsif` take a leading test argument before their block.
        let mut node = Node {
            id: 0,
            kind: NodeKind::Command,
            name,
            location,
            positional,
            tags,
            block,
        };

        if takes_block(&node.name) && node.name != "else" {
            // Re-parse: the test was actually consumed as part of the
            // positional scan above only if it looked like a nested test;
            // ensure at least one was captured.
            if !matches!(node.positional.first(), Some(Argument::Test(_))) {
                return Err(ParseError::Expected(node.location, "test", "command".to_string()));
            }
        }

        Ok(self.arena.alloc(std::mem::replace(
            &mut node,
            Node {
                id: 0,
                kind: NodeKind::Command,
                name: String::new(),
                location,
                positional: Vec::new(),
                tags: Vec::new(),
                block: None,
            },
        )))
    }

    fn looks_like_nested_test(&self) -> bool {
        matches!(self.lookahead.kind, TokenKind::Identifier(_))
    }

    fn is_string_list_start(&self) -> bool {
        matches!(self.lookahead.kind, TokenKind::LBrace)
    }

    fn parse_scalar_argument(&mut self) -> Result<Argument, ParseError> {
        match self.bump()? {
            Token {
                kind: TokenKind::Number(n),
                ..
            } => Ok(Argument::Number(n)),
            Token {
                kind: TokenKind::QuotedString(s),
                ..
            } => Ok(Argument::String(StringLit::literal(s))),
            Token {
                kind: TokenKind::MultiLine(s),
                ..
            } => Ok(Argument::String(StringLit::literal(s))),
            tok => Err(ParseError::Expected(tok.location, "argument", describe(&tok.kind))),
        }
    }

    /// `["a", "b", "c"]`
    fn parse_string_list(&mut self) -> Result<Argument, ParseError> {
        self.expect(TokenKind::LBrace, "'['")?;
        let mut items = Vec::new();
        loop {
            match self.bump()? {
                Token {
                    kind: TokenKind::QuotedString(s),
                    ..
                }
                | Token {
                    kind: TokenKind::MultiLine(s),
                    ..
                } => items.push(StringLit::literal(s)),
                tok => return Err(ParseError::Expected(tok.location, "string", describe(&tok.kind))),
            }
            if self.eat(&TokenKind::Comma)? {
                continue;
            }
            break;
        }
        self.expect(TokenKind::RBrace, "']'")?;
        Ok(Argument::StringList(items))
    }

    /// A nested test invocation: `identifier tagged-and-positional-args`, or
    /// `anyof`/`allof` with a parenthesized test list.
    fn parse_test_argument(&mut self) -> Result<Argument, ParseError> {
        let id = self.parse_test_node()?;
        Ok(Argument::Test(id))
    }

    fn parse_test_node(&mut self) -> Result<NodeId, ParseError> {
        let (name, location) = self.expect_ident()?;
        let mut positional = Vec::new();
        let mut tags = Vec::new();

        if takes_test_list(&name) {
            self.expect(TokenKind::LParen, "'('")?;
            let mut tests = Vec::new();
            loop {
                tests.push(self.parse_test_node()?);
                if self.eat(&TokenKind::Comma)? {
                    continue;
                }
                break;
            }
            self.expect(TokenKind::RParen, "')'")?;
            positional.push(Argument::TestList(tests));
        } else {
            loop {
                match &self.lookahead.kind {
                    TokenKind::Tag(_) => {
                        let TokenKind::Tag(tag_name) = self.bump()?.kind else { unreachable!() };
                        let tag_location = self.lookahead.location;
                        let param = match &self.lookahead.kind {
                            TokenKind::QuotedString(_) | TokenKind::MultiLine(_) | TokenKind::Number(_) => {
                                Some(self.parse_scalar_argument()?)
                            }
                            _ => None,
                        };
                        tags.push(TagArg {
                            name: tag_name,
                            location: tag_location,
                            param,
                        });
                    }
                    TokenKind::Number(_) | TokenKind::QuotedString(_) | TokenKind::MultiLine(_) => {
                        positional.push(self.parse_scalar_argument()?);
                    }
                    TokenKind::LBrace => {
                        positional.push(self.parse_string_list()?);
                    }
                    _ => break,
                }
            }
        }

        Ok(self.arena.alloc(Node {
            id: 0,
            kind: NodeKind::Test,
            name,
            location,
            positional,
            tags,
            block: None,
        }))
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Identifier(s) => format!("identifier {s:?}"),
        TokenKind::Tag(s) => format!("tag :{s}"),
        TokenKind::Number(n) => format!("number {n}"),
        TokenKind::QuotedString(_) => "string".to_string(),
        TokenKind::MultiLine(_) => "multiline string".to_string(),
        TokenKind::LBrace => "'['".to_string(),
        TokenKind::RBrace => "']'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::Semicolon => "';'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Eof => "end of script".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_types::ScriptLocation;

    fn parse_ok(src: &str) -> Script {
        let mut script = Script::new("t", ScriptLocation::Personal, src);
        parse(&mut script).unwrap();
        script
    }

    #[test]
    fn parses_a_bare_command() {
        let script = parse_ok("keep;");
        assert_eq!(script.roots.len(), 1);
        assert_eq!(script.arena.get(script.roots[0]).name, "keep");
    }

    #[test]
    fn parses_if_with_header_test() {
        let script = parse_ok(
            r#"if header :contains "from" "boss" { fileinto "INBOX.boss"; }"#,
        );
        let if_node = script.arena.get(script.roots[0]);
        assert_eq!(if_node.name, "if");
        assert!(matches!(if_node.positional[0], Argument::Test(_)));
        let block = if_node.block.as_ref().unwrap();
        assert_eq!(script.arena.get(block[0]).name, "fileinto");
    }

    #[test]
    fn parses_anyof_test_list() {
        let script = parse_ok(
            r#"if anyof (true, false) { stop; }"#,
        );
        let if_node = script.arena.get(script.roots[0]);
        let Argument::Test(test_id) = if_node.positional[0] else {
            panic!("expected test")
        };
        let test = script.arena.get(test_id);
        assert_eq!(test.name, "anyof");
        assert!(matches!(test.positional[0], Argument::TestList(ref l) if l.len() == 2));
    }

    #[test]
    fn parses_tagged_arguments_and_string_lists() {
        let script = parse_ok(r#"redirect :copy "a@example.com";"#);
        let node = script.arena.get(script.roots[0]);
        assert_eq!(node.tags[0].name, "copy");

        let script = parse_ok(r#"fileinto ["a", "b"];"#);
        let node = script.arena.get(script.roots[0]);
        assert!(matches!(node.positional[0], Argument::StringList(ref l) if l.len() == 2));
    }

    #[test]
    fn rejects_unterminated_block() {
        let mut script = Script::new("t", ScriptLocation::Personal, "if true { stop;");
        assert!(parse(&mut script).is_err());
    }
}
