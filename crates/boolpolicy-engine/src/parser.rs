//! Recursive-descent parser for the rule language.
//!
//! ```text
//! program := "package" name ("." name)* (func | rule)*
//! func    := "func" name "(" [name ("," name)*] ")" "{" expr "}"
//! rule    := "rule" name "{" stmt* "}"
//! stmt    := "some" name ("," name)*
//!          | name (":=" | "?=") "input" ("." name | "[" (string | name) "]")*
//!          | "emit" string ":=" name
//!          | expr
//! expr    := unary ["==" unary]
//! unary   := "!" unary | primary
//! primary := string | "true" | "false" | "null" | "[" [expr ("," expr)*] "]"
//!          | "(" expr ")" | name "(" [expr ("," expr)*] ")" | name
//! ```

use crate::ast::{Expr, Function, PathStep, Program, Rule, Stmt};
use crate::error::{EngineError, Result};
use crate::lexer::{tokenize, Spanned, Token};

/// Reserved words; they cannot name functions, rules, variables or path fields.
pub const KEYWORDS: &[&str] = &[
    "package", "func", "rule", "some", "emit", "input", "true", "false", "null",
];

/// Whether `name` can be written as a bare identifier in program text.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    starts_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !KEYWORDS.contains(&name)
}

/// Parse program text into a [`Program`].
pub fn parse(input: &str) -> Result<Program> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_program(&mut self) -> Result<Program> {
        self.consume_keyword("package")?;
        let mut package = self.consume_name()?;
        while self.peek_is(&Token::Dot) {
            self.pos += 1;
            package.push('.');
            package.push_str(&self.consume_name()?);
        }

        let mut functions = Vec::new();
        let mut rules = Vec::new();
        while !self.eof() {
            if self.peek_is_keyword("func") {
                functions.push(self.parse_function()?);
            } else if self.peek_is_keyword("rule") {
                rules.push(self.parse_rule()?);
            } else {
                return Err(self.unexpected("`func` or `rule`"));
            }
        }

        Ok(Program {
            package,
            functions,
            rules,
        })
    }

    fn parse_function(&mut self) -> Result<Function> {
        let line = self.line();
        self.consume_keyword("func")?;
        let name = self.consume_name()?;
        self.consume(Token::LParen)?;
        let mut params = Vec::new();
        if !self.peek_is(&Token::RParen) {
            loop {
                params.push(self.consume_name()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.consume(Token::RParen)?;
        self.consume(Token::LBrace)?;
        let body = self.parse_expr()?;
        self.consume(Token::RBrace)?;
        Ok(Function {
            name,
            params,
            body,
            line,
        })
    }

    fn parse_rule(&mut self) -> Result<Rule> {
        let line = self.line();
        self.consume_keyword("rule")?;
        let name = self.consume_name()?;
        self.consume(Token::LBrace)?;
        let mut body = Vec::new();
        while !self.eat(&Token::RBrace) {
            if self.eof() {
                return Err(EngineError::UnexpectedEof("`}`".into()));
            }
            body.push(self.parse_stmt()?);
        }
        Ok(Rule { name, body, line })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        if self.peek_is_keyword("some") {
            self.pos += 1;
            let mut vars = vec![self.consume_name()?];
            while self.eat(&Token::Comma) {
                vars.push(self.consume_name()?);
            }
            return Ok(Stmt::Some(vars));
        }

        if self.peek_is_keyword("emit") {
            self.pos += 1;
            let label = match self.next() {
                Some(Spanned {
                    token: Token::Str(s),
                    ..
                }) => s,
                Some(other) => return Err(unexpected_at(&other, "label string")),
                None => return Err(EngineError::UnexpectedEof("label string".into())),
            };
            self.consume(Token::Assign)?;
            let var = self.consume_name()?;
            return Ok(Stmt::Emit { label, var });
        }

        let assign = self.peek_at(1);
        if matches!(self.peek(), Some(Token::Ident(_)))
            && matches!(assign, Some(Token::Assign | Token::OptAssign))
        {
            let optional = assign == Some(&Token::OptAssign);
            let var = self.consume_name()?;
            self.pos += 1;
            let path = self.parse_input_ref()?;
            return Ok(Stmt::Lookup {
                var,
                path,
                optional,
            });
        }

        Ok(Stmt::Check(self.parse_expr()?))
    }

    fn parse_input_ref(&mut self) -> Result<Vec<PathStep>> {
        self.consume_keyword("input")?;
        let mut path = Vec::new();
        loop {
            if self.eat(&Token::Dot) {
                path.push(PathStep::Field(self.consume_name()?));
            } else if self.eat(&Token::LBracket) {
                let step = match self.next() {
                    Some(Spanned {
                        token: Token::Str(s),
                        ..
                    }) => PathStep::Field(s),
                    Some(Spanned {
                        token: Token::Ident(s),
                        line,
                    }) => {
                        check_not_keyword(&s, line)?;
                        PathStep::Index(s)
                    }
                    Some(other) => return Err(unexpected_at(&other, "field string or index")),
                    None => return Err(EngineError::UnexpectedEof("`]`".into())),
                };
                self.consume(Token::RBracket)?;
                path.push(step);
            } else {
                break;
            }
        }
        Ok(path)
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let left = self.parse_unary()?;
        if self.eat(&Token::EqEq) {
            let right = self.parse_unary()?;
            return Ok(Expr::Eq(Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Not(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(spanned) = self.next() else {
            return Err(EngineError::UnexpectedEof("expression".into()));
        };
        match spanned.token {
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::LBracket => {
                let items = self.parse_args(Token::RBracket)?;
                Ok(Expr::List(items))
            }
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.consume(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(ref name) if name == "true" => Ok(Expr::Bool(true)),
            Token::Ident(ref name) if name == "false" => Ok(Expr::Bool(false)),
            Token::Ident(ref name) if name == "null" => Ok(Expr::Null),
            Token::Ident(name) => {
                check_not_keyword(&name, spanned.line)?;
                if self.eat(&Token::LParen) {
                    let args = self.parse_args(Token::RParen)?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Var(name))
                }
            }
            _ => Err(unexpected_at(&spanned, "expression")),
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_args(&mut self, close: Token) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_expr()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.consume(close)?;
        Ok(items)
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        match self.next() {
            Some(s) if s.token == expected => Ok(()),
            Some(s) => Err(unexpected_at(&s, &expected.to_string())),
            None => Err(EngineError::UnexpectedEof(expected.to_string())),
        }
    }

    fn consume_keyword(&mut self, keyword: &str) -> Result<()> {
        match self.next() {
            Some(Spanned {
                token: Token::Ident(ref s),
                ..
            }) if s == keyword => Ok(()),
            Some(s) => Err(unexpected_at(&s, &format!("`{}`", keyword))),
            None => Err(EngineError::UnexpectedEof(format!("`{}`", keyword))),
        }
    }

    fn consume_name(&mut self) -> Result<String> {
        match self.next() {
            Some(Spanned {
                token: Token::Ident(s),
                line,
            }) => {
                check_not_keyword(&s, line)?;
                Ok(s)
            }
            Some(s) => Err(unexpected_at(&s, "identifier")),
            None => Err(EngineError::UnexpectedEof("identifier".into())),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek_is(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn peek_is(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn peek_is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s == keyword)
    }

    fn next(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn line(&self) -> usize {
        self.tokens.get(self.pos).map_or(0, |s| s.line)
    }

    fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn unexpected(&self, expected: &str) -> EngineError {
        match self.tokens.get(self.pos) {
            Some(s) => unexpected_at(s, expected),
            None => EngineError::UnexpectedEof(expected.to_string()),
        }
    }
}

fn unexpected_at(spanned: &Spanned, expected: &str) -> EngineError {
    EngineError::UnexpectedToken {
        line: spanned.line,
        expected: expected.to_string(),
        found: spanned.token.to_string(),
    }
}

fn check_not_keyword(name: &str, line: usize) -> Result<()> {
    if KEYWORDS.contains(&name) {
        return Err(EngineError::UnexpectedToken {
            line,
            expected: "identifier".into(),
            found: format!("keyword `{}`", name),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: &str = r#"
package policy.main

func not_(value) {
	!value
}

func tag_0_0(val) {
	startswith(val, "lat")
}

rule violation_0 {
	some idx0
	val0 := input.containers[idx0]["image"].tag
	tag_0_0(val0)
	emit "Image Tag" := val0
}
"#;

    #[test]
    fn test_parse_program() {
        let program = parse(PROGRAM).unwrap();
        assert_eq!(program.package, "policy.main");
        assert_eq!(program.functions.len(), 2);
        assert_eq!(program.functions[0].params, vec!["value".to_string()]);
        assert_eq!(
            program.functions[0].body,
            Expr::Not(Box::new(Expr::Var("value".into())))
        );

        let rule = &program.rules[0];
        assert_eq!(rule.name, "violation_0");
        assert_eq!(rule.body.len(), 4);
        assert_eq!(rule.body[0], Stmt::Some(vec!["idx0".into()]));
        assert_eq!(
            rule.body[1],
            Stmt::Lookup {
                var: "val0".into(),
                path: vec![
                    PathStep::Field("containers".into()),
                    PathStep::Index("idx0".into()),
                    PathStep::Field("image".into()),
                    PathStep::Field("tag".into()),
                ],
                optional: false,
            }
        );
        assert!(matches!(&rule.body[2], Stmt::Check(Expr::Call { name, .. }) if name == "tag_0_0"));
        assert_eq!(
            rule.body[3],
            Stmt::Emit {
                label: "Image Tag".into(),
                var: "val0".into()
            }
        );
    }

    #[test]
    fn test_parse_expressions() {
        let program = parse(
            r#"package p
func f(a, b) { any([a == true, !(b), g(a, "x")]) }"#,
        )
        .unwrap();
        let Expr::Call { name, args } = &program.functions[0].body else {
            panic!("expected call");
        };
        assert_eq!(name, "any");
        let Expr::List(items) = &args[0] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(items[0], Expr::Eq(_, _)));
        assert!(matches!(items[1], Expr::Not(_)));
    }

    #[test]
    fn test_parse_optional_lookup() {
        let program =
            parse("package p\nfunc f(v) { v == null }\nrule r { some i\n  v ?= input.a[i].b\n  f(v) }")
                .unwrap();
        assert_eq!(
            program.functions[0].body,
            Expr::Eq(Box::new(Expr::Var("v".into())), Box::new(Expr::Null))
        );
        assert!(matches!(
            &program.rules[0].body[1],
            Stmt::Lookup { var, optional: true, .. } if var == "v"
        ));
        assert!(!is_plain_identifier("null"));
    }

    #[test]
    fn test_empty_rule_and_empty_list() {
        let program = parse("package p\nfunc f() { any([]) }\nrule r {}").unwrap();
        assert!(program.rules[0].body.is_empty());
        assert!(program.functions[0].params.is_empty());
    }

    #[test]
    fn test_plain_identifiers() {
        assert!(is_plain_identifier("image"));
        assert!(is_plain_identifier("_x1"));
        assert!(!is_plain_identifier("1x"));
        assert!(!is_plain_identifier("read-only"));
        assert!(!is_plain_identifier(""));
        assert!(!is_plain_identifier("input"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("rule r {}"),
            Err(EngineError::UnexpectedToken { line: 1, .. })
        ));
        assert!(matches!(
            parse("package p\nrule r {\n"),
            Err(EngineError::UnexpectedEof(_))
        ));
        assert!(matches!(
            parse("package p\nfunc input(x) { x }"),
            Err(EngineError::UnexpectedToken { line: 2, .. })
        ));
        assert!(matches!(
            parse("package p\nwhat"),
            Err(EngineError::UnexpectedToken { line: 2, .. })
        ));
    }
}
