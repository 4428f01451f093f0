//! Tokenizer for the rule language.

use crate::error::{EngineError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Bang,
    Assign,
    OptAssign,
    EqEq,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "identifier `{}`", s),
            Token::Str(s) => write!(f, "string {:?}", s),
            Token::LBrace => write!(f, "`{{`"),
            Token::RBrace => write!(f, "`}}`"),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::LBracket => write!(f, "`[`"),
            Token::RBracket => write!(f, "`]`"),
            Token::Comma => write!(f, "`,`"),
            Token::Dot => write!(f, "`.`"),
            Token::Bang => write!(f, "`!`"),
            Token::Assign => write!(f, "`:=`"),
            Token::OptAssign => write!(f, "`?=`"),
            Token::EqEq => write!(f, "`==`"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Spanned {
    pub token: Token,
    pub line: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1;

    while let Some(ch) = chars.peek().copied() {
        if ch == '\n' {
            line += 1;
            chars.next();
            continue;
        }
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '#' {
            while let Some(c) = chars.peek().copied() {
                if c == '\n' {
                    break;
                }
                chars.next();
            }
            continue;
        }

        if ch == '"' {
            chars.next();
            // Keep escapes verbatim and let serde_json decode them, so the lexer
            // accepts exactly what the renderer's JSON quoting produces.
            let mut raw = String::from('"');
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => {
                        raw.push(c);
                        match chars.next() {
                            Some(escaped) => raw.push(escaped),
                            None => break,
                        }
                    }
                    '\n' => break,
                    _ => raw.push(c),
                }
            }
            if !closed {
                return Err(EngineError::UnterminatedString { line });
            }
            raw.push('"');
            let value: String =
                serde_json::from_str(&raw).map_err(|e| EngineError::InvalidString {
                    line,
                    message: e.to_string(),
                })?;
            tokens.push(Spanned {
                token: Token::Str(value),
                line,
            });
            continue;
        }

        if is_ident_start(ch) {
            let mut value = String::new();
            while let Some(c) = chars.peek().copied() {
                if is_ident_char(c) {
                    value.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Spanned {
                token: Token::Ident(value),
                line,
            });
            continue;
        }

        chars.next();
        let token = match ch {
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            '.' => Token::Dot,
            '!' => Token::Bang,
            ':' if chars.peek() == Some(&'=') => {
                chars.next();
                Token::Assign
            }
            '?' if chars.peek() == Some(&'=') => {
                chars.next();
                Token::OptAssign
            }
            '=' if chars.peek() == Some(&'=') => {
                chars.next();
                Token::EqEq
            }
            other => return Err(EngineError::UnexpectedChar { line, ch: other }),
        };
        tokens.push(Spanned { token, line });
    }

    Ok(tokens)
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_symbols_and_idents() {
        assert_eq!(
            kinds("val0 := input.a[idx0]"),
            vec![
                Token::Ident("val0".into()),
                Token::Assign,
                Token::Ident("input".into()),
                Token::Dot,
                Token::Ident("a".into()),
                Token::LBracket,
                Token::Ident("idx0".into()),
                Token::RBracket,
            ]
        );
        assert_eq!(kinds("!a == b"), vec![
            Token::Bang,
            Token::Ident("a".into()),
            Token::EqEq,
            Token::Ident("b".into()),
        ]);
        assert_eq!(kinds("s ?= input"), vec![
            Token::Ident("s".into()),
            Token::OptAssign,
            Token::Ident("input".into()),
        ]);
    }

    #[test]
    fn test_string_escapes_are_json() {
        assert_eq!(kinds(r#""a\tb\"c\\""#), vec![Token::Str("a\tb\"c\\".into())]);
        assert_eq!(kinds(r#""é""#), vec![Token::Str("é".into())]);
    }

    #[test]
    fn test_comments_and_lines() {
        let tokens = tokenize("# header\nfoo # trailing\n\nbar").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].line, 4);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            tokenize("\"open"),
            Err(EngineError::UnterminatedString { line: 1 })
        ));
        assert!(matches!(
            tokenize("a\n= b"),
            Err(EngineError::UnexpectedChar { line: 2, ch: '=' })
        ));
        assert!(matches!(
            tokenize("a ? b"),
            Err(EngineError::UnexpectedChar { line: 1, ch: '?' })
        ));
        assert!(matches!(
            tokenize(r#""\q""#),
            Err(EngineError::InvalidString { .. })
        ));
    }
}
