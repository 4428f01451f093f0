//! Syntax tree of a rule program.

/// A parsed program: a package header, helper/match functions and rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub package: String,
    pub functions: Vec<Function>,
    pub rules: Vec<Rule>,
}

/// `func name(params) { expr }`
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
    pub line: usize,
}

/// `rule name { stmt* }`
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `some idx0, idx1`: declares free index variables.
    Some(Vec<String>),
    /// `val := input.path[idx]`, or `val ?= ...` to bind `null` when the
    /// path does not resolve.
    Lookup {
        var: String,
        path: Vec<PathStep>,
        optional: bool,
    },
    /// A boolean expression that must hold.
    Check(Expr),
    /// `emit "label" := val`
    Emit { label: String, var: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    Field(String),
    Index(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Bool(bool),
    Null,
    Var(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Call { name: String, args: Vec<Expr> },
}
