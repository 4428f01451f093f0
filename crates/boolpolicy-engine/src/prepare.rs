//! Static checking and lowering of a parsed program.
//!
//! Preparation resolves every name to a slot or function index, rejects
//! duplicate function/rule names, and compiles regex and map-query literals
//! once so execution never touches the pattern text again. Functions may only
//! call builtins or functions declared above them, which keeps the call graph
//! acyclic.

use crate::ast::{Expr, PathStep, Program, Stmt};
use crate::error::{EngineError, Result};
use boolpolicy_mapeval::MapMatcher;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const BUILTINS: &[&str] = &["startswith", "regex_match", "map_match", "any"];

/// A program ready for execution. Immutable and shareable across threads.
#[derive(Debug, Clone)]
pub struct PreparedProgram {
    pub(crate) package: String,
    pub(crate) functions: Vec<PreparedFunction>,
    pub(crate) rules: Vec<PreparedRule>,
}

impl PreparedProgram {
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PreparedFunction {
    pub name: String,
    pub body: Op,
}

#[derive(Debug, Clone)]
pub(crate) struct PreparedRule {
    pub name: String,
    pub index_count: usize,
    pub slot_count: usize,
    pub steps: Vec<Step>,
    pub emits: Vec<(String, usize)>,
}

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Lookup {
        slot: usize,
        path: Vec<Segment>,
        optional: bool,
    },
    Check(Op),
}

#[derive(Debug, Clone)]
pub(crate) enum Segment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone)]
pub(crate) enum Op {
    Const(Value),
    Slot(usize),
    List(Vec<Op>),
    Not(Box<Op>),
    Eq(Box<Op>, Box<Op>),
    Call(usize, Vec<Op>),
    StartsWith(Box<Op>, Box<Op>),
    RegexMatch(Regex, Box<Op>),
    MapMatch(Box<Op>, MapMatcher),
    Any(Box<Op>),
}

/// Lower a parsed program.
pub fn prepare(program: &Program) -> Result<PreparedProgram> {
    let mut function_index: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut functions = Vec::with_capacity(program.functions.len());

    for func in &program.functions {
        let scope = format!("func {}", func.name);
        if BUILTINS.contains(&func.name.as_str()) {
            return Err(EngineError::prepare(scope, "shadows a builtin"));
        }
        if function_index.contains_key(func.name.as_str()) {
            return Err(EngineError::prepare(scope, "duplicate function name"));
        }
        let mut params: HashMap<&str, usize> = HashMap::new();
        for (i, p) in func.params.iter().enumerate() {
            if params.insert(p.as_str(), i).is_some() {
                return Err(EngineError::prepare(&scope, format!("duplicate parameter {}", p)));
            }
        }
        let lowerer = Lowerer {
            scope: &scope,
            functions: &function_index,
            vars: &params,
        };
        let body = lowerer.lower(&func.body)?;
        function_index.insert(func.name.as_str(), (functions.len(), func.params.len()));
        functions.push(PreparedFunction {
            name: func.name.clone(),
            body,
        });
    }

    let mut rule_names = HashSet::new();
    let mut rules = Vec::with_capacity(program.rules.len());
    for rule in &program.rules {
        let scope = format!("rule {}", rule.name);
        if !rule_names.insert(rule.name.as_str()) {
            return Err(EngineError::prepare(scope, "duplicate rule name"));
        }

        let mut indices: HashMap<&str, usize> = HashMap::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut steps = Vec::new();
        let mut emits = Vec::new();

        for stmt in &rule.body {
            match stmt {
                Stmt::Some(vars) => {
                    for v in vars {
                        let next = indices.len();
                        if indices.insert(v.as_str(), next).is_some() {
                            return Err(EngineError::prepare(
                                &scope,
                                format!("index variable {} declared twice", v),
                            ));
                        }
                    }
                }
                Stmt::Lookup {
                    var,
                    path,
                    optional,
                } => {
                    let mut segments = Vec::with_capacity(path.len());
                    for step in path {
                        segments.push(match step {
                            PathStep::Field(name) => Segment::Field(name.clone()),
                            PathStep::Index(idx) => {
                                let i = indices.get(idx.as_str()).ok_or_else(|| {
                                    EngineError::prepare(
                                        &scope,
                                        format!("index variable {} not declared with `some`", idx),
                                    )
                                })?;
                                Segment::Index(*i)
                            }
                        });
                    }
                    if indices.contains_key(var.as_str()) {
                        return Err(EngineError::prepare(
                            &scope,
                            format!("{} is already an index variable", var),
                        ));
                    }
                    let slot = slots.len();
                    if slots.insert(var.as_str(), slot).is_some() {
                        return Err(EngineError::prepare(
                            &scope,
                            format!("variable {} assigned twice", var),
                        ));
                    }
                    steps.push(Step::Lookup {
                        slot,
                        path: segments,
                        optional: *optional,
                    });
                }
                Stmt::Check(expr) => {
                    let lowerer = Lowerer {
                        scope: &scope,
                        functions: &function_index,
                        vars: &slots,
                    };
                    steps.push(Step::Check(lowerer.lower(expr)?));
                }
                Stmt::Emit { label, var } => {
                    let slot = slots.get(var.as_str()).ok_or_else(|| {
                        EngineError::prepare(&scope, format!("emit of undefined variable {}", var))
                    })?;
                    emits.push((label.clone(), *slot));
                }
            }
        }

        rules.push(PreparedRule {
            name: rule.name.clone(),
            index_count: indices.len(),
            slot_count: slots.len(),
            steps,
            emits,
        });
    }

    Ok(PreparedProgram {
        package: program.package.clone(),
        functions,
        rules,
    })
}

struct Lowerer<'a> {
    scope: &'a str,
    functions: &'a HashMap<&'a str, (usize, usize)>,
    vars: &'a HashMap<&'a str, usize>,
}

impl Lowerer<'_> {
    fn lower(&self, expr: &Expr) -> Result<Op> {
        Ok(match expr {
            Expr::Str(s) => Op::Const(Value::String(s.clone())),
            Expr::Bool(b) => Op::Const(Value::Bool(*b)),
            Expr::Null => Op::Const(Value::Null),
            Expr::Var(name) => Op::Slot(*self.vars.get(name.as_str()).ok_or_else(|| {
                EngineError::prepare(self.scope, format!("undefined variable {}", name))
            })?),
            Expr::List(items) => Op::List(self.lower_all(items)?),
            Expr::Not(inner) => Op::Not(Box::new(self.lower(inner)?)),
            Expr::Eq(a, b) => Op::Eq(Box::new(self.lower(a)?), Box::new(self.lower(b)?)),
            Expr::Call { name, args } => self.lower_call(name, args)?,
        })
    }

    fn lower_all(&self, exprs: &[Expr]) -> Result<Vec<Op>> {
        exprs.iter().map(|e| self.lower(e)).collect()
    }

    fn lower_call(&self, name: &str, args: &[Expr]) -> Result<Op> {
        let arity = |n: usize| -> Result<()> {
            if args.len() != n {
                return Err(EngineError::prepare(
                    self.scope,
                    format!("{} takes {} argument(s), got {}", name, n, args.len()),
                ));
            }
            Ok(())
        };

        match name {
            "startswith" => {
                arity(2)?;
                Ok(Op::StartsWith(
                    Box::new(self.lower(&args[0])?),
                    Box::new(self.lower(&args[1])?),
                ))
            }
            "regex_match" => {
                arity(2)?;
                let Expr::Str(pattern) = &args[0] else {
                    return Err(EngineError::prepare(
                        self.scope,
                        "regex_match pattern must be a string literal",
                    ));
                };
                let re = Regex::new(pattern).map_err(|e| {
                    EngineError::prepare(self.scope, format!("invalid regex {:?}: {}", pattern, e))
                })?;
                Ok(Op::RegexMatch(re, Box::new(self.lower(&args[1])?)))
            }
            "map_match" => {
                arity(2)?;
                let Expr::Str(query) = &args[1] else {
                    return Err(EngineError::prepare(
                        self.scope,
                        "map_match query must be a string literal",
                    ));
                };
                let matcher = MapMatcher::compile(query)
                    .map_err(|e| EngineError::prepare(self.scope, e.to_string()))?;
                Ok(Op::MapMatch(Box::new(self.lower(&args[0])?), matcher))
            }
            "any" => {
                arity(1)?;
                Ok(Op::Any(Box::new(self.lower(&args[0])?)))
            }
            _ => {
                let (index, expected) = self.functions.get(name).copied().ok_or_else(|| {
                    EngineError::prepare(self.scope, format!("call to undefined function {}", name))
                })?;
                arity(expected)?;
                Ok(Op::Call(index, self.lower_all(args)?))
            }
        }
    }
}
