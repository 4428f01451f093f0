//! Execution of prepared programs against a JSON input document.
//!
//! Each rule is run as a depth-first enumeration: a lookup with an unbound
//! index variable fans out over every child of the container at that point,
//! a check prunes the branch unless it evaluates to `true`, and every branch
//! that survives all statements emits one binding. Expressions that hit a type
//! mismatch or an undefined value evaluate to undefined, which fails the check.
//!
//! A plain lookup drops the branch when the path is missing or ends in `null`.
//! An optional lookup (`?=`) binds `null` instead, so a check can test for
//! absence with `v == null`.

use crate::error::{EngineError, Result};
use crate::prepare::{Op, PreparedFunction, PreparedProgram, PreparedRule, Segment, Step};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::HashSet;
use tracing::{debug, trace};

static NULL: Value = Value::Null;

/// Run every rule of `program` against `input` and collect the deduplicated
/// bindings in first-seen order. With `max_frames` set, the run fails once the
/// rules together have visited more path frames than that.
pub(crate) fn execute(
    program: &PreparedProgram,
    input: &Value,
    max_frames: Option<usize>,
) -> Result<Vec<Value>> {
    if !input.is_object() {
        return Err(EngineError::Execution(format!(
            "input must be an object, got {}",
            kind_of(input)
        )));
    }

    let mut sink = Sink::default();
    let mut frames = 0usize;

    for rule in &program.rules {
        let mut run = RuleRun {
            functions: &program.functions,
            rule,
            input,
            indices: vec![None; rule.index_count],
            slots: Vec::with_capacity(rule.slot_count),
            frames: &mut frames,
            max_frames,
            sink: &mut sink,
        };
        run.steps_from(0)?;
        trace!(rule = %rule.name, frames, "Rule evaluated");
    }

    debug!(
        package = %program.package,
        rules = program.rules.len(),
        bindings = sink.bindings.len(),
        frames,
        "Program executed"
    );
    Ok(sink.bindings)
}

#[derive(Default)]
struct Sink {
    seen: HashSet<String>,
    bindings: Vec<Value>,
}

impl Sink {
    fn push(&mut self, binding: Value) {
        if self.seen.insert(binding.to_string()) {
            self.bindings.push(binding);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum IndexKey<'a> {
    Pos(usize),
    Key(&'a str),
}

impl<'a> IndexKey<'a> {
    fn select(self, value: &'a Value) -> Option<&'a Value> {
        match self {
            IndexKey::Pos(n) => value.as_array()?.get(n),
            IndexKey::Key(k) => value.as_object()?.get(k),
        }
    }
}

fn children(value: &Value) -> Vec<(IndexKey<'_>, &Value)> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (IndexKey::Pos(i), v))
            .collect(),
        Value::Object(map) => {
            let mut entries: Vec<_> = map
                .iter()
                .map(|(k, v)| (IndexKey::Key(k.as_str()), v))
                .collect();
            entries.sort_by(|a, b| match (a.0, b.0) {
                (IndexKey::Key(x), IndexKey::Key(y)) => x.cmp(y),
                _ => std::cmp::Ordering::Equal,
            });
            entries
        }
        _ => Vec::new(),
    }
}

struct RuleRun<'p, 'a, 's> {
    functions: &'p [PreparedFunction],
    rule: &'p PreparedRule,
    input: &'a Value,
    indices: Vec<Option<IndexKey<'a>>>,
    slots: Vec<&'a Value>,
    frames: &'s mut usize,
    max_frames: Option<usize>,
    sink: &'s mut Sink,
}

impl<'p, 'a, 's> RuleRun<'p, 'a, 's> {
    fn tick(&mut self) -> Result<()> {
        *self.frames += 1;
        match self.max_frames {
            Some(max) if *self.frames > max => Err(EngineError::Execution(format!(
                "frame budget of {} exhausted in rule {}",
                max, self.rule.name
            ))),
            _ => Ok(()),
        }
    }

    fn steps_from(&mut self, step: usize) -> Result<()> {
        let rule = self.rule;
        match rule.steps.get(step) {
            None => {
                self.emit();
                Ok(())
            }
            Some(Step::Lookup { path, optional, .. }) => {
                self.walk(step, path, *optional, self.input)
            }
            Some(Step::Check(op)) => {
                let holds = matches!(
                    eval(self.functions, op, &self.slots).as_deref(),
                    Some(Value::Bool(true))
                );
                if holds {
                    self.steps_from(step + 1)?;
                }
                Ok(())
            }
        }
    }

    fn walk(
        &mut self,
        step: usize,
        path: &'p [Segment],
        optional: bool,
        current: &'a Value,
    ) -> Result<()> {
        self.tick()?;
        match path.split_first() {
            None => {
                if current.is_null() && !optional {
                    return Ok(());
                }
                self.bind(step, current)
            }
            Some((Segment::Field(name), rest)) => {
                match current.as_object().and_then(|m| m.get(name.as_str())) {
                    Some(next) => self.walk(step, rest, optional, next),
                    None => self.dead_end(step, optional),
                }
            }
            Some((Segment::Index(var), rest)) => match self.indices[*var] {
                Some(key) => match key.select(current) {
                    Some(next) => self.walk(step, rest, optional, next),
                    None => self.dead_end(step, optional),
                },
                None => {
                    for (key, child) in children(current) {
                        self.indices[*var] = Some(key);
                        let result = self.walk(step, rest, optional, child);
                        if result.is_err() {
                            self.indices[*var] = None;
                            return result;
                        }
                    }
                    self.indices[*var] = None;
                    Ok(())
                }
            },
        }
    }

    /// A path that stops resolving binds `null` for optional lookups.
    fn dead_end(&mut self, step: usize, optional: bool) -> Result<()> {
        if optional {
            self.bind(step, &NULL)
        } else {
            Ok(())
        }
    }

    fn bind(&mut self, step: usize, value: &'a Value) -> Result<()> {
        self.slots.push(value);
        let result = self.steps_from(step + 1);
        self.slots.pop();
        result
    }

    fn emit(&mut self) {
        let mut binding = Map::new();
        for (label, slot) in &self.rule.emits {
            let value = self.slots[*slot].clone();
            match binding
                .entry(label.clone())
                .or_insert_with(|| Value::Array(Vec::new()))
            {
                Value::Array(values) => values.push(value),
                other => *other = Value::Array(vec![value]),
            }
        }
        self.sink.push(Value::Object(binding));
    }
}

fn eval<'v>(functions: &[PreparedFunction], op: &Op, slots: &[&'v Value]) -> Option<Cow<'v, Value>> {
    match op {
        Op::Const(v) => Some(Cow::Owned(v.clone())),
        Op::Slot(i) => slots.get(*i).map(|v| Cow::Borrowed(*v)),
        Op::List(items) => {
            let values = items
                .iter()
                .map(|item| eval(functions, item, slots).map(Cow::into_owned))
                .collect::<Option<Vec<_>>>()?;
            Some(Cow::Owned(Value::Array(values)))
        }
        Op::Not(inner) => match eval(functions, inner, slots)?.as_ref() {
            Value::Bool(b) => Some(Cow::Owned(Value::Bool(!b))),
            _ => None,
        },
        Op::Eq(a, b) => {
            let a = eval(functions, a, slots)?;
            let b = eval(functions, b, slots)?;
            Some(Cow::Owned(Value::Bool(a == b)))
        }
        Op::Call(index, args) => {
            let function = functions.get(*index)?;
            let values = args
                .iter()
                .map(|arg| eval(functions, arg, slots))
                .collect::<Option<Vec<_>>>()?;
            let refs: Vec<&Value> = values.iter().map(|v| v.as_ref()).collect();
            let out = eval(functions, &function.body, &refs)?;
            Some(Cow::Owned(out.into_owned()))
        }
        Op::StartsWith(s, prefix) => {
            let s = eval(functions, s, slots)?;
            let prefix = eval(functions, prefix, slots)?;
            match (s.as_ref(), prefix.as_ref()) {
                (Value::String(s), Value::String(p)) => {
                    Some(Cow::Owned(Value::Bool(s.starts_with(p.as_str()))))
                }
                _ => None,
            }
        }
        Op::RegexMatch(re, arg) => match eval(functions, arg, slots)?.as_ref() {
            Value::String(s) => Some(Cow::Owned(Value::Bool(re.is_match(s)))),
            _ => None,
        },
        Op::MapMatch(arg, matcher) => {
            let value = eval(functions, arg, slots)?;
            match value.as_ref() {
                Value::Object(_) | Value::Null => {
                    Some(Cow::Owned(Value::Bool(matcher.matches_json(&value))))
                }
                _ => None,
            }
        }
        Op::Any(arg) => match eval(functions, arg, slots)?.as_ref() {
            Value::Array(items) => {
                let mut any = false;
                for item in items {
                    match item {
                        Value::Bool(b) => any |= *b,
                        _ => return None,
                    }
                }
                Some(Cow::Owned(Value::Bool(any)))
            }
            _ => None,
        },
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
