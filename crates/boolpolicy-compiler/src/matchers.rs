//! Match function synthesis.
//!
//! Each field query becomes a set of named single-parameter predicates over the
//! field's leaf value, plus the list of those predicates a rule may pick from.
//!
//! String values select their semantics by shape, checked in this order:
//!
//! | Value        | Predicate                                      |
//! |--------------|------------------------------------------------|
//! | `!rest`      | `rest` compiled normally, then inverted        |
//! | `r/pattern`  | anchored, case-insensitive regex match         |
//! | `"literal"`  | exact equality with the unquoted literal       |
//! | anything else| case-sensitive prefix match                    |
//!
//! The value `-` means "absent" on any leaf kind: it matches a leaf that is
//! missing or `null`, and the field's lookup is rendered as optional so such
//! leaves reach the predicate at all.

use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::render::quote;
use boolpolicy_mapeval::MapMatcher;
use boolpolicy_types::{parse_bool, FieldQuery, LeafKind, Operator};
use regex::Regex;

pub(crate) const NEGATION_SIGIL: char = '!';
pub(crate) const REGEX_SIGIL: &str = "r/";
pub(crate) const NULL_MARKER: &str = "-";

/// A generated `func name(v) { body }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MatchFunction {
    pub name: String,
    pub body: String,
}

/// All functions generated for one field, and which of them are rule
/// alternatives. `nullable` sets when some predicate tests for absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FunctionSet {
    pub functions: Vec<MatchFunction>,
    pub alternatives: Vec<String>,
    pub nullable: bool,
}

pub(crate) fn build_function_set(
    position: usize,
    query: &FieldQuery,
    leaf: &LeafKind,
    config: &CompilerConfig,
) -> Result<FunctionSet> {
    let base = format!("{}_{}", sanitize(&query.field), position);

    if query.match_all {
        let name = format!("{}_all", base);
        return Ok(FunctionSet {
            functions: vec![MatchFunction {
                name: name.clone(),
                body: "true".to_string(),
            }],
            alternatives: vec![name],
            nullable: false,
        });
    }

    if query.values.is_empty() {
        return Err(CompileError::NoValuesForField(query.field.clone()));
    }

    let multi = query.values.len() > 1;
    if multi && query.operator == Operator::And {
        return Err(CompileError::unsupported(
            &query.field,
            "conjunction over multiple values",
        ));
    }
    if multi && query.negate && !config.negation_supported {
        return Err(CompileError::unsupported(
            &query.field,
            "negation over multiple values",
        ));
    }

    let nullable = query.values.iter().any(|v| v == NULL_MARKER);
    let mut functions = Vec::with_capacity(query.values.len() + 2);
    for (i, raw) in query.values.iter().enumerate() {
        let mut body = if raw == NULL_MARKER {
            "v == null".to_string()
        } else {
            value_predicate(&query.field, leaf, raw)?
        };
        if query.negate && !multi {
            body = format!("!({})", body);
        }
        functions.push(MatchFunction {
            name: format!("{}_{}", base, i),
            body,
        });
    }

    if !multi {
        let alternatives = vec![functions[0].name.clone()];
        return Ok(FunctionSet {
            functions,
            alternatives,
            nullable,
        });
    }

    let calls: Vec<String> = functions.iter().map(|f| format!("{}(v)", f.name)).collect();
    let any_name = format!("{}_match", base);
    let none_name = format!("{}_not_match", base);
    let per_value: Vec<String> = functions.iter().map(|f| f.name.clone()).collect();
    functions.push(MatchFunction {
        name: any_name.clone(),
        body: format!("any_of([{}])", calls.join(", ")),
    });
    functions.push(MatchFunction {
        name: none_name.clone(),
        body: format!("not_({}(v))", any_name),
    });

    let alternatives = if query.negate { vec![none_name] } else { per_value };
    Ok(FunctionSet {
        functions,
        alternatives,
        nullable,
    })
}

fn value_predicate(field: &str, leaf: &LeafKind, raw: &str) -> Result<String> {
    match leaf {
        LeafKind::String => string_predicate(field, raw),
        LeafKind::Bool => {
            let b = parse_bool(raw).map_err(|e| CompileError::invalid_value(field, raw, e))?;
            Ok(format!("v == {}", b))
        }
        LeafKind::Map => {
            MapMatcher::compile(raw).map_err(|source| CompileError::MalformedMapConstraint {
                field: field.to_string(),
                source,
            })?;
            Ok(format!("map_match(v, {})", quote(raw)))
        }
        other => Err(CompileError::unsupported(
            field,
            format!("matching on {} values", other),
        )),
    }
}

fn string_predicate(field: &str, raw: &str) -> Result<String> {
    if let Some(rest) = raw.strip_prefix(NEGATION_SIGIL) {
        return Ok(format!("!({})", string_predicate(field, rest)?));
    }
    if let Some(pattern) = raw.strip_prefix(REGEX_SIGIL) {
        let anchored = format!("(?i)^(?:{})$", pattern);
        Regex::new(&anchored).map_err(|e| CompileError::invalid_value(field, raw, e))?;
        return Ok(format!("regex_match({}, v)", quote(&anchored)));
    }
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Ok(format!("v == {}", quote(&raw[1..raw.len() - 1])));
    }
    Ok(format!("startswith(v, {})", quote(raw)))
}

/// Lowercase ASCII identifier fragment for a field label.
fn sanitize(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "f_");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(query: &FieldQuery, leaf: LeafKind) -> Result<FunctionSet> {
        build_function_set(0, query, &leaf, &CompilerConfig::default())
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Image Tag"), "image_tag");
        assert_eq!(sanitize("  CVE / CVSS "), "cve_cvss");
        assert_eq!(sanitize("7zip"), "f_7zip");
        assert_eq!(sanitize("Ünïcode"), "n_code");
        assert_eq!(sanitize("--"), "f_");
    }

    #[test]
    fn test_string_encodings() {
        assert_eq!(string_predicate("f", "foo").unwrap(), r#"startswith(v, "foo")"#);
        assert_eq!(string_predicate("f", "\"foo\"").unwrap(), r#"v == "foo""#);
        assert_eq!(
            string_predicate("f", "r/f.*r").unwrap(),
            r#"regex_match("(?i)^(?:f.*r)$", v)"#
        );
        assert_eq!(string_predicate("f", "!foo").unwrap(), r#"!(startswith(v, "foo"))"#);
        assert_eq!(string_predicate("f", "!\"a\"").unwrap(), r#"!(v == "a")"#);
        // A lone quote is a prefix, not an empty exact match.
        assert_eq!(string_predicate("f", "\"").unwrap(), r#"startswith(v, "\"")"#);
    }

    #[test]
    fn test_invalid_regex_rejected() {
        assert!(matches!(
            string_predicate("Image", "r/(unclosed"),
            Err(CompileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_single_value_set() {
        let fs = set(&FieldQuery::new("Image", ["nginx"]), LeafKind::String).unwrap();
        assert_eq!(fs.functions.len(), 1);
        assert_eq!(fs.alternatives, vec!["image_0_0"]);
    }

    #[test]
    fn test_multi_value_set_emits_aggregates() {
        let fs = set(&FieldQuery::new("Image", ["a", "b", "c"]), LeafKind::String).unwrap();
        let names: Vec<_> = fs.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["image_0_0", "image_0_1", "image_0_2", "image_0_match", "image_0_not_match"]
        );
        assert_eq!(fs.alternatives, vec!["image_0_0", "image_0_1", "image_0_2"]);
        assert_eq!(
            fs.functions[3].body,
            "any_of([image_0_0(v), image_0_1(v), image_0_2(v)])"
        );
        assert_eq!(fs.functions[4].body, "not_(image_0_match(v))");
    }

    #[test]
    fn test_negation() {
        let single = set(&FieldQuery::new("Image", ["a"]).negated(true), LeafKind::String).unwrap();
        assert_eq!(single.functions[0].body, r#"!(startswith(v, "a"))"#);

        let multi = FieldQuery::new("Image", ["a", "b"]).negated(true);
        assert!(matches!(
            set(&multi, LeafKind::String),
            Err(CompileError::Unsupported { .. })
        ));

        let enabled =
            build_function_set(0, &multi, &LeafKind::String, &CompilerConfig::with_negation())
                .unwrap();
        assert_eq!(enabled.alternatives, vec!["image_0_not_match"]);
    }

    #[test]
    fn test_and_with_multiple_values_unsupported() {
        let q = FieldQuery::new("Image", ["a", "b"]).with_operator(Operator::And);
        assert!(matches!(
            set(&q, LeafKind::String),
            Err(CompileError::Unsupported { .. })
        ));
        let single = FieldQuery::new("Image", ["a"]).with_operator(Operator::And);
        assert!(set(&single, LeafKind::String).is_ok());
    }

    #[test]
    fn test_bool_values() {
        let fs = set(&FieldQuery::new("Privileged", ["TR"]), LeafKind::Bool).unwrap();
        assert_eq!(fs.functions[0].body, "v == true");
        assert!(matches!(
            set(&FieldQuery::new("Privileged", ["maybe"]), LeafKind::Bool),
            Err(CompileError::InvalidValue { .. })
        ));
        assert!(matches!(
            set(&FieldQuery::new("Privileged", [""]), LeafKind::Bool),
            Err(CompileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_map_values() {
        let fs = set(&FieldQuery::new("Labels", ["team=pay.*"]), LeafKind::Map).unwrap();
        assert_eq!(fs.functions[0].body, r#"map_match(v, "team=pay.*")"#);
        assert!(matches!(
            set(&FieldQuery::new("Labels", ["team"]), LeafKind::Map),
            Err(CompileError::MalformedMapConstraint { .. })
        ));
    }

    #[test]
    fn test_other_leaf_kinds_unsupported() {
        assert!(matches!(
            set(&FieldQuery::new("Replicas", ["3"]), LeafKind::Int),
            Err(CompileError::Unsupported { .. })
        ));
        // Match-all works for any leaf kind.
        let fs = set(&FieldQuery::match_all("Replicas"), LeafKind::Int).unwrap();
        assert_eq!(fs.functions[0].body, "true");
    }

    #[test]
    fn test_null_marker_tests_absence_on_any_leaf() {
        let fs = set(&FieldQuery::new("Image Scan", ["-"]), LeafKind::Other("scan".into())).unwrap();
        assert!(fs.nullable);
        assert_eq!(fs.functions[0].body, "v == null");

        let negated = set(&FieldQuery::new("Image Scan", ["-"]).negated(true), LeafKind::Other("scan".into())).unwrap();
        assert_eq!(negated.functions[0].body, "!(v == null)");

        let mixed = set(&FieldQuery::new("Image", ["-", "nginx"]), LeafKind::String).unwrap();
        assert!(mixed.nullable);
        assert_eq!(mixed.functions[1].body, r#"startswith(v, "nginx")"#);

        assert!(!set(&FieldQuery::new("Image", ["nginx"]), LeafKind::String).unwrap().nullable);
    }

    #[test]
    fn test_empty_values_rejected() {
        let q = FieldQuery::new("Image", Vec::<String>::new());
        assert!(matches!(
            set(&q, LeafKind::String),
            Err(CompileError::NoValuesForField(f)) if f == "Image"
        ));
    }
}
