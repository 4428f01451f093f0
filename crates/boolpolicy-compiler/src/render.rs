//! Program text assembly.

use crate::matchers::FunctionSet;
use crate::path::AccessPath;
use serde_json::Value;
use std::fmt::{self, Write};

/// Helpers every program starts with.
const PRELUDE: &str = "\
func not_(x) { !x }
func any_of(xs) { any(xs) }
";

/// Everything the renderer needs to know about one field.
#[derive(Debug, Clone)]
pub(crate) struct FieldPlan {
    pub label: String,
    pub path: AccessPath,
    pub set: FunctionSet,
}

/// JSON string literal, which is also the program's string syntax.
pub(crate) fn quote(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}

/// Render the program: header, prelude, match functions, then one rule per
/// combination. `combinations[n][i]` picks the alternative of field `i` used by
/// rule `n`.
pub(crate) fn render_program(
    package: &str,
    fields: &[FieldPlan],
    combinations: &[Vec<usize>],
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "package {}", package)?;
    writeln!(out)?;
    out.push_str(PRELUDE);

    for field in fields {
        writeln!(out)?;
        writeln!(out, "# {}", quote(&field.label))?;
        for function in &field.set.functions {
            writeln!(out, "func {}(v) {{ {} }}", function.name, function.body)?;
        }
    }

    let mut index_vars: Vec<&str> = Vec::new();
    for field in fields {
        for var in field.path.index_vars() {
            if !index_vars.contains(&var) {
                index_vars.push(var);
            }
        }
    }

    for (n, combination) in combinations.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "rule violation_{} {{", n)?;
        if !index_vars.is_empty() {
            writeln!(out, "  some {}", index_vars.join(", "))?;
        }
        for (i, (field, alternative)) in fields.iter().zip(combination).enumerate() {
            let function = field.set.alternatives.get(*alternative).ok_or(fmt::Error)?;
            let assign = if field.set.nullable { "?=" } else { ":=" };
            writeln!(out, "  val{} {} {}", i, assign, field.path)?;
            writeln!(out, "  {}(val{})", function, i)?;
        }
        for (i, field) in fields.iter().enumerate() {
            writeln!(out, "  emit {} := val{}", quote(&field.label), i)?;
        }
        writeln!(out, "}}")?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchers::MatchFunction;
    use crate::path::Step;

    fn plan(label: &str, steps: Vec<Step>, alternatives: &[&str]) -> FieldPlan {
        FieldPlan {
            label: label.to_string(),
            path: AccessPath { steps },
            set: FunctionSet {
                functions: alternatives
                    .iter()
                    .map(|name| MatchFunction {
                        name: name.to_string(),
                        body: "true".to_string(),
                    })
                    .collect(),
                alternatives: alternatives.iter().map(|s| s.to_string()).collect(),
                nullable: false,
            },
        }
    }

    #[test]
    fn test_render_program() {
        let fields = vec![
            plan(
                "Image",
                vec![Step::Field("containers".into()), Step::Index("idx0".into()), Step::Field("image".into())],
                &["image_0_0", "image_0_1"],
            ),
            plan("Name", vec![Step::Field("name".into())], &["name_1_0"]),
        ];
        let text = render_program("policy.main", &fields, &[vec![0, 0], vec![1, 0]]).unwrap();
        let expected = r#"package policy.main

func not_(x) { !x }
func any_of(xs) { any(xs) }

# "Image"
func image_0_0(v) { true }
func image_0_1(v) { true }

# "Name"
func name_1_0(v) { true }

rule violation_0 {
  some idx0
  val0 := input.containers[idx0].image
  image_0_0(val0)
  val1 := input.name
  name_1_0(val1)
  emit "Image" := val0
  emit "Name" := val1
}

rule violation_1 {
  some idx0
  val0 := input.containers[idx0].image
  image_0_1(val0)
  val1 := input.name
  name_1_0(val1)
  emit "Image" := val0
  emit "Name" := val1
}
"#;
        assert_eq!(text, expected);
        assert!(boolpolicy_engine::parse(&text).is_ok());
    }

    #[test]
    fn test_labels_are_escaped() {
        let fields = vec![plan("Odd\n\"label\"", vec![Step::Field("x".into())], &["odd_0_0"])];
        let text = render_program("p", &fields, &[vec![0]]).unwrap();
        assert!(text.contains(r#"emit "Odd\n\"label\"" := val0"#));
        assert!(boolpolicy_engine::parse(&text).is_ok());
    }

    #[test]
    fn test_nullable_field_renders_optional_lookup() {
        let mut scan = plan(
            "Image Scan",
            vec![Step::Field("image".into()), Step::Field("scan".into())],
            &["image_scan_0_0"],
        );
        scan.set.nullable = true;
        let text = render_program("p", &[scan], &[vec![0]]).unwrap();
        assert!(text.contains("  val0 ?= input.image.scan\n"));
        assert!(boolpolicy_engine::parse(&text).is_ok());
    }

    #[test]
    fn test_zero_combinations_render_no_rules() {
        let fields = vec![plan("Name", vec![Step::Field("name".into())], &["name_0_0"])];
        let text = render_program("p", &fields, &[]).unwrap();
        assert!(!text.contains("rule "));
        assert_eq!(boolpolicy_engine::parse(&text).unwrap().rules.len(), 0);
    }
}
