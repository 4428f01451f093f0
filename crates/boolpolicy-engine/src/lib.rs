//! # boolpolicy-engine
//!
//! A small declarative rule engine for compiled policy programs.
//!
//! A program is a package header, a list of functions and a list of rules.
//! Functions are pure boolean expressions over their parameters. Rules look up
//! values in the input document, with `some` index variables ranging over
//! arrays and objects, check function results, and emit labelled values:
//!
//! ```text
//! package policy.main
//!
//! func image_0_0(v) { startswith(v, "nginx") }
//!
//! rule violation_0 {
//!   some idx0
//!   val0 := input.containers[idx0].image
//!   image_0_0(val0)
//!   emit "Image" := val0
//! }
//! ```
//!
//! Builtins: `startswith(s, prefix)`, `regex_match("pattern", s)`,
//! `map_match(m, "query")` and `any([bools])`. A lookup written `v ?= input...`
//! binds `null` when the path does not resolve, for checks like `v == null`.

#![deny(unsafe_code)]

pub mod ast;
pub mod backend;
pub mod error;
mod exec;
mod lexer;
pub mod parser;
pub mod prepare;

pub use backend::{EvaluatorBackend, RuleEngine};
pub use error::{EngineError, Result};
pub use parser::{is_plain_identifier, parse, KEYWORDS};
pub use prepare::PreparedProgram;
