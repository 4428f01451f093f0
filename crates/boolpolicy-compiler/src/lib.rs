//! # boolpolicy-compiler
//!
//! Compiles a [`Query`](boolpolicy_types::Query) into an [`Evaluator`].
//!
//! Each field label is resolved through a
//! [`SchemaResolver`](boolpolicy_types::SchemaResolver) to a path through the
//! candidate object. Repeated containers on that path get index variables,
//! shared between fields under the same container. Field values become match
//! functions, and one rule is generated per combination of alternatives across
//! fields. The rendered program is prepared once on an
//! [`EvaluatorBackend`](boolpolicy_engine::EvaluatorBackend).
//!
//! ```rust
//! use boolpolicy_compiler::compile;
//! use boolpolicy_types::{FieldQuery, LeafKind, MetaPath, PathSegment, Query, SchemaTable};
//! use serde_json::json;
//!
//! let schema = SchemaTable::new().with_field(
//!     "Image",
//!     MetaPath::new(
//!         vec![PathSegment::slice("containers"), PathSegment::scalar("image")],
//!         LeafKind::String,
//!     ),
//! );
//! let query = Query::default().with_field(FieldQuery::new("Image", ["nginx"]));
//! let evaluator = compile(&query, &schema).unwrap();
//!
//! let deployment = json!({"containers": [{"image": "nginx:1.25"}, {"image": "redis"}]});
//! let result = evaluator.evaluate(&deployment).unwrap();
//! assert_eq!(result.values_for("Image"), vec!["nginx:1.25"]);
//! ```

#![deny(unsafe_code)]

pub mod compile;
pub mod config;
pub mod error;
pub mod evaluator;
mod matchers;
mod path;
mod render;

pub use compile::{compile, Compiler};
pub use config::CompilerConfig;
pub use error::{CompileError, InvariantViolation, Result};
pub use evaluator::{Evaluator, INVARIANT_TARGET};
