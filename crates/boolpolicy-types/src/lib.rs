//! # boolpolicy-types
//!
//! Shared vocabulary for the boolean policy query pipeline:
//!
//! - [`FieldQuery`] / [`Query`]: the per-field match criteria produced by the
//!   query builders and consumed by the compiler.
//! - [`MetaPath`] / [`SchemaResolver`]: how a field label maps onto a path through
//!   the candidate object, and which container kinds that path crosses.
//! - [`QueryResult`] / [`Binding`]: what a compiled evaluator reports for a match.
//! - [`parse_bool`]: the lenient boolean parser shared by builders and compiler.

#![deny(unsafe_code)]

pub mod boolean;
pub mod error;
pub mod query;
pub mod result;
pub mod schema;

pub use boolean::parse_bool;
pub use error::{ParseBoolError, SchemaError};
pub use query::{FieldQuery, Operator, Query};
pub use result::{Binding, QueryResult};
pub use schema::{ContainerKind, LeafKind, MetaPath, PathSegment, SchemaResolver, SchemaTable};
