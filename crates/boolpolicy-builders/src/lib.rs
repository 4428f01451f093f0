//! # boolpolicy-builders
//!
//! The persisted policy model and its translation into compiler queries.
//!
//! A [`Policy`] is a disjunction of sections; each section is a conjunction of
//! policy groups. Every group names a policy field from a fixed registry
//! which decides the values it accepts, whether it may be negated or combined
//! with `AND`, and the [`QueryBuilder`] that turns it into
//! [`FieldQuery`](boolpolicy_types::FieldQuery)s.
//!
//! Legacy policies that predate sections are upgraded by [`convert`] before
//! their queries are built.
//!
//! ```rust
//! use boolpolicy_builders::{Policy, PolicyGroup, PolicySection};
//!
//! let policy = Policy::new(
//!     "latest tag",
//!     vec![PolicySection::new(
//!         "images",
//!         vec![PolicyGroup::new("Image Tag", ["latest"])],
//!     )],
//! );
//! let queries = policy.queries().unwrap();
//! assert_eq!(queries[0].field_queries[0].field, "Image Tag");
//! assert_eq!(queries[0].field_queries[0].values, vec!["r/latest"]);
//! ```

#![deny(unsafe_code)]

pub mod builders;
pub mod convert;
pub mod error;
pub mod fieldnames;
pub mod labels;
pub mod metadata;
pub mod policy;
pub mod section;

pub use builders::{MapPredicate, QueryBuilder, ValueMapper};
pub use convert::{ensure_converted, PolicyFields, LEGACY_VERSION, POLICY_VERSION};
pub use error::{BuildError, ConversionError, Result, ValidationError};
pub use metadata::{field_metadata, known_fields, FieldMetadata, ValueKind};
pub use policy::{BooleanOperator, EventSource, Policy, PolicyGroup, PolicySection, PolicyValue};
pub use section::{section_to_query, ValidationOptions};
