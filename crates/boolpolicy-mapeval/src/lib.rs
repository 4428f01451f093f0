//! # boolpolicy-mapeval
//!
//! Matches string-keyed, string-valued maps (labels, annotations) against a
//! disjunction of conjunctions of `key=value` constraints.
//!
//! Query strings are assembled with the builders in [`query`] and compiled with
//! [`MapMatcher::compile`]:
//!
//! ```rust
//! use boolpolicy_mapeval::{conjunction, should_contain, should_not_contain, MapMatcher};
//! use std::collections::BTreeMap;
//!
//! let q = conjunction([should_contain("team", "payments"), should_not_contain("owner", "")]);
//! let matcher = MapMatcher::compile(&q).unwrap();
//!
//! let labels = BTreeMap::from([("team".to_string(), "payments".to_string())]);
//! assert!(matcher.matches(&labels));
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod matcher;
pub mod query;

pub use error::{MapQueryError, Result};
pub use matcher::{build_map_matcher, MapMatcher};
pub use query::{
    conjunction, disjunction, should_contain, should_not_contain, CONJUNCTION_MARKER,
    DISJUNCTION_MARKER, SHOULD_NOT_MATCH_MARKER,
};
