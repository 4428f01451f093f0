//! Schema model: how field labels resolve to paths through a candidate object.
//!
//! A [`MetaPath`] is the chain of segments from the object root to a field's
//! leaf. Each segment records the container kind found at that key; `Slice` and
//! `Map` segments are repeated and get an index variable in compiled rules.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Container kind of a path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Scalar,
    Pointer,
    Slice,
    Map,
}

impl ContainerKind {
    /// Whether a segment of this kind holds many elements.
    pub fn is_repeated(self) -> bool {
        matches!(self, ContainerKind::Slice | ContainerKind::Map)
    }
}

/// Kind of the value found at the end of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeafKind {
    String,
    Bool,
    Int,
    Float,
    Map,
    Other(String),
}

impl std::fmt::Display for LeafKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeafKind::String => write!(f, "string"),
            LeafKind::Bool => write!(f, "bool"),
            LeafKind::Int => write!(f, "int"),
            LeafKind::Float => write!(f, "float"),
            LeafKind::Map => write!(f, "map"),
            LeafKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// One step from a parent object to a child key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSegment {
    pub name: String,
    pub kind: ContainerKind,
}

impl PathSegment {
    pub fn new(name: impl Into<String>, kind: ContainerKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, ContainerKind::Scalar)
    }

    pub fn pointer(name: impl Into<String>) -> Self {
        Self::new(name, ContainerKind::Pointer)
    }

    pub fn slice(name: impl Into<String>) -> Self {
        Self::new(name, ContainerKind::Slice)
    }

    pub fn map(name: impl Into<String>) -> Self {
        Self::new(name, ContainerKind::Map)
    }
}

/// Resolved path and leaf kind for one field label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaPath {
    pub segments: Vec<PathSegment>,
    pub leaf: LeafKind,
}

impl MetaPath {
    pub fn new(segments: Vec<PathSegment>, leaf: LeafKind) -> Self {
        Self { segments, leaf }
    }
}

/// Resolves a field label to its [`MetaPath`].
pub trait SchemaResolver {
    fn resolve(&self, label: &str) -> Option<MetaPath>;
}

impl<T: SchemaResolver + ?Sized> SchemaResolver for &T {
    fn resolve(&self, label: &str) -> Option<MetaPath> {
        (**self).resolve(label)
    }
}

impl<T: SchemaResolver + ?Sized> SchemaResolver for std::sync::Arc<T> {
    fn resolve(&self, label: &str) -> Option<MetaPath> {
        (**self).resolve(label)
    }
}

/// A static label -> path table.
///
/// Can be built in code or loaded from YAML/JSON:
///
/// ```yaml
/// fields:
///   Image Tag:
///     segments:
///       - { name: containers, kind: slice }
///       - { name: image, kind: pointer }
///       - { name: tag, kind: scalar }
///     leaf: string
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaTable {
    #[serde(default)]
    fields: BTreeMap<String, MetaPath>,
}

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, label: impl Into<String>, path: MetaPath) -> Self {
        self.insert(label, path);
        self
    }

    pub fn insert(&mut self, label: impl Into<String>, path: MetaPath) {
        self.fields.insert(label.into(), path);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let table: SchemaTable = serde_yaml::from_str(yaml)?;
        table.validated()
    }

    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let table: SchemaTable = serde_json::from_str(json)?;
        table.validated()
    }

    /// Load a table from disk; `.json` files are read as JSON, everything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            _ => Self::from_yaml_str(&raw),
        }
    }

    fn validated(self) -> Result<Self, SchemaError> {
        if let Some((label, _)) = self.fields.iter().find(|(_, p)| p.segments.is_empty()) {
            return Err(SchemaError::EmptyPath(label.clone()));
        }
        Ok(self)
    }
}

impl SchemaResolver for SchemaTable {
    fn resolve(&self, label: &str) -> Option<MetaPath> {
        self.fields.get(label).cloned()
    }
}
