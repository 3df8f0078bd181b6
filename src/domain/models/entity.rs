//! Tests and plans found inside a metadata tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::request::Locator;

/// Kind of entity stored in an artifact tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Test,
    Plan,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Plan => "plan",
        }
    }
}

/// A named node of the tree with its fully inherited metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub name: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Entity {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// A scalar field as a string. Numbers and booleans are stringified.
    pub fn string_field(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// A field that fmf allows to be either a single string or a list.
    pub fn string_list_field(&self, key: &str) -> Vec<String> {
        match self.metadata.get(key) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// An entity paired with the locator it was resolved from.
///
/// Lives only for the duration of one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    pub entity: Entity,
    pub locator: Locator,
}

/// Return the first entity whose name equals `name` exactly.
///
/// Duplicates are not an error; the earliest one in list order wins.
pub fn find_first<'a>(entities: &'a [Entity], name: &str) -> Option<&'a Entity> {
    entities.iter().find(|entity| entity.name == name)
}
