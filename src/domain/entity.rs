//! Linked-data entities of the provenance graph.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// A property value on an entity
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// Plain JSON value (string, number, bool)
    Literal(Value),

    /// Edge to another entity
    Reference(String),

    /// Edges to several entities, in order
    References(Vec<String>),
}

impl Property {
    fn to_json(&self) -> Value {
        match self {
            Property::Literal(value) => value.clone(),
            Property::Reference(id) => json!({ "@id": id }),
            Property::References(ids) => {
                Value::Array(ids.iter().map(|id| json!({ "@id": id })).collect())
            }
        }
    }
}

/// A node in the provenance graph
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Identifier, unique within the graph
    pub id: String,

    /// JSON-LD types
    pub types: Vec<String>,

    /// Properties in insertion order
    pub properties: IndexMap<String, Property>,
}

impl Entity {
    pub fn new(id: impl Into<String>, types: &[&str]) -> Self {
        Self {
            id: id.into(),
            types: types.iter().map(|t| t.to_string()).collect(),
            properties: IndexMap::new(),
        }
    }

    pub fn with_literal(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_literal(key, value);
        self
    }

    pub fn with_reference(mut self, key: &str, target: impl Into<String>) -> Self {
        self.properties
            .insert(key.to_string(), Property::Reference(target.into()));
        self
    }

    pub fn with_references<I, S>(mut self, key: &str, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties.insert(
            key.to_string(),
            Property::References(targets.into_iter().map(Into::into).collect()),
        );
        self
    }

    pub fn set_literal(&mut self, key: &str, value: impl Into<Value>) {
        self.properties
            .insert(key.to_string(), Property::Literal(value.into()));
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.iter().any(|t| t == type_name)
    }

    /// Literal value of a property, if it is a literal
    pub fn literal(&self, key: &str) -> Option<&Value> {
        match self.properties.get(key)? {
            Property::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Targets of a reference property (empty for literals or missing keys)
    pub fn targets(&self, key: &str) -> Vec<&str> {
        match self.properties.get(key) {
            Some(Property::Reference(id)) => vec![id.as_str()],
            Some(Property::References(ids)) => ids.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Every outgoing edge as `(property, target)`
    pub fn references(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().flat_map(|(key, prop)| {
            let targets: Vec<&str> = match prop {
                Property::Literal(_) => Vec::new(),
                Property::Reference(id) => vec![id.as_str()],
                Property::References(ids) => ids.iter().map(String::as_str).collect(),
            };
            targets.into_iter().map(move |t| (key.as_str(), t))
        })
    }

    /// JSON-LD node object
    pub fn to_json(&self) -> Value {
        let mut node = Map::new();
        node.insert("@id".to_string(), Value::String(self.id.clone()));

        let types = match self.types.as_slice() {
            [single] => Value::String(single.clone()),
            many => Value::Array(many.iter().cloned().map(Value::String).collect()),
        };
        node.insert("@type".to_string(), types);

        for (key, prop) in &self.properties {
            node.insert(key.clone(), prop.to_json());
        }

        Value::Object(node)
    }
}
