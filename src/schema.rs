//! Closed representation of schema fragments.
//!
//! API documents describe parameters and bodies with JSON Schema fragments.
//! Rather than walking open-ended maps, fragments are parsed once into a
//! [`SchemaNode`] with five shapes. Keywords that carry no structure
//! (`description`, `enum`, `format`, `type`, bounds, ...) are kept verbatim so
//! that serialising a reference-free node gives back the input.
//!
//! Parsing never fails. Anything that cannot be read structurally becomes the
//! permissive placeholder, an untyped scalar with no keywords.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Keywords copied through untouched.
pub type Keywords = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Scalar(ScalarSchema),
    Object(ObjectSchema),
    Array(ArraySchema),
    Composition(CompositionSchema),
    /// Pointer into the document, e.g. `#/components/schemas/Pet`.
    Reference(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScalarSchema {
    pub keywords: Keywords,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    /// Properties in declaration order.
    pub properties: Vec<(String, SchemaNode)>,
    /// `None` when the fragment had no `required` keyword.
    pub required: Option<Vec<String>>,
    pub additional: AdditionalProperties,
    pub keywords: Keywords,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum AdditionalProperties {
    #[default]
    Unspecified,
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArraySchema {
    pub items: Option<Box<SchemaNode>>,
    pub keywords: Keywords,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositionKind {
    OneOf,
    AnyOf,
    AllOf,
}

impl CompositionKind {
    /// Checked in this order when a fragment carries several.
    pub const ALL: [CompositionKind; 3] = [
        CompositionKind::OneOf,
        CompositionKind::AnyOf,
        CompositionKind::AllOf,
    ];

    pub fn keyword(&self) -> &'static str {
        match self {
            CompositionKind::OneOf => "oneOf",
            CompositionKind::AnyOf => "anyOf",
            CompositionKind::AllOf => "allOf",
        }
    }

    /// Human-readable note, e.g. "one of 2 variants".
    pub fn describe(&self, count: usize) -> String {
        match self {
            CompositionKind::OneOf => format!("one of {} variants", count),
            CompositionKind::AnyOf => format!("any of {} variants", count),
            CompositionKind::AllOf => format!("all of {} schemas combined", count),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionSchema {
    pub kind: CompositionKind,
    pub members: Vec<SchemaNode>,
    /// Everything beside the composition keyword, parsed as its own node so
    /// that sibling `properties` or `items` are resolved like any other.
    pub base: Box<SchemaNode>,
}

/// Structural keys consumed by the parser; never stored in `keywords`.
const OBJECT_KEYS: &[&str] = &["properties", "required", "additionalProperties"];

impl SchemaNode {
    /// The permissive placeholder: accepts any value.
    pub fn permissive() -> Self {
        SchemaNode::Scalar(ScalarSchema::default())
    }

    /// Placeholder carrying an explanatory description.
    pub fn permissive_with(description: impl Into<String>) -> Self {
        let mut keywords = Keywords::new();
        keywords.insert("description".to_string(), Value::String(description.into()));
        SchemaNode::Scalar(ScalarSchema { keywords })
    }

    pub fn is_permissive(&self) -> bool {
        matches!(self, SchemaNode::Scalar(s) if s.keywords.is_empty())
    }

    /// Parse a fragment. Unreadable shapes degrade to [`SchemaNode::permissive`].
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            if !value.is_boolean() {
                tracing::debug!(
                    "schema is a {}, using permissive placeholder",
                    crate::types::json_type_name(value)
                );
            }
            return SchemaNode::permissive();
        };

        if let Some(pointer) = map.get("$ref") {
            return match pointer.as_str() {
                Some(p) => SchemaNode::Reference(p.to_string()),
                None => degrade("$ref is not a string"),
            };
        }

        for kind in CompositionKind::ALL {
            if let Some(members) = map.get(kind.keyword()) {
                let Some(members) = members.as_array() else {
                    return degrade("composition members are not an array");
                };
                let rest = Value::Object(keywords_without(map, &[kind.keyword()]));
                return SchemaNode::Composition(CompositionSchema {
                    kind,
                    members: members.iter().map(SchemaNode::from_value).collect(),
                    base: Box::new(SchemaNode::from_value(&rest)),
                });
            }
        }

        let ty = map.get("type").and_then(Value::as_str);

        if ty == Some("object") || map.contains_key("properties") {
            return parse_object(map);
        }

        if ty == Some("array") || map.contains_key("items") {
            let items = match map.get("items") {
                None => None,
                Some(items @ (Value::Object(_) | Value::Bool(_))) => {
                    Some(Box::new(SchemaNode::from_value(items)))
                }
                Some(_) => return degrade("array items are neither a schema nor a boolean"),
            };
            return SchemaNode::Array(ArraySchema {
                items,
                keywords: keywords_without(map, &["items"]),
            });
        }

        SchemaNode::Scalar(ScalarSchema {
            keywords: map.clone(),
        })
    }

    /// Serialise back to a JSON Schema fragment.
    pub fn to_value(&self) -> Value {
        match self {
            SchemaNode::Scalar(s) => Value::Object(s.keywords.clone()),
            SchemaNode::Object(o) => {
                let mut map = o.keywords.clone();
                if !o.properties.is_empty() || o.keywords.get("type").is_none() {
                    let props: Map<String, Value> = o
                        .properties
                        .iter()
                        .map(|(name, node)| (name.clone(), node.to_value()))
                        .collect();
                    map.insert("properties".to_string(), Value::Object(props));
                }
                if let Some(required) = &o.required {
                    map.insert(
                        "required".to_string(),
                        Value::Array(required.iter().cloned().map(Value::String).collect()),
                    );
                }
                match &o.additional {
                    AdditionalProperties::Unspecified => {}
                    AdditionalProperties::Allowed(b) => {
                        map.insert("additionalProperties".to_string(), Value::Bool(*b));
                    }
                    AdditionalProperties::Schema(node) => {
                        map.insert("additionalProperties".to_string(), node.to_value());
                    }
                }
                Value::Object(map)
            }
            SchemaNode::Array(a) => {
                let mut map = a.keywords.clone();
                if let Some(items) = &a.items {
                    map.insert("items".to_string(), items.to_value());
                }
                Value::Object(map)
            }
            SchemaNode::Composition(c) => {
                let mut value = c.base.to_value();
                if let Value::Object(map) = &mut value {
                    map.insert(
                        c.kind.keyword().to_string(),
                        Value::Array(c.members.iter().map(SchemaNode::to_value).collect()),
                    );
                }
                value
            }
            SchemaNode::Reference(pointer) => {
                let mut map = Map::new();
                map.insert("$ref".to_string(), Value::String(pointer.clone()));
                Value::Object(map)
            }
        }
    }

    pub fn keywords(&self) -> Option<&Keywords> {
        match self {
            SchemaNode::Scalar(s) => Some(&s.keywords),
            SchemaNode::Object(o) => Some(&o.keywords),
            SchemaNode::Array(a) => Some(&a.keywords),
            SchemaNode::Composition(c) => c.base.keywords(),
            SchemaNode::Reference(_) => None,
        }
    }

    pub fn keywords_mut(&mut self) -> Option<&mut Keywords> {
        match self {
            SchemaNode::Scalar(s) => Some(&mut s.keywords),
            SchemaNode::Object(o) => Some(&mut o.keywords),
            SchemaNode::Array(a) => Some(&mut a.keywords),
            SchemaNode::Composition(c) => c.base.keywords_mut(),
            SchemaNode::Reference(_) => None,
        }
    }

    /// The declared `type`, inferred from shape for objects and arrays.
    pub fn declared_type(&self) -> Option<&str> {
        let explicit = self
            .keywords()
            .and_then(|k| k.get("type"))
            .and_then(Value::as_str);
        match (self, explicit) {
            (_, Some(ty)) => Some(ty),
            (SchemaNode::Object(_), None) => Some("object"),
            (SchemaNode::Array(_), None) => Some("array"),
            (SchemaNode::Composition(c), None) => c.base.declared_type(),
            _ => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.keywords()
            .and_then(|k| k.get("description"))
            .and_then(Value::as_str)
    }

    /// Append a line to `description`, creating it when absent.
    ///
    /// A reference has nowhere to hold a description, so it is left alone.
    pub fn append_description(&mut self, note: &str) {
        let Some(keywords) = self.keywords_mut() else {
            return;
        };
        let text = match keywords.get("description").and_then(Value::as_str) {
            Some(existing) if !existing.is_empty() => format!("{}\n{}", existing, note),
            _ => note.to_string(),
        };
        keywords.insert("description".to_string(), Value::String(text));
    }

    /// Enum values, when the node declares any.
    pub fn enum_values(&self) -> Option<&Vec<Value>> {
        self.keywords()
            .and_then(|k| k.get("enum"))
            .and_then(Value::as_array)
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

fn parse_object(map: &Map<String, Value>) -> SchemaNode {
    let properties = match map.get("properties") {
        None => Vec::new(),
        Some(Value::Object(props)) => props
            .iter()
            .map(|(name, schema)| (name.clone(), SchemaNode::from_value(schema)))
            .collect(),
        Some(_) => return degrade("properties is not an object"),
    };

    let required = match map.get("required") {
        None => None,
        Some(Value::Array(names)) => Some(
            names
                .iter()
                .filter_map(|n| n.as_str().map(String::from))
                .collect(),
        ),
        Some(_) => {
            tracing::debug!("ignoring non-array required list");
            None
        }
    };

    let additional = match map.get("additionalProperties") {
        None => AdditionalProperties::Unspecified,
        Some(Value::Bool(b)) => AdditionalProperties::Allowed(*b),
        Some(schema @ Value::Object(_)) => {
            AdditionalProperties::Schema(Box::new(SchemaNode::from_value(schema)))
        }
        Some(_) => AdditionalProperties::Unspecified,
    };

    SchemaNode::Object(ObjectSchema {
        properties,
        required,
        additional,
        keywords: keywords_without(map, OBJECT_KEYS),
    })
}

fn keywords_without(map: &Map<String, Value>, skip: &[&str]) -> Keywords {
    map.iter()
        .filter(|(k, _)| !skip.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn degrade(reason: &str) -> SchemaNode {
    tracing::debug!("{}, using permissive placeholder", reason);
    SchemaNode::permissive()
}
