//! Schema resolution - expands `$ref` pointers into finite, self-contained trees.

use serde_json::Value;

use crate::loader::navigate_fragment;
use crate::schema::{
    AdditionalProperties, ArraySchema, CompositionKind, CompositionSchema, Keywords, ObjectSchema,
    ScalarSchema, SchemaNode,
};

/// Nesting bound applied on top of cycle detection.
pub const DEFAULT_MAX_DEPTH: usize = 24;

/// Pointers currently being expanded, plus the nesting depth reached.
///
/// Passed by value down the recursion: entering a reference produces a new
/// stack, so siblings never see each other's pointers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathStack {
    pointers: Vec<String>,
    depth: usize,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, pointer: &str) -> bool {
        self.pointers.iter().any(|p| p == pointer)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn pointers(&self) -> &[String] {
        &self.pointers
    }

    fn enter(&self, pointer: &str) -> Self {
        let mut next = self.descend();
        next.pointers.push(pointer.to_string());
        next
    }

    fn descend(&self) -> Self {
        Self {
            pointers: self.pointers.clone(),
            depth: self.depth + 1,
        }
    }
}

/// Resolves schema fragments against one document's definitions.
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    document: &'a Value,
    max_depth: usize,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(document: &'a Value) -> Self {
        Self {
            document,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse and resolve a raw fragment from a fresh stack.
    pub fn resolve_value(&self, schema: &Value) -> Value {
        self.resolve(&SchemaNode::from_value(schema), PathStack::new())
            .to_value()
    }

    /// Resolve `schema`, expanding every reference.
    ///
    /// A pointer already on `stack` yields a terminal stub holding only the
    /// target's type and property names. Past the depth bound every node is
    /// cut down the same way. Enum and composition descriptions are extended.
    /// Never fails: unknown pointers become the permissive placeholder.
    pub fn resolve(&self, schema: &SchemaNode, stack: PathStack) -> SchemaNode {
        if stack.depth() >= self.max_depth {
            tracing::debug!(depth = stack.depth(), "schema depth bound reached");
            return match schema {
                SchemaNode::Reference(pointer) => self.stub_for(pointer),
                other => shallow(other),
            };
        }

        let mut resolved = match schema {
            SchemaNode::Reference(pointer) => return self.resolve_reference(pointer, stack),
            SchemaNode::Scalar(s) => SchemaNode::Scalar(s.clone()),
            SchemaNode::Object(o) => {
                let child = stack.descend();
                SchemaNode::Object(ObjectSchema {
                    properties: o
                        .properties
                        .iter()
                        .map(|(name, node)| (name.clone(), self.resolve(node, child.clone())))
                        .collect(),
                    required: o.required.clone(),
                    additional: match &o.additional {
                        AdditionalProperties::Schema(node) => {
                            AdditionalProperties::Schema(Box::new(self.resolve(node, child)))
                        }
                        other => other.clone(),
                    },
                    keywords: o.keywords.clone(),
                })
            }
            SchemaNode::Array(a) => SchemaNode::Array(ArraySchema {
                items: a
                    .items
                    .as_ref()
                    .map(|items| Box::new(self.resolve(items, stack.descend()))),
                keywords: a.keywords.clone(),
            }),
            SchemaNode::Composition(c) => {
                let child = stack.descend();
                // The siblings share this level; their enum note is added there.
                let base = self.resolve(&c.base, stack);
                let mut node = SchemaNode::Composition(CompositionSchema {
                    kind: c.kind,
                    members: c
                        .members
                        .iter()
                        .map(|m| self.resolve(m, child.clone()))
                        .collect(),
                    base: Box::new(base),
                });
                node.append_description(&format!("Schema is {}", c.kind.describe(c.members.len())));
                return node;
            }
        };

        describe_enum(&mut resolved);
        resolved
    }

    /// The type `schema` declares once references are followed.
    ///
    /// An `allOf` without its own type takes the first member type found.
    /// Cycles and unknown pointers give `None`.
    pub fn declared_type(&self, schema: &SchemaNode) -> Option<String> {
        self.type_of(schema, PathStack::new())
    }

    fn type_of(&self, schema: &SchemaNode, stack: PathStack) -> Option<String> {
        if stack.depth() >= self.max_depth {
            return None;
        }
        match schema {
            SchemaNode::Reference(pointer) => {
                if stack.contains(pointer) {
                    return None;
                }
                let target = self.lookup(pointer)?;
                self.type_of(&target, stack.enter(pointer))
            }
            SchemaNode::Composition(c)
                if c.kind == CompositionKind::AllOf && schema.declared_type().is_none() =>
            {
                c.members
                    .iter()
                    .find_map(|m| self.type_of(m, stack.descend()))
            }
            other => other.declared_type().map(String::from),
        }
    }

    fn resolve_reference(&self, pointer: &str, stack: PathStack) -> SchemaNode {
        let Some(target) = self.lookup(pointer) else {
            return SchemaNode::permissive_with(format!("Unresolved reference: {}", pointer));
        };
        if stack.contains(pointer) {
            tracing::debug!(pointer, "reference cycle, emitting stub");
            return stub(pointer, &target);
        }
        self.resolve(&target, stack.enter(pointer))
    }

    fn stub_for(&self, pointer: &str) -> SchemaNode {
        match self.lookup(pointer) {
            Some(target) => stub(pointer, &target),
            None => SchemaNode::permissive_with(format!("Unresolved reference: {}", pointer)),
        }
    }

    fn lookup(&self, pointer: &str) -> Option<SchemaNode> {
        match navigate_fragment(self.document, pointer) {
            Ok(target) => Some(SchemaNode::from_value(target)),
            Err(e) => {
                tracing::debug!(pointer, "cannot follow reference: {}", e);
                None
            }
        }
    }
}

/// Terminal stub for a reference that would recurse.
fn stub(pointer: &str, target: &SchemaNode) -> SchemaNode {
    let mut node = shallow(target);
    node.append_description(&format!("Circular reference to {}", reference_name(pointer)));
    node
}

/// Type and property names only; nothing below the first level.
fn shallow(node: &SchemaNode) -> SchemaNode {
    match node {
        SchemaNode::Reference(_) => SchemaNode::permissive(),
        SchemaNode::Object(o) => SchemaNode::Object(ObjectSchema {
            properties: o
                .properties
                .iter()
                .map(|(name, child)| (name.clone(), type_only(child)))
                .collect(),
            required: None,
            additional: AdditionalProperties::Unspecified,
            keywords: type_keyword(node),
        }),
        other => type_only(other),
    }
}

fn type_only(node: &SchemaNode) -> SchemaNode {
    match node {
        SchemaNode::Reference(_) => SchemaNode::permissive(),
        other => SchemaNode::Scalar(ScalarSchema {
            keywords: type_keyword(other),
        }),
    }
}

fn type_keyword(node: &SchemaNode) -> Keywords {
    let mut keywords = Keywords::new();
    if let Some(ty) = node.declared_type() {
        keywords.insert("type".to_string(), Value::String(ty.to_string()));
    }
    keywords
}

/// Last pointer segment, e.g. `Pet` for `#/components/schemas/Pet`.
pub fn reference_name(pointer: &str) -> &str {
    pointer.rsplit('/').next().unwrap_or(pointer)
}

fn describe_enum(node: &mut SchemaNode) {
    let Some(values) = node.enum_values() else {
        return;
    };
    let listed = values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ");
    node.append_description(&format!("Allowed values: {}", listed));
}
