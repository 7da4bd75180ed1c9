//! Tool contract generation from indexed operations.

use std::cmp::Ordering;

use serde_json::{json, Map, Value};

use crate::resolver::{PathStack, SchemaResolver};
use crate::schema::SchemaNode;
use crate::types::{Operation, ToolContract};

/// Name of the input property carrying the request body.
pub const BODY_PROPERTY: &str = "body";

/// Builds one [`ToolContract`] per operation.
#[derive(Debug, Clone, Copy)]
pub struct ToolSchemaBuilder<'a> {
    resolver: SchemaResolver<'a>,
}

impl<'a> ToolSchemaBuilder<'a> {
    /// Builder resolving references against `document`.
    pub fn new(document: &'a Value) -> Self {
        Self {
            resolver: SchemaResolver::new(document),
        }
    }

    pub fn with_resolver(resolver: SchemaResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Build the contract for `operation`. Never fails; schemas that cannot
    /// be interpreted come out permissive.
    pub fn build(&self, operation: &Operation) -> ToolContract {
        ToolContract {
            name: operation.operation_id.clone(),
            description: format_description(operation),
            input_schema: self.input_schema(operation),
        }
    }

    fn input_schema(&self, operation: &Operation) -> Value {
        let mut properties = Map::new();
        let mut required: Vec<String> = Vec::new();

        for param in operation.parameters.iter().filter(|p| p.location.is_exposed()) {
            if properties.contains_key(&param.name) {
                tracing::debug!(
                    operation = %operation.operation_id,
                    parameter = %param.name,
                    "parameter name already used by another location"
                );
            } else {
                let mut schema = self.resolver.resolve(&param.schema, PathStack::new());
                if let Some(desc) = param.description.as_deref().filter(|d| !d.is_empty()) {
                    schema.append_description(desc);
                }
                properties.insert(param.name.clone(), schema.to_value());
            }

            if param.required && !required.contains(&param.name) {
                required.push(param.name.clone());
            }
        }

        if let Some(body) = &operation.request_body {
            let mut schema = body
                .preferred_media_type()
                .and_then(|media| body.schema_for(media))
                .map(|node| self.resolver.resolve(node, PathStack::new()))
                .unwrap_or_else(SchemaNode::permissive);

            if let Some(desc) = body.description.as_deref().filter(|d| !d.is_empty()) {
                schema.append_description(desc);
            }
            if body.content.len() > 1 {
                let mut media: Vec<&str> = body.media_types().collect();
                media.sort_unstable();
                schema.append_description(&format!("Content types: {}", media.join(", ")));
            }

            properties.insert(BODY_PROPERTY.to_string(), schema.to_value());
            if body.required && !required.iter().any(|r| r == BODY_PROPERTY) {
                required.push(BODY_PROPERTY.to_string());
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

/// `"<summary>. <description>"`, then `Tags:` and `Returns:` lines.
///
/// With neither summary nor description the method and path stand in.
pub fn format_description(operation: &Operation) -> String {
    let summary = operation.summary.as_deref().filter(|s| !s.is_empty());
    let detail = operation.description.as_deref().filter(|s| !s.is_empty());

    let mut text = match (summary, detail) {
        (Some(s), Some(d)) => format!("{}. {}", s, d),
        (Some(s), None) => s.to_string(),
        (None, Some(d)) => d.to_string(),
        (None, None) => format!("{} {}", operation.method.as_upper(), operation.path),
    };

    if !operation.tags.is_empty() {
        text.push_str("\nTags: ");
        text.push_str(&operation.tags.join(", "));
    }

    if !operation.responses.is_empty() {
        text.push_str("\nReturns: ");
        text.push_str(&sort_response_codes(&operation.responses).join(", "));
    }

    text
}

/// Ascending order: numeric codes by value, then everything else lexically.
pub fn sort_response_codes(codes: &[String]) -> Vec<String> {
    let mut sorted = codes.to_vec();
    sorted.sort_by(|a, b| compare_codes(a, b));
    sorted
}

fn compare_codes(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}
