//! Operation index used at execution time.
//!
//! Built once from a normalized document and read-only afterwards. Schemas
//! are stored as parsed, unresolved nodes; the request body keeps every
//! declared media type so the executor can negotiate.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::loader::navigate_fragment;
use crate::normalize::generate_operation_id;
use crate::resolver::SchemaResolver;
use crate::schema::SchemaNode;
use crate::types::{HttpMethod, Operation, Parameter, ParameterLocation, RequestBody};

/// Keywords copied from a Swagger 2.0 parameter into its synthesised schema.
const INLINE_SCHEMA_KEYS: &[&str] = &[
    "type",
    "format",
    "items",
    "enum",
    "default",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
    "multipleOf",
];

/// Operations keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: Vec<Operation>,
    by_id: HashMap<String, usize>,
}

impl OperationRegistry {
    /// Index every operation in `document`.
    ///
    /// When two operations share an identifier the first one wins.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidDocument` if the document has no `paths`.
    pub fn index(document: &Value) -> Result<Self, LoadError> {
        let mut registry = Self::default();
        for operation in extract_operations(document)? {
            if registry.by_id.contains_key(&operation.operation_id) {
                tracing::warn!(
                    operation_id = %operation.operation_id,
                    path = %operation.path,
                    "duplicate operation id, keeping the first"
                );
                continue;
            }
            registry
                .by_id
                .insert(operation.operation_id.clone(), registry.operations.len());
            registry.operations.push(operation);
        }
        tracing::info!(operations = registry.operations.len(), "indexed operations");
        Ok(registry)
    }

    pub fn get(&self, operation_id: &str) -> Option<&Operation> {
        self.by_id.get(operation_id).map(|&i| &self.operations[i])
    }

    /// Indexed operations in document order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Every operation in document order, duplicates included.
///
/// # Errors
///
/// Returns `LoadError::InvalidDocument` if the document has no `paths`.
pub fn extract_operations(document: &Value) -> Result<Vec<Operation>, LoadError> {
    let paths = document
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| LoadError::InvalidDocument {
            message: "document has no paths object".to_string(),
        })?;

    let mut operations = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            tracing::warn!(path = %path, "path item is not an object, skipping");
            continue;
        };
        let shared = item.get("parameters");

        for method in HttpMethod::ALL {
            let Some(op) = item.get(method.as_str()).and_then(Value::as_object) else {
                continue;
            };
            operations.push(build_operation(document, path, method, op, shared));
        }
    }
    Ok(operations)
}

fn build_operation(
    document: &Value,
    path: &str,
    method: HttpMethod,
    op: &Map<String, Value>,
    shared: Option<&Value>,
) -> Operation {
    let operation_id = op
        .get("operationId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .unwrap_or_else(|| generate_operation_id(method, path));

    let mut parameters = Vec::new();
    let mut body_params = Vec::new();
    let mut form_params = Vec::new();
    let declared = shared
        .into_iter()
        .chain(op.get("parameters"))
        .filter_map(Value::as_array)
        .flatten();

    for raw in declared {
        let Some(raw) = follow_ref(document, raw) else {
            continue;
        };
        match raw.get("in").and_then(Value::as_str) {
            Some("body") => body_params.push(raw),
            Some("formData") => form_params.push(raw),
            _ => {
                if let Some(param) = parse_parameter(document, raw) {
                    parameters.push(param);
                }
            }
        }
    }

    let request_body = match op.get("requestBody").and_then(|b| follow_ref(document, b)) {
        Some(body) => parse_request_body(body),
        None => swagger_body(document, op, &body_params, &form_params),
    };

    let responses = op
        .get("responses")
        .and_then(Value::as_object)
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default();

    let security = op
        .get("security")
        .or_else(|| document.get("security"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Operation {
        operation_id,
        method,
        path: path.to_string(),
        summary: string_field(op, "summary"),
        description: string_field(op, "description"),
        tags: op
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default(),
        parameters,
        request_body,
        responses,
        security,
    }
}

/// Follow a `$ref` on a parameter or body object, one level.
fn follow_ref<'a>(document: &'a Value, value: &'a Value) -> Option<&'a Value> {
    let Some(pointer) = value.get("$ref").and_then(Value::as_str) else {
        return Some(value);
    };
    match navigate_fragment(document, pointer) {
        Ok(target) => Some(target),
        Err(e) => {
            tracing::warn!(pointer, "dropping unresolvable reference: {}", e);
            None
        }
    }
}

fn parse_parameter(document: &Value, raw: &Value) -> Option<Parameter> {
    let name = raw.get("name").and_then(Value::as_str)?;
    let location_name = raw.get("in").and_then(Value::as_str).unwrap_or_default();
    let Some(location) = ParameterLocation::parse(location_name) else {
        tracing::warn!(parameter = name, location = location_name, "unknown parameter location, skipping");
        return None;
    };

    let required = raw
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(location == ParameterLocation::Path);

    let schema = match raw.get("schema") {
        Some(schema) => SchemaNode::from_value(schema),
        None => inline_schema(raw),
    };
    let value_type = SchemaResolver::new(document).declared_type(&schema);

    Some(Parameter {
        name: name.to_string(),
        location,
        required,
        description: raw
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        schema,
        value_type,
    })
}

/// Schema for a parameter that declares its type inline.
fn inline_schema(raw: &Value) -> SchemaNode {
    let Some(map) = raw.as_object() else {
        return SchemaNode::permissive();
    };
    let keywords: Map<String, Value> = map
        .iter()
        .filter(|(k, _)| INLINE_SCHEMA_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    SchemaNode::from_value(&Value::Object(keywords))
}

fn parse_request_body(body: &Value) -> Option<RequestBody> {
    let content = body
        .get("content")
        .and_then(Value::as_object)
        .map(|content| {
            content
                .iter()
                .map(|(media, entry)| {
                    let schema = entry
                        .get("schema")
                        .map(SchemaNode::from_value)
                        .unwrap_or_else(SchemaNode::permissive);
                    (media.clone(), schema)
                })
                .collect()
        })
        .unwrap_or_default();

    Some(RequestBody {
        required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
        description: body
            .get("description")
            .and_then(Value::as_str)
            .map(String::from),
        content,
    })
}

/// Request body from Swagger 2.0 `in: body` or `in: formData` parameters.
fn swagger_body(
    document: &Value,
    op: &Map<String, Value>,
    body_params: &[&Value],
    form_params: &[&Value],
) -> Option<RequestBody> {
    if let Some(param) = body_params.first() {
        let schema = param
            .get("schema")
            .map(SchemaNode::from_value)
            .unwrap_or_else(SchemaNode::permissive);
        let media = consumes(document, op, "application/json");
        return Some(RequestBody {
            required: param.get("required").and_then(Value::as_bool).unwrap_or(false),
            description: param
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            content: media.into_iter().map(|m| (m, schema.clone())).collect(),
        });
    }

    if form_params.is_empty() {
        return None;
    }

    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in form_params {
        let Some(name) = param.get("name").and_then(Value::as_str) else {
            continue;
        };
        let mut schema = inline_schema(param);
        if let Some(desc) = param.get("description").and_then(Value::as_str) {
            schema.append_description(desc);
        }
        properties.insert(name.to_string(), schema.to_value());
        if param.get("required").and_then(Value::as_bool).unwrap_or(false) {
            required.push(Value::String(name.to_string()));
        }
    }
    let any_required = !required.is_empty();
    let schema = SchemaNode::from_value(&serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    }));
    let media = consumes(document, op, "application/x-www-form-urlencoded");
    Some(RequestBody {
        required: any_required,
        description: None,
        content: media.into_iter().map(|m| (m, schema.clone())).collect(),
    })
}

fn consumes(document: &Value, op: &Map<String, Value>, fallback: &str) -> Vec<String> {
    let declared: Vec<String> = op
        .get("consumes")
        .or_else(|| document.get("consumes"))
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|m| m.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();
    if declared.is_empty() {
        vec![fallback.to_string()]
    } else {
        declared
    }
}

fn string_field(op: &Map<String, Value>, key: &str) -> Option<String> {
    op.get(key).and_then(Value::as_str).map(String::from)
}
