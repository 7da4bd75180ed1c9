//! Core types shared by the registry, tool builder, and executor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::SchemaNode;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The HTTP verbs an operation may be declared under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl HttpMethod {
    /// Every verb, in the order path items are scanned.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    /// Lower-case key used in path items.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }

    pub fn as_upper(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Parse a method name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

/// Where a parameter travels in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }

    /// Whether parameters here become tool input properties.
    pub fn is_exposed(&self) -> bool {
        !matches!(self, ParameterLocation::Cookie)
    }
}

/// A declared request parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub description: Option<String>,
    pub schema: SchemaNode,
    /// Type of `schema` with references followed; drives coercion.
    pub value_type: Option<String>,
}

/// Request body descriptor: media type to schema, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    pub description: Option<String>,
    pub content: Vec<(String, SchemaNode)>,
}

/// Media types tried, in order, when the caller sets no content type.
pub const CONTENT_TYPE_PREFERENCE: [&str; 5] = [
    "application/json",
    "application/xml",
    "text/xml",
    "application/x-www-form-urlencoded",
    "multipart/form-data",
];

impl RequestBody {
    pub fn media_types(&self) -> impl Iterator<Item = &str> {
        self.content.iter().map(|(media, _)| media.as_str())
    }

    /// First preferred media type that is declared, else the first declared.
    pub fn preferred_media_type(&self) -> Option<&str> {
        CONTENT_TYPE_PREFERENCE
            .iter()
            .find_map(|preferred| self.media_types().find(|m| m == preferred))
            .or_else(|| self.media_types().next())
    }

    pub fn schema_for(&self, media_type: &str) -> Option<&SchemaNode> {
        self.content
            .iter()
            .find(|(media, _)| media == media_type)
            .map(|(_, schema)| schema)
    }
}

/// One operation from a normalized document. Immutable once indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operation_id: String,
    pub method: HttpMethod,
    /// Path template with `{name}` placeholders.
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Path-item parameters first, then operation parameters.
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    /// Response status keys as declared.
    pub responses: Vec<String>,
    pub security: Vec<Value>,
}

/// The externally exposed contract for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolContract {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolContract {
    /// Names listed in the input schema's `required` array.
    pub fn required(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Read-only side index entry, keyed by tool name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetadata {
    pub operation_id: String,
    /// Upper-cased HTTP method.
    pub method: String,
    pub path: String,
    pub tags: Vec<String>,
    pub security: Vec<Value>,
}

impl From<&Operation> for ToolMetadata {
    fn from(op: &Operation) -> Self {
        Self {
            operation_id: op.operation_id.clone(),
            method: op.method.as_upper().to_string(),
            path: op.path.clone(),
            tags: op.tags.clone(),
            security: op.security.clone(),
        }
    }
}
