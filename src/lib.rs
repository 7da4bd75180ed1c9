//! OpenAPI Tools
//!
//! Turns an OpenAPI 3.x or Swagger 2.0 document into a set of callable tool
//! contracts, and executes tool calls as HTTP requests.
//!
//! Each operation in the document becomes one tool: a name, a description,
//! and a self-contained JSON Schema for its arguments. `$ref` pointers are
//! expanded inline; cycles are cut with a typed stub so every schema is
//! finite.
//!
//! # Example
//!
//! ```
//! use openapi_tools::{ClientConfig, ToolSet};
//! use serde_json::json;
//!
//! let document = json!({
//!     "openapi": "3.0.0",
//!     "servers": [{ "url": "https://api.example.com/v1" }],
//!     "paths": {
//!         "/pets/{petId}": {
//!             "get": {
//!                 "operationId": "getPet",
//!                 "summary": "Get a pet",
//!                 "parameters": [
//!                     { "name": "petId", "in": "path", "required": true,
//!                       "schema": { "type": "integer" } }
//!                 ]
//!             }
//!         }
//!     }
//! });
//!
//! let tools = ToolSet::from_document(document, &ClientConfig::new()).unwrap();
//! let tool = tools.tool("getPet").unwrap();
//!
//! assert_eq!(tool.input_schema["properties"]["petId"]["type"], "integer");
//! assert_eq!(tool.input_schema["required"], json!(["petId"]));
//! ```
//!
//! # Argument Mapping
//!
//! | Parameter `in` | Request placement |
//! |----------------|-------------------|
//! | `path` | Substituted into the path template, percent-encoded |
//! | `query` | Query string; arrays repeat the key |
//! | `header` | Request header; arrays are comma-joined |
//! | `cookie` | Not exposed |
//! | request body | The `body` argument, encoded per content type |
//!
//! # Features
//!
//! - `remote` (default): loading documents from `http(s)://` URLs through
//!   `load_document_url` and `load_document_auto`. Without it a URL source is
//!   rejected as a missing file. Tool execution always uses the HTTP client and
//!   does not depend on this feature.

mod builder;
mod config;
mod error;
mod executor;
mod linter;
mod loader;
mod normalize;
mod registry;
mod resolver;
mod schema;
mod toolset;
mod types;
mod validator;

pub use builder::{format_description, sort_response_codes, ToolSchemaBuilder, BODY_PROPERTY};
pub use config::{resolve_base_url, ClientConfig};
pub use error::{
    ArgumentIssue, ConfigError, ExecuteError, LoadError, MissingParameter, SchemaError,
    TransportError, ValidateError,
};
pub use executor::{
    coerce_value, encode_body, wire_string, ExecutionResult, PreparedRequest, RequestExecutor,
};
pub use linter::{
    lint, lint_document, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity,
};
pub use loader::{
    is_url, load_document, load_document_auto, load_document_str, navigate_fragment,
};
pub use normalize::{generate_operation_id, normalize, DEFAULT_RESPONSE_DESCRIPTION};
pub use registry::{extract_operations, OperationRegistry};
pub use resolver::{reference_name, PathStack, SchemaResolver, DEFAULT_MAX_DEPTH};
pub use schema::{
    AdditionalProperties, ArraySchema, CompositionKind, CompositionSchema, Keywords, ObjectSchema,
    ScalarSchema, SchemaNode,
};
pub use toolset::{ToolCallOutput, ToolSet};
pub use types::{
    json_type_name, HttpMethod, Operation, Parameter, ParameterLocation, RequestBody,
    ToolContract, ToolMetadata, CONTENT_TYPE_PREFERENCE,
};
pub use validator::{check_input_schema, validate_against_schema, validate_arguments};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
