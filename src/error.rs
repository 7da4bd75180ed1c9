//! Error types for document loading, configuration, and tool execution.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::ParameterLocation;

/// Errors while loading or structurally checking an API document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid document: {message}")]
    InvalidDocument { message: String },

    #[error("pointer not found: {pointer}")]
    PointerNotFound { pointer: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Fatal initialization errors. No tool is usable after one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no base URL: pass an override or declare a server in the document")]
    MissingBaseUrl,

    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("server URL '{url}' is relative: pass an absolute base URL override")]
    RelativeBaseUrl { url: String },

    #[error("base URL '{url}' cannot carry a path")]
    BaseUrlWithoutPath { url: String },

    #[error("invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },

    #[error("cannot build HTTP client: {source}")]
    Client {
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Document(#[from] LoadError),
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::Document(e) => e.exit_code(),
            _ => 2,
        }
    }
}

/// A required argument the caller did not supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingParameter {
    pub name: String,
    /// `path`, `query`, `header`, `cookie`, or `body`.
    pub location: String,
}

impl MissingParameter {
    pub fn new(name: impl Into<String>, location: ParameterLocation) -> Self {
        Self {
            name: name.into(),
            location: location.as_str().to_string(),
        }
    }

    pub fn body() -> Self {
        Self {
            name: "body".to_string(),
            location: "body".to_string(),
        }
    }
}

impl fmt::Display for MissingParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.location)
    }
}

/// A supplied argument that cannot be turned into its wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArgumentIssue {
    pub name: String,
    pub location: String,
    pub message: String,
}

impl fmt::Display for ArgumentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.location, self.message)
    }
}

/// Upstream failure: non-2xx status or a request that never completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportError {
    /// HTTP status, absent when no response was received.
    pub status: Option<u16>,
    pub status_text: String,
    /// Response body, parsed as JSON when possible.
    pub body: Value,
    pub method: String,
    pub url: String,
    pub message: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{} {} failed with status {} {}",
                self.method, self.url, status, self.status_text
            ),
            None => write!(f, "{} {} failed: {}", self.method, self.url, self.message),
        }
    }
}

/// Errors returned per tool invocation. All of them are recoverable.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("unknown tool: {name}")]
    NotFound { name: String },

    #[error("missing required parameters: {}", join_display(missing))]
    MissingParameters { missing: Vec<MissingParameter> },

    #[error("invalid arguments: {}", join_display(issues))]
    InvalidArguments { issues: Vec<ArgumentIssue> },

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error("{0}")]
    Transport(Box<TransportError>),
}

impl ExecuteError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecuteError::NotFound { .. } => 2,
            ExecuteError::MissingParameters { .. } | ExecuteError::InvalidArguments { .. } => 1,
            ExecuteError::Validate(e) => e.exit_code(),
            ExecuteError::Transport(_) => 4,
        }
    }

    /// Structured form for callers that report errors as data.
    pub fn to_json(&self) -> Value {
        match self {
            ExecuteError::NotFound { name } => serde_json::json!({
                "error": "not_found",
                "message": self.to_string(),
                "tool": name,
            }),
            ExecuteError::MissingParameters { missing } => serde_json::json!({
                "error": "validation",
                "message": self.to_string(),
                "missing": missing,
            }),
            ExecuteError::InvalidArguments { issues } => serde_json::json!({
                "error": "validation",
                "message": self.to_string(),
                "issues": issues,
            }),
            ExecuteError::Validate(ValidateError::Invalid { errors }) => serde_json::json!({
                "error": "validation",
                "message": self.to_string(),
                "errors": errors,
            }),
            ExecuteError::Validate(ValidateError::InvalidSchema { message }) => serde_json::json!({
                "error": "schema",
                "message": message,
            }),
            ExecuteError::Transport(transport) => serde_json::json!({
                "error": "transport",
                "message": self.to_string(),
                "status": transport.status,
                "statusText": transport.status_text,
                "body": transport.body,
                "method": transport.method,
                "url": transport.url,
            }),
        }
    }
}

impl From<TransportError> for ExecuteError {
    fn from(err: TransportError) -> Self {
        ExecuteError::Transport(Box::new(err))
    }
}

/// Errors from validating arguments against a tool's input schema.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("input schema does not compile: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::InvalidSchema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// Single validation error with path context.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
