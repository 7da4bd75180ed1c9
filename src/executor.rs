//! Maps tool arguments back onto an HTTP request and performs it.
//!
//! Preparation is pure: missing arguments, coercion failures, and body
//! encoding problems are all reported before any network I/O. Exactly one
//! request is sent per invocation and it is never retried.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Map, Value};
use url::{form_urlencoded, Url};

use crate::builder::BODY_PROPERTY;
use crate::config::ClientConfig;
use crate::error::{ArgumentIssue, ConfigError, ExecuteError, MissingParameter, TransportError};
use crate::registry::OperationRegistry;
use crate::types::{json_type_name, HttpMethod, Operation, ParameterLocation};

/// Used when a body is sent but the operation declares no media type.
const FALLBACK_CONTENT_TYPE: &str = "application/json";

/// Successful upstream response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub status: u16,
    pub status_text: String,
    pub headers: Map<String, Value>,
    /// Body parsed as JSON when it parses, otherwise the raw text.
    pub data: Value,
    pub url: String,
    pub method: String,
}

/// A fully assembled request, ready to send.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl PreparedRequest {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

/// Executes operations from a registry against one base URL.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    registry: OperationRegistry,
    base_url: Url,
    default_headers: HeaderMap,
    client: Client,
}

impl RequestExecutor {
    /// # Errors
    ///
    /// Returns a `ConfigError` for unusable headers, a base URL that cannot
    /// take a path, or an HTTP client that fails to build.
    pub fn new(
        registry: OperationRegistry,
        base_url: Url,
        config: &ClientConfig,
    ) -> Result<Self, ConfigError> {
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::BaseUrlWithoutPath {
                url: base_url.to_string(),
            });
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|source| ConfigError::Client { source })?;

        Ok(Self {
            registry,
            base_url,
            default_headers: config.default_headers()?,
            client,
        })
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Prepare and send one request.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown identifier, `MissingParameters` or
    /// `InvalidArguments` before any I/O, `Transport` for non-2xx responses
    /// and network failures.
    pub fn execute(&self, operation_id: &str, args: &Value) -> Result<ExecutionResult, ExecuteError> {
        let prepared = self.prepare(operation_id, args)?;
        self.send(prepared)
    }

    /// Assemble the request for `operation_id` without sending it.
    pub fn prepare(&self, operation_id: &str, args: &Value) -> Result<PreparedRequest, ExecuteError> {
        let operation = self
            .registry
            .get(operation_id)
            .ok_or_else(|| ExecuteError::NotFound {
                name: operation_id.to_string(),
            })?;

        let empty = Map::new();
        let args = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ExecuteError::InvalidArguments {
                    issues: vec![ArgumentIssue {
                        name: "arguments".to_string(),
                        location: "body".to_string(),
                        message: format!("expected an object, got {}", json_type_name(other)),
                    }],
                })
            }
        };

        check_required(operation, args)?;

        let mut issues = Vec::new();
        let mut path_values: Vec<(&str, String)> = Vec::new();
        let mut query: Vec<(&str, String)> = Vec::new();
        let mut headers = self.default_headers.clone();

        for param in operation.parameters.iter().filter(|p| p.location.is_exposed()) {
            let Some(raw) = present(args, &param.name) else {
                continue;
            };
            let value = match coerce_value(raw, param.value_type.as_deref()) {
                Ok(v) => v,
                Err(message) => {
                    issues.push(issue(&param.name, param.location.as_str(), message));
                    continue;
                }
            };

            match param.location {
                ParameterLocation::Path => {
                    path_values.push((param.name.as_str(), wire_string(&value)))
                }
                ParameterLocation::Query => match &value {
                    Value::Array(items) => {
                        query.extend(items.iter().map(|item| (param.name.as_str(), wire_string(item))))
                    }
                    other => query.push((param.name.as_str(), wire_string(other))),
                },
                ParameterLocation::Header => {
                    match header_pair(&param.name, &wire_string(&value)) {
                        Ok((name, value)) => {
                            headers.insert(name, value);
                        }
                        Err(message) => issues.push(issue(&param.name, "header", message)),
                    }
                }
                ParameterLocation::Cookie => {}
            }
        }

        let mut body = None;
        if let (Some(request_body), Some(payload)) =
            (&operation.request_body, present(args, BODY_PROPERTY))
        {
            // An explicit Content-Type from the caller is never overridden.
            let content_type = match headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
                Some(explicit) => explicit.to_string(),
                None => request_body
                    .preferred_media_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string(),
            };

            match encode_body(&content_type, payload) {
                Ok(encoded) => {
                    if !headers.contains_key(CONTENT_TYPE) {
                        match HeaderValue::from_str(&content_type) {
                            Ok(value) => {
                                headers.insert(CONTENT_TYPE, value);
                            }
                            Err(e) => issues.push(issue(BODY_PROPERTY, "body", e.to_string())),
                        }
                    }
                    body = Some(encoded);
                }
                Err(message) => issues.push(issue(BODY_PROPERTY, "body", message)),
            }
        }

        if !issues.is_empty() {
            return Err(ExecuteError::InvalidArguments { issues });
        }

        let url = self.build_url(&operation.path, &path_values, &query);
        Ok(PreparedRequest {
            method: operation.method,
            url,
            headers,
            body,
        })
    }

    fn build_url(&self, template: &str, path_values: &[(&str, String)], query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            let relative = template.strip_prefix('/').unwrap_or(template);
            if !relative.is_empty() {
                for segment in relative.split('/') {
                    segments.push(&substitute(segment, path_values));
                }
            }
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        url
    }

    /// Send a prepared request and normalize the outcome.
    pub fn send(&self, prepared: PreparedRequest) -> Result<ExecutionResult, ExecuteError> {
        let method = prepared.method.as_upper().to_string();
        let url = prepared.url.to_string();
        tracing::debug!(%method, %url, "sending request");

        let mut request = self
            .client
            .request(prepared.method.into(), prepared.url)
            .headers(prepared.headers);
        if let Some(body) = prepared.body {
            tracing::debug!("request body ({} bytes):\n{}", body.len(), body);
            request = request.body(body);
        }

        let transport_failure = |e: reqwest::Error| {
            ExecuteError::from(TransportError {
                status: e.status().map(|s| s.as_u16()),
                status_text: String::new(),
                body: Value::Null,
                method: method.clone(),
                url: url.clone(),
                message: e.to_string(),
            })
        };

        let response = request.send().map_err(transport_failure)?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let headers = response_headers(response.headers());
        let text = response.text().map_err(transport_failure)?;
        tracing::debug!(status = status.as_u16(), "response ({} bytes):\n{}", text.len(), text);
        let data = parse_body(text);

        if !status.is_success() {
            return Err(TransportError {
                status: Some(status.as_u16()),
                status_text,
                body: data,
                method,
                url,
                message: format!("upstream returned {}", status),
            }
            .into());
        }

        Ok(ExecutionResult {
            status: status.as_u16(),
            status_text,
            headers,
            data,
            url,
            method,
        })
    }
}

/// Fail with every missing required argument at once.
fn check_required(operation: &Operation, args: &Map<String, Value>) -> Result<(), ExecuteError> {
    let mut missing: Vec<MissingParameter> = operation
        .parameters
        .iter()
        .filter(|p| p.location.is_exposed() && p.required && present(args, &p.name).is_none())
        .map(|p| MissingParameter::new(&p.name, p.location))
        .collect();

    if let Some(body) = &operation.request_body {
        if body.required && present(args, BODY_PROPERTY).is_none() {
            missing.push(MissingParameter::body());
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ExecuteError::MissingParameters { missing })
    }
}

fn present<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

fn issue(name: &str, location: &str, message: String) -> ArgumentIssue {
    ArgumentIssue {
        name: name.to_string(),
        location: location.to_string(),
        message,
    }
}

/// Coerce an argument to its declared scalar type.
///
/// Numbers parse from strings, booleans accept `"true"`/`"false"` in any
/// case, arrays accept a JSON list or a comma-separated string, and anything
/// else is stringified.
pub fn coerce_value(value: &Value, declared_type: Option<&str>) -> Result<Value, String> {
    let fail = |ty: &str| format!("cannot convert {} to {}", value, ty);
    match declared_type {
        Some(ty @ ("integer" | "number")) => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => parse_number(s.trim()).ok_or_else(|| fail(ty)),
            _ => Err(fail(ty)),
        },
        Some("boolean") => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(fail("boolean")),
        },
        Some("array") => match value {
            Value::Array(_) => Ok(value.clone()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(list @ Value::Array(_)) => Ok(list),
                _ => Ok(Value::Array(
                    s.split(',')
                        .map(|token| Value::String(token.trim().to_string()))
                        .collect(),
                )),
            },
            other => Ok(Value::Array(vec![other.clone()])),
        },
        _ => Ok(Value::String(wire_string(value))),
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if s.is_empty() {
        return None;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(Value::from(n));
    }
    s.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

/// Text form of a value on the wire. Arrays are comma-joined.
pub fn wire_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(wire_string).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Replace `{name}` placeholders in one left-to-right pass. Substituted text is
/// never rescanned; unknown placeholders stay literal.
fn substitute(segment: &str, path_values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut rest = segment;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rest = &rest[open..];
            break;
        };
        let name = &after[..close];
        match path_values.iter().find(|(n, _)| *n == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), String> {
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| e.to_string())?;
    let value = HeaderValue::from_str(value).map_err(|e| e.to_string())?;
    Ok((name, value))
}

/// Encode the body payload for `content_type`.
///
/// JSON parses string payloads and serializes objects; form-urlencoded
/// flattens an object into `key=value&...`; anything else passes through.
pub fn encode_body(content_type: &str, payload: &Value) -> Result<String, String> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "application/json" || essence.ends_with("+json") {
        return match payload {
            Value::String(s) => serde_json::from_str::<Value>(s)
                .map(|v| v.to_string())
                .map_err(|e| format!("body is not valid JSON: {}", e)),
            other => Ok(other.to_string()),
        };
    }

    if essence == "application/x-www-form-urlencoded" {
        if let Value::Object(fields) = payload {
            let mut form = form_urlencoded::Serializer::new(String::new());
            for (key, value) in fields {
                form.append_pair(key, &wire_string(value));
            }
            return Ok(form.finish());
        }
    }

    Ok(match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn response_headers(headers: &HeaderMap) -> Map<String, Value> {
    let mut out = Map::new();
    for (name, value) in headers {
        let Ok(text) = value.to_str() else {
            continue;
        };
        match out.get_mut(name.as_str()) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(text);
            }
            _ => {
                out.insert(name.as_str().to_string(), Value::String(text.to_string()));
            }
        }
    }
    out
}

fn parse_body(text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
