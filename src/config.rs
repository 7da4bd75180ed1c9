//! Request configuration handed to the executor.
//!
//! Built once, before any tool is invoked, and never mutated afterwards.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use url::Url;

use crate::error::ConfigError;

/// Caller-supplied settings. None of them are parsed from the document.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    /// Extra headers sent with every request, in insertion order.
    pub headers: Vec<(String, String)>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the document's server URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send `Authorization: Basic base64(user:pass)` with every request.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Headers to send on every request, basic auth included.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidHeader` for names or values that are not
    /// valid HTTP.
    pub fn default_headers(&self) -> Result<HeaderMap, ConfigError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        if let Some(auth) = self.basic_auth_value() {
            let value = HeaderValue::from_str(&auth).map_err(|e| ConfigError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                message: e.to_string(),
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// `Basic <base64(user:pass)>` when a username is configured.
    pub fn basic_auth_value(&self) -> Option<String> {
        let username = self.username.as_deref()?;
        let password = self.password.as_deref().unwrap_or_default();
        let encoded = STANDARD.encode(format!("{}:{}", username, password));
        Some(format!("Basic {}", encoded))
    }
}

/// Pick the base URL: explicit override, else the document's first server.
///
/// Swagger 2.0 documents contribute `schemes[0]://host basePath`.
///
/// # Errors
///
/// `ConfigError::MissingBaseUrl` when neither source has one.
/// `ConfigError::RelativeBaseUrl` for a relative server URL such as
/// `/api/v3`. `ConfigError::InvalidBaseUrl` when the URL does not parse.
pub fn resolve_base_url(config: &ClientConfig, document: &Value) -> Result<Url, ConfigError> {
    let raw = config
        .base_url
        .clone()
        .filter(|u| !u.is_empty())
        .or_else(|| first_server_url(document))
        .or_else(|| swagger_base_url(document))
        .ok_or(ConfigError::MissingBaseUrl)?;

    match Url::parse(&raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Err(ConfigError::RelativeBaseUrl { url: raw }),
        Err(source) => Err(ConfigError::InvalidBaseUrl { url: raw, source }),
    }
}

fn first_server_url(document: &Value) -> Option<String> {
    document
        .get("servers")?
        .as_array()?
        .iter()
        .filter_map(|s| s.get("url").and_then(Value::as_str))
        .find(|u| !u.is_empty())
        .map(String::from)
}

fn swagger_base_url(document: &Value) -> Option<String> {
    let host = document.get("host").and_then(Value::as_str)?;
    let scheme = document
        .get("schemes")
        .and_then(Value::as_array)
        .and_then(|s| s.first())
        .and_then(Value::as_str)
        .unwrap_or("https");
    let base_path = document
        .get("basePath")
        .and_then(Value::as_str)
        .unwrap_or("");
    Some(format!("{}://{}{}", scheme, host, base_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn override_wins_over_document() {
        let doc = json!({ "servers": [{ "url": "https://api.example.com/v1" }] });
        let config = ClientConfig::new().base_url("http://localhost:8080");
        let url = resolve_base_url(&config, &doc).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn first_server_used() {
        let doc = json!({ "servers": [
            { "url": "https://api.example.com/v1" },
            { "url": "https://staging.example.com/v1" }
        ] });
        let url = resolve_base_url(&ClientConfig::new(), &doc).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1");
    }

    #[test]
    fn swagger_host_and_base_path() {
        let doc = json!({ "host": "petstore.example.com", "basePath": "/v2", "schemes": ["http"] });
        let url = resolve_base_url(&ClientConfig::new(), &doc).unwrap();
        assert_eq!(url.as_str(), "http://petstore.example.com/v2");
    }

    #[test]
    fn missing_base_url_is_fatal() {
        let result = resolve_base_url(&ClientConfig::new(), &json!({ "paths": {} }));
        assert!(matches!(result, Err(ConfigError::MissingBaseUrl)));
    }

    #[test]
    fn invalid_base_url() {
        let config = ClientConfig::new().base_url("http://[::1");
        assert!(matches!(
            resolve_base_url(&config, &json!({})),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn relative_server_url_asks_for_override() {
        let doc = json!({ "servers": [{ "url": "/api/v3" }] });
        let err = resolve_base_url(&ClientConfig::new(), &doc).unwrap_err();
        assert!(matches!(&err, ConfigError::RelativeBaseUrl { url } if url == "/api/v3"));
        assert!(err.to_string().contains("override"));
        assert_eq!(err.exit_code(), 2);

        let config = ClientConfig::new().base_url("http://localhost:8080/api/v3");
        assert!(resolve_base_url(&config, &doc).is_ok());
    }

    #[test]
    fn basic_auth_header() {
        let config = ClientConfig::new().basic_auth("user", "pass");
        assert_eq!(config.basic_auth_value().unwrap(), "Basic dXNlcjpwYXNz");
        let headers = config.default_headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn invalid_header_rejected() {
        let config = ClientConfig::new().header("bad header", "x");
        assert!(matches!(
            config.default_headers(),
            Err(ConfigError::InvalidHeader { .. })
        ));
    }
}
