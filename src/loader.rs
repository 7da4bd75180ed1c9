//! Document loading from files, strings, and HTTP URLs.
//!
//! Documents may be JSON or YAML; both decode into a `serde_json::Value`.

use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for fetching a document (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a document from a file path.
///
/// `.yaml`/`.yml` files are decoded as YAML. Anything else is tried as JSON
/// first, then YAML.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or a parse
/// error if the content is neither JSON nor YAML.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    if is_yaml_path(path) {
        return parse_yaml(&content);
    }
    load_document_str(&content)
}

/// Load a document from a JSON or YAML string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` when the content looks like JSON but
/// doesn't parse, otherwise `LoadError::InvalidYaml`.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    match serde_json::from_str(content) {
        Ok(value) => Ok(value),
        Err(source) if content.trim_start().starts_with(['{', '[']) => {
            Err(LoadError::InvalidJson { source })
        }
        Err(_) => parse_yaml(content),
    }
}

/// Load a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, or a parse error
/// if the body isn't a JSON or YAML document.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(network)?;

    let body = response.text().map_err(network)?;
    load_document_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path or URL.
///
/// URL loading requires the `remote` feature.
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Navigate an internal pointer (e.g. `#/components/schemas/Pet`).
///
/// The pointer must start with `#`. `~1` and `~0` are unescaped per RFC 6901.
pub fn navigate_fragment<'a>(root: &'a Value, fragment: &str) -> Result<&'a Value, LoadError> {
    let not_found = || LoadError::PointerNotFound {
        pointer: fragment.to_string(),
    };

    let path = fragment
        .strip_prefix('#')
        .ok_or_else(not_found)?
        .trim_start_matches('/');
    if path.is_empty() {
        return Ok(root);
    }

    let mut current = root;
    for part in path.split('/') {
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&key),
            Value::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
            _ => None,
        }
        .ok_or_else(not_found)?;
    }
    Ok(current)
}

fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

fn parse_yaml(content: &str) -> Result<Value, LoadError> {
    serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })
}
