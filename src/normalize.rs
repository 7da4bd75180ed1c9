//! Fill in missing operation identifiers and responses in place.

use serde_json::{json, Value};

use crate::error::LoadError;
use crate::types::HttpMethod;

/// Description used for the response inserted when an operation has none.
pub const DEFAULT_RESPONSE_DESCRIPTION: &str = "Successful response";

/// Normalize a document so every operation has an `operationId` and a
/// non-empty `responses` map.
///
/// Running it again on a normalized document changes nothing.
///
/// # Errors
///
/// Returns `LoadError::InvalidDocument` if the document has no `paths` object.
pub fn normalize(document: &mut Value) -> Result<(), LoadError> {
    let paths = document
        .get_mut("paths")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| LoadError::InvalidDocument {
            message: "document has no paths object".to_string(),
        })?;

    for (path, item) in paths.iter_mut() {
        let Some(item) = item.as_object_mut() else {
            continue;
        };
        for method in HttpMethod::ALL {
            let Some(operation) = item.get_mut(method.as_str()).and_then(Value::as_object_mut)
            else {
                continue;
            };

            let has_id = operation
                .get("operationId")
                .and_then(Value::as_str)
                .is_some_and(|id| !id.is_empty());
            if !has_id {
                let id = generate_operation_id(method, path);
                tracing::debug!(operation_id = %id, "generated operation id");
                operation.insert("operationId".to_string(), Value::String(id));
            }

            let has_responses = operation
                .get("responses")
                .and_then(Value::as_object)
                .is_some_and(|r| !r.is_empty());
            if !has_responses {
                operation.insert(
                    "responses".to_string(),
                    json!({ "200": { "description": DEFAULT_RESPONSE_DESCRIPTION } }),
                );
            }
        }
    }

    Ok(())
}

/// Deterministic identifier for an operation without one.
///
/// The lower-cased method, an underscore, then the path with every
/// non-alphanumeric character replaced by an underscore:
/// `get /api/v1/complex-path/{id}` becomes `get__api_v1_complex_path__id_`.
pub fn generate_operation_id(method: HttpMethod, path: &str) -> String {
    let sanitized: String = path
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}", method.as_str(), sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_matches_known_example() {
        assert_eq!(
            generate_operation_id(HttpMethod::Get, "/api/v1/complex-path/{id}"),
            "get__api_v1_complex_path__id_"
        );
        assert_eq!(generate_operation_id(HttpMethod::Post, "/pets"), "post__pets");
    }

    #[test]
    fn fills_missing_id_and_responses() {
        let mut doc = json!({
            "paths": {
                "/pets/{petId}": {
                    "parameters": [],
                    "get": { "summary": "Get a pet" },
                    "delete": { "operationId": "", "responses": {} }
                }
            }
        });
        normalize(&mut doc).unwrap();

        let get = &doc["paths"]["/pets/{petId}"]["get"];
        assert_eq!(get["operationId"], "get__pets__petId_");
        assert_eq!(get["responses"]["200"]["description"], DEFAULT_RESPONSE_DESCRIPTION);

        let delete = &doc["paths"]["/pets/{petId}"]["delete"];
        assert_eq!(delete["operationId"], "delete__pets__petId_");
        assert!(delete["responses"].get("200").is_some());
    }

    #[test]
    fn keeps_existing_values() {
        let mut doc = json!({
            "paths": {
                "/pets": {
                    "get": {
                        "operationId": "listPets",
                        "responses": { "default": { "description": "anything" } }
                    }
                }
            }
        });
        let before = doc.clone();
        normalize(&mut doc).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn is_idempotent() {
        let mut doc = json!({
            "paths": { "/a-b": { "put": {}, "head": {} } }
        });
        normalize(&mut doc).unwrap();
        let once = doc.clone();
        normalize(&mut doc).unwrap();
        assert_eq!(doc, once);
    }

    #[test]
    fn missing_paths_is_an_error() {
        let mut doc = json!({ "openapi": "3.0.0" });
        assert!(matches!(
            normalize(&mut doc),
            Err(LoadError::InvalidDocument { .. })
        ));
    }
}
