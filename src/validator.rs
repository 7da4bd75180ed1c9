//! Argument validation against generated input schemas.

use serde_json::Value;

use crate::error::{SchemaError, ValidateError};
use crate::types::ToolContract;

/// Validate tool arguments against the contract's input schema.
///
/// Unlike the executor, which coerces strings into numbers, booleans, and
/// lists, this check is strict: `"5"` does not satisfy an integer property.
///
/// # Errors
///
/// Returns `ValidateError::InvalidSchema` if the input schema doesn't
/// compile, or `ValidateError::Invalid` with every violation found.
pub fn validate_arguments(contract: &ToolContract, args: &Value) -> Result<(), ValidateError> {
    validate_against_schema(&contract.input_schema, args)
}

/// Validate a payload against an already-resolved schema.
pub fn validate_against_schema(schema: &Value, payload: &Value) -> Result<(), ValidateError> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
            message: e.to_string(),
        })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

/// Check that a generated schema compiles.
///
/// # Errors
///
/// Returns `ValidateError::InvalidSchema` with the compiler's message.
pub fn check_input_schema(schema: &Value) -> Result<(), ValidateError> {
    jsonschema::validator_for(schema)
        .map(|_| ())
        .map_err(|e| ValidateError::InvalidSchema {
            message: e.to_string(),
        })
}
