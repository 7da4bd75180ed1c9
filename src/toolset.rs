//! The assembled set of tools for one API document.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::builder::ToolSchemaBuilder;
use crate::config::{resolve_base_url, ClientConfig};
use crate::error::{ConfigError, ExecuteError};
use crate::executor::{ExecutionResult, RequestExecutor};
use crate::normalize::normalize;
use crate::registry::OperationRegistry;
use crate::types::{ToolContract, ToolMetadata};
use crate::validator::validate_arguments;

/// Result of a tool call, enriched with the operation it ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallOutput {
    pub metadata: ToolMetadata,
    pub response: ExecutionResult,
}

/// Tool contracts, metadata, and the executor for one document.
///
/// Everything is computed up front; afterwards the set is read-only and may
/// be shared between threads.
#[derive(Debug, Clone)]
pub struct ToolSet {
    tools: Vec<ToolContract>,
    by_name: HashMap<String, usize>,
    metadata: HashMap<String, ToolMetadata>,
    executor: RequestExecutor,
}

impl ToolSet {
    /// Normalize `document`, resolve the base URL, index operations, and
    /// build one contract per operation.
    ///
    /// # Errors
    ///
    /// Any `ConfigError` is fatal: a document without `paths`, no usable
    /// base URL, or invalid configured headers.
    pub fn from_document(mut document: Value, config: &ClientConfig) -> Result<Self, ConfigError> {
        normalize(&mut document)?;
        let base_url = resolve_base_url(config, &document)?;
        let registry = OperationRegistry::index(&document)?;

        let builder = ToolSchemaBuilder::new(&document);
        let mut tools = Vec::with_capacity(registry.len());
        let mut by_name = HashMap::with_capacity(registry.len());
        let mut metadata = HashMap::with_capacity(registry.len());
        for operation in registry.operations() {
            let tool = builder.build(operation);
            by_name.insert(tool.name.clone(), tools.len());
            metadata.insert(tool.name.clone(), ToolMetadata::from(operation));
            tools.push(tool);
        }
        tracing::info!(tools = tools.len(), base_url = %base_url, "tool set ready");

        let executor = RequestExecutor::new(registry, base_url, config)?;
        Ok(Self {
            tools,
            by_name,
            metadata,
            executor,
        })
    }

    pub fn tools(&self) -> &[ToolContract] {
        &self.tools
    }

    pub fn tool(&self, name: &str) -> Option<&ToolContract> {
        self.by_name.get(name).map(|&i| &self.tools[i])
    }

    pub fn get_metadata(&self, name: &str) -> Option<&ToolMetadata> {
        self.metadata.get(name)
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Execute the tool `name` with `args`.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::execute`].
    pub fn call(&self, name: &str, args: &Value) -> Result<ToolCallOutput, ExecuteError> {
        let metadata = self
            .get_metadata(name)
            .cloned()
            .ok_or_else(|| ExecuteError::NotFound {
                name: name.to_string(),
            })?;
        let response = self.executor.execute(name, args)?;
        Ok(ToolCallOutput { metadata, response })
    }

    /// Like [`ToolSet::call`], but first checks `args` strictly against the
    /// tool's input schema.
    pub fn call_validated(&self, name: &str, args: &Value) -> Result<ToolCallOutput, ExecuteError> {
        let tool = self.tool(name).ok_or_else(|| ExecuteError::NotFound {
            name: name.to_string(),
        })?;
        validate_arguments(tool, args)?;
        self.call(name, args)
    }
}
