//! Document linting - static checks on API documents before tools are built.
//!
//! Reports:
//! - unreadable documents and documents without `paths`
//! - broken internal `$ref` pointers, and external ones that will degrade
//! - duplicate or missing operation identifiers
//! - path placeholders with no matching path parameter
//! - generated input schemas that fail to compile

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::builder::ToolSchemaBuilder;
use crate::loader::{load_document, navigate_fragment};
use crate::registry::extract_operations;
use crate::types::{HttpMethod, ParameterLocation};
use crate::validator::check_input_schema;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/paths/~1pets/get")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// Directories are searched recursively for `.json`, `.yaml`, and `.yml`
/// files. If `strict` is true, warnings count as failures.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_document_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        for diag in &file_result.diagnostics {
            match diag.severity {
                Severity::Error => total_errors += 1,
                Severity::Warning => total_warnings += 1,
            }
        }
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single document file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();
    let display = file.strip_prefix(base_path).unwrap_or(file).to_path_buf();

    match load_document(file) {
        Ok(document) => lint_document(&document, file, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            code: "E001".to_string(),
            file: file.to_path_buf(),
            path: "/".to_string(),
            message: format!("cannot load document: {}", e),
        }),
    }

    let status = if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        FileStatus::Error
    } else if diagnostics.is_empty() {
        FileStatus::Ok
    } else {
        FileStatus::Warning
    };

    FileResult {
        file: display,
        status,
        diagnostics,
    }
}

/// Run every document check, appending to `diagnostics`.
pub fn lint_document(document: &Value, file: &Path, diagnostics: &mut Vec<Diagnostic>) {
    let mut report = |severity: Severity, code: &str, path: String, message: String| {
        diagnostics.push(Diagnostic {
            severity,
            code: code.to_string(),
            file: file.to_path_buf(),
            path,
            message,
        })
    };

    check_refs(document, document, "", &mut report);

    let has_server = document
        .get("servers")
        .and_then(Value::as_array)
        .is_some_and(|s| !s.is_empty())
        || document.get("host").is_some();
    if !has_server {
        report(
            Severity::Warning,
            "W004",
            "/servers".to_string(),
            "no server URL declared; a base URL override will be required".to_string(),
        );
    }

    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        report(
            Severity::Error,
            "E002",
            "/paths".to_string(),
            "document has no paths object".to_string(),
        );
        return;
    };

    for (path, item) in paths {
        for method in HttpMethod::ALL {
            let Some(op) = item.get(method.as_str()) else {
                continue;
            };
            if op.get("operationId").and_then(Value::as_str).is_none() {
                report(
                    Severity::Warning,
                    "W001",
                    operation_pointer(path, method),
                    "operation has no operationId; one will be generated".to_string(),
                );
            }
        }
    }

    let Ok(operations) = extract_operations(document) else {
        return;
    };

    let mut seen: HashMap<&str, &str> = HashMap::new();
    let builder = ToolSchemaBuilder::new(document);
    for op in &operations {
        let pointer = operation_pointer(&op.path, op.method);

        if let Some(first) = seen.insert(&op.operation_id, &op.path) {
            report(
                Severity::Error,
                "E004",
                pointer.clone(),
                format!(
                    "duplicate operationId \"{}\" (first declared under {})",
                    op.operation_id, first
                ),
            );
        }

        for name in placeholders(&op.path) {
            let declared = op
                .parameters
                .iter()
                .any(|p| p.location == ParameterLocation::Path && p.name == name);
            if !declared {
                report(
                    Severity::Warning,
                    "W002",
                    pointer.clone(),
                    format!("path placeholder {{{}}} has no path parameter", name),
                );
            }
        }

        let tool = builder.build(op);
        if let Err(e) = check_input_schema(&tool.input_schema) {
            report(
                Severity::Error,
                "E005",
                pointer,
                format!("generated input schema for {}: {}", tool.name, e),
            );
        }
    }
}

/// Recursively check `$ref` values.
fn check_refs<F>(value: &Value, root: &Value, path: &str, report: &mut F)
where
    F: FnMut(Severity, &str, String, String),
{
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_val)) = map.get("$ref") {
                if !ref_val.starts_with('#') {
                    report(
                        Severity::Warning,
                        "W003",
                        path.to_string(),
                        format!("external reference {} will not be followed", ref_val),
                    );
                } else if navigate_fragment(root, ref_val).is_err() {
                    report(
                        Severity::Error,
                        "E003",
                        path.to_string(),
                        format!("reference not found: {}", ref_val),
                    );
                }
            }

            for (key, val) in map {
                let child_path = format!("{}/{}", path, escape_pointer(key));
                check_refs(val, root, &child_path, report);
            }
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                let child_path = format!("{}/{}", path, i);
                check_refs(item, root, &child_path, report);
            }
        }
        _ => {}
    }
}

/// Names inside `{...}` in a path template.
fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        names.push(&after[..close]);
        rest = &after[close + 1..];
    }
    names
}

fn operation_pointer(path: &str, method: HttpMethod) -> String {
    format!("/paths/{}/{}", escape_pointer(path), method.as_str())
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Collect all document files in a path (file or directory).
fn collect_document_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if is_document_file(path) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if is_document_file(&path) {
            files.push(path);
        }
    }
}

fn is_document_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e, "json" | "yaml" | "yml"))
        .unwrap_or(false)
}
