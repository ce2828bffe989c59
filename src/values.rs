//! Values documents and the template context built from them.
//!
//! A source tree ships default values in `values.yaml` (or `.yml`/`.json`).
//! The user document is merged on top of them: mappings merge recursively,
//! everything else is replaced wholesale.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Default values file names, tried in order.
pub const VALUES_FILES: [&str; 3] = ["values.yaml", "values.yml", "values.json"];

/// Optional JSON schema the merged values must satisfy.
pub const VALUES_SCHEMA_FILE: &str = "values.schema.json";

/// Key under which the merged values are exposed to templates.
pub const VALUES_KEY: &str = "Values";

/// Immutable values binding shared by every render call of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateContext {
    binding: Value,
}

impl TemplateContext {
    /// Wraps already merged values; `values` must be a mapping.
    pub fn new(values: serde_json::Map<String, Value>) -> Self {
        let mut binding = serde_json::Map::new();
        binding.insert(VALUES_KEY.to_string(), Value::Object(values));
        Self {
            binding: Value::Object(binding),
        }
    }

    /// The merged values mapping.
    pub fn values(&self) -> &Value {
        &self.binding[VALUES_KEY]
    }

    /// The data handed to the template engine: `{"Values": {...}}`.
    pub fn binding(&self) -> &Value {
        &self.binding
    }
}

/// Finds the default values document inside a source tree.
///
/// # Errors
/// * `Error::ConfigReadError` if none of [`VALUES_FILES`] exists
pub fn find_default_values<P: AsRef<Path>>(source_root: P) -> Result<PathBuf> {
    let source_root = source_root.as_ref();
    for file in VALUES_FILES {
        let path = source_root.join(file);
        if path.is_file() {
            debug!("Using default values from {}", path.display());
            return Ok(path);
        }
    }

    Err(Error::ConfigReadError {
        path: source_root.join(VALUES_FILES[0]),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no default values found (tried: {})", VALUES_FILES.join(", ")),
        ),
    })
}

/// Reads a values document and returns its top-level mapping.
///
/// Files ending in `.json` are parsed as JSON, everything else as YAML. An
/// empty document is an empty mapping.
pub fn load_values<P: AsRef<Path>>(path: P) -> Result<serde_json::Map<String, Value>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigReadError {
        path: path.to_path_buf(),
        source,
    })?;

    if content.trim().is_empty() {
        return Ok(serde_json::Map::new());
    }

    let parse_error = |reason: String| Error::ConfigParseError {
        path: path.to_path_buf(),
        reason,
    };

    let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
    let document: IndexMap<String, Value> = if is_json {
        serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?
    } else {
        serde_yaml::from_str::<Option<IndexMap<String, Value>>>(&content)
            .map_err(|e| parse_error(e.to_string()))?
            .unwrap_or_default()
    };

    Ok(document.into_iter().collect())
}

/// Merges `overrides` on top of `defaults`.
///
/// Two mappings merge key by key; any other pair resolves to the override.
pub fn merge_values(defaults: Value, overrides: Value) -> Value {
    match (defaults, overrides) {
        (Value::Object(base), Value::Object(top)) => Value::Object(merge_maps(base, top)),
        (_, overrides) => overrides,
    }
}

fn merge_maps(
    mut base: serde_json::Map<String, Value>,
    top: serde_json::Map<String, Value>,
) -> serde_json::Map<String, Value> {
    for (key, value) in top {
        let merged = match base.remove(&key) {
            Some(existing) => merge_values(existing, value),
            None => value,
        };
        base.insert(key, merged);
    }
    base
}

/// Builds the template context from the default and user values documents.
///
/// A missing `user_values_path` stands for an empty mapping.
///
/// # Errors
/// * `Error::ConfigReadError` if a document cannot be read
/// * `Error::ConfigParseError` if a document is not a mapping
pub fn build_context(
    defaults_path: &Path,
    user_values_path: Option<&Path>,
) -> Result<TemplateContext> {
    let defaults = load_values(defaults_path)?;
    let overrides = match user_values_path {
        Some(path) => load_values(path)?,
        None => serde_json::Map::new(),
    };

    let values = merge_maps(defaults, overrides);
    debug!("Merged values: {values:?}");
    Ok(TemplateContext::new(values))
}

/// Checks the merged values against a JSON schema document.
///
/// # Errors
/// * `Error::ConfigReadError` / `Error::ConfigParseError` for an unreadable schema
/// * `Error::ConfigValidationError` listing every violation
pub fn validate_values<P: AsRef<Path>>(schema_path: P, context: &TemplateContext) -> Result<()> {
    let schema_path = schema_path.as_ref();
    let content = std::fs::read_to_string(schema_path).map_err(|source| Error::ConfigReadError {
        path: schema_path.to_path_buf(),
        source,
    })?;
    let schema: Value = serde_json::from_str(&content).map_err(|e| Error::ConfigParseError {
        path: schema_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| Error::ConfigParseError {
        path: schema_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let violations: Vec<String> = validator
        .iter_errors(context.values())
        .map(|e| e.to_string())
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(Error::ConfigValidationError {
            path: schema_path.to_path_buf(),
            violations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_replaces_sequences() {
        let merged = merge_values(json!({"list": [1, 2], "keep": true}), json!({"list": [3]}));
        assert_eq!(merged, json!({"list": [3], "keep": true}));
    }

    #[test]
    fn test_merge_scalar_over_mapping() {
        let merged = merge_values(json!({"a": {"x": 1}}), json!({"a": "flat"}));
        assert_eq!(merged, json!({"a": "flat"}));
    }

    #[test]
    fn test_binding_wraps_values() {
        let mut values = serde_json::Map::new();
        values.insert("name".to_string(), json!("world"));
        let context = TemplateContext::new(values);
        assert_eq!(context.binding(), &json!({"Values": {"name": "world"}}));
        assert_eq!(context.values()["name"], "world");
    }
}
