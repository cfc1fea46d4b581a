//! Loading the catalog from YAML or JSON files.

use super::SchemaCatalog;
use crate::error::Result;
use serde_json::Value as JsonValue;
use std::path::Path;

impl SchemaCatalog {
    /// Load a catalog from a file; `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse a catalog from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let spec: JsonValue = serde_yaml::from_str(yaml)?;
        Self::from_spec(&spec)
    }

    /// Parse a catalog from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: JsonValue = serde_json::from_str(json)?;
        Self::from_spec(&spec)
    }
}
