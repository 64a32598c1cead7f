//! Variable table shared by `setvar`/`getvar` directives
//!
//! The table outlives a single composition run. Whoever owns it decides when it
//! is reset: per composition, per session, or never.

use std::collections::BTreeMap;
use std::path::Path;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mapping from variable name to value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableTable {
    vars: BTreeMap<String, String>,
}

impl VariableTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Insert or overwrite a variable
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        debug!(%name, value_len = value.len(), "VariableTable::set: called");
        self.vars.insert(name, value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        debug!(%name, "VariableTable::remove: called");
        self.vars.remove(name)
    }

    pub fn clear(&mut self) {
        debug!(len = self.vars.len(), "VariableTable::clear: called");
        self.vars.clear();
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over variables in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Load a table from a JSON file. A missing file yields an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(?path, "VariableTable::load: called");
        if !path.exists() {
            debug!("VariableTable::load: file missing, starting empty");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        let table: Self =
            serde_json::from_str(&content).context(format!("Failed to parse variables from {}", path.display()))?;
        debug!(len = table.len(), "VariableTable::load: loaded");
        Ok(table)
    }

    /// Save the table as pretty JSON, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        debug!(?path, len = self.len(), "VariableTable::save: called");
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).context(format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_overwrites() {
        let mut vars = VariableTable::new();
        vars.set("mood", "calm");
        vars.set("mood", "angry");
        assert_eq!(vars.get("mood"), Some("angry"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn test_missing_variable() {
        let vars = VariableTable::new();
        assert!(vars.get("nope").is_none());
        assert!(!vars.contains("nope"));
        assert!(vars.is_empty());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let vars: VariableTable = [("a", "1"), ("b", "two")].into_iter().collect();
        let json = serde_json::to_string(&vars).unwrap();
        assert_eq!(json, r#"{"a":"1","b":"two"}"#);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let vars = VariableTable::load(&temp.path().join("vars.json")).unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("vars.json");

        let mut vars = VariableTable::new();
        vars.set("name", "Alice");
        vars.set("hp", "12");
        vars.save(&path).unwrap();

        let loaded = VariableTable::load(&path).unwrap();
        assert_eq!(loaded, vars);
    }

    #[test]
    fn test_clear_and_remove() {
        let mut vars: VariableTable = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(vars.remove("a"), Some("1".to_string()));
        assert_eq!(vars.iter().collect::<Vec<_>>(), vec![("b", "2")]);
        vars.clear();
        assert!(vars.is_empty());
    }
}
