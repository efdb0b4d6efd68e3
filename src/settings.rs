//! Event taxonomy configuration
//!
//! The taxonomy is read once at startup from `setup.json`, looked up in this
//! order: an explicit path, `<config dir>/airway/setup.json`, then the
//! built-in defaults.

use crate::error::{AnnotationError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "setup.json";

/// Built-in classes with their keyboard shortcuts
const DEFAULT_CLASSES: [(&str, &str); 10] = [
    ("wet cough", "1"),
    ("dry cough", "2"),
    ("throat clearing", "3"),
    ("dry swallow", "4"),
    ("wheeze", "5"),
    ("sneeze", "6"),
    ("short of breath", "7"),
    ("voice quality", "8"),
    ("speech", "S"),
    ("silence", "Q"),
];

/// On-disk shape of `setup.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SetupFile {
    classes: Vec<String>,
    #[serde(default)]
    shortcuts: Vec<String>,
}

/// One event class and the key that applies it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventClass {
    pub label: String,
    pub shortcut: String,
}

/// Ordered, immutable list of valid event labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTaxonomy {
    classes: Vec<EventClass>,
}

impl EventTaxonomy {
    /// Build a taxonomy from index-aligned labels and shortcuts
    pub fn new(labels: Vec<String>, shortcuts: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(AnnotationError::Config("no event classes configured".to_string()));
        }
        if labels.len() != shortcuts.len() {
            return Err(AnnotationError::Config(format!(
                "{} classes but {} shortcuts",
                labels.len(),
                shortcuts.len()
            )));
        }

        let mut seen_labels = HashSet::new();
        let mut seen_keys = HashSet::new();
        for (label, shortcut) in labels.iter().zip(&shortcuts) {
            if label.trim().is_empty() {
                return Err(AnnotationError::Config("empty class name".to_string()));
            }
            if shortcut.trim().is_empty() {
                return Err(AnnotationError::Config(format!(
                    "class `{}` has no shortcut",
                    label
                )));
            }
            if !seen_labels.insert(label.as_str()) {
                return Err(AnnotationError::Config(format!("duplicate class `{}`", label)));
            }
            if !seen_keys.insert(shortcut.to_lowercase()) {
                return Err(AnnotationError::Config(format!(
                    "duplicate shortcut `{}`",
                    shortcut
                )));
            }
        }

        let classes = labels
            .into_iter()
            .zip(shortcuts)
            .map(|(label, shortcut)| EventClass { label, shortcut })
            .collect();
        Ok(Self { classes })
    }

    /// Parse a `setup.json` document
    pub fn from_json(contents: &str) -> Result<Self> {
        let setup: SetupFile = serde_json::from_str(contents)?;
        // Older setup files only list classes; number them in order
        let shortcuts = if setup.shortcuts.is_empty() {
            (1..=setup.classes.len()).map(|n| n.to_string()).collect()
        } else {
            setup.shortcuts
        };
        Self::new(setup.classes, shortcuts)
    }

    /// Load a taxonomy from a `setup.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| {
            AnnotationError::Config(format!("failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Resolve the taxonomy for this run
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading event classes from {}", path.display());
            return Self::from_file(path);
        }

        if let Some(path) = Self::default_path().filter(|p| p.exists()) {
            info!("Loading event classes from {}", path.display());
            return Self::from_file(path);
        }

        debug!("No setup.json found, using built-in event classes");
        Ok(Self::default())
    }

    /// Get the default configuration path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("airway").join(CONFIG_FILE))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[EventClass] {
        &self.classes
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(|c| c.label.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.label.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.classes.iter().any(|c| c.label == label)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c.label == label)
    }

    /// Find the class bound to a key (case-insensitive)
    pub fn index_for_shortcut(&self, key: &str) -> Option<usize> {
        self.classes
            .iter()
            .position(|c| c.shortcut.eq_ignore_ascii_case(key))
    }

    /// Serialize back to the `setup.json` shape
    pub fn to_json(&self) -> Result<String> {
        let setup = SetupFile {
            classes: self.classes.iter().map(|c| c.label.clone()).collect(),
            shortcuts: self.classes.iter().map(|c| c.shortcut.clone()).collect(),
        };
        Ok(serde_json::to_string_pretty(&setup)?)
    }
}

impl Default for EventTaxonomy {
    fn default() -> Self {
        Self {
            classes: DEFAULT_CLASSES
                .iter()
                .map(|(label, shortcut)| EventClass {
                    label: label.to_string(),
                    shortcut: shortcut.to_string(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_taxonomy() {
        let taxonomy = EventTaxonomy::default();
        assert_eq!(taxonomy.len(), 10);
        assert_eq!(taxonomy.label(0), Some("wet cough"));
        assert_eq!(taxonomy.index_for_shortcut("s"), Some(8));
        assert_eq!(taxonomy.index_for_shortcut("Q"), Some(9));
        assert_eq!(taxonomy.index_for_shortcut("9"), None);
    }

    #[test]
    fn test_from_json() {
        let taxonomy = EventTaxonomy::from_json(
            r#"{"classes": ["cough", "speech"], "shortcuts": ["c", "s"]}"#,
        )
        .unwrap();
        assert_eq!(taxonomy.labels().collect::<Vec<_>>(), vec!["cough", "speech"]);
        assert!(taxonomy.contains("speech"));
        assert_eq!(taxonomy.index_of("speech"), Some(1));
    }

    #[test]
    fn test_rejects_misaligned_shortcuts() {
        let err = EventTaxonomy::from_json(r#"{"classes": ["cough", "speech"], "shortcuts": ["c"]}"#)
            .unwrap_err();
        assert!(matches!(err, AnnotationError::Config(_)));
    }

    #[test]
    fn test_classes_without_shortcuts_are_numbered() {
        let taxonomy = EventTaxonomy::from_json(r#"{"classes": ["cough", "speech"]}"#).unwrap();
        assert_eq!(taxonomy.index_for_shortcut("2"), Some(1));
    }

    #[test]
    fn test_rejects_duplicates() {
        assert!(EventTaxonomy::new(strings(&["a", "a"]), strings(&["1", "2"])).is_err());
        assert!(EventTaxonomy::new(strings(&["a", "b"]), strings(&["x", "X"])).is_err());
        assert!(EventTaxonomy::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setup.json");
        std::fs::write(&path, EventTaxonomy::default().to_json().unwrap()).unwrap();

        let loaded = EventTaxonomy::load(Some(&path)).unwrap();
        assert_eq!(loaded, EventTaxonomy::default());

        let missing = dir.path().join("missing.json");
        assert!(EventTaxonomy::load(Some(&missing)).is_err());
    }
}
