//! `.airway` annotation bundles
//!
//! A bundle is a JSON document naming the source recording, its MD5 hash and
//! the ordered annotation entries. Selection state and region handles are
//! session-local and never written.

use crate::audio::{hash_file, Recording};
use crate::error::{AnnotationError, Result};
use crate::models::EntryRecord;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// File extension for annotation bundles
pub const BUNDLE_EXTENSION: &str = "airway";

/// Persisted annotations for one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBundle {
    pub source_filename: String,
    pub source_hash: String,
    pub entries: Vec<EntryRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl AnnotationBundle {
    /// Read a bundle from disk
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let bundle = serde_json::from_str(&contents)?;
        Ok(bundle)
    }

    /// Write the bundle to disk, creating the parent directory if needed
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;

        info!(
            "Saved {} annotation(s) to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }
}

/// Default bundle location for a recording: next to it, same stem
pub fn default_bundle_path(recording: &Path) -> PathBuf {
    recording.with_extension(BUNDLE_EXTENSION)
}

/// Open a bundle together with its companion recording
///
/// The recording must sit in the bundle's directory and hash to the value
/// the bundle recorded.
pub fn open_bundle(path: impl AsRef<Path>) -> Result<(AnnotationBundle, Recording)> {
    let path = path.as_ref();
    let bundle = AnnotationBundle::read(path)?;

    let directory = path.parent().unwrap_or_else(|| Path::new(""));
    let audio_path = directory.join(&bundle.source_filename);
    if !is_plain_file_name(&bundle.source_filename) || !audio_path.is_file() {
        return Err(AnnotationError::MissingCompanionFile {
            file_name: bundle.source_filename.clone(),
            bundle: path.to_path_buf(),
        });
    }

    // Check the hash before decoding anything
    let actual = hash_file(&audio_path)?;
    if actual != bundle.source_hash {
        return Err(AnnotationError::IntegrityMismatch {
            file_name: bundle.source_filename.clone(),
            expected: bundle.source_hash.clone(),
            actual,
        });
    }

    let recording = Recording::load(&audio_path)?;
    info!(
        "Opened {} with {} annotation(s)",
        path.display(),
        bundle.entries.len()
    );
    Ok((bundle, recording))
}

/// A single normal path component, so the recording stays next to the bundle
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
