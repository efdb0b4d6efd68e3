//! Error types for annotation sessions
//!
//! Every failure is reported at the point of the failed operation. A store
//! operation that returns an error leaves the store exactly as it was.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, editing or exporting annotations
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// The audio file is missing, unreadable or not a PCM waveform
    #[error("can't load the file ({}): {reason}", .path.display())]
    LoadFailure { path: PathBuf, reason: String },

    /// The recording next to a bundle is not the one the bundle was made from
    #[error(
        "file with name \"{file_name}\" is not the same one used for these annotations \
         (expected MD5 {expected}, found {actual})"
    )]
    IntegrityMismatch {
        file_name: String,
        expected: String,
        actual: String,
    },

    /// The bundle references a recording that is not in the bundle's directory
    #[error(
        "corresponding file \"{file_name}\" not found; make sure it is in the same \
         directory as \"{}\"", .bundle.display()
    )]
    MissingCompanionFile { file_name: String, bundle: PathBuf },

    /// A zero-width or out-of-bounds region cannot become an event
    #[error("please select a region (got [{from}, {to}])")]
    InvalidRegion { from: usize, to: usize },

    /// Label index outside the event taxonomy
    #[error("no event class at index {0}")]
    UnknownLabel(usize),

    /// Bundle contents violate the collection invariants
    #[error("invalid annotation bundle: {0}")]
    InvalidBundle(String),

    /// Event taxonomy configuration is unusable
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, AnnotationError>;
