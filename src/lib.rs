//! Airway - annotate time-aligned events in audio recordings
//!
//! The [`state::AnnotationStore`] holds the annotation table of one recording
//! and enforces its rules; any front end drives it and renders from its
//! snapshots. The crate ships a console front end in [`app`].

pub mod app;
pub mod audio;
pub mod cli;
pub mod error;
pub mod export;
pub mod models;
pub mod settings;
pub mod state;

pub use error::{AnnotationError, Result};
