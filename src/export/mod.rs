//! Exports of the annotation table
//!
//! - CSV report, one row per entry
//! - One WAV clip per labeled event, grouped by event class

mod clips;
mod report;

pub use clips::{clip_path, export_event_clips, ClipCount};
pub use report::{save_csv, write_csv, CSV_DELIMITER};
