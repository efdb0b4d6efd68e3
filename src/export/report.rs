//! CSV report of the annotation table

use crate::error::Result;
use crate::models::{format_sample_time, AnnotationEntry};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Column separator used by the report
pub const CSV_DELIMITER: u8 = b';';

/// Write one row per entry with `From`, `To` and `Event` columns
///
/// Times are written as `H:MM:SS.ss (sample)`.
pub fn write_csv<W: Write>(writer: W, entries: &[AnnotationEntry], sample_rate: u32) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .from_writer(writer);

    out.write_record(["From", "To", "Event"])?;
    for entry in entries {
        let from = format!("{} ({})", format_sample_time(entry.from, sample_rate), entry.from);
        let to = format!("{} ({})", format_sample_time(entry.to, sample_rate), entry.to);
        out.write_record([from.as_str(), to.as_str(), entry.event_label.as_str()])?;
    }
    out.flush()?;
    Ok(())
}

/// Save the CSV report to a file
pub fn save_csv(path: impl AsRef<Path>, entries: &[AnnotationEntry], sample_rate: u32) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    write_csv(file, entries, sample_rate)?;
    info!("Wrote {} row(s) to {}", entries.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegionHandle;

    fn entry(from: usize, to: usize, label: &str) -> AnnotationEntry {
        AnnotationEntry {
            initial_position: from as f64,
            from,
            to,
            event_label: label.to_string(),
            selected: true,
            region: RegionHandle(7),
        }
    }

    #[test]
    fn test_write_csv() {
        let entries = vec![entry(44100, 66150, "dry cough"), entry(0, 441, "")];
        let mut out = Vec::new();
        write_csv(&mut out, &entries, 44100).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "From;To;Event");
        assert_eq!(lines[1], "0:00:01.00 (44100);0:00:01.50 (66150);dry cough");
        assert_eq!(lines[2], "0:00:00.00 (0);0:00:00.01 (441);");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_save_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        save_csv(&path, &[entry(0, 10, "speech")], 1000).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("0:00:00.00 (0);0:00:00.01 (10);speech\n"));
    }
}
