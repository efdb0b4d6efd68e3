//! Per-event WAV export using hound
//!
//! Each labeled entry is written as its own file, in one subdirectory per
//! event class, using the original channels, bit depth and sample rate.

use crate::audio::{Recording, SampleBuffer};
use crate::error::Result;
use crate::models::AnnotationEntry;
use crate::settings::EventTaxonomy;
use hound::WavWriter;
use log::{debug, info};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Number of clips written for one event class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipCount {
    pub label: String,
    pub clips: usize,
}

/// Clip path for the `sequence`-th event of a class
pub fn clip_path(dir: &Path, label: &str, sequence: usize) -> PathBuf {
    dir.join(label).join(format!("{}_{}.wav", label, sequence))
}

/// Write every labeled entry to `<dir>/<label>/<label>_<n>.wav`
///
/// `n` counts from 0 per class in table order. Pending entries are skipped.
pub fn export_event_clips(
    dir: impl AsRef<Path>,
    recording: &Recording,
    entries: &[AnnotationEntry],
    taxonomy: &EventTaxonomy,
) -> Result<Vec<ClipCount>> {
    let dir = dir.as_ref();
    let mut counts = Vec::with_capacity(taxonomy.len());

    for label in taxonomy.labels() {
        fs::create_dir_all(dir.join(label))?;

        let mut sequence = 0;
        for entry in entries.iter().filter(|e| e.event_label == label) {
            let path = clip_path(dir, label, sequence);
            write_clip(&path, recording, entry.from, entry.to)?;
            debug!("Wrote {} [{}, {}]", path.display(), entry.from, entry.to);
            sequence += 1;
        }

        counts.push(ClipCount {
            label: label.to_string(),
            clips: sequence,
        });
    }

    let total: usize = counts.iter().map(|c| c.clips).sum();
    info!("Exported {} event clip(s) to {}", total, dir.display());
    Ok(counts)
}

/// Write frames `from..to` of the recording to a WAV file
fn write_clip(path: &Path, recording: &Recording, from: usize, to: usize) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = WavWriter::new(BufWriter::new(file), recording.spec())?;

    match recording.frames(from, to) {
        SampleBuffer::Int(samples) => {
            for sample in samples {
                writer.write_sample(sample)?;
            }
        }
        SampleBuffer::Float(samples) => {
            for sample in samples {
                writer.write_sample(sample)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::write_test_wav;
    use crate::models::RegionHandle;

    fn entry(from: usize, to: usize, label: &str) -> AnnotationEntry {
        AnnotationEntry {
            initial_position: 0.0,
            from,
            to,
            event_label: label.to_string(),
            selected: false,
            region: RegionHandle(1),
        }
    }

    #[test]
    fn test_export_event_clips() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("stereo.wav");
        write_test_wav(&wav, 200, 2, 8000);
        let recording = Recording::load(&wav).unwrap();
        let taxonomy = EventTaxonomy::new(
            vec!["cough".to_string(), "speech".to_string(), "silence".to_string()],
            vec!["c".to_string(), "s".to_string(), "q".to_string()],
        )
        .unwrap();
        let entries = vec![
            entry(10, 20, "cough"),
            entry(0, 50, ""),
            entry(30, 35, "speech"),
            entry(100, 150, "cough"),
        ];

        let out = dir.path().join("events");
        let counts = export_event_clips(&out, &recording, &entries, &taxonomy).unwrap();
        assert_eq!(
            counts.iter().map(|c| c.clips).collect::<Vec<_>>(),
            vec![2, 1, 0]
        );
        assert!(out.join("silence").is_dir());

        let second = hound::WavReader::open(clip_path(&out, "cough", 1)).unwrap();
        assert_eq!(second.spec(), recording.spec());
        assert_eq!(second.duration(), 50);

        let speech = hound::WavReader::open(clip_path(&out, "speech", 0)).unwrap();
        let samples: Vec<i16> = speech.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(&samples[..4], &[300, 301, 310, 311]);
    }
}
