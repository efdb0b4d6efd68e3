//! Loading recordings from WAV files using hound
//!
//! The whole file is read once. The bytes are hashed for integrity checks,
//! then decoded into the original interleaved samples plus a mono working
//! copy built from the first channel.

use crate::error::{AnnotationError, Result};
use hound::{SampleFormat, WavReader, WavSpec};
use log::info;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Interleaved samples in their original encoding
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl SampleBuffer {
    fn len(&self) -> usize {
        match self {
            SampleBuffer::Int(samples) => samples.len(),
            SampleBuffer::Float(samples) => samples.len(),
        }
    }
}

/// An immutable recording, resident in memory for the whole session
#[derive(Debug, Clone)]
pub struct Recording {
    path: PathBuf,
    spec: WavSpec,
    content_hash: String,
    original: SampleBuffer,
    mono: Vec<f32>,
}

impl Recording {
    /// Load a WAV file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| load_failure(path, e))?;
        let recording = Self::from_bytes(path, &bytes)?;

        info!(
            "Loaded {} ({}Hz, {} channel(s), {} frames, md5 {})",
            path.display(),
            recording.sample_rate(),
            recording.channels(),
            recording.len(),
            recording.content_hash
        );
        Ok(recording)
    }

    /// Decode an in-memory WAV file; `path` only names the source
    pub fn from_bytes(path: impl AsRef<Path>, bytes: &[u8]) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| load_failure(path, e))?;

        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(load_failure(path, "invalid WAV header"));
        }

        let original = match spec.sample_format {
            SampleFormat::Float => SampleBuffer::Float(
                reader
                    .into_samples::<f32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| load_failure(path, e))?,
            ),
            SampleFormat::Int => SampleBuffer::Int(
                reader
                    .into_samples::<i32>()
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| load_failure(path, e))?,
            ),
        };

        let channels = spec.channels as usize;
        if original.len() % channels != 0 {
            return Err(load_failure(path, "truncated sample frame"));
        }

        // Keep only the first channel for the working copy
        let mono = match &original {
            SampleBuffer::Float(samples) => samples.iter().step_by(channels).copied().collect(),
            SampleBuffer::Int(samples) => {
                let max_value = (1u64 << (spec.bits_per_sample - 1)) as f32;
                samples
                    .iter()
                    .step_by(channels)
                    .map(|&v| v as f32 / max_value)
                    .collect()
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            spec,
            content_hash: content_hash(bytes),
            original,
            mono,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used to find the recording next to a bundle
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.spec.channels
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.mono.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mono.is_empty()
    }

    /// Mono working copy, normalized to [-1, 1]
    pub fn mono(&self) -> &[f32] {
        &self.mono
    }

    pub fn original(&self) -> &SampleBuffer {
        &self.original
    }

    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.len() as f64 / self.sample_rate() as f64
    }

    /// Interleaved original samples for frames `from..to`
    pub fn frames(&self, from: usize, to: usize) -> SampleBuffer {
        let channels = self.channels() as usize;
        let to = to.min(self.len());
        let from = from.min(to);
        let range = from * channels..to * channels;
        match &self.original {
            SampleBuffer::Int(samples) => SampleBuffer::Int(samples[range].to_vec()),
            SampleBuffer::Float(samples) => SampleBuffer::Float(samples[range].to_vec()),
        }
    }
}

/// MD5 hex digest of a file's bytes
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Hash a file on disk without decoding it
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| load_failure(path, e))?;
    Ok(content_hash(&bytes))
}

fn load_failure(path: &Path, reason: impl ToString) -> AnnotationError {
    AnnotationError::LoadFailure {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hound::WavWriter;

    /// Write a 16-bit WAV where channel `c` of frame `i` holds `i * 10 + c`
    pub(crate) fn write_test_wav(path: &Path, frames: usize, channels: u16, rate: u32) {
        let spec = WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for c in 0..channels {
                writer.write_sample(((i * 10) % 30000) as i16 + c as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    /// Build a silent mono recording in memory
    pub(crate) fn silent_recording(name: &str, frames: usize, rate: u32) -> Recording {
        let spec = WavSpec {
            channels: 1,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..frames {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        Recording::from_bytes(name, cursor.get_ref()).unwrap()
    }

    #[test]
    fn test_load_keeps_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_test_wav(&path, 100, 2, 8000);

        let recording = Recording::load(&path).unwrap();
        assert_eq!(recording.len(), 100);
        assert_eq!(recording.channels(), 2);
        assert_eq!(recording.sample_rate(), 8000);
        assert_eq!(recording.file_name(), "stereo.wav");
        assert_eq!(recording.mono()[3], 30.0 / 32768.0);

        match recording.frames(2, 4) {
            SampleBuffer::Int(samples) => assert_eq!(samples, vec![20, 21, 30, 31]),
            other => panic!("unexpected buffer {:?}", other),
        }
    }

    #[test]
    fn test_hash_matches_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_test_wav(&path, 10, 1, 8000);

        let recording = Recording::load(&path).unwrap();
        assert_eq!(recording.content_hash(), hash_file(&path).unwrap());
        assert_eq!(recording.content_hash().len(), 32);
    }

    #[test]
    fn test_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.wav");
        assert!(matches!(
            Recording::load(&missing),
            Err(AnnotationError::LoadFailure { .. })
        ));

        let garbage = dir.path().join("garbage.wav");
        std::fs::write(&garbage, b"not a wave file").unwrap();
        assert!(matches!(
            Recording::load(&garbage),
            Err(AnnotationError::LoadFailure { .. })
        ));
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(content_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
    }
}
