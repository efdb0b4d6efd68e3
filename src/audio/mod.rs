//! Audio input for annotation sessions
//!
//! This module provides:
//! - WAV loading via hound, with an MD5 content hash of the source file
//! - A mono working copy alongside the original multi-channel samples
//! - The playback clock the annotation store reads positions from

mod playback;
mod recording;

pub use playback::{PlaybackClock, SharedPlaybackClock, NOTIFY_INTERVAL};
pub use recording::{content_hash, hash_file, Recording, SampleBuffer};

#[cfg(test)]
pub(crate) use recording::tests::{silent_recording, write_test_wav};
