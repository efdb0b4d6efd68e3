//! Playback clock
//!
//! The annotation store never drives playback. It only reads the position
//! and whether audio is currently playing, through [`PlaybackClock`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Interval between position notifications while playing
pub const NOTIFY_INTERVAL: Duration = Duration::from_millis(20);

/// Source of the current playback position
pub trait PlaybackClock {
    /// Current position as a (fractional) sample index
    fn position_samples(&self) -> f64;

    fn is_playing(&self) -> bool;
}

/// Shared state for the playback clock - thread-safe
#[derive(Clone)]
pub struct SharedPlaybackClock {
    inner: Arc<Mutex<ClockInner>>,
}

struct ClockInner {
    sample_rate: u32,
    /// Total number of frames in the recording
    total_samples: usize,
    /// Current playback position (sample index)
    position: f64,
    is_playing: bool,
}

impl SharedPlaybackClock {
    pub fn new(sample_rate: u32, total_samples: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockInner {
                sample_rate: sample_rate.max(1),
                total_samples,
                position: 0.0,
                is_playing: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get current playback position in seconds
    pub fn current_time(&self) -> f64 {
        let inner = self.lock();
        inner.position / inner.sample_rate as f64
    }

    /// Get total duration in seconds
    pub fn duration(&self) -> f64 {
        let inner = self.lock();
        inner.total_samples as f64 / inner.sample_rate as f64
    }

    /// Start playback; restarts from the beginning once the end was reached
    pub fn play(&self) {
        let mut inner = self.lock();
        if inner.position >= inner.total_samples as f64 {
            inner.position = 0.0;
        }
        inner.is_playing = inner.total_samples > 0;
    }

    pub fn stop(&self) {
        self.lock().is_playing = false;
    }

    /// Toggle play/pause, returning the new playing state
    pub fn toggle(&self) -> bool {
        if self.is_playing() {
            self.stop();
            false
        } else {
            self.play();
            self.is_playing()
        }
    }

    /// Seek to a position in seconds, clamped to the recording
    pub fn seek_seconds(&self, seconds: f64) {
        let mut inner = self.lock();
        let target = seconds.max(0.0) * inner.sample_rate as f64;
        inner.position = target.min(inner.total_samples as f64);
    }

    /// Advance the position by `elapsed` if playing; playback stops at the end
    pub fn advance(&self, elapsed: Duration) {
        let mut inner = self.lock();
        if !inner.is_playing {
            return;
        }
        let end = inner.total_samples as f64;
        inner.position =
            (inner.position + elapsed.as_secs_f64() * inner.sample_rate as f64).min(end);
        if inner.position >= end {
            inner.is_playing = false;
        }
    }
}

impl PlaybackClock for SharedPlaybackClock {
    fn position_samples(&self) -> f64 {
        self.lock().position
    }

    fn is_playing(&self) -> bool {
        self.lock().is_playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_only_while_playing() {
        let clock = SharedPlaybackClock::new(1000, 500);
        clock.advance(Duration::from_millis(100));
        assert_eq!(clock.position_samples(), 0.0);

        clock.play();
        clock.advance(Duration::from_millis(100));
        assert_eq!(clock.position_samples(), 100.0);
        assert!(clock.is_playing());
    }

    #[test]
    fn test_stops_at_end_and_restarts() {
        let clock = SharedPlaybackClock::new(1000, 500);
        clock.play();
        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.position_samples(), 500.0);
        assert!(!clock.is_playing());

        assert!(clock.toggle());
        assert_eq!(clock.position_samples(), 0.0);
    }

    #[test]
    fn test_seek_is_clamped() {
        let clock = SharedPlaybackClock::new(1000, 500);
        clock.seek_seconds(0.25);
        assert_eq!(clock.current_time(), 0.25);
        clock.seek_seconds(10.0);
        assert_eq!(clock.position_samples(), 500.0);
        assert_eq!(clock.duration(), 0.5);
    }
}
