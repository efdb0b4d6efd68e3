use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a visual region owned by the presentation layer
///
/// The store allocates handles and reports changes by handle; it never holds
/// a reference to the rendering object itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionHandle(pub u64);

impl fmt::Display for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// A region marker over the waveform
///
/// The free preview region is not clickable; every entry region is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub handle: RegionHandle,
    pub from: f64,
    pub to: f64,
    pub clickable: bool,
    pub movable: bool,
    pub visible: bool,
}

impl Region {
    /// Region bounds truncated to whole samples
    pub fn sample_bounds(&self) -> (usize, usize) {
        (self.from.max(0.0) as usize, self.to.max(0.0) as usize)
    }
}

/// One labeled or pending time interval over the recording
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationEntry {
    /// Playback position (in samples) at the moment the entry was created
    pub initial_position: f64,
    pub from: usize,
    pub to: usize,
    /// Empty for a pending entry, otherwise a taxonomy label
    pub event_label: String,
    pub selected: bool,
    pub region: RegionHandle,
}

impl AnnotationEntry {
    pub fn is_pending(&self) -> bool {
        self.event_label.is_empty()
    }

    pub fn len_samples(&self) -> usize {
        self.to - self.from
    }

    /// Persisted form, without selection state or region handle
    pub fn to_record(&self) -> EntryRecord {
        EntryRecord {
            from: self.from,
            to: self.to,
            event_label: self.event_label.clone(),
            initial_position: self.initial_position,
        }
    }
}

/// An annotation entry as stored in a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub from: usize,
    pub to: usize,
    pub event_label: String,
    pub initial_position: f64,
}

/// Which per-class quantity `summarize` aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryMetric {
    Count,
    #[default]
    TotalDuration,
}

impl SummaryMetric {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" | "counts" => Some(Self::Count),
            "duration" | "length" | "total_duration" => Some(Self::TotalDuration),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Count => "Count",
            Self::TotalDuration => "Length",
        }
    }
}

/// Direction for stepping the selection through the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Change notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    RegionCreated {
        handle: RegionHandle,
        from: f64,
        to: f64,
        clickable: bool,
    },
    RegionMoved {
        handle: RegionHandle,
        from: f64,
        to: f64,
    },
    RegionRemoved(RegionHandle),
    RegionMovable {
        handle: RegionHandle,
        movable: bool,
    },
    /// Label or selection changed, so the region's color must be refreshed
    RegionRestyled(RegionHandle),
    FreeRegionChanged {
        from: f64,
        to: f64,
        enabled: bool,
    },
    TableChanged,
}

/// A display row of the annotation table
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub index: usize,
    pub from: String,
    pub to: String,
    pub event: String,
    pub selected: bool,
    pub pending: bool,
}

/// Format a sample index as `H:MM:SS.ss`, truncated to hundredths
pub fn format_sample_time(sample: usize, sample_rate: u32) -> String {
    let rate = u128::from(sample_rate.max(1));
    let centis = sample as u128 * 100 / rate;
    let hours = centis / 360_000;
    let minutes = centis / 6_000 % 60;
    let seconds = centis / 100 % 60;
    let hundredths = centis % 100;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, hundredths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_sample_time() {
        assert_eq!(format_sample_time(0, 44100), "0:00:00.00");
        assert_eq!(format_sample_time(44100, 44100), "0:00:01.00");
        // 1.5s + a bit, truncated rather than rounded
        assert_eq!(format_sample_time(66_590, 44100), "0:00:01.50");
        assert_eq!(format_sample_time(16000 * 3723, 16000), "1:02:03.00");
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!(SummaryMetric::parse("count"), Some(SummaryMetric::Count));
        assert_eq!(SummaryMetric::parse("Length"), Some(SummaryMetric::TotalDuration));
        assert_eq!(SummaryMetric::parse("bars"), None);
    }
}
