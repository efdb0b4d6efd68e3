//! The annotation store
//!
//! Owns the ordered annotation entries of one recording and keeps them
//! consistent with the free preview region, the playback clock and the
//! selection.
//!
//! Invariants held after every operation:
//! - at most one entry is selected
//! - every entry satisfies `0 <= from <= to <= recording.len()`
//! - every label is empty or a member of the taxonomy
//! - entries are only added or removed by the explicit add/label/delete/load
//!   operations
//!
//! The presentation layer learns about changes through [`StoreEvent`]s,
//! drained with [`AnnotationStore::drain_events`].

use crate::audio::{PlaybackClock, Recording};
use crate::error::{AnnotationError, Result};
use crate::models::{
    format_sample_time, AnnotationEntry, Direction, Region, RegionHandle, StoreEvent,
    SummaryMetric, TableRow,
};
use crate::settings::EventTaxonomy;
use crate::state::bundle::AnnotationBundle;
use chrono::Utc;
use log::{debug, warn};
use std::ops::Range;
use std::sync::Arc;

/// Half-width (in samples) of the preview window that follows playback
pub const FREE_REGION_HALF_WIDTH: f64 = 10_000.0;

/// Free region bounds when a session starts
pub const DEFAULT_FREE_REGION: (f64, f64) = (0.0, 20_000.0);

/// Placeholder shown in the table for pending entries
pub const PENDING_LABEL: &str = "---";

pub struct AnnotationStore {
    recording: Arc<Recording>,
    taxonomy: EventTaxonomy,
    clock: Box<dyn PlaybackClock>,
    entries: Vec<AnnotationEntry>,
    free_region: Region,
    next_handle: u64,
    events: Vec<StoreEvent>,
}

impl AnnotationStore {
    pub fn new(
        recording: Arc<Recording>,
        taxonomy: EventTaxonomy,
        clock: Box<dyn PlaybackClock>,
    ) -> Self {
        let mut store = Self {
            recording,
            taxonomy,
            clock,
            entries: Vec::new(),
            free_region: Region {
                handle: RegionHandle(0),
                from: 0.0,
                to: 0.0,
                clickable: false,
                movable: true,
                visible: true,
            },
            next_handle: 1,
            events: Vec::new(),
        };

        let (from, to) = store.clamp(DEFAULT_FREE_REGION.0, DEFAULT_FREE_REGION.1);
        store.free_region.from = from;
        store.free_region.to = to;
        store.events.push(StoreEvent::RegionCreated {
            handle: store.free_region.handle,
            from,
            to,
            clickable: false,
        });
        store
    }

    pub fn recording(&self) -> &Arc<Recording> {
        &self.recording
    }

    pub fn taxonomy(&self) -> &EventTaxonomy {
        &self.taxonomy
    }

    pub fn entries(&self) -> &[AnnotationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn free_region(&self) -> &Region {
        &self.free_region
    }

    /// Index of the selected entry, if any
    pub fn selected_index(&self) -> Option<usize> {
        self.entries.iter().position(|e| e.selected)
    }

    pub fn selected(&self) -> Option<&AnnotationEntry> {
        self.entries.iter().find(|e| e.selected)
    }

    /// Find the entry rendered by a region (e.g. after a click on it)
    pub fn index_of_region(&self, handle: RegionHandle) -> Option<usize> {
        self.entries.iter().position(|e| e.region == handle)
    }

    /// Take all change notifications queued since the last call
    ///
    /// Back-to-back free region updates are merged into the latest one, so
    /// playback ticks between two drains leave a single notification.
    pub fn drain_events(&mut self) -> Vec<StoreEvent> {
        std::mem::take(&mut self.events)
    }

    /// Append a pending entry over the free region
    ///
    /// Does nothing while an entry is selected. Returns the new entry's index.
    pub fn add_pending_entry(&mut self) -> Option<usize> {
        if let Some(index) = self.selected_index() {
            debug!("Entry {} is selected, not adding a pending entry", index);
            return None;
        }

        let (from, to) = self.free_region.sample_bounds();
        let index = self.push_entry(from, to, String::new());
        debug!("Added pending entry {} [{}, {}]", index, from, to);
        Some(index)
    }

    /// Label the selected entry, or create a labeled entry over the free region
    ///
    /// Returns the index of the labeled entry.
    pub fn label_region(&mut self, label_index: usize) -> Result<usize> {
        let label = self
            .taxonomy
            .label(label_index)
            .ok_or(AnnotationError::UnknownLabel(label_index))?
            .to_string();

        if let Some(index) = self.selected_index() {
            let entry = &mut self.entries[index];
            entry.event_label = label;
            let handle = entry.region;
            self.events.push(StoreEvent::RegionRestyled(handle));
            self.events.push(StoreEvent::TableChanged);
            debug!("Labeled selected entry {} as `{}`", index, self.entries[index].event_label);
            return Ok(index);
        }

        let (from, to) = self.free_region.sample_bounds();
        if from >= to || to > self.recording.len() {
            warn!("Refusing to label empty region [{}, {}]", from, to);
            return Err(AnnotationError::InvalidRegion { from, to });
        }

        let index = self.push_entry(from, to, label);
        debug!(
            "Added entry {} [{}, {}] as `{}`",
            index, from, to, self.entries[index].event_label
        );
        Ok(index)
    }

    /// Remove the selected entry and give control back to the free region
    pub fn delete_selected_entry(&mut self) -> Option<AnnotationEntry> {
        let index = self.selected_index()?;
        let entry = self.entries.remove(index);
        self.events.push(StoreEvent::RegionRemoved(entry.region));
        self.set_free_region_enabled(true);
        self.events.push(StoreEvent::TableChanged);
        debug!("Deleted entry {}", index);
        Some(entry)
    }

    /// Select the entry at `index`, or deselect it if it is already selected
    ///
    /// Rejected while audio is playing or when `index` is out of range.
    /// Returns whether the selection was changed.
    pub fn toggle_select(&mut self, index: usize) -> bool {
        if self.clock.is_playing() {
            debug!("Ignoring selection change during playback");
            return false;
        }
        if index >= self.entries.len() {
            warn!("No entry at row {}", index);
            return false;
        }

        if self.entries[index].selected {
            self.deselect_current();
            self.set_free_region_enabled(true);
        } else {
            self.deselect_current();
            self.select(index);
        }
        self.events.push(StoreEvent::TableChanged);
        true
    }

    /// Move the selection to the previous or next entry
    ///
    /// With nothing selected, `Next` selects the first entry. `Previous` on the
    /// first entry keeps the selection; `Next` on the last entry clamps.
    pub fn select_adjacent(&mut self, direction: Direction) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        if self.clock.is_playing() {
            debug!("Ignoring selection change during playback");
            return false;
        }

        let target = match (self.selected_index(), direction) {
            (None, Direction::Next) => 0,
            (None, Direction::Previous) => return false,
            (Some(0), Direction::Previous) => {
                self.events.push(StoreEvent::TableChanged);
                return false;
            }
            (Some(i), Direction::Previous) => i - 1,
            (Some(i), Direction::Next) => (i + 1).min(self.entries.len() - 1),
        };

        self.deselect_current();
        self.select(target);
        self.events.push(StoreEvent::TableChanged);
        true
    }

    /// Write new bounds to the selected entry after its region was dragged
    pub fn update_selected_region_bounds(&mut self, new_from: f64, new_to: f64) -> bool {
        let Some(index) = self.selected_index() else {
            return false;
        };

        let (from, to) = self.clamp(new_from, new_to);
        let entry = &mut self.entries[index];
        entry.from = from as usize;
        entry.to = to as usize;
        let handle = entry.region;
        self.events.push(StoreEvent::RegionMoved { handle, from, to });
        self.events.push(StoreEvent::TableChanged);
        true
    }

    /// Move the free region after the user dragged it
    ///
    /// Ignored while an entry is selected (the free region is hidden then).
    pub fn set_free_region(&mut self, from: f64, to: f64) -> bool {
        if !self.free_region.movable {
            return false;
        }
        self.move_free_region(from, to);
        true
    }

    /// Re-center the free region on the current playback position
    ///
    /// Called on every position notification; each call supersedes the last.
    pub fn on_playback_tick(&mut self) {
        let position = self.clock.position_samples();
        self.move_free_region(
            position - FREE_REGION_HALF_WIDTH,
            position + FREE_REGION_HALF_WIDTH,
        );
    }

    /// Sample range the "play region" action should play
    ///
    /// The selected entry if there is one, otherwise the free region.
    pub fn playable_range(&self) -> Option<Range<usize>> {
        let (from, to) = match self.selected() {
            Some(entry) => (entry.from, entry.to),
            None => self.free_region.sample_bounds(),
        };
        (from < to).then_some(from..to)
    }

    /// Per-class totals in taxonomy order, scaled so the largest is 1.0
    pub fn summarize(&self, metric: SummaryMetric) -> Vec<f64> {
        let mut totals = vec![0.0; self.taxonomy.len()];
        for entry in &self.entries {
            let Some(index) = self.taxonomy.index_of(&entry.event_label) else {
                continue;
            };
            totals[index] += match metric {
                SummaryMetric::Count => 1.0,
                SummaryMetric::TotalDuration => entry.len_samples() as f64,
            };
        }

        let max = totals.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            for value in &mut totals {
                *value /= max;
            }
        }
        totals
    }

    /// Table snapshot for rendering
    pub fn rows(&self) -> Vec<TableRow> {
        let rate = self.recording.sample_rate();
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| TableRow {
                index,
                from: format_sample_time(entry.from, rate),
                to: format_sample_time(entry.to, rate),
                event: if entry.is_pending() {
                    PENDING_LABEL.to_string()
                } else {
                    entry.event_label.clone()
                },
                selected: entry.selected,
                pending: entry.is_pending(),
            })
            .collect()
    }

    /// Snapshot the collection for persistence
    pub fn save(&self) -> AnnotationBundle {
        AnnotationBundle {
            source_filename: self.recording.file_name(),
            source_hash: self.recording.content_hash().to_string(),
            entries: self.entries.iter().map(AnnotationEntry::to_record).collect(),
            saved_at: Some(Utc::now()),
        }
    }

    /// Replace the collection with a bundle's entries
    ///
    /// The bundle must have been made from this recording. Nothing changes
    /// if validation fails.
    pub fn load(&mut self, bundle: AnnotationBundle) -> Result<()> {
        if bundle.source_hash != self.recording.content_hash() {
            return Err(AnnotationError::IntegrityMismatch {
                file_name: bundle.source_filename,
                expected: bundle.source_hash,
                actual: self.recording.content_hash().to_string(),
            });
        }
        if bundle.source_filename != self.recording.file_name() {
            warn!(
                "Bundle was made from `{}`, loading it onto `{}` (same content)",
                bundle.source_filename,
                self.recording.file_name()
            );
        }

        let len = self.recording.len();
        for (index, record) in bundle.entries.iter().enumerate() {
            if record.from > record.to || record.to > len {
                return Err(AnnotationError::InvalidBundle(format!(
                    "entry {} has bounds [{}, {}] outside 0..={}",
                    index, record.from, record.to, len
                )));
            }
            if !record.event_label.is_empty() && !self.taxonomy.contains(&record.event_label) {
                return Err(AnnotationError::InvalidBundle(format!(
                    "entry {} has unknown event `{}`",
                    index, record.event_label
                )));
            }
        }

        for entry in std::mem::take(&mut self.entries) {
            self.events.push(StoreEvent::RegionRemoved(entry.region));
        }
        for record in bundle.entries {
            let region = self.create_entry_region(record.from, record.to);
            self.entries.push(AnnotationEntry {
                initial_position: record.initial_position,
                from: record.from,
                to: record.to,
                event_label: record.event_label,
                selected: false,
                region,
            });
        }
        self.set_free_region_enabled(true);
        self.events.push(StoreEvent::TableChanged);
        debug!("Loaded {} entries", self.entries.len());
        Ok(())
    }

    fn push_entry(&mut self, from: usize, to: usize, event_label: String) -> usize {
        let region = self.create_entry_region(from, to);
        self.entries.push(AnnotationEntry {
            initial_position: self.clock.position_samples(),
            from,
            to,
            event_label,
            selected: false,
            region,
        });
        self.events.push(StoreEvent::TableChanged);
        self.entries.len() - 1
    }

    fn create_entry_region(&mut self, from: usize, to: usize) -> RegionHandle {
        let handle = RegionHandle(self.next_handle);
        self.next_handle += 1;
        self.events.push(StoreEvent::RegionCreated {
            handle,
            from: from as f64,
            to: to as f64,
            clickable: true,
        });
        handle
    }

    fn select(&mut self, index: usize) {
        let entry = &mut self.entries[index];
        entry.selected = true;
        let handle = entry.region;
        self.events.push(StoreEvent::RegionMovable {
            handle,
            movable: true,
        });
        self.events.push(StoreEvent::RegionRestyled(handle));
        self.set_free_region_enabled(false);
    }

    fn deselect_current(&mut self) {
        let Some(index) = self.selected_index() else {
            return;
        };
        let entry = &mut self.entries[index];
        entry.selected = false;
        let handle = entry.region;
        self.events.push(StoreEvent::RegionMovable {
            handle,
            movable: false,
        });
        self.events.push(StoreEvent::RegionRestyled(handle));
    }

    fn set_free_region_enabled(&mut self, enabled: bool) {
        self.free_region.movable = enabled;
        self.free_region.visible = enabled;
        self.push_free_region_changed();
    }

    fn move_free_region(&mut self, from: f64, to: f64) {
        let (from, to) = self.clamp(from, to);
        self.free_region.from = from;
        self.free_region.to = to;
        self.push_free_region_changed();
    }

    /// Queue the free region's current state, replacing a notification for
    /// it that is still at the back of the queue
    fn push_free_region_changed(&mut self) {
        let event = StoreEvent::FreeRegionChanged {
            from: self.free_region.from,
            to: self.free_region.to,
            enabled: self.free_region.visible,
        };
        match self.events.last_mut() {
            Some(last @ StoreEvent::FreeRegionChanged { .. }) => *last = event,
            _ => self.events.push(event),
        }
    }

    /// Order the bounds and clamp them to the recording
    fn clamp(&self, a: f64, b: f64) -> (f64, f64) {
        let len = self.recording.len() as f64;
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        (from.clamp(0.0, len), to.clamp(0.0, len))
    }
}
