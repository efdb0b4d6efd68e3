//! Console front end for annotation sessions
//!
//! Reads one command per line, forwards it to the annotation store and keeps
//! its own map of region views up to date from the store's change events.

use crate::audio::{PlaybackClock, Recording, SharedPlaybackClock, NOTIFY_INTERVAL};
use crate::export::{export_event_clips, save_csv, ClipCount};
use crate::models::{
    format_sample_time, Direction, EntryRecord, RegionHandle, StoreEvent, SummaryMetric,
};
use crate::settings::EventTaxonomy;
use crate::state::{default_bundle_path, open_bundle, AnnotationStore, BUNDLE_EXTENSION};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BAR_WIDTH: usize = 40;

/// A parsed console command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add,
    Label(usize),
    Delete,
    Select(usize),
    Next,
    Previous,
    Region(f64, f64),
    Drag(f64, f64),
    Play,
    Stop,
    Toggle,
    Tick(u32),
    Seek(f64),
    Preview,
    Table,
    Regions,
    Summary(SummaryMetric),
    Save(Option<PathBuf>),
    Csv(PathBuf),
    Export(PathBuf),
    Help,
    Quit { force: bool },
}

impl Command {
    /// Parse one input line; a bare shortcut key labels the current region
    pub fn parse(line: &str, taxonomy: &EventTaxonomy) -> std::result::Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err("empty command".to_string());
        };
        let rest: Vec<&str> = words.collect();

        let command = match head.to_lowercase().as_str() {
            "add" | "enter" => Command::Add,
            "label" => {
                let name = rest.join(" ");
                let index = taxonomy
                    .index_for_shortcut(&name)
                    .or_else(|| taxonomy.index_of(&name))
                    .ok_or_else(|| format!("unknown event class `{}`", name))?;
                Command::Label(index)
            }
            "delete" | "del" => Command::Delete,
            "select" => Command::Select(parse_arg(&rest, 0, "row")?),
            "next" | "right" => Command::Next,
            "prev" | "previous" | "left" => Command::Previous,
            "region" => Command::Region(parse_arg(&rest, 0, "from")?, parse_arg(&rest, 1, "to")?),
            "drag" => Command::Drag(parse_arg(&rest, 0, "from")?, parse_arg(&rest, 1, "to")?),
            "play" => Command::Play,
            "stop" => Command::Stop,
            "toggle" | "space" => Command::Toggle,
            "tick" => Command::Tick(if rest.is_empty() { 1 } else { parse_arg(&rest, 0, "count")? }),
            "seek" => Command::Seek(parse_arg(&rest, 0, "seconds")?),
            "preview" | "p" => Command::Preview,
            "table" | "ls" => Command::Table,
            "regions" => Command::Regions,
            "summary" => {
                let metric = match rest.first() {
                    None => SummaryMetric::default(),
                    Some(name) => SummaryMetric::parse(name)
                        .ok_or_else(|| format!("unknown metric `{}`", name))?,
                };
                Command::Summary(metric)
            }
            "save" => Command::Save(rest.first().map(|p| PathBuf::from(*p))),
            "csv" => Command::Csv(PathBuf::from(parse_arg::<String>(&rest, 0, "path")?)),
            "export" => Command::Export(PathBuf::from(parse_arg::<String>(&rest, 0, "directory")?)),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit { force: false },
            "quit!" | "exit!" => Command::Quit { force: true },
            _ => match taxonomy.index_for_shortcut(head) {
                Some(index) if rest.is_empty() => Command::Label(index),
                _ => return Err(format!("unknown command `{}` (try `help`)", head)),
            },
        };
        Ok(command)
    }
}

fn parse_arg<T: std::str::FromStr>(
    args: &[&str],
    position: usize,
    name: &str,
) -> std::result::Result<T, String> {
    let raw = args
        .get(position)
        .ok_or_else(|| format!("missing argument <{}>", name))?;
    raw.parse()
        .map_err(|_| format!("invalid value `{}` for <{}>", raw, name))
}

/// What the presentation side knows about a region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionView {
    pub from: f64,
    pub to: f64,
    pub clickable: bool,
    pub movable: bool,
}

enum Flow {
    Continue,
    Quit,
}

/// One recording, its annotations and the playback clock
pub struct Session {
    store: AnnotationStore,
    clock: SharedPlaybackClock,
    bundle_path: Option<PathBuf>,
    saved: Vec<EntryRecord>,
    regions: BTreeMap<RegionHandle, RegionView>,
}

impl Session {
    /// Start a fresh session on a recording
    pub fn import(path: impl AsRef<Path>, taxonomy: EventTaxonomy) -> Result<Self> {
        let recording = Recording::load(path.as_ref())?;
        Ok(Self::with_recording(recording, taxonomy))
    }

    /// Continue a saved session
    pub fn open(path: impl AsRef<Path>, taxonomy: EventTaxonomy) -> Result<Self> {
        let path = path.as_ref();
        let (bundle, recording) = open_bundle(path)?;
        let mut session = Self::with_recording(recording, taxonomy);
        session
            .store
            .load(bundle)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        session.bundle_path = Some(path.to_path_buf());
        session.mark_saved();
        session.apply_events();
        Ok(session)
    }

    /// Open either a `.wav` recording or an `.airway` bundle
    pub fn from_path(path: impl AsRef<Path>, taxonomy: EventTaxonomy) -> Result<Self> {
        let path = path.as_ref();
        let is_bundle = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(BUNDLE_EXTENSION))
            .unwrap_or(false);
        if is_bundle {
            Self::open(path, taxonomy)
        } else {
            Self::import(path, taxonomy)
        }
    }

    fn with_recording(recording: Recording, taxonomy: EventTaxonomy) -> Self {
        let clock = SharedPlaybackClock::new(recording.sample_rate(), recording.len());
        let store = AnnotationStore::new(Arc::new(recording), taxonomy, Box::new(clock.clone()));
        let mut session = Self {
            store,
            clock,
            bundle_path: None,
            saved: Vec::new(),
            regions: BTreeMap::new(),
        };
        session.apply_events();
        session
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn regions(&self) -> &BTreeMap<RegionHandle, RegionView> {
        &self.regions
    }

    pub fn bundle_path(&self) -> Option<&Path> {
        self.bundle_path.as_deref()
    }

    /// Whether the table differs from what was last saved or opened
    pub fn has_unsaved_changes(&self) -> bool {
        let current: Vec<EntryRecord> = self.store.entries().iter().map(|e| e.to_record()).collect();
        current != self.saved
    }

    /// Run commands until `quit` or end of input
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> Result<()> {
        let recording = self.store.recording();
        writeln!(
            out,
            "{}: {} frames at {}Hz ({}), {} annotation(s). Type `help` for commands.",
            recording.file_name(),
            recording.len(),
            recording.sample_rate(),
            format_sample_time(recording.len(), recording.sample_rate()),
            self.store.len()
        )?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let flow = match Command::parse(line, self.store.taxonomy()) {
                Ok(command) => match self.execute(command, &mut out) {
                    Ok(flow) => flow,
                    Err(e) => {
                        writeln!(out, "error: {:#}", e)?;
                        Flow::Continue
                    }
                },
                Err(message) => {
                    writeln!(out, "error: {}", message)?;
                    Flow::Continue
                }
            };
            self.apply_events();

            if let Flow::Quit = flow {
                return Ok(());
            }
        }

        if self.has_unsaved_changes() {
            warn!("Input ended with unsaved annotations");
        }
        Ok(())
    }

    fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<Flow> {
        debug!("Command: {:?}", command);
        match command {
            Command::Add => {
                if self.store.add_pending_entry().is_none() {
                    writeln!(out, "deselect the current row before adding an event")?;
                }
            }
            Command::Label(index) => {
                let row = self.store.label_region(index)?;
                let entry = &self.store.entries()[row];
                writeln!(out, "row {}: {}", row, entry.event_label)?;
            }
            Command::Delete => {
                if self.store.delete_selected_entry().is_none() {
                    writeln!(out, "no row selected")?;
                }
            }
            Command::Select(row) => {
                if !self.store.toggle_select(row) {
                    writeln!(out, "can't change the selection now")?;
                }
            }
            Command::Next => {
                self.store.select_adjacent(Direction::Next);
            }
            Command::Previous => {
                self.store.select_adjacent(Direction::Previous);
            }
            Command::Region(from, to) => {
                if !self.store.set_free_region(from, to) {
                    writeln!(out, "the free region is locked while a row is selected")?;
                }
            }
            Command::Drag(from, to) => {
                if !self.store.update_selected_region_bounds(from, to) {
                    writeln!(out, "no row selected")?;
                }
            }
            Command::Play => self.clock.play(),
            Command::Stop => self.clock.stop(),
            Command::Toggle => {
                self.clock.toggle();
            }
            Command::Tick(count) => {
                for _ in 0..count {
                    if !self.clock.is_playing() {
                        break;
                    }
                    self.clock.advance(NOTIFY_INTERVAL);
                    self.store.on_playback_tick();
                }
                self.write_position(out)?;
            }
            Command::Seek(seconds) => {
                self.clock.seek_seconds(seconds);
                self.store.on_playback_tick();
                self.write_position(out)?;
            }
            Command::Preview => match self.store.playable_range() {
                Some(range) => {
                    let rate = self.store.recording().sample_rate();
                    writeln!(
                        out,
                        "playing {} - {} ({}..{})",
                        format_sample_time(range.start, rate),
                        format_sample_time(range.end, rate),
                        range.start,
                        range.end
                    )?;
                }
                None => writeln!(out, "nothing to play")?,
            },
            Command::Table => self.write_table(out)?,
            Command::Regions => {
                for (handle, view) in &self.regions {
                    writeln!(
                        out,
                        "{} [{:.0}, {:.0}]{}{}",
                        handle,
                        view.from,
                        view.to,
                        if view.clickable { "" } else { " free" },
                        if view.movable { " movable" } else { "" }
                    )?;
                }
            }
            Command::Summary(metric) => self.write_summary(metric, out)?,
            Command::Save(path) => {
                let path = self.save(path)?;
                writeln!(out, "saved annotations to {}", path.display())?;
            }
            Command::Csv(path) => {
                save_csv(
                    &path,
                    self.store.entries(),
                    self.store.recording().sample_rate(),
                )?;
                writeln!(out, "wrote {}", path.display())?;
            }
            Command::Export(dir) => {
                let counts = self.export_events(&dir)?;
                for count in counts {
                    writeln!(out, "{}: {}", count.label, count.clips)?;
                }
            }
            Command::Help => write_help(out, self.store.taxonomy())?,
            Command::Quit { force } => {
                if !force && self.has_unsaved_changes() {
                    writeln!(out, "unsaved changes; `save` first or use `quit!`")?;
                    return Ok(Flow::Continue);
                }
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Save to `path`, the bundle this session came from, or next to the recording
    pub fn save(&mut self, path: Option<PathBuf>) -> Result<PathBuf> {
        let path = path
            .or_else(|| self.bundle_path.clone())
            .unwrap_or_else(|| default_bundle_path(self.store.recording().path()));
        self.store
            .save()
            .write(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        self.bundle_path = Some(path.clone());
        self.mark_saved();
        Ok(path)
    }

    /// Write one WAV file per labeled event
    pub fn export_events(&self, dir: &Path) -> Result<Vec<ClipCount>> {
        let counts = export_event_clips(
            dir,
            self.store.recording(),
            self.store.entries(),
            self.store.taxonomy(),
        )
        .with_context(|| format!("Failed to export events to {}", dir.display()))?;
        Ok(counts)
    }

    pub fn write_table<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{:>4}  {:3}  {:<12} {:<12} Event", "#", "sel", "From", "To")?;
        for row in self.store.rows() {
            writeln!(
                out,
                "{:>4}  {:3}  {:<12} {:<12} {}",
                row.index,
                if row.selected { "[x]" } else { "[ ]" },
                row.from,
                row.to,
                row.event
            )?;
        }
        Ok(())
    }

    pub fn write_summary<W: Write>(&self, metric: SummaryMetric, out: &mut W) -> Result<()> {
        let values = self.store.summarize(metric);
        let width = self.store.taxonomy().labels().map(str::len).max().unwrap_or(0);
        writeln!(out, "{}", metric.display_name())?;
        for (label, value) in self.store.taxonomy().labels().zip(values) {
            let bar = "#".repeat((value * BAR_WIDTH as f64).round() as usize);
            writeln!(out, "{:<width$} {:>5.2} {}", label, value, bar, width = width)?;
        }
        Ok(())
    }

    fn write_position<W: Write>(&self, out: &mut W) -> Result<()> {
        let rate = self.store.recording().sample_rate();
        let (from, to) = self.store.free_region().sample_bounds();
        writeln!(
            out,
            "{} {:.2}s / {:.2}s, region {} - {}",
            if self.clock.is_playing() { "playing" } else { "stopped" },
            self.clock.current_time(),
            self.clock.duration(),
            format_sample_time(from, rate),
            format_sample_time(to, rate)
        )?;
        Ok(())
    }

    fn mark_saved(&mut self) {
        self.saved = self.store.entries().iter().map(|e| e.to_record()).collect();
    }

    /// Mirror the store's change notifications into the region views
    fn apply_events(&mut self) {
        for event in self.store.drain_events() {
            match event {
                StoreEvent::RegionCreated {
                    handle,
                    from,
                    to,
                    clickable,
                } => {
                    self.regions.insert(
                        handle,
                        RegionView {
                            from,
                            to,
                            clickable,
                            movable: !clickable,
                        },
                    );
                }
                StoreEvent::RegionMoved { handle, from, to } => {
                    if let Some(view) = self.regions.get_mut(&handle) {
                        view.from = from;
                        view.to = to;
                    }
                }
                StoreEvent::RegionRemoved(handle) => {
                    self.regions.remove(&handle);
                }
                StoreEvent::RegionMovable { handle, movable } => {
                    if let Some(view) = self.regions.get_mut(&handle) {
                        view.movable = movable;
                    }
                }
                StoreEvent::FreeRegionChanged { from, to, enabled } => {
                    let handle = self.store.free_region().handle;
                    if let Some(view) = self.regions.get_mut(&handle) {
                        view.from = from;
                        view.to = to;
                        view.movable = enabled;
                    }
                }
                StoreEvent::RegionRestyled(_) | StoreEvent::TableChanged => {}
            }
        }
    }
}

fn write_help<W: Write>(out: &mut W, taxonomy: &EventTaxonomy) -> Result<()> {
    writeln!(
        out,
        "add                 add a pending event over the free region (Enter)\n\
         label <key|name>    label the selected row or the free region\n\
         delete              delete the selected row (Del)\n\
         select <row>        select or deselect a row\n\
         next / prev         move the selection (Right / Left)\n\
         region <from> <to>  move the free region (samples)\n\
         drag <from> <to>    resize the selected row (samples)\n\
         play / stop / toggle, tick [n], seek <seconds>\n\
         preview             play the selected row or free region (P)\n\
         table, regions, summary [count|duration]\n\
         save [path], csv <path>, export <dir>, quit"
    )?;
    writeln!(out, "event classes:")?;
    for class in taxonomy.classes() {
        writeln!(out, "  ({}) {}", class.shortcut, class.label)?;
    }
    Ok(())
}

/// Load a bundle and print its per-class summary
pub fn print_summary<W: Write>(
    bundle: &Path,
    taxonomy: EventTaxonomy,
    metric: SummaryMetric,
    mut out: W,
) -> Result<()> {
    let session = Session::open(bundle, taxonomy)?;
    session.write_summary(metric, &mut out)
}

/// Load a bundle and write its CSV report
pub fn export_csv(bundle: &Path, taxonomy: EventTaxonomy, output: &Path) -> Result<()> {
    let session = Session::open(bundle, taxonomy)?;
    let store = session.store();
    save_csv(output, store.entries(), store.recording().sample_rate())
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("CSV report written to {}", output.display());
    Ok(())
}

/// Load a bundle and write one WAV file per labeled event
pub fn export_events(bundle: &Path, taxonomy: EventTaxonomy, dir: &Path) -> Result<()> {
    let session = Session::open(bundle, taxonomy)?;
    session.export_events(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::write_test_wav;
    use std::io::Cursor;

    fn run_script(session: &mut Session, script: &str) -> String {
        let mut out = Vec::new();
        session.run(Cursor::new(script), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn imported(frames: usize) -> (tempfile::TempDir, PathBuf, Session) {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("take.wav");
        write_test_wav(&wav, frames, 1, 8000);
        let session = Session::from_path(&wav, EventTaxonomy::default()).unwrap();
        (dir, wav, session)
    }

    #[test]
    fn test_parse_commands() {
        let taxonomy = EventTaxonomy::default();
        assert_eq!(Command::parse("add", &taxonomy), Ok(Command::Add));
        assert_eq!(Command::parse("s", &taxonomy), Ok(Command::Label(8)));
        assert_eq!(Command::parse("label dry cough", &taxonomy), Ok(Command::Label(1)));
        assert_eq!(Command::parse("label Q", &taxonomy), Ok(Command::Label(9)));
        assert_eq!(Command::parse("region 10 20.5", &taxonomy), Ok(Command::Region(10.0, 20.5)));
        assert_eq!(Command::parse("tick", &taxonomy), Ok(Command::Tick(1)));
        assert_eq!(
            Command::parse("summary count", &taxonomy),
            Ok(Command::Summary(SummaryMetric::Count))
        );
        assert_eq!(Command::parse("quit!", &taxonomy), Ok(Command::Quit { force: true }));
        assert!(Command::parse("select", &taxonomy).is_err());
        assert!(Command::parse("select x", &taxonomy).is_err());
        assert!(Command::parse("label hiccup", &taxonomy).is_err());
        assert!(Command::parse("frobnicate", &taxonomy).is_err());
    }

    #[test]
    fn test_session_annotates_and_saves() {
        let (dir, wav, mut session) = imported(40_000);
        let output = run_script(
            &mut session,
            "region 1000 5000\nadd\nregion 8000 9000\n2\nselect 0\ns\nnext\ndelete\ntable\nsave\nquit\n",
        );

        assert!(output.contains("row 1: dry cough"));
        assert!(output.contains("row 0: speech"));
        let store = session.store();
        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].event_label, "speech");
        assert_eq!(store.selected_index(), None);
        assert!(!session.has_unsaved_changes());

        let bundle_path = dir.path().join("take.airway");
        assert_eq!(session.bundle_path(), Some(bundle_path.as_path()));

        let reopened = Session::from_path(&bundle_path, EventTaxonomy::default()).unwrap();
        assert_eq!(reopened.store().entries()[0].to_record(), store.entries()[0].to_record());
        assert_eq!(reopened.store().recording().path(), wav.as_path());
    }

    #[test]
    fn test_errors_do_not_end_session() {
        let (_dir, _wav, mut session) = imported(10_000);
        let output = run_script(&mut session, "region 0 0\n1\nbogus\nadd\nquit\nquit!\n");
        assert!(output.contains("error: please select a region"));
        assert!(output.contains("error: unknown command `bogus`"));
        assert!(output.contains("unsaved changes"));
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn test_playback_moves_free_region() {
        let (_dir, _wav, mut session) = imported(80_000);
        let output = run_script(&mut session, "seek 3\nplay\ntick 50\nselect 0\nstop\n");
        // 3s + 50 * 20ms at 8kHz = 32000 samples
        assert_eq!(
            session.store().free_region().sample_bounds(),
            (22_000, 42_000)
        );
        assert!(output.contains("playing 4.00s"));

        let free = session.store().free_region().handle;
        assert_eq!(session.regions()[&free].from, 22_000.0);
    }

    #[test]
    fn test_region_views_follow_store() {
        let (_dir, _wav, mut session) = imported(10_000);
        run_script(&mut session, "region 100 200\nadd\nselect 0\ndrag 150 300\n");

        let handle = session.store().entries()[0].region;
        let view = &session.regions()[&handle];
        assert_eq!((view.from, view.to), (150.0, 300.0));
        assert!(view.movable && view.clickable);
        let free = session.store().free_region().handle;
        assert!(!session.regions()[&free].movable);

        run_script(&mut session, "delete\n");
        assert!(!session.regions().contains_key(&handle));
        assert!(session.regions()[&free].movable);
    }

    #[test]
    fn test_batch_exports() {
        let (dir, _wav, mut session) = imported(20_000);
        run_script(&mut session, "region 0 800\n1\nregion 1000 1400\n1\nsave\n");
        let bundle = session.bundle_path().unwrap().to_path_buf();

        let mut summary = Vec::new();
        print_summary(&bundle, EventTaxonomy::default(), SummaryMetric::Count, &mut summary)
            .unwrap();
        let summary = String::from_utf8(summary).unwrap();
        assert!(summary.starts_with("Count\n"));
        assert!(summary.contains("wet cough"));

        let csv_path = dir.path().join("take.csv");
        export_csv(&bundle, EventTaxonomy::default(), &csv_path).unwrap();
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().count(), 3);

        let events = dir.path().join("events");
        export_events(&bundle, EventTaxonomy::default(), &events).unwrap();
        assert!(events.join("wet cough").join("wet cough_1.wav").is_file());
    }
}
