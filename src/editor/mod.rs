/// Editor facade - the host-facing API over clock, note store and exporter
/// Every operation also leaves a one-line status message for the host to show
use std::path::Path;

use tracing::{debug, info};

use crate::audio::{AudioOutput, DecodedTrack};
use crate::clock::{AudioBackend, PlaybackClock};
use crate::error::{EditorError, Result};
use crate::export::{export, track_name_from_filename, PatternMeta};
use crate::notes::{Direction, Note, NoteStore, HIGHLIGHT_WINDOW};

pub struct BeatmapEditor<B: AudioBackend = AudioOutput> {
    clock: PlaybackClock<B>,
    notes: NoteStore,
    track_name: Option<String>,
    status: String,
}

impl<B: AudioBackend> BeatmapEditor<B> {
    pub fn new(backend: B) -> Self {
        Self {
            clock: PlaybackClock::new(backend),
            notes: NoteStore::new(),
            track_name: None,
            status: "Load an audio file to begin".to_string(),
        }
    }

    pub fn clock(&self) -> &PlaybackClock<B> {
        &self.clock
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    fn fail<T>(&mut self, err: EditorError) -> Result<T> {
        debug!(error = %err, "operation rejected");
        self.status = err.to_string();
        Err(err)
    }

    pub fn track_name(&self) -> Option<&str> {
        self.track_name.as_deref()
    }

    pub fn duration(&self) -> Option<f64> {
        self.clock.duration()
    }

    /// Decode and install a track chosen by the user
    pub fn load_track(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<f64> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_owned);

        match self.clock.load(bytes, extension.as_deref()) {
            Ok(duration) => Ok(self.loaded(file_name, duration)),
            Err(err) => self.fail(err),
        }
    }

    /// Install a track decoded elsewhere (e.g. on a worker thread)
    pub fn install_track(&mut self, file_name: &str, track: DecodedTrack) -> f64 {
        let duration = self.clock.install(track);
        self.loaded(file_name, duration)
    }

    fn loaded(&mut self, file_name: &str, duration: f64) -> f64 {
        let name = track_name_from_filename(file_name);
        info!(name = %name, duration, "track loaded");
        self.status = format!("Loaded: {}", name);
        self.track_name = Some(name);
        duration
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Start a new take, or continue a paused one
    pub fn play(&mut self) -> Result<()> {
        let at_end = match self.clock.duration() {
            Some(duration) => self.clock.sample() >= duration,
            None => false,
        };

        let res = if self.clock.is_paused() && !at_end {
            self.clock.resume()
        } else {
            if self.clock.is_paused() {
                self.clock.stop();
            }
            self.clock.start().map(|()| self.notes.rearm())
        };

        match res {
            Ok(()) => {
                self.status = "Playing".to_string();
                Ok(())
            }
            Err(EditorError::InvalidState("no track loaded")) => {
                self.status = "Please load an audio file first".to_string();
                Err(EditorError::InvalidState("no track loaded"))
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        match self.clock.pause() {
            Ok(()) => {
                self.status = "Paused".to_string();
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn toggle_playback(&mut self) -> Result<()> {
        if self.clock.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        self.status = "Stopped".to_string();
    }

    /// Per-frame housekeeping: parks the clock once the track runs out
    pub fn update(&mut self) {
        if self.clock.is_finished() && self.clock.pause().is_ok() {
            self.status = "Finished".to_string();
        }
    }

    /// Place a note for `direction` at the current playback time
    pub fn register_key_press(&mut self, direction: Direction) -> Result<Note> {
        if !self.clock.has_track() {
            self.status = "Please load an audio file first".to_string();
            return Err(EditorError::NotPlaying);
        }

        match self.notes.insert(direction, self.clock.playhead()) {
            Ok(note) => {
                self.status = format!(
                    "Added {} arrow at {}",
                    direction,
                    format_time(note.time())
                );
                Ok(note)
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn delete_note(&mut self, index: usize) -> Result<Note> {
        match self.notes.delete_at(index) {
            Ok(note) => {
                self.status = "Note deleted".to_string();
                Ok(note)
            }
            Err(err) => self.fail(err),
        }
    }

    pub fn snapshot(&self) -> &[Note] {
        self.notes.snapshot()
    }

    pub fn current_time(&self) -> f64 {
        self.clock.sample()
    }

    /// Indices of the notes sounding now; empty unless playing
    pub fn current_notes(&self) -> Vec<usize> {
        if !self.clock.is_playing() {
            return Vec::new();
        }
        self.notes.indices_near(self.clock.sample(), HIGHLIGHT_WINDOW)
    }

    /// The next note to keep in view while playing
    pub fn upcoming_note(&self) -> Option<usize> {
        if !self.clock.is_playing() {
            return None;
        }
        self.notes.next_at_or_after(self.clock.sample())
    }

    pub fn export_pattern(&mut self) -> Result<String> {
        let meta = self
            .track_name
            .as_ref()
            .map(PatternMeta::new)
            .unwrap_or_default();

        match export(self.notes.snapshot(), &meta) {
            Ok(doc) => {
                self.status = "Beatmap saved!".to_string();
                Ok(doc)
            }
            Err(err) => self.fail(err),
        }
    }
}

/// `m:ss.mmm`
pub fn format_time(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let millis_total = (seconds * 1000.0).floor() as u64;
    let mins = millis_total / 60_000;
    let secs = (millis_total / 1000) % 60;
    let ms = millis_total % 1000;
    format!("{}:{:02}.{:03}", mins, secs, ms)
}
