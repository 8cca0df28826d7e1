/// Note store - the time-ordered list of placed arrows
/// Insertion is debounced so a physical double hit only lands once
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::clock::Playhead;
use crate::error::{EditorError, Result};

pub mod keys;

/// Minimum spacing between two accepted notes, in seconds.
pub const MIN_GAP: f64 = 0.1;

/// Window used to decide which notes are "current" during playback.
pub const HIGHLIGHT_WINDOW: f64 = 0.1;

const MIN_GAP_CENTIS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Down,
        Direction::Up,
        Direction::Right,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(format!("Unknown direction: {}", other)),
        }
    }
}

/// A timed directional cue. Time is held in hundredths of a second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    centis: u32,
    direction: Direction,
}

impl Note {
    /// Build a note, rounding `time` to the nearest 0.01s (negative clamps to 0)
    pub fn new(time: f64, direction: Direction) -> Self {
        Self {
            centis: quantize(time),
            direction,
        }
    }

    pub fn time(&self) -> f64 {
        self.centis as f64 / 100.0
    }

    pub fn centis(&self) -> u32 {
        self.centis
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Time with exactly two decimals, e.g. `12.05`
    pub fn time_label(&self) -> String {
        format!("{}.{:02}", self.centis / 100, self.centis % 100)
    }
}

fn quantize(time: f64) -> u32 {
    if !time.is_finite() || time <= 0.0 {
        return 0;
    }
    (time * 100.0).round().min(u32::MAX as f64) as u32
}

#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    notes: Vec<Note>,
    last_accepted: Option<u32>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Place a note at the playhead position.
    ///
    /// Rejects when playback is halted, or when the note would land less than
    /// `MIN_GAP` after the last accepted note of any direction.
    pub fn insert(&mut self, direction: Direction, playhead: Playhead) -> Result<Note> {
        let time = match playhead {
            Playhead::Running(t) => t,
            Playhead::Halted(_) => return Err(EditorError::NotPlaying),
        };

        let note = Note::new(time, direction);

        if let Some(last) = self.last_accepted {
            if (note.centis as i64) - (last as i64) < MIN_GAP_CENTIS as i64 {
                debug!(time = note.time(), last = last as f64 / 100.0, "note rejected");
                return Err(EditorError::TooClose {
                    time: note.time(),
                    last: last as f64 / 100.0,
                });
            }
        }

        // Equal times keep insertion order
        let pos = self.notes.partition_point(|n| n.centis <= note.centis);
        self.notes.insert(pos, note);
        self.last_accepted = Some(note.centis);
        debug!(time = note.time(), direction = %direction, index = pos, "note accepted");

        Ok(note)
    }

    /// Forget the last accepted time, e.g. when a new take starts from zero
    pub fn rearm(&mut self) {
        self.last_accepted = None;
    }

    pub fn delete_at(&mut self, index: usize) -> Result<Note> {
        if index >= self.notes.len() {
            return Err(EditorError::IndexOutOfRange {
                index,
                len: self.notes.len(),
            });
        }
        Ok(self.notes.remove(index))
    }

    pub fn snapshot(&self) -> &[Note] {
        &self.notes
    }

    /// All notes with `|note.time - time| < epsilon`, compared in hundredths
    pub fn notes_near(&self, time: f64, epsilon: f64) -> Vec<Note> {
        self.indices_near(time, epsilon)
            .into_iter()
            .map(|i| self.notes[i])
            .collect()
    }

    /// Positions of the notes `notes_near` would return
    pub fn indices_near(&self, time: f64, epsilon: f64) -> Vec<usize> {
        let at = quantize(time);
        let window = quantize(epsilon);
        self.notes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.centis.abs_diff(at) < window)
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of the first note at or after `time`
    pub fn next_at_or_after(&self, time: f64) -> Option<usize> {
        let idx = self.notes.partition_point(|n| n.time() < time);
        (idx < self.notes.len()).then_some(idx)
    }
}
