/// STEPMAP - A step editor core for arrow-based rhythm games
///
/// This library provides the pieces behind recording a step chart:
/// - Playback clock driven by the audio device's own clock
/// - Note store with debounced, time-ordered insertion
/// - Lua pattern export with annotated 8-second sections
/// - Audio decoding and output for previewing the track

pub mod audio;
pub mod clock;
pub mod editor;
pub mod error;
pub mod export;
pub mod notes;

// Re-export commonly used types
pub use audio::{decode_track, AudioOutput, DecodedTrack};
pub use clock::{AudioBackend, ManualBackend, PlaybackClock, Playhead};
pub use editor::{format_time, BeatmapEditor};
pub use error::{EditorError, Result};
pub use export::{export, track_name_from_filename, PatternMeta, SECTION_SIZE};
pub use notes::keys::KeyCapture;
pub use notes::{Direction, Note, NoteStore, HIGHLIGHT_WINDOW, MIN_GAP};
