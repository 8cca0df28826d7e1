/// Playback clock - derives the current track time from the audio device's own clock
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::audio::{decode_track, DecodedTrack};
use crate::error::{EditorError, Result};

/// The seam between the clock and whatever actually makes sound.
pub trait AudioBackend {
    /// Monotonic seconds as counted by the audio subsystem itself
    fn now(&self) -> f64;

    /// Begin sounding `track` from `offset` seconds into it
    fn play_from(&mut self, track: Arc<DecodedTrack>, offset: f64);

    /// Silence output, keeping the clock running
    fn halt(&mut self);
}

/// A clock reading tagged with whether playback is live.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Playhead {
    Running(f64),
    Halted(f64),
}

impl Playhead {
    pub fn is_running(self) -> bool {
        matches!(self, Playhead::Running(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Session {
    Stopped,
    Playing { reference: f64, offset: f64 },
    Paused { at: f64 },
}

pub struct PlaybackClock<B: AudioBackend> {
    backend: B,
    track: Option<Arc<DecodedTrack>>,
    session: Session,
}

impl<B: AudioBackend> PlaybackClock<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            track: None,
            session: Session::Stopped,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Decode raw bytes and install them. On failure nothing changes.
    pub fn load(&mut self, bytes: Vec<u8>, extension: Option<&str>) -> Result<f64> {
        let track = decode_track(bytes, extension).map_err(|e| {
            warn!(error = %e, "track decode failed");
            e
        })?;
        Ok(self.install(track))
    }

    /// Install an already decoded track. Playback is reset and never auto-starts.
    pub fn install(&mut self, track: DecodedTrack) -> f64 {
        self.backend.halt();
        self.session = Session::Stopped;
        let duration = track.duration();
        self.track = Some(Arc::new(track));
        info!(duration, "track installed");
        duration
    }

    pub fn has_track(&self) -> bool {
        self.track.is_some()
    }

    pub fn duration(&self) -> Option<f64> {
        self.track.as_ref().map(|t| t.duration())
    }

    /// Start from zero
    pub fn start(&mut self) -> Result<()> {
        let track = self
            .track
            .clone()
            .ok_or(EditorError::InvalidState("no track loaded"))?;
        if self.is_playing() {
            return Err(EditorError::InvalidState("already playing"));
        }

        self.backend.play_from(track, 0.0);
        self.session = Session::Playing {
            reference: self.backend.now(),
            offset: 0.0,
        };
        debug!("playback started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if !self.is_playing() {
            return Err(EditorError::InvalidState("not playing"));
        }
        let at = self.sample();
        self.backend.halt();
        self.session = Session::Paused { at };
        debug!(at, "playback paused");
        Ok(())
    }

    /// Continue from where `pause` left off
    pub fn resume(&mut self) -> Result<()> {
        let at = match self.session {
            Session::Paused { at } => at,
            _ => return Err(EditorError::InvalidState("not paused")),
        };
        let track = self
            .track
            .clone()
            .ok_or(EditorError::InvalidState("no track loaded"))?;

        self.backend.play_from(track, at);
        self.session = Session::Playing {
            reference: self.backend.now(),
            offset: at,
        };
        debug!(at, "playback resumed");
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.session != Session::Stopped {
            debug!("playback stopped");
        }
        self.backend.halt();
        self.session = Session::Stopped;
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.session, Session::Playing { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.session, Session::Paused { .. })
    }

    /// Playing, but the track has run out
    pub fn is_finished(&self) -> bool {
        match (self.session, self.duration()) {
            (Session::Playing { .. }, Some(duration)) => self.sample() >= duration,
            _ => false,
        }
    }

    /// Current track time in seconds. Pure read.
    pub fn sample(&self) -> f64 {
        match self.session {
            Session::Stopped => 0.0,
            Session::Paused { at } => at,
            Session::Playing { reference, offset } => {
                let elapsed = offset + (self.backend.now() - reference).max(0.0);
                match self.duration() {
                    Some(duration) => elapsed.min(duration),
                    None => elapsed,
                }
            }
        }
    }

    pub fn playhead(&self) -> Playhead {
        let t = self.sample();
        if self.is_playing() && !self.is_finished() {
            Playhead::Running(t)
        } else {
            Playhead::Halted(t)
        }
    }
}

/// Shared handle onto a `ManualBackend`'s time
#[derive(Debug, Clone, Default)]
pub struct ManualTime(Rc<Cell<f64>>);

impl ManualTime {
    pub fn get(&self) -> f64 {
        self.0.get()
    }

    pub fn advance(&self, secs: f64) {
        self.0.set(self.0.get() + secs);
    }
}

/// Backend whose clock only moves when told to. Makes no sound.
#[derive(Debug, Default)]
pub struct ManualBackend {
    time: ManualTime,
    sounding_from: Option<f64>,
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time(&self) -> ManualTime {
        self.time.clone()
    }

    /// Offset passed to the last `play_from`, if still sounding
    pub fn sounding_from(&self) -> Option<f64> {
        self.sounding_from
    }
}

impl AudioBackend for ManualBackend {
    fn now(&self) -> f64 {
        self.time.get()
    }

    fn play_from(&mut self, _track: Arc<DecodedTrack>, offset: f64) {
        self.sounding_from = Some(offset);
    }

    fn halt(&mut self) {
        self.sounding_from = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_with_track(seconds: f64) -> (PlaybackClock<ManualBackend>, ManualTime) {
        let backend = ManualBackend::new();
        let time = backend.time();
        let mut clock = PlaybackClock::new(backend);
        clock.install(DecodedTrack::silence(seconds, 1000));
        (clock, time)
    }

    #[test]
    fn test_start_requires_track() {
        let mut clock = PlaybackClock::new(ManualBackend::new());
        assert!(matches!(clock.start(), Err(EditorError::InvalidState(_))));
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_sample_follows_audio_clock() {
        let (mut clock, time) = clock_with_track(10.0);
        time.advance(3.0);
        clock.start().unwrap();
        assert_eq!(clock.sample(), 0.0);

        time.advance(1.25);
        assert_eq!(clock.sample(), 1.25);
        // Pure read
        assert_eq!(clock.sample(), 1.25);
        assert_eq!(clock.playhead(), Playhead::Running(1.25));
        assert_eq!(clock.backend().sounding_from(), Some(0.0));
    }

    #[test]
    fn test_start_twice_fails() {
        let (mut clock, _time) = clock_with_track(10.0);
        clock.start().unwrap();
        assert!(matches!(clock.start(), Err(EditorError::InvalidState(_))));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut clock, time) = clock_with_track(10.0);
        clock.start().unwrap();
        time.advance(2.0);

        clock.stop();
        assert_eq!(clock.sample(), 0.0);
        clock.stop();
        assert_eq!(clock.sample(), 0.0);
        assert!(!clock.is_playing());
        assert_eq!(clock.playhead(), Playhead::Halted(0.0));
        assert_eq!(clock.backend().sounding_from(), None);
    }

    #[test]
    fn test_pause_and_resume() {
        let (mut clock, time) = clock_with_track(10.0);
        clock.start().unwrap();
        time.advance(2.0);
        clock.pause().unwrap();

        time.advance(5.0);
        assert_eq!(clock.sample(), 2.0);
        assert!(!clock.playhead().is_running());

        clock.resume().unwrap();
        assert_eq!(clock.backend().sounding_from(), Some(2.0));
        time.advance(0.5);
        assert_eq!(clock.sample(), 2.5);

        assert!(clock.resume().is_err());
    }

    #[test]
    fn test_sample_clamps_to_duration() {
        let (mut clock, time) = clock_with_track(4.0);
        clock.start().unwrap();
        time.advance(9.0);
        assert_eq!(clock.sample(), 4.0);
        assert!(clock.is_finished());
        assert_eq!(clock.playhead(), Playhead::Halted(4.0));
    }

    #[test]
    fn test_install_resets_and_never_starts() {
        let (mut clock, time) = clock_with_track(10.0);
        clock.start().unwrap();
        time.advance(1.0);

        let duration = clock.install(DecodedTrack::silence(2.0, 1000));
        assert_eq!(duration, 2.0);
        assert!(!clock.is_playing());
        assert_eq!(clock.sample(), 0.0);
    }

    #[test]
    fn test_failed_load_keeps_state() {
        let (mut clock, time) = clock_with_track(10.0);
        clock.start().unwrap();
        time.advance(1.5);

        let err = clock.load(b"definitely not audio".to_vec(), None).unwrap_err();
        assert!(matches!(err, EditorError::Decode(_)));
        assert!(clock.is_playing());
        assert_eq!(clock.sample(), 1.5);
        assert_eq!(clock.duration(), Some(10.0));
    }
}
