/// Key capture - per-direction debounce in front of the note store
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::{Direction, MIN_GAP};

/// Remembers when each direction key last fired. A key that fires again
/// within `MIN_GAP` of its own last trigger is swallowed before it reaches
/// the store; other directions are unaffected.
#[derive(Debug, Clone)]
pub struct KeyCapture {
    last_trigger: HashMap<Direction, Instant>,
    window: Duration,
}

impl KeyCapture {
    pub fn new() -> Self {
        Self {
            last_trigger: HashMap::new(),
            window: Duration::from_secs_f64(MIN_GAP),
        }
    }

    /// Returns true when the press should be forwarded as a note.
    /// `repeat` marks OS auto-repeat events, which never count.
    pub fn accept(&mut self, direction: Direction, repeat: bool, at: Instant) -> bool {
        if repeat {
            return false;
        }

        if let Some(last) = self.last_trigger.get(&direction) {
            if at.saturating_duration_since(*last) < self.window {
                return false;
            }
        }

        self.last_trigger.insert(direction, at);
        true
    }

    pub fn reset(&mut self) {
        self.last_trigger.clear();
    }
}

impl Default for KeyCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_direction_debounced() {
        let mut keys = KeyCapture::new();
        let t0 = Instant::now();
        assert!(keys.accept(Direction::Left, false, t0));
        assert!(!keys.accept(Direction::Left, false, t0 + Duration::from_millis(50)));
        assert!(keys.accept(Direction::Left, false, t0 + Duration::from_millis(150)));
    }

    #[test]
    fn test_other_direction_passes() {
        let mut keys = KeyCapture::new();
        let t0 = Instant::now();
        assert!(keys.accept(Direction::Left, false, t0));
        assert!(keys.accept(Direction::Down, false, t0 + Duration::from_millis(20)));
    }

    #[test]
    fn test_repeat_ignored() {
        let mut keys = KeyCapture::new();
        let t0 = Instant::now();
        assert!(!keys.accept(Direction::Up, true, t0));
        // A swallowed repeat does not start the window
        assert!(keys.accept(Direction::Up, false, t0 + Duration::from_millis(10)));
    }

    #[test]
    fn test_reset_forgets_triggers() {
        let mut keys = KeyCapture::new();
        let t0 = Instant::now();
        assert!(keys.accept(Direction::Right, false, t0));
        keys.reset();
        assert!(keys.accept(Direction::Right, false, t0 + Duration::from_millis(10)));
    }
}
