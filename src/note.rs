//! A single paired note-on / note-off.

use crate::event::Tick;
use std::fmt;

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C sharp ", "D", "D sharp ", "E", "F", "F sharp ", "G", "G sharp ", "A", "A sharp ", "B",
];

/// Spoken name of a MIDI pitch, e.g. `60` is `"C4"` and `61` is `"C sharp 4"`.
///
/// Names are one-to-one with pitch indices.
pub fn pitch_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

/// A note opened by a note-on and, once terminated, closed by a note-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEvent {
    channel: u8,
    pitch: u8,
    velocity: u8,
    tick: Tick,
    length: Option<Tick>,
    release_velocity: u8,
}

impl NoteEvent {
    /// An open note starting at `tick`.
    pub fn open(tick: Tick, channel: u8, pitch: u8, velocity: u8) -> Self {
        Self {
            channel,
            pitch,
            velocity,
            tick,
            length: None,
            release_velocity: 0,
        }
    }

    /// A terminated note of `length` ticks, channel 0.
    pub fn new(tick: Tick, length: Tick, pitch: u8, velocity: u8) -> Self {
        let mut note = Self::open(tick, 0, pitch, velocity);
        note.terminate(tick + length, 0);
        note
    }

    /// Close the note at `stop_tick`. A stop before the start gives length 0.
    pub fn terminate(&mut self, stop_tick: Tick, release_velocity: u8) {
        self.length = Some(stop_tick.saturating_sub(self.tick));
        self.release_velocity = release_velocity;
    }

    pub fn is_terminated(&self) -> bool {
        self.length.is_some()
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Length in ticks, `None` while the note is open.
    pub fn length(&self) -> Option<Tick> {
        self.length
    }

    pub fn release_velocity(&self) -> u8 {
        self.release_velocity
    }

    pub fn name(&self) -> String {
        pitch_name(self.pitch)
    }
}

impl fmt::Display for NoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            Some(length) => write!(
                f,
                "Note {}; length: {}; velocity: {}",
                self.name(),
                length,
                self.velocity
            ),
            None => write!(f, "Note {}; open; velocity: {}", self.name(), self.velocity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_names() {
        assert_eq!(pitch_name(60), "C4");
        assert_eq!(pitch_name(61), "C sharp 4");
        assert_eq!(pitch_name(0), "C-1");
        assert_eq!(pitch_name(69), "A4");
        assert_eq!(pitch_name(127), "G9");
    }

    #[test]
    fn test_open_then_terminate() {
        let mut note = NoteEvent::open(240, 3, 64, 90);
        assert!(!note.is_terminated());
        assert_eq!(note.length(), None);

        note.terminate(720, 40);
        assert!(note.is_terminated());
        assert_eq!(note.length(), Some(480));
        assert_eq!(note.release_velocity(), 40);
        assert_eq!(note.channel(), 3);
    }

    #[test]
    fn test_display() {
        let note = NoteEvent::new(0, 100, 60, 80);
        assert_eq!(note.to_string(), "Note C4; length: 100; velocity: 80");
    }
}
