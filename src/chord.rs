//! # Chord
//!
//! All notes of a staff that start on the same tick.
//!
//! ## Note order
//! Notes are kept in descending pitch order: [`Chord::add_note`] inserts a note
//! before the first member with a lower pitch, and after any member with the
//! same pitch. Playback walks the chord from the back, so the lowest note is
//! sounded first when notes are staggered.
//!
//! ## Review cursor
//! A chord has its own cursor used when stepping through its notes one by one.
//! The cursor always stays inside the chord.

use crate::event::Tick;
use crate::note::NoteEvent;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    tick: Tick,
    notes: Vec<NoteEvent>,
    review_index: usize,
}

impl Chord {
    /// A chord holding one note, at that note's tick.
    pub fn new(note: NoteEvent) -> Self {
        Self {
            tick: note.tick(),
            notes: vec![note],
            review_index: 0,
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn notes(&self) -> &[NoteEvent] {
        &self.notes
    }

    pub fn note(&self, index: usize) -> Option<&NoteEvent> {
        self.notes.get(index)
    }

    pub(crate) fn notes_mut(&mut self) -> &mut [NoteEvent] {
        &mut self.notes
    }

    /// Insert a note, keeping descending pitch order.
    ///
    /// The note must start on this chord's tick.
    pub fn add_note(&mut self, note: NoteEvent) {
        debug_assert_eq!(note.tick(), self.tick, "note added to a chord at another tick");
        let at = self
            .notes
            .iter()
            .position(|m| note.pitch() > m.pitch())
            .unwrap_or(self.notes.len());
        self.notes.insert(at, note);
    }

    /// A copy of this chord with every note of `other` added.
    ///
    /// Both chords are expected to share a tick.
    pub fn join(&self, other: &Chord) -> Chord {
        let mut joined = self.clone();
        for note in &other.notes {
            joined.add_note(note.clone());
        }
        joined
    }

    /// Drop notes that were never terminated. Returns how many were dropped.
    pub(crate) fn retain_terminated(&mut self) -> usize {
        let before = self.notes.len();
        self.notes.retain(NoteEvent::is_terminated);
        self.review_index = self.review_index.min(self.notes.len().saturating_sub(1));
        before - self.notes.len()
    }

    pub fn note_names(&self) -> Vec<String> {
        self.notes.iter().map(NoteEvent::name).collect()
    }

    pub fn review_index(&self) -> usize {
        self.review_index
    }

    pub fn move_up(&mut self) -> Option<&NoteEvent> {
        self.review_index = self.review_index.saturating_sub(1);
        self.notes.get(self.review_index)
    }

    pub fn move_down(&mut self) -> Option<&NoteEvent> {
        let last = self.notes.len().saturating_sub(1);
        self.review_index = (self.review_index + 1).min(last);
        self.notes.get(self.review_index)
    }

    /// Put the review cursor on the last (lowest) note.
    pub fn reset_review(&mut self) {
        self.review_index = self.notes.len().saturating_sub(1);
    }

    /// Move the review cursor to `index` and return that note.
    ///
    /// An index outside the chord leaves the cursor where it was.
    pub fn select_note(&mut self, index: usize) -> Option<&NoteEvent> {
        if index < self.notes.len() {
            self.review_index = index;
        }
        self.notes.get(index)
    }

    /// Measure / beat / tick label such as `"2M 1.060"`.
    ///
    /// Measures and beats count from zero; the remaining ticks are zero-padded
    /// to the digit width of `ppq`.
    pub fn position_label(&self, numerator: u32, ppq: u32) -> String {
        let ppq = ppq.max(1) as u64;
        let numerator = numerator.max(1) as u64;
        let quarters = self.tick / ppq;
        let width = ppq.to_string().len();
        format!(
            "{}M {}.{:0width$}",
            quarters / numerator,
            quarters % numerator,
            self.tick % ppq,
            width = width
        )
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.note_names().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(pitch: u8, length: Tick) -> NoteEvent {
        NoteEvent::new(0, length, pitch, 80)
    }

    fn pitches(chord: &Chord) -> Vec<u8> {
        chord.notes().iter().map(NoteEvent::pitch).collect()
    }

    #[test]
    fn test_add_note_keeps_descending_pitch() {
        let mut chord = Chord::new(note(64, 100));
        chord.add_note(note(60, 100));
        chord.add_note(note(67, 100));
        chord.add_note(note(62, 100));
        assert_eq!(pitches(&chord), vec![67, 64, 62, 60]);
    }

    #[test]
    fn test_add_note_equal_pitch_goes_after() {
        let mut chord = Chord::new(note(60, 10));
        chord.add_note(note(60, 20));
        assert_eq!(chord.notes()[0].length(), Some(10));
        assert_eq!(chord.notes()[1].length(), Some(20));
    }

    #[test]
    fn test_join_is_union_and_keeps_lengths() {
        let mut a = Chord::new(note(60, 100));
        a.add_note(note(64, 50));
        let mut b = Chord::new(note(67, 200));
        b.add_note(note(48, 25));

        let joined = a.join(&b);
        assert_eq!(pitches(&joined), vec![67, 64, 60, 48]);
        let lengths: Vec<_> = joined.notes().iter().map(|n| n.length()).collect();
        assert_eq!(lengths, vec![Some(200), Some(50), Some(100), Some(25)]);
        // Inputs untouched
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_review_cursor_clamps() {
        let mut chord = Chord::new(note(60, 1));
        chord.add_note(note(64, 1));
        chord.add_note(note(67, 1));

        assert_eq!(chord.move_up().map(|n| n.pitch()), Some(67));
        assert_eq!(chord.review_index(), 0);
        chord.move_down();
        chord.move_down();
        assert_eq!(chord.move_down().map(|n| n.pitch()), Some(60));
        assert_eq!(chord.review_index(), 2);

        chord.select_note(1);
        assert_eq!(chord.review_index(), 1);
        assert!(chord.select_note(9).is_none());
        assert_eq!(chord.review_index(), 1);

        chord.reset_review();
        assert_eq!(chord.review_index(), 2);
    }

    #[test]
    fn test_retain_terminated() {
        let mut chord = Chord::new(NoteEvent::open(0, 0, 60, 80));
        chord.add_note(note(64, 10));
        assert_eq!(chord.retain_terminated(), 1);
        assert_eq!(pitches(&chord), vec![64]);
    }

    #[test]
    fn test_position_label() {
        let at = |tick| Chord::new(NoteEvent::new(tick, 1, 60, 80));
        assert_eq!(at(0).position_label(4, 480), "0M 0.000");
        assert_eq!(at(480 * 5 + 60).position_label(4, 480), "1M 1.060");
        assert_eq!(at(7).position_label(3, 96), "0M 0.07");
    }

    #[test]
    fn test_display_lists_names() {
        let mut chord = Chord::new(note(60, 1));
        chord.add_note(note(61, 1));
        assert_eq!(chord.to_string(), "C sharp 4, C4");
    }
}
