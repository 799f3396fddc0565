//! Playback sequence builders
//!
//! Turns notes, chords and chord ranges into instruction sequences for a
//! [`Transport`](super::Transport).
//!
//! All sequences start at tick 0. Notes of a chord are emitted from the back
//! of the chord (lowest pitch first). Open notes are never emitted.

use super::types::{Instruction, InstructionSequence, PlaybackMode, Timing};
use crate::chord::Chord;
use crate::config::Config;
use crate::event::Tick;
use crate::note::NoteEvent;
use std::collections::BTreeMap;

/// Length of the silence closing a range, relative to the offset buffer.
///
/// The silence marks the loop boundary when a range is looped.
pub const LOOP_PAUSE_RATIO: (u64, u64) = (3, 2);

/// Pitch of the silent (zero velocity) loop pause instructions.
pub const PAUSE_PITCH: u8 = 100;

/// A range sequence plus where each chord starts inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSequence {
    pub sequence: InstructionSequence,
    /// Chord tick to the tick its first note starts at in `sequence`.
    pub playback_ticks: BTreeMap<Tick, Tick>,
}

/// Sequence playing a single note at the review velocity for its recorded length.
pub fn build_note_sequence(note: &NoteEvent, timing: Timing, config: &Config) -> InstructionSequence {
    let mut sequence = InstructionSequence::new(timing);
    if let Some(length) = note.length() {
        sequence.push_pair(
            Instruction::note_on(0, note.channel(), note.pitch(), config.review_velocity),
            Instruction::note_off(length, note.channel(), note.pitch(), note.release_velocity()),
        );
    }
    sequence.finish()
}

/// Sequence playing one chord at the review velocity.
///
/// In synchronized mode every note starts at 0 and lasts its recorded length.
/// In offset mode the k-th emitted note starts at `k * offset` and note N of the
/// chord stops at `start + (N + 1) * offset`.
pub fn build_chord_sequence(
    chord: &Chord,
    timing: Timing,
    mode: PlaybackMode,
    config: &Config,
) -> InstructionSequence {
    let mut sequence = InstructionSequence::new(timing);
    let offset = match mode {
        PlaybackMode::Synchronized => 0,
        PlaybackMode::Offset => timing.ms_to_ticks(config.chord_offset_ms),
    };

    let mut emitted: u64 = 0;
    for (j, note) in chord.notes().iter().enumerate().rev() {
        let Some(length) = note.length() else {
            continue;
        };
        let start = emitted * offset;
        let stop = match mode {
            PlaybackMode::Synchronized => start + length,
            PlaybackMode::Offset => start + (j as u64 + 1) * offset,
        };
        sequence.push_pair(
            Instruction::note_on(start, note.channel(), note.pitch(), config.review_velocity),
            Instruction::note_off(stop, note.channel(), note.pitch(), note.release_velocity()),
        );
        emitted += 1;
    }
    sequence.finish()
}

/// Sequence playing every chord of `chords` in order, followed by the loop pause.
///
/// Synchronized mode keeps the recorded velocities, lengths and the recorded
/// tick distance between chords. Offset mode plays each note `offset` after the
/// previous one at the review velocity and separates chords by the offset
/// buffer. A range of more than one chord loops `loop_count - 1` extra times.
pub fn build_range_sequence(
    chords: &[Chord],
    timing: Timing,
    mode: PlaybackMode,
    config: &Config,
) -> RangeSequence {
    let mut sequence = InstructionSequence::new(timing);
    let mut playback_ticks = BTreeMap::new();
    let buffer = timing.ms_to_ticks(config.offset_buffer_ms);
    let offset = match mode {
        PlaybackMode::Synchronized => 0,
        PlaybackMode::Offset => timing.ms_to_ticks(config.chord_offset_ms),
    };

    let mut start: Tick = 0;
    let mut stop: Tick = 0;
    for (i, chord) in chords.iter().enumerate() {
        playback_ticks.insert(chord.tick(), start + offset);

        for (j, note) in chord.notes().iter().enumerate().rev() {
            let Some(length) = note.length() else {
                continue;
            };
            start += offset;
            let velocity = match mode {
                PlaybackMode::Synchronized => {
                    stop = start + length;
                    note.velocity()
                }
                PlaybackMode::Offset => {
                    stop = start + (j as u64 + 1) * offset;
                    config.review_velocity
                }
            };
            sequence.push_pair(
                Instruction::note_on(start, note.channel(), note.pitch(), velocity),
                Instruction::note_off(stop, note.channel(), note.pitch(), note.release_velocity()),
            );
        }

        match chords.get(i + 1) {
            Some(next) => match mode {
                PlaybackMode::Synchronized => start += next.tick().saturating_sub(chord.tick()),
                PlaybackMode::Offset => start += buffer,
            },
            None => {
                start = stop;
                stop += buffer * LOOP_PAUSE_RATIO.0 / LOOP_PAUSE_RATIO.1;
                sequence.push_pair(
                    Instruction::note_on(start, 0, PAUSE_PITCH, 0),
                    Instruction::note_off(stop, 0, PAUSE_PITCH, 0),
                );
            }
        }
    }

    if chords.len() > 1 {
        sequence.loop_count = config.loop_count.saturating_sub(1);
    }
    RangeSequence {
        sequence: sequence.finish(),
        playback_ticks,
    }
}
