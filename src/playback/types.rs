//! Playback instruction type definitions
//!
//! This module defines what the sequence builders hand to a transport.

use crate::event::Tick;
use serde::Serialize;

/// How notes of a chord or range are spaced in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Recorded relative timing and per-note durations.
    Synchronized,
    /// Fixed artificial spacing per note and chord, for ear-training review.
    Offset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InstructionKind {
    NoteOn,
    NoteOff,
}

/// One timed note instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub tick: Tick,
    pub kind: InstructionKind,
    pub channel: u8,
    pub pitch: u8,
    pub velocity: u8,
}

impl Instruction {
    pub fn note_on(tick: Tick, channel: u8, pitch: u8, velocity: u8) -> Self {
        Self {
            tick,
            kind: InstructionKind::NoteOn,
            channel,
            pitch,
            velocity,
        }
    }

    pub fn note_off(tick: Tick, channel: u8, pitch: u8, velocity: u8) -> Self {
        Self {
            tick,
            kind: InstructionKind::NoteOff,
            channel,
            pitch,
            velocity,
        }
    }
}

/// A complete sequence ready to be installed on a transport.
///
/// # Fields
/// - `resolution`: ticks per quarter note the instruction ticks are expressed in
/// - `instructions`: tick-ordered; instructions on the same tick keep the order
///   they were generated in
/// - `tempo`: microseconds per quarter note, only present when known
/// - `loop_count`: extra repetitions after the first pass (0 = play once)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionSequence {
    pub resolution: u32,
    pub instructions: Vec<Instruction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<u32>,
    pub loop_count: u32,
}

impl InstructionSequence {
    pub(crate) fn new(timing: Timing) -> Self {
        Self {
            resolution: timing.ppq,
            instructions: Vec::new(),
            tempo: (timing.mpq != 0).then_some(timing.mpq),
            loop_count: 0,
        }
    }

    pub(crate) fn push_pair(&mut self, start: Instruction, stop: Instruction) {
        self.instructions.push(start);
        self.instructions.push(stop);
    }

    /// Stable sort by tick.
    pub(crate) fn finish(mut self) -> Self {
        self.instructions.sort_by_key(|i| i.tick);
        self
    }

    /// Tick of the last instruction.
    pub fn end_tick(&self) -> Tick {
        self.instructions.last().map(|i| i.tick).unwrap_or(0)
    }

    pub fn note_ons(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions
            .iter()
            .filter(|i| i.kind == InstructionKind::NoteOn)
    }
}

/// Tick resolution and tempo of the staff being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub ppq: u32,
    pub mpq: u32,
}

impl Timing {
    /// Convert milliseconds to ticks at this tempo, rounding down.
    ///
    /// # Example
    /// ```
    /// use mozart::playback::Timing;
    ///
    /// // 480 ticks per quarter, half a second per quarter
    /// let timing = Timing { ppq: 480, mpq: 500_000 };
    /// assert_eq!(timing.ms_to_ticks(1000), 960);
    /// ```
    pub fn ms_to_ticks(&self, ms: u32) -> Tick {
        (self.ppq as u64 * ms as u64 * 1000)
            .checked_div(self.mpq as u64)
            .unwrap_or(0)
    }
}
