//! # Playback Module
//!
//! Build timed instruction sequences from notes, chords and staff ranges, and
//! hand them to a playback transport.
//!
//! ## Sub-modules
//! - `types` - Instruction, InstructionSequence, PlaybackMode, Timing
//! - `engine` - Sequence builders for a note, a chord and a chord range
//! - `transport` - The `Transport` trait and the stop / install / start helper
//!
//! ## Playback Modes
//!
//! ### Synchronized
//! - Chord range: recorded velocities, recorded note lengths, recorded tick
//!   distance between chords
//! - Single chord: every note starts together at the review velocity
//!
//! ### Offset
//! - Each note starts one chord offset after the previous one
//! - Note N of a chord stops `(N + 1)` offsets after it starts, so notes overlap
//!   in a staggered way
//! - Chords of a range are separated by the offset buffer
//!
//! ## Loop Boundary
//! A range always ends with a silent pause of 1.5 times the offset buffer
//! ([`LOOP_PAUSE_RATIO`]). A range of more than one chord loops
//! `loop_count - 1` extra times; single notes and chords never loop.
//!
//! ## Example
//! ```rust
//! use mozart::playback::{build_range_sequence, PlaybackMode, Timing};
//! use mozart::{Config, Staff, TrackEvent};
//!
//! let config = Config::default();
//! let events = vec![
//!     TrackEvent::note_on(0, 60, 80),
//!     TrackEvent::note_off(100, 60),
//!     TrackEvent::note_on(240, 64, 80),
//!     TrackEvent::note_off(340, 64),
//! ];
//! let staff = Staff::from_events(&events, &config);
//! let timing = Timing { ppq: staff.ppq(), mpq: staff.mpq() };
//!
//! let range = build_range_sequence(staff.chords(), timing, PlaybackMode::Synchronized, &config);
//! let starts: Vec<u64> = range.sequence.note_ons().map(|i| i.tick).collect();
//! assert_eq!(starts[..2], [0, 240]);
//! ```

mod engine;
mod transport;
mod types;


pub use engine::{
    build_chord_sequence, build_note_sequence, build_range_sequence, RangeSequence,
    LOOP_PAUSE_RATIO, PAUSE_PITCH,
};
pub use transport::{play_sequence, Transport};
pub use types::{Instruction, InstructionKind, InstructionSequence, PlaybackMode, Timing};
