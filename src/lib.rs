pub mod chord;
pub mod composition;
pub mod config;
pub mod error;
pub mod event;
pub mod note;
pub mod playback;
pub mod smf;
pub mod staff;

pub use chord::Chord;
pub use composition::{Composition, CompositionOptions, StaffSelection};
pub use config::Config;
pub use error::*;
pub use event::{EventKind, MetaEvent, Tick, TimeSignature, TrackEvent};
pub use note::{pitch_name, NoteEvent};
pub use playback::{PlaybackMode, Transport};
pub use staff::{OptionField, Staff, StaffOptions};

/// Read a MIDI file into a composition using the default configuration.
/// This is the main entry point for the library.
pub fn open(bytes: &[u8], title: &str) -> Result<Composition, MozartError> {
    smf::load_composition(bytes, title, &Config::default())
}

/// Build a composition from already-decoded tracks using the default configuration.
pub fn open_tracks(tracks: &[Vec<TrackEvent>], title: &str) -> Result<Composition, MozartError> {
    Composition::from_tracks(tracks, title, &Config::default())
}
