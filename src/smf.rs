//! Standard MIDI File reading.
//!
//! Turns SMF bytes into one absolute-tick [`TrackEvent`] list per track, the
//! shape [`Staff::from_events`](crate::Staff::from_events) consumes.

use crate::composition::Composition;
use crate::config::Config;
use crate::error::MozartError;
use crate::event::{encode_tempo, EventKind, Tick, TrackEvent};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

const META_TEXT: u8 = 0x01;
const META_COPYRIGHT: u8 = 0x02;
const META_TRACK_NAME: u8 = 0x03;
const META_INSTRUMENT_NAME: u8 = 0x04;
const META_LYRIC: u8 = 0x05;
const META_MARKER: u8 = 0x06;
const META_CUE_POINT: u8 = 0x07;
const META_END_OF_TRACK: u8 = 0x2F;
const META_KEY_SIGNATURE: u8 = 0x59;
const META_SEQUENCER_SPECIFIC: u8 = 0x7F;

/// Tracks of a MIDI file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmfTracks {
    /// Ticks per quarter note, absent for timecode-based files.
    pub resolution: Option<u32>,
    pub tracks: Vec<Vec<TrackEvent>>,
}

/// Parse SMF bytes into per-track event lists.
pub fn read_tracks(bytes: &[u8]) -> Result<SmfTracks, MozartError> {
    let smf = Smf::parse(bytes).map_err(|e| MozartError::Smf(e.to_string()))?;

    let resolution = match smf.header.timing {
        Timing::Metrical(ticks_per_beat) => Some(ticks_per_beat.as_int() as u32),
        Timing::Timecode(fps, ticks_per_frame) => {
            log::warn!(
                "timecode timing ({} fps, {} ticks per frame) is not supported; keeping default resolution",
                fps.as_int(),
                ticks_per_frame
            );
            None
        }
    };

    let tracks = smf
        .tracks
        .iter()
        .enumerate()
        .map(|(number, track)| {
            let mut tick: Tick = 0;
            let mut events = Vec::with_capacity(track.len());
            for event in track {
                // Deltas accumulate across every event kind, not just channel events
                tick += event.delta.as_int() as Tick;
                match convert_event(event.kind) {
                    Some(kind) => events.push(TrackEvent::new(tick, kind)),
                    None => log::trace!("track {}: skipping {:?} at tick {}", number, event.kind, tick),
                }
            }
            events
        })
        .collect();

    Ok(SmfTracks { resolution, tracks })
}

/// Read a MIDI file into a composition, applying the file's resolution.
///
/// # Example
/// ```no_run
/// use mozart::{smf, Config};
///
/// let bytes = std::fs::read("minuet.mid").unwrap();
/// let song = smf::load_composition(&bytes, "Minuet", &Config::default()).unwrap();
/// println!("{} staves", song.staves().len());
/// ```
pub fn load_composition(
    bytes: &[u8],
    title: impl Into<String>,
    config: &Config,
) -> Result<Composition, MozartError> {
    let smf = read_tracks(bytes)?;
    let mut composition = Composition::from_tracks(&smf.tracks, title, config)?;
    if let Some(ppq) = smf.resolution {
        composition.set_resolution(ppq);
    }
    Ok(composition)
}

fn convert_event(kind: TrackEventKind) -> Option<EventKind> {
    match kind {
        TrackEventKind::Midi { channel, message } => {
            let channel = channel.as_int();
            match message {
                MidiMessage::NoteOn { key, vel } => Some(EventKind::NoteOn {
                    channel,
                    pitch: key.as_int(),
                    velocity: vel.as_int(),
                }),
                MidiMessage::NoteOff { key, vel } => Some(EventKind::NoteOff {
                    channel,
                    pitch: key.as_int(),
                    velocity: vel.as_int(),
                }),
                _ => None,
            }
        }
        TrackEventKind::Meta(message) => convert_meta(message),
        TrackEventKind::SysEx(_) | TrackEventKind::Escape(_) => None,
    }
}

fn convert_meta(message: MetaMessage) -> Option<EventKind> {
    let meta = |meta_type: u8, data: &[u8]| EventKind::Meta {
        meta_type,
        data: data.to_vec(),
    };
    match message {
        MetaMessage::Tempo(mpq) => Some(EventKind::Tempo(encode_tempo(mpq.as_int()))),
        MetaMessage::TimeSignature(numerator, exponent, clicks, thirty_seconds) => Some(
            EventKind::TimeSignature(vec![numerator, exponent, clicks, thirty_seconds]),
        ),
        MetaMessage::Text(data) => Some(meta(META_TEXT, data)),
        MetaMessage::Copyright(data) => Some(meta(META_COPYRIGHT, data)),
        MetaMessage::TrackName(data) => Some(meta(META_TRACK_NAME, data)),
        MetaMessage::InstrumentName(data) => Some(meta(META_INSTRUMENT_NAME, data)),
        MetaMessage::Lyric(data) => Some(meta(META_LYRIC, data)),
        MetaMessage::Marker(data) => Some(meta(META_MARKER, data)),
        MetaMessage::CuePoint(data) => Some(meta(META_CUE_POINT, data)),
        MetaMessage::KeySignature(sharps, minor) => {
            Some(meta(META_KEY_SIGNATURE, &[sharps as u8, minor as u8]))
        }
        MetaMessage::SequencerSpecific(data) => Some(meta(META_SEQUENCER_SPECIFIC, data)),
        MetaMessage::EndOfTrack => Some(meta(META_END_OF_TRACK, &[])),
        MetaMessage::Unknown(meta_type, data) => Some(meta(meta_type, data)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::META_SET_TEMPO;

    /// Format 0, 96 ticks per quarter: tempo, 3/4, a C4/E4 dyad of one quarter.
    const DYAD: [u8; 57] = [
        b'M', b'T', b'h', b'd', 0x00, 0x00, 0x00, 0x06, // header chunk
        0x00, 0x00, 0x00, 0x01, 0x00, 0x60, // format 0, 1 track, 96 ppq
        b'M', b'T', b'r', b'k', 0x00, 0x00, 0x00, 0x23, // track chunk, 35 bytes
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500000
        0x00, 0xFF, 0x58, 0x04, 0x03, 0x02, 0x18, 0x08, // 3/4
        0x00, 0x90, 0x3C, 0x50, // C4 on
        0x00, 0x90, 0x40, 0x50, // E4 on
        0x60, 0x80, 0x3C, 0x40, // C4 off
        0x00, 0x80, 0x40, 0x40, // E4 off
        0x00, 0xFF, 0x2F, 0x00, // end of track
    ];

    #[test]
    fn test_read_tracks() {
        let smf = read_tracks(&DYAD).unwrap();
        assert_eq!(smf.resolution, Some(96));
        assert_eq!(smf.tracks.len(), 1);

        let events = &smf.tracks[0];
        assert_eq!(events.len(), 7);
        assert_eq!(events[0], TrackEvent::tempo(0, 500_000));
        assert_eq!(events[1], TrackEvent::time_signature(0, 3, 4));
        assert_eq!(
            events[4].kind,
            EventKind::NoteOff {
                channel: 0,
                pitch: 60,
                velocity: 64
            }
        );
        assert_eq!(events[4].tick, 96);
        assert_eq!(
            events[6],
            TrackEvent::new(
                96,
                EventKind::Meta {
                    meta_type: META_END_OF_TRACK,
                    data: Vec::new()
                }
            )
        );
    }

    #[test]
    fn test_load_composition() {
        let song = load_composition(&DYAD, "Dyad", &Config::default()).unwrap();
        let composite = song.composite();

        assert_eq!(composite.ppq(), 96);
        assert_eq!(composite.mpq(), 500_000);
        assert_eq!((composite.numerator(), composite.denominator()), (3, 4));
        assert_eq!(composite.len(), 1);
        assert_eq!(composite.chords()[0].note_names(), vec!["E4", "C4"]);
        assert_eq!(composite.chords()[0].note(0).unwrap().release_velocity(), 64);
        assert_eq!(composite.tempo_event().meta_type, META_SET_TEMPO);
        assert_eq!(song.tracks()[0].description(), "Staff 1");
    }

    #[test]
    fn test_timecode_keeps_default_resolution() {
        let mut bytes = DYAD;
        // -25 fps, 40 ticks per frame
        bytes[12] = 0xE7;
        bytes[13] = 0x28;

        let smf = read_tracks(&bytes).unwrap();
        assert_eq!(smf.resolution, None);

        let config = Config::default();
        let song = load_composition(&bytes, "Dyad", &config).unwrap();
        assert_eq!(song.composite().ppq(), config.default_ppq);
    }

    #[test]
    fn test_garbage_is_rejected() {
        let err = read_tracks(b"not a midi file").unwrap_err();
        assert!(matches!(err, MozartError::Smf(_)));
    }
}
