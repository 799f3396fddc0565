//! # Track Events
//!
//! The already-decoded, per-track event stream a [`Staff`](crate::Staff) is
//! built from, plus the tempo and time-signature meta payload codecs.
//!
//! ## Wire formats
//! - **Tempo** (`0x51`): microseconds per quarter note, big-endian, leading zero
//!   bytes stripped. Decoding accepts 1 to 4 bytes.
//! - **Time signature** (`0x58`): `[numerator, log2(denominator), 24, 8]`. The
//!   last two bytes are the metronome click interval and the number of notated
//!   32nd notes per quarter note.

use crate::error::MozartError;
use serde::Serialize;

/// Absolute position in pulses (ticks).
pub type Tick = u64;

pub const META_SET_TEMPO: u8 = 0x51;
pub const META_TIME_SIGNATURE: u8 = 0x58;

/// Largest denominator accepted from a time-signature event.
pub const MAX_DENOMINATOR: u32 = 255;
pub const METRONOME_CLICKS: u8 = 24;
pub const THIRTY_SECONDS_PER_QUARTER: u8 = 8;

/// What a track event carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8, velocity: u8 },
    /// Raw tempo payload.
    Tempo(Vec<u8>),
    /// Raw time-signature payload.
    TimeSignature(Vec<u8>),
    /// Any other meta event, kept opaque.
    Meta { meta_type: u8, data: Vec<u8> },
}

/// One event of a track at an absolute tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    pub tick: Tick,
    pub kind: EventKind,
}

impl TrackEvent {
    pub fn new(tick: Tick, kind: EventKind) -> Self {
        Self { tick, kind }
    }

    /// Note-on on channel 0.
    pub fn note_on(tick: Tick, pitch: u8, velocity: u8) -> Self {
        Self::new(tick, EventKind::NoteOn { channel: 0, pitch, velocity })
    }

    /// Note-off on channel 0 with release velocity 0.
    pub fn note_off(tick: Tick, pitch: u8) -> Self {
        Self::new(tick, EventKind::NoteOff { channel: 0, pitch, velocity: 0 })
    }

    pub fn tempo(tick: Tick, mpq: u32) -> Self {
        Self::new(tick, EventKind::Tempo(encode_tempo(mpq)))
    }

    pub fn time_signature(tick: Tick, numerator: u32, denominator: u32) -> Self {
        Self::new(
            tick,
            EventKind::TimeSignature(encode_time_signature(numerator, denominator)),
        )
    }
}

/// A meta event as stored on a staff, ready for re-serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaEvent {
    pub tick: Tick,
    pub meta_type: u8,
    pub data: Vec<u8>,
}

impl MetaEvent {
    pub fn tempo(tick: Tick, mpq: u32) -> Self {
        Self {
            tick,
            meta_type: META_SET_TEMPO,
            data: encode_tempo(mpq),
        }
    }

    pub fn time_signature(tick: Tick, numerator: u32, denominator: u32) -> Self {
        Self {
            tick,
            meta_type: META_TIME_SIGNATURE,
            data: encode_time_signature(numerator, denominator),
        }
    }
}

/// Decoded time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

/// Encode a tempo as big-endian bytes with leading zeros stripped.
///
/// # Example
/// ```
/// use mozart::event::{decode_tempo, encode_tempo};
///
/// assert_eq!(encode_tempo(500_000), vec![0x07, 0xA1, 0x20]);
/// assert_eq!(encode_tempo(1), vec![0x01]);
/// assert_eq!(decode_tempo(&encode_tempo(500_000)).unwrap(), 500_000);
/// ```
pub fn encode_tempo(mpq: u32) -> Vec<u8> {
    let bytes = mpq.to_be_bytes();
    // A zero tempo still encodes to one byte.
    let first = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Decode a big-endian tempo payload of 1 to 4 bytes.
pub fn decode_tempo(data: &[u8]) -> Result<u32, MozartError> {
    if data.is_empty() {
        return Err(malformed_tempo("empty payload"));
    }
    if data.len() > 4 {
        return Err(malformed_tempo(format!(
            "payload of {} bytes is too long",
            data.len()
        )));
    }
    let mpq = data.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
    if mpq == 0 {
        return Err(malformed_tempo("tempo of zero microseconds"));
    }
    Ok(mpq)
}

/// Encode a time signature payload.
///
/// The denominator is halved until it reaches 1; the number of halvings is the
/// exponent byte. Numerators above 255 saturate.
pub fn encode_time_signature(numerator: u32, denominator: u32) -> Vec<u8> {
    let mut d = denominator;
    let mut exponent = 0u8;
    while d > 1 {
        d /= 2;
        exponent += 1;
    }
    vec![
        numerator.min(u8::MAX as u32) as u8,
        exponent,
        METRONOME_CLICKS,
        THIRTY_SECONDS_PER_QUARTER,
    ]
}

/// Decode a time signature payload.
///
/// Denominators above [`MAX_DENOMINATOR`] are rejected.
pub fn decode_time_signature(data: &[u8]) -> Result<TimeSignature, MozartError> {
    if data.len() < 4 {
        return Err(malformed_time_signature(format!(
            "expected 4 bytes, got {}",
            data.len()
        )));
    }
    let numerator = data[0] as u32;
    if numerator == 0 {
        return Err(malformed_time_signature("numerator of zero"));
    }
    let denominator = 1u32
        .checked_shl(data[1] as u32)
        .filter(|&d| d <= MAX_DENOMINATOR)
        .ok_or_else(|| {
            malformed_time_signature(format!("unsupported denominator exponent {}", data[1]))
        })?;
    Ok(TimeSignature {
        numerator,
        denominator,
    })
}

fn malformed_tempo(message: impl Into<String>) -> MozartError {
    MozartError::MalformedMeta {
        kind: "tempo",
        message: message.into(),
    }
}

fn malformed_time_signature(message: impl Into<String>) -> MozartError {
    MozartError::MalformedMeta {
        kind: "time signature",
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_round_trip() {
        for mpq in [1, 120_000, 500_000, 16_777_215] {
            assert_eq!(decode_tempo(&encode_tempo(mpq)).unwrap(), mpq);
        }
    }

    #[test]
    fn test_tempo_strips_leading_zeros() {
        assert_eq!(encode_tempo(0x0000_0100), vec![0x01, 0x00]);
        assert_eq!(encode_tempo(16_777_215), vec![0xFF, 0xFF, 0xFF]);
        assert_eq!(encode_tempo(0), vec![0x00]);
    }

    #[test]
    fn test_tempo_decode_rejects_bad_lengths() {
        assert!(matches!(
            decode_tempo(&[]),
            Err(MozartError::MalformedMeta { kind: "tempo", .. })
        ));
        assert!(decode_tempo(&[1, 2, 3, 4, 5]).is_err());
        assert!(decode_tempo(&[0, 0, 0]).is_err());
        // Three-byte wire form with leading zero is still accepted
        assert_eq!(decode_tempo(&[0x00, 0x01, 0x00]).unwrap(), 256);
    }

    #[test]
    fn test_time_signature_round_trip() {
        for denominator in [2, 4, 8, 16, 128] {
            let data = encode_time_signature(3, denominator);
            let ts = decode_time_signature(&data).unwrap();
            assert_eq!(ts.numerator, 3);
            assert_eq!(ts.denominator, denominator);
        }
    }

    #[test]
    fn test_time_signature_fixed_bytes() {
        assert_eq!(encode_time_signature(6, 8), vec![6, 3, 24, 8]);
        assert_eq!(encode_time_signature(4, 1), vec![4, 0, 24, 8]);
    }

    #[test]
    fn test_time_signature_rejects_large_denominator() {
        // 2^8 = 256 exceeds the supported maximum
        assert!(decode_time_signature(&[4, 8, 24, 8]).is_err());
        assert!(decode_time_signature(&[4, 40, 24, 8]).is_err());
        assert!(decode_time_signature(&[4, 2]).is_err());
        assert!(decode_time_signature(&[0, 2, 24, 8]).is_err());
    }

    #[test]
    fn test_non_power_of_two_denominator_encodes_by_halving() {
        // 6 -> 3 -> 1 takes two halvings
        let data = encode_time_signature(5, 6);
        assert_eq!(decode_time_signature(&data).unwrap().denominator, 4);
    }
}
