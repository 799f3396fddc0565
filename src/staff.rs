//! # Staff
//!
//! One playable, tick-ordered voice: a single track or a merge of several.
//!
//! ## Building from a track
//! [`Staff::from_events`] walks a track once:
//! - The first tempo and the first time-signature event set the staff's tempo
//!   and time signature. A malformed one is logged and replaced by the
//!   configured default; either way later events of that kind are kept as
//!   pass-through meta events.
//! - A note-on with a non-zero velocity opens a note. It joins the last chord
//!   when that chord starts on the same tick, otherwise it starts a new chord.
//! - A note-off, or a note-on with velocity 0, closes the first still-open note
//!   of the same pitch, searching chords in order. A note-off with no open
//!   match is discarded.
//! - Notes still open at the end of the track are dropped.
//!
//! ## Invariants
//! - Chord ticks are strictly increasing.
//! - `position` is a valid chord index, or 0 for an empty staff.
//! - A staff always has a tempo and a time-signature meta event.
//!
//! ## Playback state
//! ```text
//! Idle --play()--> Playing --stop() / sync_with_transport()--> Idle
//! ```
//! Leaving `Playing` moves `position` to the chord playback had reached.

use crate::chord::Chord;
use crate::config::Config;
use crate::error::MozartError;
use crate::event::{
    decode_tempo, decode_time_signature, EventKind, MetaEvent, Tick, TrackEvent, META_SET_TEMPO,
    META_TIME_SIGNATURE,
};
use crate::note::{pitch_name, NoteEvent};
use crate::playback::{
    build_chord_sequence, build_note_sequence, build_range_sequence, play_sequence, PlaybackMode,
    Timing, Transport,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// An editable staff field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionField {
    Numerator,
    Denominator,
    Ppq,
    Mpq,
}

impl OptionField {
    pub const ALL: [OptionField; 4] = [
        OptionField::Numerator,
        OptionField::Denominator,
        OptionField::Ppq,
        OptionField::Mpq,
    ];

    /// Display label, also used to identify the field in errors.
    pub fn label(&self) -> &'static str {
        match self {
            OptionField::Numerator => "Numerator",
            OptionField::Denominator => "Denominator",
            OptionField::Ppq => "Pulses/Ticks per Quarter Note (PPQ)",
            OptionField::Mpq => "Microseconds per Quarter Note (MPQ)",
        }
    }

    /// Parse a user-entered value for this field.
    pub fn parse(&self, text: &str) -> Result<u32, MozartError> {
        let value: i64 = text.trim().parse().map_err(|_| {
            MozartError::invalid_option(self.label(), format!("'{}' is not a whole number", text))
        })?;
        if value <= 0 {
            return Err(self.non_positive());
        }
        u32::try_from(value)
            .map_err(|_| MozartError::invalid_option(self.label(), "value is too large"))
    }

    fn check(&self, value: u32) -> Result<u32, MozartError> {
        if value == 0 {
            return Err(self.non_positive());
        }
        Ok(value)
    }

    fn non_positive(&self) -> MozartError {
        MozartError::invalid_option(
            self.label(),
            "values less than or equal to 0 are not valid",
        )
    }
}

/// Time signature and timing of a staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffOptions {
    pub numerator: u32,
    pub denominator: u32,
    pub ppq: u32,
    pub mpq: u32,
}

impl StaffOptions {
    pub fn get(&self, field: OptionField) -> u32 {
        match field {
            OptionField::Numerator => self.numerator,
            OptionField::Denominator => self.denominator,
            OptionField::Ppq => self.ppq,
            OptionField::Mpq => self.mpq,
        }
    }

    pub fn with(mut self, field: OptionField, value: u32) -> Self {
        match field {
            OptionField::Numerator => self.numerator = value,
            OptionField::Denominator => self.denominator = value,
            OptionField::Ppq => self.ppq = value,
            OptionField::Mpq => self.mpq = value,
        }
        self
    }

    /// Reject the first zero field.
    pub fn validate(&self) -> Result<(), MozartError> {
        for field in OptionField::ALL {
            field.check(self.get(field))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Staff {
    chords: Vec<Chord>,
    numerator: u32,
    denominator: u32,
    ppq: u32,
    mpq: u32,
    tempo_event: MetaEvent,
    time_signature_event: MetaEvent,
    meta_events: Vec<MetaEvent>,
    description: String,
    position: usize,
    is_playing: bool,
    playback_ticks: BTreeMap<Tick, Tick>,
}

impl Staff {
    /// An empty staff using the configured defaults.
    pub fn new(description: impl Into<String>, config: &Config) -> Self {
        Self {
            chords: Vec::new(),
            numerator: config.default_numerator,
            denominator: config.default_denominator,
            ppq: config.default_ppq,
            mpq: config.default_mpq,
            tempo_event: MetaEvent::tempo(0, config.default_mpq),
            time_signature_event: MetaEvent::time_signature(
                0,
                config.default_numerator,
                config.default_denominator,
            ),
            meta_events: Vec::new(),
            description: description.into(),
            position: 0,
            is_playing: false,
            playback_ticks: BTreeMap::new(),
        }
    }

    /// Build a staff from one track's events.
    ///
    /// # Example
    /// ```
    /// use mozart::{Config, Staff, TrackEvent};
    ///
    /// let events = vec![
    ///     TrackEvent::note_on(0, 60, 80),
    ///     TrackEvent::note_on(0, 64, 80),
    ///     TrackEvent::note_off(100, 60),
    ///     TrackEvent::note_off(100, 64),
    /// ];
    /// let staff = Staff::from_events(&events, &Config::default());
    ///
    /// assert_eq!(staff.len(), 1);
    /// assert_eq!(staff.chords()[0].note_names(), vec!["E4", "C4"]);
    /// ```
    pub fn from_events(events: &[TrackEvent], config: &Config) -> Self {
        let mut staff = Self::new("", config);
        let mut tempo: Option<MetaEvent> = None;
        let mut time_signature: Option<MetaEvent> = None;
        let mut tempo_seen = false;
        let mut time_signature_seen = false;

        for event in events {
            let tick = event.tick;
            match &event.kind {
                EventKind::NoteOn {
                    channel,
                    pitch,
                    velocity,
                } if *velocity != 0 => staff.open_note(tick, *channel, *pitch, *velocity),
                EventKind::NoteOn { pitch, .. } => staff.close_note(tick, *pitch, 0),
                EventKind::NoteOff {
                    pitch, velocity, ..
                } => staff.close_note(tick, *pitch, *velocity),
                EventKind::Tempo(data) if !tempo_seen => {
                    tempo_seen = true;
                    match decode_tempo(data) {
                        Ok(mpq) => {
                            staff.mpq = mpq;
                            tempo = Some(MetaEvent {
                                tick,
                                meta_type: META_SET_TEMPO,
                                data: data.clone(),
                            });
                        }
                        Err(e) => log::warn!("{} at tick {}; using default tempo", e, tick),
                    }
                }
                EventKind::TimeSignature(data) if !time_signature_seen => {
                    time_signature_seen = true;
                    match decode_time_signature(data) {
                        Ok(ts) => {
                            staff.numerator = ts.numerator;
                            staff.denominator = ts.denominator;
                            time_signature = Some(MetaEvent {
                                tick,
                                meta_type: META_TIME_SIGNATURE,
                                data: data.clone(),
                            });
                        }
                        Err(e) => {
                            log::warn!("{} at tick {}; using default time signature", e, tick)
                        }
                    }
                }
                EventKind::Tempo(data) => staff.meta_events.push(MetaEvent {
                    tick,
                    meta_type: META_SET_TEMPO,
                    data: data.clone(),
                }),
                EventKind::TimeSignature(data) => staff.meta_events.push(MetaEvent {
                    tick,
                    meta_type: META_TIME_SIGNATURE,
                    data: data.clone(),
                }),
                EventKind::Meta { meta_type, data } => staff.meta_events.push(MetaEvent {
                    tick,
                    meta_type: *meta_type,
                    data: data.clone(),
                }),
            }
        }

        let (mpq, numerator, denominator) = (staff.mpq, staff.numerator, staff.denominator);
        staff.tempo_event = tempo.unwrap_or_else(|| {
            log::debug!("no usable tempo event; synthesizing {} mpq", mpq);
            MetaEvent::tempo(0, mpq)
        });
        staff.time_signature_event = time_signature.unwrap_or_else(|| {
            log::debug!(
                "no usable time signature event; synthesizing {}/{}",
                numerator,
                denominator
            );
            MetaEvent::time_signature(0, numerator, denominator)
        });
        staff.drop_open_notes();
        staff
    }

    pub fn with_description(
        description: impl Into<String>,
        events: &[TrackEvent],
        config: &Config,
    ) -> Self {
        let mut staff = Self::from_events(events, config);
        staff.description = description.into();
        staff
    }

    fn open_note(&mut self, tick: Tick, channel: u8, pitch: u8, velocity: u8) {
        let note = NoteEvent::open(tick, channel, pitch, velocity);
        match self.chords.last_mut() {
            Some(chord) if chord.tick() == tick => chord.add_note(note),
            _ => self.chords.push(Chord::new(note)),
        }
    }

    fn close_note(&mut self, tick: Tick, pitch: u8, release_velocity: u8) {
        for chord in &mut self.chords {
            if let Some(note) = chord
                .notes_mut()
                .iter_mut()
                .find(|n| !n.is_terminated() && n.pitch() == pitch)
            {
                note.terminate(tick, release_velocity);
                return;
            }
        }
        log::trace!("discarding unmatched note-off for {} at tick {}", pitch_name(pitch), tick);
    }

    fn drop_open_notes(&mut self) {
        let dropped: usize = self.chords.iter_mut().map(Chord::retain_terminated).sum();
        if dropped > 0 {
            log::debug!("dropped {} note(s) never terminated", dropped);
            self.chords.retain(|c| !c.is_empty());
        }
    }

    /// Interleave two staves by tick into a new one.
    ///
    /// Chords on the same tick are joined. Time signature and tempo come from
    /// `first`. If either staff is empty the other one is returned as is.
    pub fn merge(first: Staff, second: Staff) -> Staff {
        if second.is_empty() {
            return first;
        }
        if first.is_empty() {
            return second;
        }

        let mut meta_events = first.meta_events.clone();
        meta_events.extend(second.meta_events.iter().cloned());
        meta_events.sort_by_key(|e| e.tick);

        let mut merged = Staff {
            chords: Vec::with_capacity(first.chords.len() + second.chords.len()),
            numerator: first.numerator,
            denominator: first.denominator,
            ppq: first.ppq,
            mpq: first.mpq,
            tempo_event: first.tempo_event.clone(),
            time_signature_event: first.time_signature_event.clone(),
            meta_events,
            description: format!("{} + {}", first.description, second.description),
            position: 0,
            is_playing: false,
            playback_ticks: BTreeMap::new(),
        };

        let mut a = first.chords.into_iter().peekable();
        let mut b = second.chords.into_iter().peekable();
        loop {
            let order = match (a.peek(), b.peek()) {
                (Some(x), Some(y)) => x.tick().cmp(&y.tick()),
                _ => break,
            };
            let chord = match order {
                Ordering::Less => a.next(),
                Ordering::Greater => b.next(),
                Ordering::Equal => a.next().zip(b.next()).map(|(x, y)| x.join(&y)),
            };
            merged.chords.extend(chord);
        }
        merged.chords.extend(a);
        merged.chords.extend(b);
        merged
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    pub fn chord(&self, position: usize) -> Option<&Chord> {
        self.chords.get(position)
    }

    pub fn chord_mut(&mut self, position: usize) -> Option<&mut Chord> {
        self.chords.get_mut(position)
    }

    /// Insert a chord at its tick, joining it with a chord already on that tick.
    pub fn add_chord(&mut self, chord: Chord) {
        match self.chords.binary_search_by_key(&chord.tick(), Chord::tick) {
            Ok(at) => {
                let joined = self.chords[at].join(&chord);
                self.chords[at] = joined;
            }
            Err(at) => self.chords.insert(at, chord),
        }
        if self.chords.len() == 1 {
            self.position = 0;
        }
    }

    pub fn all_ticks(&self) -> Vec<Tick> {
        self.chords.iter().map(Chord::tick).collect()
    }

    // Cursor

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn reset_position(&mut self) {
        self.position = 0;
    }

    pub fn current(&self) -> Option<&Chord> {
        self.chords.get(self.position)
    }

    pub fn current_mut(&mut self) -> Option<&mut Chord> {
        self.chords.get_mut(self.position)
    }

    /// Step to the next chord. At the last chord the cursor stays and `None`
    /// is returned.
    pub fn move_forward(&mut self) -> Option<&Chord> {
        if self.position + 1 >= self.chords.len() {
            self.position = self.chords.len().saturating_sub(1);
            return None;
        }
        self.position += 1;
        self.chords.get(self.position)
    }

    /// Step to the previous chord. At the first chord the cursor stays and
    /// `None` is returned.
    pub fn move_back(&mut self) -> Option<&Chord> {
        if self.position == 0 {
            return None;
        }
        self.position -= 1;
        self.chords.get(self.position)
    }

    pub fn to_start(&mut self) -> Option<&Chord> {
        self.position = 0;
        self.chords.first()
    }

    pub fn to_end(&mut self) -> Option<&Chord> {
        self.position = self.chords.len().saturating_sub(1);
        self.chords.last()
    }

    pub fn go_to(&mut self, position: usize) -> Result<&Chord, MozartError> {
        if position >= self.chords.len() {
            return Err(self.out_of_range(position));
        }
        self.position = position;
        Ok(&self.chords[position])
    }

    /// Move the cursor to the last chord starting at or before `tick`, or to
    /// the first chord if none does.
    pub fn seek_tick(&mut self, tick: Tick) {
        self.position = self
            .chords
            .partition_point(|c| c.tick() <= tick)
            .saturating_sub(1);
    }

    // Time signature and tempo

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator(&self) -> u32 {
        self.denominator
    }

    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    pub fn mpq(&self) -> u32 {
        self.mpq
    }

    pub fn timing(&self) -> Timing {
        Timing {
            ppq: self.ppq,
            mpq: self.mpq,
        }
    }

    pub fn options(&self) -> StaffOptions {
        StaffOptions {
            numerator: self.numerator,
            denominator: self.denominator,
            ppq: self.ppq,
            mpq: self.mpq,
        }
    }

    /// Replace all four options at once. Nothing changes if any is invalid.
    pub fn set_options(&mut self, options: StaffOptions) -> Result<(), MozartError> {
        options.validate()?;
        self.numerator = options.numerator;
        self.denominator = options.denominator;
        self.ppq = options.ppq;
        self.mpq = options.mpq;
        self.refresh_meta();
        Ok(())
    }

    pub fn set_option(&mut self, field: OptionField, value: u32) -> Result<(), MozartError> {
        field.check(value)?;
        self.set_options(self.options().with(field, value))
    }

    pub fn set_numerator(&mut self, numerator: u32) -> Result<(), MozartError> {
        self.set_option(OptionField::Numerator, numerator)
    }

    pub fn set_denominator(&mut self, denominator: u32) -> Result<(), MozartError> {
        self.set_option(OptionField::Denominator, denominator)
    }

    pub fn set_ppq(&mut self, ppq: u32) -> Result<(), MozartError> {
        self.set_option(OptionField::Ppq, ppq)
    }

    pub fn set_mpq(&mut self, mpq: u32) -> Result<(), MozartError> {
        self.set_option(OptionField::Mpq, mpq)
    }

    /// Tick resolution reported by the source file.
    pub fn set_resolution(&mut self, ppq: u32) {
        self.ppq = ppq;
    }

    fn refresh_meta(&mut self) {
        self.tempo_event = MetaEvent::tempo(self.tempo_event.tick, self.mpq);
        self.time_signature_event = MetaEvent::time_signature(
            self.time_signature_event.tick,
            self.numerator,
            self.denominator,
        );
    }

    pub fn tempo_event(&self) -> &MetaEvent {
        &self.tempo_event
    }

    pub fn time_signature_event(&self) -> &MetaEvent {
        &self.time_signature_event
    }

    /// Tempo, time signature, then every pass-through meta event.
    pub fn meta_events(&self) -> Vec<MetaEvent> {
        let mut events = vec![self.tempo_event.clone(), self.time_signature_event.clone()];
        events.extend(self.meta_events.iter().cloned());
        events
    }

    /// Measure / beat / tick label of the chord at `position`.
    pub fn position_label(&self, position: usize) -> Option<String> {
        self.chords
            .get(position)
            .map(|c| c.position_label(self.numerator, self.ppq))
    }

    // Playback

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Play one note of the chord at `position` for review.
    pub fn play_note<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        position: usize,
        note_index: usize,
        config: &Config,
    ) -> Result<(), MozartError> {
        let chord = self.chord_at(position)?;
        let note = chord.note(note_index).ok_or(MozartError::PositionOutOfRange {
            position: note_index,
            len: chord.len(),
        })?;
        play_sequence(transport, &build_note_sequence(note, self.timing(), config))
    }

    /// Play the chord at `position` for review.
    pub fn play_chord<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        position: usize,
        mode: PlaybackMode,
        config: &Config,
    ) -> Result<(), MozartError> {
        let chord = self.chord_at(position)?;
        play_sequence(
            transport,
            &build_chord_sequence(chord, self.timing(), mode, config),
        )
    }

    /// Play chords `start..=stop` and enter the playing state.
    pub fn play<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        start: usize,
        stop: usize,
        mode: PlaybackMode,
        config: &Config,
    ) -> Result<(), MozartError> {
        if stop >= self.chords.len() {
            return Err(self.out_of_range(stop));
        }
        if start > stop {
            return Err(self.out_of_range(start));
        }
        let range = build_range_sequence(&self.chords[start..=stop], self.timing(), mode, config);
        play_sequence(transport, &range.sequence)?;
        self.playback_ticks = range.playback_ticks;
        self.is_playing = true;
        Ok(())
    }

    /// Halt the transport and move the cursor to the chord playback reached.
    pub fn stop<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        transport.stop();
        self.finish_playback(transport.tick_position());
    }

    /// Leave the playing state if the transport ran out on its own.
    ///
    /// Returns `true` if playback finished.
    pub fn sync_with_transport<T: Transport + ?Sized>(&mut self, transport: &T) -> bool {
        if self.is_playing && !transport.is_running() {
            self.finish_playback(transport.tick_position());
            return true;
        }
        false
    }

    fn finish_playback(&mut self, tick: Tick) {
        self.is_playing = false;
        self.resync_position(tick);
        self.playback_ticks.clear();
    }

    /// Move the cursor to the last played chord whose playback start is at or
    /// before `tick`, or to the first played chord if none is.
    ///
    /// Playback starts grow with chord order, so this is where walking the
    /// cursor forward past earlier starts and back past later ones ends up.
    fn resync_position(&mut self, tick: Tick) {
        let mut played = self.chords.iter().enumerate().filter_map(|(i, c)| {
            self.playback_ticks.get(&c.tick()).map(|&start| (i, start))
        });
        let Some((first, _)) = played.next() else {
            return;
        };
        let last_reached = played
            .take_while(|&(_, start)| start <= tick)
            .last()
            .map(|(i, _)| i);
        let position = last_reached.unwrap_or(first);
        log::debug!("resynchronized '{}' to position {} at tick {}", self.description, position, tick);
        self.position = position;
    }

    fn chord_at(&self, position: usize) -> Result<&Chord, MozartError> {
        self.chords
            .get(position)
            .ok_or_else(|| self.out_of_range(position))
    }

    fn out_of_range(&self, position: usize) -> MozartError {
        MozartError::PositionOutOfRange {
            position,
            len: self.chords.len(),
        }
    }
}

impl fmt::Display for Staff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}
