//! # Composition
//!
//! All staves built from one source: a composite staff holding every track
//! merged together (for full-song playback) followed by one staff per
//! non-empty track (for single-part practice).
//!
//! ## Shared options
//! [`Composition::options`] collapses each field to a single display value
//! when every staff agrees and lists the distinct values (`"4; 3"`) when they
//! don't. [`Composition::set_options`] diffs an edited snapshot against the
//! current one and applies only the fields that changed, to every staff.

use crate::config::Config;
use crate::error::MozartError;
use crate::event::{Tick, TrackEvent};
use crate::playback::Transport;
use crate::staff::{OptionField, Staff, StaffOptions};

/// Separator between distinct values of an aggregated option.
pub const VALUE_SEPARATOR: &str = "; ";

/// Which staff of a composition a caller is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffSelection {
    None,
    /// The merged staff; option edits apply to the whole composition.
    Composite,
    /// One track staff, indexed from 0 in track order.
    Track(usize),
}

/// Display snapshot of the four staff options, as edited in a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionOptions {
    pub numerator: String,
    pub denominator: String,
    pub ppq: String,
    pub mpq: String,
}

impl CompositionOptions {
    pub fn get(&self, field: OptionField) -> &str {
        match field {
            OptionField::Numerator => &self.numerator,
            OptionField::Denominator => &self.denominator,
            OptionField::Ppq => &self.ppq,
            OptionField::Mpq => &self.mpq,
        }
    }

    pub fn set(&mut self, field: OptionField, value: impl Into<String>) {
        let value = value.into();
        match field {
            OptionField::Numerator => self.numerator = value,
            OptionField::Denominator => self.denominator = value,
            OptionField::Ppq => self.ppq = value,
            OptionField::Mpq => self.mpq = value,
        }
    }

    /// Fields whose text differs from `previous`.
    pub fn changed_fields(&self, previous: &CompositionOptions) -> Vec<OptionField> {
        OptionField::ALL
            .into_iter()
            .filter(|&field| self.get(field) != previous.get(field))
            .collect()
    }

    /// `true` if the staves disagree on `field`.
    pub fn has_multiple_values(&self, field: OptionField) -> bool {
        self.get(field).contains(';')
    }

    /// Parse every field, failing on the first invalid one.
    pub fn parse(&self) -> Result<StaffOptions, MozartError> {
        Ok(StaffOptions {
            numerator: OptionField::Numerator.parse(&self.numerator)?,
            denominator: OptionField::Denominator.parse(&self.denominator)?,
            ppq: OptionField::Ppq.parse(&self.ppq)?,
            mpq: OptionField::Mpq.parse(&self.mpq)?,
        })
    }
}

impl From<StaffOptions> for CompositionOptions {
    fn from(options: StaffOptions) -> Self {
        Self {
            numerator: options.numerator.to_string(),
            denominator: options.denominator.to_string(),
            ppq: options.ppq.to_string(),
            mpq: options.mpq.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    title: String,
    /// Composite first, then one staff per non-empty track.
    staves: Vec<Staff>,
}

impl Composition {
    /// Build a composition from per-track event lists.
    ///
    /// Tracks without notes are skipped. Two-track sources get the piano
    /// names "Piano Right" and "Piano Left"; otherwise the N-th kept track
    /// is called "Staff N".
    ///
    /// # Example
    /// ```
    /// use mozart::{Composition, Config, TrackEvent};
    ///
    /// let right = vec![TrackEvent::note_on(0, 72, 80), TrackEvent::note_off(480, 72)];
    /// let left = vec![TrackEvent::note_on(0, 48, 80), TrackEvent::note_off(960, 48)];
    ///
    /// let song = Composition::from_tracks(&[right, left], "Minuet", &Config::default()).unwrap();
    /// assert_eq!(song.composite().description(), "Minuet");
    /// assert_eq!(song.composite().chords()[0].note_names(), vec!["C5", "C3"]);
    /// assert_eq!(song.tracks()[1].description(), "Piano Left");
    /// ```
    pub fn from_tracks(
        tracks: &[Vec<TrackEvent>],
        title: impl Into<String>,
        config: &Config,
    ) -> Result<Self, MozartError> {
        let title = title.into();
        let piano = tracks.len() == 2;
        let mut track_staves: Vec<Staff> = Vec::new();

        for events in tracks {
            let mut staff = Staff::from_events(events, config);
            if staff.is_empty() {
                log::debug!("skipping track without notes in '{}'", title);
                continue;
            }
            let number = track_staves.len() + 1;
            let name = match (piano, number) {
                (true, 1) => "Piano Right".to_string(),
                (true, 2) => "Piano Left".to_string(),
                _ => format!("Staff {}", number),
            };
            staff.set_description(name);
            track_staves.push(staff);
        }

        let mut composite = track_staves
            .iter()
            .cloned()
            .reduce(Staff::merge)
            .ok_or_else(|| MozartError::EmptyComposition(title.clone()))?;
        composite.set_description(title.clone());
        composite.reset_position();

        log::debug!(
            "built '{}' from {} track staff(s), {} chord(s) merged",
            title,
            track_staves.len(),
            composite.len()
        );

        let mut staves = Vec::with_capacity(track_staves.len() + 1);
        staves.push(composite);
        staves.extend(track_staves);
        Ok(Self { title, staves })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn composite(&self) -> &Staff {
        &self.staves[0]
    }

    pub fn composite_mut(&mut self) -> &mut Staff {
        &mut self.staves[0]
    }

    pub fn tracks(&self) -> &[Staff] {
        &self.staves[1..]
    }

    /// Composite followed by every track staff.
    pub fn staves(&self) -> &[Staff] {
        &self.staves
    }

    pub fn staff(&self, selection: StaffSelection) -> Option<&Staff> {
        self.staves.get(Self::index_of(selection)?)
    }

    pub fn staff_mut(&mut self, selection: StaffSelection) -> Option<&mut Staff> {
        self.staves.get_mut(Self::index_of(selection)?)
    }

    fn index_of(selection: StaffSelection) -> Option<usize> {
        match selection {
            StaffSelection::None => None,
            StaffSelection::Composite => Some(0),
            StaffSelection::Track(i) => Some(i + 1),
        }
    }

    /// Apply the resolution from the source file header to every staff.
    pub fn set_resolution(&mut self, ppq: u32) {
        for staff in &mut self.staves {
            staff.set_resolution(ppq);
        }
    }

    /// Point every staff at its last chord starting at or before `tick`.
    pub fn sync_tick_position(&mut self, tick: Tick) {
        for staff in &mut self.staves {
            staff.seek_tick(tick);
        }
    }

    /// Stop playback of the selected staff and align every other staff with
    /// the chord it stopped on.
    pub fn stop_playback<T: Transport + ?Sized>(
        &mut self,
        selection: StaffSelection,
        transport: &mut T,
    ) -> Option<Tick> {
        let staff = self.staff_mut(selection)?;
        staff.stop(transport);
        let tick = staff.current()?.tick();
        self.sync_tick_position(tick);
        Some(tick)
    }

    /// Like [`Composition::stop_playback`], for a transport that ran out on its own.
    ///
    /// Returns the tick the staves were aligned to, or `None` if the selected
    /// staff is still playing.
    pub fn poll_playback<T: Transport + ?Sized>(
        &mut self,
        selection: StaffSelection,
        transport: &T,
    ) -> Option<Tick> {
        let staff = self.staff_mut(selection)?;
        if !staff.sync_with_transport(transport) {
            return None;
        }
        let tick = staff.current()?.tick();
        self.sync_tick_position(tick);
        Some(tick)
    }

    /// Aggregated options across every staff.
    ///
    /// # Example
    /// ```
    /// use mozart::{Composition, Config, TrackEvent};
    ///
    /// let track = vec![TrackEvent::note_on(0, 60, 80), TrackEvent::note_off(10, 60)];
    /// let mut song =
    ///     Composition::from_tracks(&[track.clone(), track], "Etude", &Config::default()).unwrap();
    /// song.staff_mut(mozart::StaffSelection::Track(1))
    ///     .unwrap()
    ///     .set_numerator(3)
    ///     .unwrap();
    ///
    /// assert_eq!(song.options().numerator, "4; 3");
    /// assert_eq!(song.options().denominator, "4");
    /// ```
    pub fn options(&self) -> CompositionOptions {
        let aggregate = |field: OptionField| {
            let mut values: Vec<String> = Vec::new();
            for staff in &self.staves {
                let value = staff.options().get(field).to_string();
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            values.join(VALUE_SEPARATOR)
        };
        CompositionOptions {
            numerator: aggregate(OptionField::Numerator),
            denominator: aggregate(OptionField::Denominator),
            ppq: aggregate(OptionField::Ppq),
            mpq: aggregate(OptionField::Mpq),
        }
    }

    /// Apply the fields of `edited` that differ from [`Composition::options`]
    /// to every staff.
    ///
    /// Unchanged fields keep each staff's own value. Nothing is applied if any
    /// changed field fails to parse. Returns the fields that were applied.
    pub fn set_options(
        &mut self,
        edited: &CompositionOptions,
    ) -> Result<Vec<OptionField>, MozartError> {
        let previous = self.options();
        let changes = edited
            .changed_fields(&previous)
            .into_iter()
            .map(|field| field.parse(edited.get(field)).map(|value| (field, value)))
            .collect::<Result<Vec<(OptionField, u32)>, MozartError>>()?;

        for staff in &mut self.staves {
            let options = changes
                .iter()
                .fold(staff.options(), |options, &(field, value)| {
                    options.with(field, value)
                });
            staff.set_options(options)?;
        }

        let fields: Vec<OptionField> = changes.into_iter().map(|(field, _)| field).collect();
        if !fields.is_empty() {
            log::debug!("'{}': applied {:?} to every staff", self.title, fields);
        }
        Ok(fields)
    }

    /// Options shown for a selection: aggregated for the composite, the
    /// staff's own for a track.
    pub fn options_for(&self, selection: StaffSelection) -> Option<CompositionOptions> {
        match selection {
            StaffSelection::None => None,
            StaffSelection::Composite => Some(self.options()),
            StaffSelection::Track(_) => self.staff(selection).map(|s| s.options().into()),
        }
    }

    /// Apply edited options to a selection.
    ///
    /// The composite propagates changed fields to every staff; a track staff
    /// takes all four values. Returns `Ok(false)` when nothing is selected.
    pub fn apply_options_for(
        &mut self,
        selection: StaffSelection,
        edited: &CompositionOptions,
    ) -> Result<bool, MozartError> {
        match selection {
            StaffSelection::None => Ok(false),
            StaffSelection::Composite => self.set_options(edited).map(|_| true),
            StaffSelection::Track(i) => {
                let options = edited.parse()?;
                let len = self.tracks().len();
                let staff = self
                    .staff_mut(selection)
                    .ok_or(MozartError::PositionOutOfRange { position: i, len })?;
                staff.set_options(options)?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(notes: &[(Tick, u8)]) -> Vec<TrackEvent> {
        let mut events = Vec::new();
        for &(tick, pitch) in notes {
            events.push(TrackEvent::note_on(tick, pitch, 80));
            events.push(TrackEvent::note_off(tick + 10, pitch));
        }
        events.sort_by_key(|e| e.tick);
        events
    }

    fn song() -> Composition {
        Composition::from_tracks(
            &[track(&[(0, 72), (100, 74)]), track(&[(0, 48), (50, 50)])],
            "Prelude",
            &Config::default(),
        )
        .unwrap()
    }

    fn descriptions(song: &Composition) -> Vec<&str> {
        song.staves().iter().map(|s| s.description()).collect()
    }

    #[test]
    fn test_two_tracks_are_piano_hands() {
        let song = song();
        assert_eq!(descriptions(&song), vec!["Prelude", "Piano Right", "Piano Left"]);
        assert_eq!(song.title(), "Prelude");
    }

    #[test]
    fn test_other_track_counts_are_numbered() {
        let config = Config::default();
        let song = Composition::from_tracks(
            &[track(&[(0, 60)]), Vec::new(), track(&[(5, 62)]), track(&[(9, 64)])],
            "Quartet",
            &config,
        )
        .unwrap();
        assert_eq!(
            descriptions(&song),
            vec!["Quartet", "Staff 1", "Staff 2", "Staff 3"]
        );

        let single = Composition::from_tracks(&[track(&[(0, 60)])], "Solo", &config).unwrap();
        assert_eq!(descriptions(&single), vec!["Solo", "Staff 1"]);
    }

    #[test]
    fn test_two_tracks_with_one_empty() {
        let song = Composition::from_tracks(
            &[Vec::new(), track(&[(0, 60)])],
            "Conductor",
            &Config::default(),
        )
        .unwrap();
        assert_eq!(descriptions(&song), vec!["Conductor", "Piano Right"]);
    }

    #[test]
    fn test_no_notes_is_an_error() {
        let tempo_only = vec![TrackEvent::tempo(0, 500_000)];
        let err = Composition::from_tracks(&[tempo_only, Vec::new()], "Silence", &Config::default())
            .unwrap_err();
        assert_eq!(err, MozartError::EmptyComposition("Silence".to_string()));
    }

    #[test]
    fn test_composite_merges_tracks() {
        let song = song();
        let composite = song.composite();
        assert_eq!(composite.all_ticks(), vec![0, 50, 100]);
        assert_eq!(composite.chords()[0].note_names(), vec!["C5", "C3"]);
        assert_eq!(composite.position(), 0);
        assert_eq!(song.tracks().len(), 2);
    }

    #[test]
    fn test_selection() {
        let mut song = song();
        assert!(song.staff(StaffSelection::None).is_none());
        assert_eq!(
            song.staff(StaffSelection::Composite).unwrap().description(),
            "Prelude"
        );
        assert_eq!(
            song.staff(StaffSelection::Track(0)).unwrap().description(),
            "Piano Right"
        );
        assert!(song.staff(StaffSelection::Track(2)).is_none());
        assert!(song.staff_mut(StaffSelection::Track(1)).is_some());
    }

    #[test]
    fn test_sync_tick_position() {
        let mut song = song();
        song.sync_tick_position(60);
        let positions: Vec<usize> = song.staves().iter().map(Staff::position).collect();
        // composite: 0, 50, 100; right: 0, 100; left: 0, 50
        assert_eq!(positions, vec![1, 0, 1]);

        song.sync_tick_position(1000);
        let positions: Vec<usize> = song.staves().iter().map(Staff::position).collect();
        assert_eq!(positions, vec![2, 1, 1]);
    }

    #[test]
    fn test_set_resolution() {
        let mut song = song();
        song.set_resolution(96);
        assert!(song.staves().iter().all(|s| s.ppq() == 96));
        assert_eq!(song.options().ppq, "96");
    }

    #[test]
    fn test_options_aggregate_distinct_values() {
        let mut song = song();
        assert_eq!(song.options(), CompositionOptions::from(song.composite().options()));

        song.staff_mut(StaffSelection::Track(0))
            .unwrap()
            .set_mpq(500_000)
            .unwrap();
        song.staff_mut(StaffSelection::Track(1))
            .unwrap()
            .set_mpq(600_000)
            .unwrap();
        let options = song.options();
        assert_eq!(options.mpq, "2000000; 500000; 600000");
        assert!(options.has_multiple_values(OptionField::Mpq));
        assert!(!options.has_multiple_values(OptionField::Ppq));
    }

    #[test]
    fn test_set_options_applies_changed_fields_only() {
        let mut song = song();
        song.staff_mut(StaffSelection::Track(1))
            .unwrap()
            .set_mpq(500_000)
            .unwrap();

        let mut edited = song.options();
        edited.numerator = "3".to_string();
        let applied = song.set_options(&edited).unwrap();

        assert_eq!(applied, vec![OptionField::Numerator]);
        assert!(song.staves().iter().all(|s| s.numerator() == 3));
        // Untouched field keeps each staff's own value
        assert_eq!(song.options().mpq, "2000000; 500000");
    }

    #[test]
    fn test_set_options_is_all_or_nothing() {
        let mut song = song();
        let before = song.clone();

        let mut edited = song.options();
        edited.numerator = "6".to_string();
        edited.ppq = "0".to_string();
        let err = song.set_options(&edited).unwrap_err();

        assert!(matches!(err, MozartError::InvalidOption { ref field, .. } if field == OptionField::Ppq.label()));
        assert_eq!(song, before);
    }

    #[test]
    fn test_set_options_rejects_multiple_values() {
        let mut song = song();
        let mut edited = song.options();
        edited.set(OptionField::Denominator, "4; 8");
        assert!(song.set_options(&edited).is_err());

        // Unchanged aggregated text is not re-parsed
        song.staff_mut(StaffSelection::Track(0))
            .unwrap()
            .set_denominator(8)
            .unwrap();
        let edited = song.options();
        assert_eq!(edited.denominator, "4; 8");
        assert_eq!(song.set_options(&edited).unwrap(), Vec::<OptionField>::new());
    }

    #[test]
    fn test_options_for_selection() {
        let mut song = song();
        assert!(song.options_for(StaffSelection::None).is_none());
        assert!(!song
            .apply_options_for(StaffSelection::None, &song.options())
            .unwrap());

        let mut edited = song.options_for(StaffSelection::Track(0)).unwrap();
        edited.numerator = "2".to_string();
        assert!(song.apply_options_for(StaffSelection::Track(0), &edited).unwrap());
        assert_eq!(song.tracks()[0].numerator(), 2);
        assert_eq!(song.tracks()[1].numerator(), 4);
        assert_eq!(song.options_for(StaffSelection::Composite).unwrap().numerator, "4; 2");

        let err = song
            .apply_options_for(StaffSelection::Track(5), &edited)
            .unwrap_err();
        assert_eq!(err, MozartError::PositionOutOfRange { position: 5, len: 2 });
    }
}
