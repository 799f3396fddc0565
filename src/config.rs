//! # Configuration
//!
//! Process-wide defaults and playback options, passed explicitly into staff
//! construction and the playback builders.
//!
//! ## YAML format
//! Every key is optional; missing keys keep their defaults.
//! ```yaml
//! default-numerator: 4
//! default-denominator: 4
//! default-ppq: 480
//! default-mpq: 2000000
//! chord-offset-ms: 1000
//! offset-buffer-ms: 1000
//! review-velocity: 80
//! loop-count: 10
//! ```
//!
//! ## Validation
//! All values must be greater than zero, except the offset buffer which may be
//! zero. The review velocity must also fit a MIDI data byte (at most 127).

use crate::error::MozartError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NUMERATOR: u32 = 4;
pub const DEFAULT_DENOMINATOR: u32 = 4;
pub const DEFAULT_PPQ: u32 = 480;
pub const DEFAULT_MPQ: u32 = 2_000_000;
pub const DEFAULT_CHORD_OFFSET_MS: u32 = 1000;
pub const DEFAULT_OFFSET_BUFFER_MS: u32 = 1000;
pub const DEFAULT_REVIEW_VELOCITY: u8 = 80;
pub const DEFAULT_LOOP_COUNT: u32 = 10;

const MAX_VELOCITY: i64 = 127;

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Beats per measure used when a track carries no time signature.
    pub default_numerator: u32,
    pub default_denominator: u32,
    /// Pulses (ticks) per quarter note.
    pub default_ppq: u32,
    /// Microseconds per quarter note used when a track carries no tempo.
    pub default_mpq: u32,
    /// Spacing between notes in offset playback.
    pub chord_offset_ms: u32,
    /// Pause between chords in offset playback; also sizes the loop pause.
    pub offset_buffer_ms: u32,
    pub review_velocity: u8,
    /// Number of times a multi-chord range is played. 1 means play once.
    pub loop_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_numerator: DEFAULT_NUMERATOR,
            default_denominator: DEFAULT_DENOMINATOR,
            default_ppq: DEFAULT_PPQ,
            default_mpq: DEFAULT_MPQ,
            chord_offset_ms: DEFAULT_CHORD_OFFSET_MS,
            offset_buffer_ms: DEFAULT_OFFSET_BUFFER_MS,
            review_velocity: DEFAULT_REVIEW_VELOCITY,
            loop_count: DEFAULT_LOOP_COUNT,
        }
    }
}

/// Raw configuration as read from YAML, before validation.
///
/// Values are signed so that negative input is reported against its field
/// instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    default_numerator: Option<i64>,
    default_denominator: Option<i64>,
    default_ppq: Option<i64>,
    default_mpq: Option<i64>,
    chord_offset_ms: Option<i64>,
    offset_buffer_ms: Option<i64>,
    review_velocity: Option<i64>,
    loop_count: Option<i64>,
}

impl Config {
    /// Parse and validate a YAML configuration document.
    ///
    /// # Example
    /// ```
    /// use mozart::Config;
    ///
    /// let config = Config::from_yaml("loop-count: 3\nreview-velocity: 100").unwrap();
    /// assert_eq!(config.loop_count, 3);
    /// assert_eq!(config.review_velocity, 100);
    /// assert_eq!(config.default_ppq, 480);
    /// ```
    pub fn from_yaml(content: &str) -> Result<Self, MozartError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| MozartError::Config(e.to_string()))?;
        Self::from_raw(raw, &Self::default())
    }

    /// Apply the playback options edited by a user.
    ///
    /// Either every value is accepted and a new config is returned, or the first
    /// offending field is reported and `self` is unchanged.
    pub fn with_playback_options(
        &self,
        chord_offset_ms: i64,
        offset_buffer_ms: i64,
        review_velocity: i64,
        loop_count: i64,
    ) -> Result<Self, MozartError> {
        let raw = RawConfig {
            chord_offset_ms: Some(chord_offset_ms),
            offset_buffer_ms: Some(offset_buffer_ms),
            review_velocity: Some(review_velocity),
            loop_count: Some(loop_count),
            ..RawConfig::default()
        };
        Self::from_raw(raw, self)
    }

    /// Check an already-built config.
    pub fn validate(&self) -> Result<(), MozartError> {
        positive("Default Numerator", self.default_numerator.into())?;
        positive("Default Denominator", self.default_denominator.into())?;
        positive("Default PPQ", self.default_ppq.into())?;
        positive("Default MPQ", self.default_mpq.into())?;
        positive("Chord Offset (milliseconds)", self.chord_offset_ms.into())?;
        velocity("Review Velocity", self.review_velocity.into())?;
        positive("Loop Count", self.loop_count.into())?;
        Ok(())
    }

    fn from_raw(raw: RawConfig, base: &Config) -> Result<Self, MozartError> {
        Ok(Self {
            default_numerator: pick("Default Numerator", raw.default_numerator, base.default_numerator)?,
            default_denominator: pick(
                "Default Denominator",
                raw.default_denominator,
                base.default_denominator,
            )?,
            default_ppq: pick("Default PPQ", raw.default_ppq, base.default_ppq)?,
            default_mpq: pick("Default MPQ", raw.default_mpq, base.default_mpq)?,
            chord_offset_ms: pick(
                "Chord Offset (milliseconds)",
                raw.chord_offset_ms,
                base.chord_offset_ms,
            )?,
            offset_buffer_ms: match raw.offset_buffer_ms {
                Some(v) => non_negative("Offset Buffer (milliseconds)", v)?,
                None => base.offset_buffer_ms,
            },
            review_velocity: match raw.review_velocity {
                Some(v) => velocity("Review Velocity", v)?,
                None => base.review_velocity,
            },
            loop_count: pick("Loop Count", raw.loop_count, base.loop_count)?,
        })
    }
}

fn pick(field: &str, value: Option<i64>, fallback: u32) -> Result<u32, MozartError> {
    match value {
        Some(v) => positive(field, v),
        None => Ok(fallback),
    }
}

fn positive(field: &str, value: i64) -> Result<u32, MozartError> {
    if value <= 0 {
        return Err(MozartError::invalid_option(field, "must be greater than 0"));
    }
    u32::try_from(value).map_err(|_| MozartError::invalid_option(field, "value is too large"))
}

fn non_negative(field: &str, value: i64) -> Result<u32, MozartError> {
    if value < 0 {
        return Err(MozartError::invalid_option(field, "cannot be negative"));
    }
    u32::try_from(value).map_err(|_| MozartError::invalid_option(field, "value is too large"))
}

fn velocity(field: &str, value: i64) -> Result<u8, MozartError> {
    if value <= 0 || value > MAX_VELOCITY {
        return Err(MozartError::invalid_option(field, "must be between 1 and 127"));
    }
    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let config = Config::from_yaml("default-mpq: 500000\noffset-buffer-ms: 0").unwrap();
        assert_eq!(config.default_mpq, 500_000);
        assert_eq!(config.offset_buffer_ms, 0);
        assert_eq!(config.chord_offset_ms, DEFAULT_CHORD_OFFSET_MS);
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let err = Config::from_yaml("chord-offset-ms: 0").unwrap_err();
        assert_eq!(
            err,
            MozartError::invalid_option("Chord Offset (milliseconds)", "must be greater than 0")
        );

        let err = Config::from_yaml("offset-buffer-ms: -5").unwrap_err();
        assert!(matches!(err, MozartError::InvalidOption { ref field, .. } if field == "Offset Buffer (milliseconds)"));

        let err = Config::from_yaml("review-velocity: 200").unwrap_err();
        assert!(matches!(err, MozartError::InvalidOption { ref field, .. } if field == "Review Velocity"));
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let err = Config::from_yaml("tempo: 120").unwrap_err();
        assert!(matches!(err, MozartError::Config(_)));
    }

    #[test]
    fn test_playback_options_all_or_nothing() {
        let config = Config::default();

        let updated = config.with_playback_options(250, 0, 64, 2).unwrap();
        assert_eq!(updated.chord_offset_ms, 250);
        assert_eq!(updated.offset_buffer_ms, 0);
        assert_eq!(updated.review_velocity, 64);
        assert_eq!(updated.loop_count, 2);
        assert_eq!(updated.default_ppq, config.default_ppq);

        let err = config.with_playback_options(250, 0, 64, 0).unwrap_err();
        assert!(matches!(err, MozartError::InvalidOption { ref field, .. } if field == "Loop Count"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }
}
