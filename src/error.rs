//! # Error Types
//!
//! This module defines the single error type used across the crate.
//!
//! ## Recoverable vs. surfaced errors
//! - `MalformedMeta` is produced by the tempo / time-signature decoders. A
//!   [`Staff`](crate::Staff) always recovers from it by applying the configured
//!   defaults, so it never escapes staff construction.
//! - `InvalidOption` is the only error a user edit can produce. Whenever it is
//!   returned, the edited value (staff, composition or config) is left untouched.
//!
//! ## Usage
//! ```rust
//! use mozart::{Config, MozartError};
//!
//! let err = Config::from_yaml("loop-count: 0").unwrap_err();
//! match err {
//!     MozartError::InvalidOption { field, .. } => assert_eq!(field, "Loop Count"),
//!     e => panic!("unexpected error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MozartError {
    /// A tempo or time-signature meta event could not be decoded.
    ///
    /// # Example
    /// ```
    /// # use mozart::MozartError;
    /// let err = MozartError::MalformedMeta {
    ///     kind: "tempo",
    ///     message: "empty payload".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Malformed tempo event: empty payload");
    /// ```
    #[error("Malformed {kind} event: {message}")]
    MalformedMeta { kind: &'static str, message: String },

    /// A user-supplied option was rejected.
    ///
    /// `field` is the display label of the offending option.
    ///
    /// # Example
    /// ```
    /// # use mozart::MozartError;
    /// let err = MozartError::InvalidOption {
    ///     field: "Numerator".to_string(),
    ///     message: "must be greater than 0".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Invalid value for Numerator: must be greater than 0");
    /// ```
    #[error("Invalid value for {field}: {message}")]
    InvalidOption { field: String, message: String },

    #[error("Position {position} is outside a staff of {len} chord(s)")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid MIDI file: {0}")]
    Smf(String),

    #[error("No playable notes in {0}")]
    EmptyComposition(String),
}

impl MozartError {
    pub(crate) fn invalid_option(field: impl Into<String>, message: impl Into<String>) -> Self {
        MozartError::InvalidOption {
            field: field.into(),
            message: message.into(),
        }
    }
}
