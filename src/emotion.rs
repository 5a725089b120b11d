//! Emotion events and the wire format the classifier speaks.
//!
//! A frame is `<label>:<score>` with the label trimmed and the score a
//! decimal in `[0, 100]`. Anything else is a [`ParseError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Label the classifier reports for positive affect.
pub const HAPPY_LABEL: &str = "happy";

/// Label and score reported before any frame has been parsed.
pub const DEFAULT_LABEL: &str = "neutral";

/// One classifier reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionEvent {
    pub label: String,
    /// Confidence in percent, `0.0..=100.0`.
    pub score: f32,
}

impl EmotionEvent {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }

    /// Case-insensitive match against [`HAPPY_LABEL`].
    #[must_use]
    pub fn is_happy(&self) -> bool {
        self.label.eq_ignore_ascii_case(HAPPY_LABEL)
    }
}

impl Default for EmotionEvent {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL, 0.0)
    }
}

impl fmt::Display for EmotionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}%", self.label, self.score)
    }
}

/// Why a frame was dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected `label:score`, found {0} field(s)")]
    FieldCount(usize),
    #[error("score `{0}` is not a number")]
    InvalidScore(String),
    #[error("score {0} is outside 0..=100")]
    OutOfRange(f32),
}

/// Parses one raw frame.
///
/// Both fields are trimmed, and the score must be a finite number in
/// `0..=100`.
///
/// # Arguments
///
/// * `frame` - One `label:score` payload as read off the socket
///
/// # Returns
///
/// The decoded [`EmotionEvent`], or the [`ParseError`] that caused the
/// frame to be dropped.
///
/// # Examples
///
/// ```
/// use moodmix::emotion::{parse_frame, EmotionEvent};
///
/// assert_eq!(parse_frame(" happy :82.5").unwrap(), EmotionEvent::new("happy", 82.5));
/// assert!(parse_frame("garbage").is_err());
/// ```
pub fn parse_frame(frame: &str) -> Result<EmotionEvent, ParseError> {
    let fields: Vec<&str> = frame.split(':').collect();
    let [label, score] = fields.as_slice() else {
        return Err(ParseError::FieldCount(fields.len()));
    };

    let score_text = score.trim();
    let score: f32 = score_text
        .parse()
        .map_err(|_| ParseError::InvalidScore(score_text.to_string()))?;

    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return Err(ParseError::OutOfRange(score));
    }

    Ok(EmotionEvent::new(label.trim(), score))
}

/// Anything that can report the live emotion. Reads must not block.
pub trait EmotionSource {
    fn current_emotion(&self) -> &EmotionEvent;
}

impl EmotionSource for EmotionEvent {
    fn current_emotion(&self) -> &EmotionEvent {
        self
    }
}
