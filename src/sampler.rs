//! # Happiness Sampler Module
//!
//! Measures how happy the listener was while one clip played. The sampler
//! does not subscribe to classifier events; it looks at the live emotion once
//! per tick, so a reading that is overwritten between two ticks is never seen.
//!
//! ## Measurement
//!
//! ```text
//! every tick:   total_checks += 1
//!               if label == "happy" (any case): samples.push(score)
//! window end:   percent_time_happy = 100 * samples / total_checks
//!               average_score      = mean(samples)
//!               qualifies          = percent_time_happy >= threshold && samples > 0
//! ```
//!
//! A window with no ticks at all reports 0% and never qualifies.

use crate::emotion::EmotionEvent;
use serde::Serialize;

/// Result of one clip's evaluation window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HappinessRecord {
    /// Share of ticks, in percent, on which the listener read as happy.
    pub percent_time_happy: f32,
    /// Mean happy score over the happy ticks; `None` when there were none.
    pub average_score: Option<f32>,
    pub sample_count: usize,
    pub total_checks: usize,
    pub qualifies: bool,
}

/// Per-window tick accumulator.
#[derive(Debug, Clone, Default)]
pub struct HappinessSampler {
    total_checks: usize,
    samples: Vec<f32>,
}

impl HappinessSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one tick's view of the live emotion.
    pub fn sample(&mut self, emotion: &EmotionEvent) {
        self.total_checks += 1;
        if emotion.is_happy() {
            self.samples.push(emotion.score);
        }
    }

    #[must_use]
    pub fn total_checks(&self) -> usize {
        self.total_checks
    }

    /// Closes the window against `threshold` (percent, `0..=100`).
    ///
    /// # Returns
    ///
    /// A [`HappinessRecord`] that qualifies when at least one tick read happy
    /// and the happy share of ticks reaches `threshold`.
    ///
    /// # Examples
    ///
    /// ```
    /// use moodmix::emotion::EmotionEvent;
    /// use moodmix::sampler::HappinessSampler;
    ///
    /// let mut sampler = HappinessSampler::new();
    /// sampler.sample(&EmotionEvent::new("happy", 60.0));
    /// sampler.sample(&EmotionEvent::new("neutral", 40.0));
    ///
    /// let record = sampler.finish(50.0);
    /// assert_eq!(record.percent_time_happy, 50.0);
    /// assert_eq!(record.average_score, Some(60.0));
    /// assert!(record.qualifies);
    /// ```
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(&self, threshold: f32) -> HappinessRecord {
        let sample_count = self.samples.len();

        let percent_time_happy = match self.total_checks {
            0 => 0.0,
            checks => 100.0 * sample_count as f32 / checks as f32,
        };

        let average_score = match sample_count {
            0 => None,
            count => Some(self.samples.iter().sum::<f32>() / count as f32),
        };

        HappinessRecord {
            percent_time_happy,
            average_score,
            sample_count,
            total_checks: self.total_checks,
            qualifies: sample_count > 0 && percent_time_happy >= threshold,
        }
    }

    /// Runs a whole window over a finite tick stream.
    ///
    /// Each item is one tick: the time it advances and the live emotion seen
    /// on it. Ticks are consumed while the accumulated time is still below
    /// `window_duration`; a stream that runs dry ends the window early.
    ///
    /// # Examples
    ///
    /// ```
    /// use moodmix::emotion::EmotionEvent;
    /// use moodmix::sampler::HappinessSampler;
    ///
    /// let ticks = vec![
    ///     (1.0, EmotionEvent::new("happy", 80.0)),
    ///     (1.0, EmotionEvent::new("sad", 10.0)),
    ///     (1.0, EmotionEvent::new("happy", 90.0)),
    /// ];
    /// let record = HappinessSampler::evaluate(3.0, ticks, 50.0);
    ///
    /// assert!(record.qualifies);
    /// assert_eq!(record.average_score, Some(85.0));
    /// ```
    pub fn evaluate<I>(window_duration: f32, ticks: I, threshold: f32) -> HappinessRecord
    where
        I: IntoIterator<Item = (f32, EmotionEvent)>,
    {
        let mut sampler = Self::new();
        let mut elapsed = 0.0;
        let mut ticks = ticks.into_iter();

        while elapsed < window_duration {
            let Some((dt, emotion)) = ticks.next() else {
                break;
            };
            elapsed += dt;
            sampler.sample(&emotion);
        }

        sampler.finish(threshold)
    }
}
