//! # Category Evaluator Module
//!
//! Auditions an ordered list of clips one after another on a single channel.
//! Each clip gets a full [`PlaybackWindow`] while a [`HappinessSampler`]
//! watches the live emotion on the same ticks. When a window closes, its
//! record is kept if it qualifies and the next clip starts on the next tick.
//!
//! ## Guarantees
//!
//! - Only one clip plays at a time
//! - Every clip is evaluated fully; there is no early exit on a good score
//! - Results are in evaluation order, not score order
//! - Clips that do not qualify are left out of the results

use crate::audio::AudioOutput;
use crate::config::EngineConfig;
use crate::emotion::EmotionEvent;
use crate::library::{Clip, Role};
use crate::sampler::{HappinessRecord, HappinessSampler};
use crate::window::{PlaybackWindow, WindowStatus};
use log::{debug, info};
use serde::Serialize;
use std::collections::VecDeque;

/// Timing and scoring knobs shared by every window in a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationSettings {
    /// Length of each clip's window, in seconds.
    pub song_duration: f32,
    /// Length of the closing pitch fade, in seconds.
    pub pitch_down_duration: f32,
    /// Percent of window time that must read as happy.
    pub happiness_threshold: f32,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            song_duration: 20.0,
            pitch_down_duration: 1.0,
            happiness_threshold: 50.0,
        }
    }
}

impl From<&EngineConfig> for EvaluationSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            song_duration: config.song_duration,
            pitch_down_duration: config.pitch_down_duration,
            happiness_threshold: config.happiness_threshold,
        }
    }
}

/// A clip that qualified, with its measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredClip {
    pub clip: Clip,
    pub record: HappinessRecord,
}

impl ScoredClip {
    /// Average happy score. Qualifying records always carry one.
    #[must_use]
    pub fn average_score(&self) -> f32 {
        self.record.average_score.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluatorStatus {
    Running,
    Done,
}

#[derive(Debug)]
struct Trial {
    window: PlaybackWindow,
    sampler: HappinessSampler,
}

/// Sequential audition of one clip list.
#[derive(Debug)]
pub struct CategoryEvaluator {
    channel: Role,
    settings: EvaluationSettings,
    pending: VecDeque<Clip>,
    current: Option<Trial>,
    results: Vec<ScoredClip>,
    evaluated: usize,
}

impl CategoryEvaluator {
    /// Queues `clips` for audition on `channel`. Nothing plays until the
    /// first [`tick`](Self::tick).
    ///
    /// # Arguments
    ///
    /// * `channel` - Output channel every window plays on
    /// * `clips` - Clips in audition order
    /// * `settings` - Window length, fade length and qualifying threshold
    ///
    /// # Examples
    ///
    /// ```
    /// use moodmix::audio::RecordingOutput;
    /// use moodmix::emotion::EmotionEvent;
    /// use moodmix::evaluator::{CategoryEvaluator, EvaluationSettings, EvaluatorStatus};
    /// use moodmix::library::{Clip, Role};
    ///
    /// let settings = EvaluationSettings { song_duration: 1.0, pitch_down_duration: 0.5, happiness_threshold: 50.0 };
    /// let clips = vec![Clip::new("beat_1"), Clip::new("beat_2")];
    /// let mut evaluator = CategoryEvaluator::new(Role::Beat, clips, settings);
    /// let mut output = RecordingOutput::new();
    ///
    /// let happy = EmotionEvent::new("happy", 75.0);
    /// assert_eq!(evaluator.tick(1.0, &happy, &mut output), EvaluatorStatus::Running);
    /// assert_eq!(evaluator.tick(1.0, &happy, &mut output), EvaluatorStatus::Done);
    /// assert_eq!(evaluator.results().len(), 2);
    /// ```
    pub fn new(channel: Role, clips: impl IntoIterator<Item = Clip>, settings: EvaluationSettings) -> Self {
        Self {
            channel,
            settings,
            pending: clips.into_iter().collect(),
            current: None,
            results: Vec::new(),
            evaluated: 0,
        }
    }

    pub fn channel(&self) -> Role {
        self.channel
    }

    /// Clip under audition, if any.
    pub fn current_clip(&self) -> Option<&Clip> {
        self.current.as_ref().map(|trial| trial.window.clip())
    }

    /// Clip the next tick will sample for: the one under audition, or the
    /// next one queued.
    pub fn next_clip(&self) -> Option<&Clip> {
        self.current_clip().or_else(|| self.pending.front())
    }

    /// Number of clips whose windows have closed.
    #[must_use]
    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    /// Qualifying clips so far, in evaluation order.
    #[must_use]
    pub fn results(&self) -> &[ScoredClip] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ScoredClip> {
        self.results
    }

    /// Advances the audition by one tick of `dt` seconds, sampling `emotion`.
    ///
    /// A tick samples for at most one clip. A clip whose window closes on
    /// this tick is scored now; the next clip starts on the following tick.
    ///
    /// # Returns
    ///
    /// * `EvaluatorStatus::Running` - A window is open or another clip is queued
    /// * `EvaluatorStatus::Done` - Every clip has been scored; see
    ///   [`results`](Self::results)
    pub fn tick(&mut self, dt: f32, emotion: &EmotionEvent, output: &mut dyn AudioOutput) -> EvaluatorStatus {
        loop {
            if self.current.is_none() {
                let Some(clip) = self.pending.pop_front() else {
                    return EvaluatorStatus::Done;
                };
                debug!("Auditioning {clip} on the {} channel", self.channel);
                let window = PlaybackWindow::start(
                    clip,
                    self.channel,
                    self.settings.song_duration,
                    self.settings.pitch_down_duration,
                    output,
                );
                self.current = Some(Trial {
                    window,
                    sampler: HappinessSampler::new(),
                });
            }

            let Some(trial) = self.current.as_mut() else {
                continue;
            };

            match trial.window.tick(dt, output) {
                WindowStatus::Playing => {
                    trial.sampler.sample(emotion);
                    return EvaluatorStatus::Running;
                }
                WindowStatus::LastTick => {
                    trial.sampler.sample(emotion);
                    if let Some(trial) = self.current.take() {
                        self.close_trial(trial);
                    }
                    return self.status();
                }
                WindowStatus::Finished => {
                    if let Some(trial) = self.current.take() {
                        self.close_trial(trial);
                    }
                }
            }
        }
    }

    fn status(&self) -> EvaluatorStatus {
        if self.is_done() {
            EvaluatorStatus::Done
        } else {
            EvaluatorStatus::Running
        }
    }

    fn close_trial(&mut self, trial: Trial) {
        let clip = trial.window.clip().clone();
        let record = trial.sampler.finish(self.settings.happiness_threshold);
        self.evaluated += 1;

        match (record.qualifies, record.average_score) {
            (true, Some(average)) => {
                info!(
                    "Clip: {clip} finished. Average Happiness: {average:.1}%, Happiness Detected for {:.1}% of the time.",
                    record.percent_time_happy
                );
                self.results.push(ScoredClip { clip, record });
            }
            _ => {
                info!(
                    "Clip: {clip} finished. No Happiness Detected. Happiness was only detected {:.1}% of the time.",
                    record.percent_time_happy
                );
            }
        }
    }

    /// Abandons the audition: stops the clip in flight, drops its partial
    /// record, and forgets the clips still queued.
    pub fn cancel(&mut self, output: &mut dyn AudioOutput) {
        if let Some(mut trial) = self.current.take() {
            debug!("Cancelling audition of {}", trial.window.clip());
            trial.window.stop(output);
        }
        self.pending.clear();
    }
}

/// Auditions `clips` start to finish over a finite tick stream and returns
/// the qualifying clips in evaluation order. Stops early only if the ticks
/// run out.
pub fn evaluate_all<I>(
    channel: Role,
    clips: impl IntoIterator<Item = Clip>,
    settings: EvaluationSettings,
    ticks: I,
    output: &mut dyn AudioOutput,
) -> Vec<ScoredClip>
where
    I: IntoIterator<Item = (f32, EmotionEvent)>,
{
    let mut evaluator = CategoryEvaluator::new(channel, clips, settings);
    for (dt, emotion) in ticks {
        if evaluator.tick(dt, &emotion, output) == EvaluatorStatus::Done {
            break;
        }
    }
    evaluator.into_results()
}
