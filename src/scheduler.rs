//! # Selection Scheduler Module
//!
//! Orchestrates one full selection pass over a [`ClipLibrary`]:
//!
//! ```text
//! Idle ──play/skip──► EvaluatingBeats ──► SelectedBeat ──► EvaluatingLeads ──► Committed
//!                           │
//!                           └── no beat qualified ──► Idle
//! ```
//!
//! ## Cascade
//!
//! Beats from every style are auditioned, in the library's style order. The
//! winning beat then decides which single style's leads are auditioned; the
//! leads of every other style get no playback time at all. A pass therefore
//! costs `O(beats) + O(leads in the winning style)`.
//!
//! ## Picking a Winner
//!
//! The winner is the qualifying clip with the strictly greatest average
//! happy score, and that score must be above zero. Because only a strictly
//! greater score replaces the current best, the clip evaluated first wins a
//! tie, and a clip that only ever read `happy:0` never wins.
//!
//! ## Host Controls
//!
//! - [`play`](SelectionScheduler::play) stops every channel and starts a fresh pass
//! - [`skip`](SelectionScheduler::skip) stops the lead, drops the window in flight, and restarts
//! - [`pause`](SelectionScheduler::pause) freezes window time and pauses every channel
//!
//! The scheduler owns no clock and no emotion state. Each [`tick`](SelectionScheduler::tick)
//! is handed the frame delta and the live emotion by the host.

use crate::audio::{AudioOutput, NORMAL_PITCH};
use crate::emotion::EmotionEvent;
use crate::evaluator::{CategoryEvaluator, EvaluationSettings, EvaluatorStatus, ScoredClip};
use crate::library::{Clip, ClipLibrary, Role};
use log::{debug, info};
use serde::Serialize;
use std::mem;

/// Observable position in the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    EvaluatingBeats,
    SelectedBeat,
    EvaluatingLeads,
    Committed,
}

/// Running best picks of the current pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionState {
    pub best_beat: Option<Clip>,
    pub best_beat_score: f32,
    pub best_lead: Option<Clip>,
    pub best_lead_score: f32,
}

/// The committed outcome of a pass, published to display consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub style: String,
    pub beat: ScoredClip,
    pub lead: Option<ScoredClip>,
}

/// Picks the entry with the strictly greatest average score.
///
/// The running best starts at a score of `0.0`, and only a strictly greater
/// average replaces it.
///
/// # Returns
///
/// * `Some(clip)` - The first entry holding the highest positive average
/// * `None` - If `results` is empty or no average is above zero
///
/// # Examples
///
/// ```
/// use moodmix::scheduler::pick_best;
///
/// assert!(pick_best(&[]).is_none());
/// ```
#[must_use]
pub fn pick_best(results: &[ScoredClip]) -> Option<&ScoredClip> {
    let mut best = None;
    let mut best_score = 0.0;
    for candidate in results {
        if candidate.average_score() > best_score {
            best_score = candidate.average_score();
            best = Some(candidate);
        }
    }
    best
}

#[derive(Debug)]
enum Stage {
    Idle,
    EvaluatingBeats(CategoryEvaluator),
    SelectedBeat { style: String, beat: ScoredClip },
    EvaluatingLeads { style: String, beat: ScoredClip, evaluator: CategoryEvaluator },
    Committed,
}

/// Drives selection passes for one host.
#[derive(Debug)]
pub struct SelectionScheduler {
    library: ClipLibrary,
    settings: EvaluationSettings,
    stage: Stage,
    state: SelectionState,
    selection: Option<Selection>,
    paused: bool,
    passes: u64,
}

impl SelectionScheduler {
    pub fn new(library: ClipLibrary, settings: EvaluationSettings) -> Self {
        Self {
            library,
            settings,
            stage: Stage::Idle,
            state: SelectionState::default(),
            selection: None,
            paused: false,
            passes: 0,
        }
    }

    pub fn library(&self) -> &ClipLibrary {
        &self.library
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        match self.stage {
            Stage::Idle => Phase::Idle,
            Stage::EvaluatingBeats(_) => Phase::EvaluatingBeats,
            Stage::SelectedBeat { .. } => Phase::SelectedBeat,
            Stage::EvaluatingLeads { .. } => Phase::EvaluatingLeads,
            Stage::Committed => Phase::Committed,
        }
    }

    /// Best picks of the pass in progress (or the last one).
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// The committed beat and lead, once a pass reaches [`Phase::Committed`].
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of passes started since creation.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// The clip the next tick will sample for, and its channel.
    pub fn next_audition(&self) -> Option<(Role, &Clip)> {
        match &self.stage {
            Stage::EvaluatingBeats(evaluator) => evaluator.next_clip().map(|clip| (Role::Beat, clip)),
            Stage::SelectedBeat { style, .. } => self
                .library
                .style(style)
                .and_then(|bucket| bucket.leads.first())
                .map(|clip| (Role::Lead, clip)),
            Stage::EvaluatingLeads { evaluator, .. } => evaluator.next_clip().map(|clip| (Role::Lead, clip)),
            Stage::Idle | Stage::Committed => None,
        }
    }

    /// Starts a fresh pass from scratch, silencing every channel first.
    pub fn play(&mut self, output: &mut dyn AudioOutput) {
        info!("Play: starting a fresh selection pass");
        self.abandon_stage(output);
        for channel in Role::ALL {
            output.stop(channel);
        }
        self.begin_pass();
    }

    /// Stops the lead, throws away the window in flight, and restarts the
    /// pass from the first beat.
    pub fn skip(&mut self, output: &mut dyn AudioOutput) {
        info!("Skip: restarting selection from the first beat");
        output.stop(Role::Lead);
        self.abandon_stage(output);
        self.begin_pass();
    }

    /// Freezes window time and pauses every channel.
    pub fn pause(&mut self, output: &mut dyn AudioOutput) {
        if self.paused {
            return;
        }
        debug!("Pausing playback");
        self.paused = true;
        for channel in Role::ALL {
            output.pause(channel);
        }
    }

    pub fn unpause(&mut self, output: &mut dyn AudioOutput) {
        if !self.paused {
            return;
        }
        debug!("Resuming playback");
        self.paused = false;
        for channel in Role::ALL {
            output.unpause(channel);
        }
    }

    fn abandon_stage(&mut self, output: &mut dyn AudioOutput) {
        match mem::replace(&mut self.stage, Stage::Idle) {
            Stage::EvaluatingBeats(mut evaluator) | Stage::EvaluatingLeads { mut evaluator, .. } => {
                evaluator.cancel(output);
            }
            Stage::Idle | Stage::SelectedBeat { .. } | Stage::Committed => {}
        }
        if self.paused {
            self.unpause(output);
        }
    }

    fn begin_pass(&mut self) {
        self.passes += 1;
        self.state = SelectionState::default();
        self.selection = None;

        let beats: Vec<Clip> = self
            .library
            .styles()
            .iter()
            .flat_map(|style| style.beats.iter().cloned())
            .collect();
        debug!(
            "Pass {}: auditioning {} beats across {} styles",
            self.passes,
            beats.len(),
            self.library.styles().len()
        );
        self.stage = Stage::EvaluatingBeats(CategoryEvaluator::new(Role::Beat, beats, self.settings));
    }

    /// Advances the pass by one frame.
    ///
    /// The audition in progress gets `dt` more seconds and samples `emotion`
    /// once. When the last beat window closes, the winning beat is started
    /// on the beat channel; when the last lead window closes, the winning
    /// lead joins it and the pass is committed.
    ///
    /// # Arguments
    ///
    /// * `dt` - Seconds since the previous tick
    /// * `emotion` - The live emotion, as seen on this tick
    /// * `output` - Device the clips play on
    ///
    /// # Returns
    ///
    /// The phase after this tick. Paused schedulers ignore ticks and report
    /// their current phase; so do `Idle` and `Committed` ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use moodmix::audio::RecordingOutput;
    /// use moodmix::emotion::EmotionEvent;
    /// use moodmix::evaluator::EvaluationSettings;
    /// use moodmix::library::{Clip, ClipLibrary, StyleBucket};
    /// use moodmix::scheduler::{Phase, SelectionScheduler};
    ///
    /// let library = ClipLibrary::new(vec![StyleBucket {
    ///     name: "rave".to_string(),
    ///     beats: vec![Clip::new("rave_beat")],
    ///     ..StyleBucket::default()
    /// }])?;
    /// let settings = EvaluationSettings { song_duration: 1.0, ..EvaluationSettings::default() };
    /// let mut scheduler = SelectionScheduler::new(library, settings);
    /// let mut output = RecordingOutput::new();
    ///
    /// scheduler.play(&mut output);
    /// let happy = EmotionEvent::new("happy", 70.0);
    /// assert_eq!(scheduler.tick(1.0, &happy, &mut output), Phase::SelectedBeat);
    /// assert_eq!(scheduler.tick(1.0, &happy, &mut output), Phase::Committed);
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn tick(&mut self, dt: f32, emotion: &EmotionEvent, output: &mut dyn AudioOutput) -> Phase {
        if self.paused {
            return self.phase();
        }
        let stage = mem::replace(&mut self.stage, Stage::Idle);
        self.stage = self.advance(stage, dt, emotion, output);
        self.phase()
    }

    fn advance(&mut self, stage: Stage, dt: f32, emotion: &EmotionEvent, output: &mut dyn AudioOutput) -> Stage {
        match stage {
            Stage::Idle => Stage::Idle,
            Stage::Committed => Stage::Committed,
            Stage::EvaluatingBeats(mut evaluator) => match evaluator.tick(dt, emotion, output) {
                EvaluatorStatus::Running => Stage::EvaluatingBeats(evaluator),
                EvaluatorStatus::Done => self.select_beat(&evaluator.into_results(), output),
            },
            Stage::SelectedBeat { style, beat } => {
                let leads = self
                    .library
                    .style(&style)
                    .map(|bucket| bucket.leads.clone())
                    .unwrap_or_default();
                debug!("Auditioning {} {style} leads over the selected beat", leads.len());
                let evaluator = CategoryEvaluator::new(Role::Lead, leads, self.settings);
                self.advance(Stage::EvaluatingLeads { style, beat, evaluator }, dt, emotion, output)
            }
            Stage::EvaluatingLeads { style, beat, mut evaluator } => match evaluator.tick(dt, emotion, output) {
                EvaluatorStatus::Running => Stage::EvaluatingLeads { style, beat, evaluator },
                EvaluatorStatus::Done => self.commit(style, beat, &evaluator.into_results(), output),
            },
        }
    }

    fn select_beat(&mut self, results: &[ScoredClip], output: &mut dyn AudioOutput) -> Stage {
        let Some(best) = pick_best(results) else {
            info!("No beat detected as the happiest.");
            return Stage::Idle;
        };

        info!(
            "The beat with the highest average happiness is: {} with an average happiness score of {:.1}%.",
            best.clip,
            best.average_score()
        );
        self.state.best_beat = Some(best.clip.clone());
        self.state.best_beat_score = best.average_score();

        let style = self
            .library
            .style_of(Role::Beat, &best.clip)
            .map(|bucket| bucket.name.clone())
            .unwrap_or_default();

        output.play(Role::Beat, &best.clip, true, NORMAL_PITCH);
        Stage::SelectedBeat {
            style,
            beat: best.clone(),
        }
    }

    fn commit(&mut self, style: String, beat: ScoredClip, results: &[ScoredClip], output: &mut dyn AudioOutput) -> Stage {
        let lead = pick_best(results).cloned();

        match &lead {
            Some(lead) => {
                info!(
                    "The happiest lead is: {} with an average happiness score of {:.1}%.",
                    lead.clip,
                    lead.average_score()
                );
                self.state.best_lead = Some(lead.clip.clone());
                self.state.best_lead_score = lead.average_score();
                output.play(Role::Lead, &lead.clip, true, NORMAL_PITCH);
            }
            None => info!("No lead detected as the happiest."),
        }
        output.set_pitch(Role::Beat, NORMAL_PITCH);

        self.selection = Some(Selection { style, beat, lead });
        Stage::Committed
    }
}
