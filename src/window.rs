//! # Playback Window Module
//!
//! Timed lifecycle of one clip on one channel:
//!
//! ```text
//! start ──► tick … tick ──► fade (last `pitch_down` seconds) ──► stop, pitch = 1.0
//! ```
//!
//! The window owns no clock. The host hands it a delta on every tick, so a
//! paused host simply stops ticking and the window resumes where it was.
//!
//! ## Pitch Envelope
//!
//! Over the final `pitch_down` seconds the pitch falls linearly from `1.0`
//! to [`FADE_FLOOR_PITCH`]:
//!
//! ```text
//! t     = clamp((elapsed - (duration - pitch_down)) / pitch_down, 0, 1)
//! pitch = 1.0 * (1 - t) + 0.05 * t
//! ```

use crate::audio::{AudioOutput, NORMAL_PITCH};
use crate::library::{Clip, Role};
use log::trace;

/// Pitch reached at the very end of a window.
pub const FADE_FLOOR_PITCH: f32 = 0.05;

/// Fade progress in `[0, 1]`, or `None` before the fade begins.
///
/// A zero (or negative) fade length means there is no fade.
#[must_use]
pub fn fade_progress(elapsed: f32, duration: f32, pitch_down: f32) -> Option<f32> {
    if pitch_down <= 0.0 {
        return None;
    }
    let fade_start = duration - pitch_down;
    if elapsed < fade_start {
        return None;
    }
    Some(((elapsed - fade_start) / pitch_down).clamp(0.0, 1.0))
}

/// Pitch the envelope prescribes at `elapsed` seconds into a window.
///
/// # Examples
///
/// ```
/// use moodmix::window::pitch_at;
///
/// assert_eq!(pitch_at(0.0, 20.0, 1.0), 1.0);
/// assert_eq!(pitch_at(19.0, 20.0, 1.0), 1.0);
/// assert_eq!(pitch_at(20.0, 20.0, 1.0), 0.05);
/// ```
#[must_use]
pub fn pitch_at(elapsed: f32, duration: f32, pitch_down: f32) -> f32 {
    match fade_progress(elapsed, duration, pitch_down) {
        Some(t) => lerp(NORMAL_PITCH, FADE_FLOOR_PITCH, t),
        None => NORMAL_PITCH,
    }
}

#[inline]
fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from * (1.0 - t) + to * t
}

/// What one tick did to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    /// The tick counted and the window is still open.
    Playing,
    /// The tick counted and reached the end of the window; the clip is
    /// stopped.
    LastTick,
    /// The window was already over. The tick did not count.
    Finished,
}

/// One clip's timed playback. Not restartable: a new window is a new value.
#[derive(Debug, Clone)]
pub struct PlaybackWindow {
    clip: Clip,
    channel: Role,
    duration: f32,
    pitch_down: f32,
    elapsed: f32,
    finished: bool,
}

impl PlaybackWindow {
    /// Starts `clip` looping on `channel` at normal pitch.
    ///
    /// # Arguments
    ///
    /// * `clip` - Clip to play for the length of the window
    /// * `channel` - Output channel, one per clip role
    /// * `duration` - Window length in seconds
    /// * `pitch_down` - Length of the closing fade in seconds. A fade longer
    ///   than the window is cut to the window, so the dive always starts
    ///   from normal pitch.
    /// * `output` - Device the clip plays on
    ///
    /// # Examples
    ///
    /// ```
    /// use moodmix::audio::RecordingOutput;
    /// use moodmix::library::{Clip, Role};
    /// use moodmix::window::{PlaybackWindow, WindowStatus};
    ///
    /// let mut output = RecordingOutput::new();
    /// let mut window = PlaybackWindow::start(Clip::new("latin_beat_1"), Role::Beat, 2.0, 1.0, &mut output);
    ///
    /// assert_eq!(window.tick(1.0, &mut output), WindowStatus::Playing);
    /// assert_eq!(window.tick(1.0, &mut output), WindowStatus::LastTick);
    /// assert!(output.channel(Role::Beat).is_none());
    /// ```
    pub fn start(
        clip: Clip,
        channel: Role,
        duration: f32,
        pitch_down: f32,
        output: &mut dyn AudioOutput,
    ) -> Self {
        output.play(channel, &clip, true, NORMAL_PITCH);
        Self {
            clip,
            channel,
            duration,
            pitch_down: pitch_down.clamp(0.0, duration.max(0.0)),
            elapsed: 0.0,
            finished: false,
        }
    }

    pub fn clip(&self) -> &Clip {
        &self.clip
    }

    pub fn channel(&self) -> Role {
        self.channel
    }

    #[must_use]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Advances the window by `dt` seconds.
    ///
    /// The tick that carries the elapsed time to the duration applies the
    /// final fade step, stops the clip, restores normal pitch, and reports
    /// [`WindowStatus::LastTick`]. A window whose duration is not positive
    /// closes on its first tick without counting it.
    pub fn tick(&mut self, dt: f32, output: &mut dyn AudioOutput) -> WindowStatus {
        if self.finished {
            return WindowStatus::Finished;
        }
        if self.elapsed >= self.duration {
            self.stop(output);
            return WindowStatus::Finished;
        }

        self.elapsed += dt;
        if let Some(t) = fade_progress(self.elapsed, self.duration, self.pitch_down) {
            let pitch = lerp(NORMAL_PITCH, FADE_FLOOR_PITCH, t);
            trace!("Fading {} (t = {t:.3}, pitch = {pitch:.3})", self.clip);
            output.set_pitch(self.channel, pitch);
        }

        if self.elapsed >= self.duration {
            self.stop(output);
            WindowStatus::LastTick
        } else {
            WindowStatus::Playing
        }
    }

    /// Ends the window now, whatever its progress.
    pub fn stop(&mut self, output: &mut dyn AudioOutput) {
        if self.finished {
            return;
        }
        output.stop(self.channel);
        output.set_pitch(self.channel, NORMAL_PITCH);
        self.finished = true;
    }
}
