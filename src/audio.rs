//! Output device seam.
//!
//! The engine never decodes or mixes audio; it tells an [`AudioOutput`] what
//! to play on which channel. One channel exists per [`Role`].

use crate::library::{Clip, Role};
use log::{debug, info, trace};
use std::collections::HashMap;

/// Pitch of a clip playing at normal speed.
pub const NORMAL_PITCH: f32 = 1.0;

/// Per-channel playback control.
pub trait AudioOutput {
    /// Replaces whatever `channel` was playing with `clip`.
    fn play(&mut self, channel: Role, clip: &Clip, looped: bool, pitch: f32);
    fn stop(&mut self, channel: Role);
    fn set_pitch(&mut self, channel: Role, pitch: f32);
    fn pause(&mut self, channel: Role);
    fn unpause(&mut self, channel: Role);
}

/// What a channel is doing right now.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelState {
    pub clip: Clip,
    pub looped: bool,
    pub pitch: f32,
    pub paused: bool,
}

/// One call made against an output.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    Play { channel: Role, clip: Clip, looped: bool, pitch: f32 },
    Stop(Role),
    SetPitch(Role, f32),
    Pause(Role),
    Unpause(Role),
}

/// Headless output that keeps channel state and a full command history.
#[derive(Debug, Default)]
pub struct RecordingOutput {
    channels: HashMap<Role, ChannelState>,
    history: Vec<AudioCommand>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `channel`, or `None` if it is stopped.
    #[must_use]
    pub fn channel(&self, channel: Role) -> Option<&ChannelState> {
        self.channels.get(&channel)
    }

    #[must_use]
    pub fn history(&self) -> &[AudioCommand] {
        &self.history
    }

    /// Clips started on `channel`, in order.
    pub fn played_on(&self, channel: Role) -> Vec<&Clip> {
        self.history
            .iter()
            .filter_map(|command| match command {
                AudioCommand::Play { channel: c, clip, .. } if *c == channel => Some(clip),
                _ => None,
            })
            .collect()
    }

    /// Every pitch value set on `channel`, in order.
    pub fn pitches_on(&self, channel: Role) -> Vec<f32> {
        self.history
            .iter()
            .filter_map(|command| match command {
                AudioCommand::SetPitch(c, pitch) if *c == channel => Some(*pitch),
                _ => None,
            })
            .collect()
    }
}

impl AudioOutput for RecordingOutput {
    fn play(&mut self, channel: Role, clip: &Clip, looped: bool, pitch: f32) {
        self.channels.insert(
            channel,
            ChannelState {
                clip: clip.clone(),
                looped,
                pitch,
                paused: false,
            },
        );
        self.history.push(AudioCommand::Play {
            channel,
            clip: clip.clone(),
            looped,
            pitch,
        });
    }

    fn stop(&mut self, channel: Role) {
        self.channels.remove(&channel);
        self.history.push(AudioCommand::Stop(channel));
    }

    fn set_pitch(&mut self, channel: Role, pitch: f32) {
        if let Some(state) = self.channels.get_mut(&channel) {
            state.pitch = pitch;
        }
        self.history.push(AudioCommand::SetPitch(channel, pitch));
    }

    fn pause(&mut self, channel: Role) {
        if let Some(state) = self.channels.get_mut(&channel) {
            state.paused = true;
        }
        self.history.push(AudioCommand::Pause(channel));
    }

    fn unpause(&mut self, channel: Role) {
        if let Some(state) = self.channels.get_mut(&channel) {
            state.paused = false;
        }
        self.history.push(AudioCommand::Unpause(channel));
    }
}

/// Output for running without a sound device: every command goes to the log.
#[derive(Debug, Default)]
pub struct LoggingOutput;

impl AudioOutput for LoggingOutput {
    fn play(&mut self, channel: Role, clip: &Clip, looped: bool, pitch: f32) {
        let mode = if looped { "looping" } else { "once" };
        info!("[{channel}] play {clip} ({mode}, pitch {pitch:.2})");
    }

    fn stop(&mut self, channel: Role) {
        debug!("[{channel}] stop");
    }

    fn set_pitch(&mut self, channel: Role, pitch: f32) {
        trace!("[{channel}] pitch {pitch:.3}");
    }

    fn pause(&mut self, channel: Role) {
        debug!("[{channel}] pause");
    }

    fn unpause(&mut self, channel: Role) {
        debug!("[{channel}] unpause");
    }
}
