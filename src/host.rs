//! # Host Session Module
//!
//! The frame loop that ties the engine together. A [`Session`] owns the
//! [`EmotionFeed`], the [`SelectionScheduler`], an [`AudioOutput`] and an
//! [`EmotionDisplay`], and runs everything on one thread:
//!
//! ```text
//! every frame:  drain control commands ─► poll feed (if due) ─► tick scheduler
//! ```
//!
//! The feed is polled every `poll_interval_ms`; the scheduler is ticked once
//! per frame with the frame delta and the feed's live emotion. A feed update
//! is therefore seen by the next evaluation tick.
//!
//! Control commands arrive over an [`mpsc`] channel. [`spawn_stdin_reader`]
//! feeds that channel from the terminal, one command per line.

use crate::audio::AudioOutput;
use crate::config::EngineConfig;
use crate::emotion::EmotionEvent;
use crate::evaluator::EvaluationSettings;
use crate::feed::EmotionFeed;
use crate::library::ClipLibrary;
use crate::scheduler::{Phase, SelectionScheduler};
use anyhow::Result;
use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Passive consumer of the live emotion and of the animation speed.
pub trait EmotionDisplay {
    /// Called whenever the displayed emotion changes.
    fn show_emotion(&mut self, emotion: &EmotionEvent);
    /// `0.0` freezes the animation, `1.0` runs it at normal speed.
    fn set_animation_speed(&mut self, speed: f32);
}

/// Prints emotion changes to stdout.
#[derive(Debug, Default)]
pub struct ConsoleDisplay;

impl EmotionDisplay for ConsoleDisplay {
    fn show_emotion(&mut self, emotion: &EmotionEvent) {
        println!("{emotion}");
    }

    fn set_animation_speed(&mut self, speed: f32) {
        debug!("Animation speed set to {speed}");
    }
}

/// User controls accepted by a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Play,
    Skip,
    Pause,
    Unpause,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown command {0:?} (expected play, skip, pause, unpause or quit)")]
pub struct UnknownCommand(String);

impl FromStr for HostCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play" => Ok(Self::Play),
            "skip" => Ok(Self::Skip),
            "pause" => Ok(Self::Pause),
            "unpause" | "resume" => Ok(Self::Unpause),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            _ => Err(UnknownCommand(s.trim().to_string())),
        }
    }
}

/// Reads commands from stdin on a background thread and forwards them to
/// `commands`. Blank lines are ignored, unknown commands are reported and
/// skipped. The thread ends at end of input or once the session hangs up.
pub fn spawn_stdin_reader(commands: Sender<HostCommand>) -> JoinHandle<()> {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read from stdin: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<HostCommand>() {
                Ok(command) => {
                    let quit = command == HostCommand::Quit;
                    if commands.send(command).is_err() || quit {
                        break;
                    }
                }
                Err(e) => eprintln!("{e}"),
            }
        }
        debug!("Stdin reader finished");
    })
}

/// One running engine instance.
pub struct Session<O: AudioOutput, D: EmotionDisplay> {
    feed: EmotionFeed,
    scheduler: SelectionScheduler,
    output: O,
    display: D,
    poll_interval: Duration,
    frame_interval: Duration,
    last_poll: Option<Instant>,
    shown: Option<EmotionEvent>,
}

impl<O: AudioOutput, D: EmotionDisplay> Session<O, D> {
    /// Builds a session from `config`. Nothing connects or plays until the
    /// first frame.
    ///
    /// # Arguments
    ///
    /// * `config` - Classifier address, poll cadence, frame rate and timing
    /// * `library` - Clips the scheduler auditions
    /// * `output` - Device receiving play/stop/pitch commands
    /// * `display` - Receives emotion changes and the animation speed
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use moodmix::audio::LoggingOutput;
    /// use moodmix::config::EngineConfig;
    /// use moodmix::host::{ConsoleDisplay, HostCommand, Session};
    /// use moodmix::library::ClipLibrary;
    /// use std::sync::mpsc;
    ///
    /// let config = EngineConfig::load(None)?;
    /// let library = ClipLibrary::load(&ClipLibrary::default_path()?)?;
    /// let mut session = Session::new(&config, library, LoggingOutput, ConsoleDisplay);
    ///
    /// let (tx, rx) = mpsc::channel();
    /// tx.send(HostCommand::Play)?;
    /// session.run(&rx)?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn new(config: &EngineConfig, library: ClipLibrary, output: O, display: D) -> Self {
        let feed = EmotionFeed::new(config.classifier_address.clone(), config.reconnect_interval());
        let scheduler = SelectionScheduler::new(library, EvaluationSettings::from(config));

        Self {
            feed,
            scheduler,
            output,
            display,
            poll_interval: config.poll_interval(),
            frame_interval: config.frame_interval(),
            last_poll: None,
            shown: None,
        }
    }

    pub fn feed(&self) -> &EmotionFeed {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut EmotionFeed {
        &mut self.feed
    }

    pub fn scheduler(&self) -> &SelectionScheduler {
        &self.scheduler
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Applies one control command. Returns [`ControlFlow::Break`] on quit.
    pub fn handle(&mut self, command: HostCommand) -> ControlFlow<()> {
        debug!("Handling {command:?}");
        match command {
            HostCommand::Play => {
                self.scheduler.play(&mut self.output);
                self.display.set_animation_speed(1.0);
            }
            HostCommand::Skip => {
                self.scheduler.skip(&mut self.output);
                self.display.set_animation_speed(1.0);
            }
            HostCommand::Pause => {
                self.scheduler.pause(&mut self.output);
                self.display.set_animation_speed(0.0);
            }
            HostCommand::Unpause => {
                self.scheduler.unpause(&mut self.output);
                self.display.set_animation_speed(1.0);
            }
            HostCommand::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Runs one frame at `now`: polls the feed if its cadence is due, then
    /// ticks the scheduler by `dt` seconds.
    pub fn frame(&mut self, now: Instant, dt: f32) -> Phase {
        if self.poll_due(now) {
            self.last_poll = Some(now);
            self.feed.poll_at(now);
            self.refresh_display();
        }

        self.scheduler.tick(dt, self.feed.current_emotion(), &mut self.output)
    }

    fn poll_due(&self, now: Instant) -> bool {
        self.last_poll
            .map_or(true, |last| now.saturating_duration_since(last) >= self.poll_interval)
    }

    fn refresh_display(&mut self) {
        let current = self.feed.current_emotion();
        if self.shown.as_ref() != Some(current) {
            self.display.show_emotion(current);
            self.shown = Some(current.clone());
        }
    }

    /// Runs frames at the configured rate until a [`HostCommand::Quit`]
    /// arrives. A hung-up command channel does not stop the session.
    ///
    /// The classifier connection is opened by the feed's own polling, in the
    /// background, so a slow or unreachable classifier never delays a frame.
    pub fn run(&mut self, commands: &Receiver<HostCommand>) -> Result<()> {
        info!(
            "Session started: {} styles, classifier at {}",
            self.scheduler.library().styles().len(),
            self.feed.address()
        );
        if !self.feed.is_connected() {
            debug!("Classifier connection will be opened by the first poll");
        }

        let mut commands_open = true;
        let mut last_frame = Instant::now();

        loop {
            while commands_open {
                match commands.try_recv() {
                    Ok(command) => {
                        if self.handle(command).is_break() {
                            info!("Session stopped");
                            return Ok(());
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        debug!("Control channel closed");
                        commands_open = false;
                    }
                }
            }

            let now = Instant::now();
            let dt = now.saturating_duration_since(last_frame).as_secs_f32();
            last_frame = now;
            self.frame(now, dt);

            let spent = now.elapsed();
            if spent < self.frame_interval {
                thread::sleep(self.frame_interval - spent);
            }
        }
    }
}
