//! Emotion-driven background music selection.
//!
//! Core modules:
//! - [`feed`] - Emotion classifier connection
//! - [`sampler`] - Happiness measurement over a window
//! - [`window`] - Timed clip playback with pitch fade
//! - [`evaluator`] - Sequential audition of a clip list
//! - [`scheduler`] - Beat then lead selection cascade
//! - [`host`] - Frame loop and user controls
//!
//! ### Supporting Modules
//!
//! - [`emotion`] - Emotion events and the classifier wire format
//! - [`library`] - Clip catalog grouped by style and role
//! - [`audio`] - Output device seam
//! - [`config`] - Configuration and data directory management
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//! - [`simulate`] - Stand-in classifier for running without a camera
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use moodmix::audio::RecordingOutput;
//! use moodmix::emotion::EmotionEvent;
//! use moodmix::evaluator::EvaluationSettings;
//! use moodmix::library::{Clip, ClipLibrary, StyleBucket};
//! use moodmix::scheduler::{Phase, SelectionScheduler};
//!
//! let library = ClipLibrary::new(vec![StyleBucket {
//!     name: "latin".to_string(),
//!     beats: vec![Clip::new("latin_beat_1")],
//!     leads: vec![Clip::new("latin_lead_1")],
//!     melodies: vec![],
//! }])?;
//!
//! let mut output = RecordingOutput::new();
//! let mut scheduler = SelectionScheduler::new(library, EvaluationSettings::default());
//! scheduler.play(&mut output);
//!
//! let mood = EmotionEvent::new("happy", 85.0);
//! while !matches!(scheduler.tick(1.0 / 60.0, &mood, &mut output), Phase::Idle | Phase::Committed) {}
//!
//! if let Some(selection) = scheduler.selection() {
//!     println!("Selected {} from {}", selection.beat.clip, selection.style);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Selection Details
//!
//! A clip qualifies when the classifier reported `happy` for at least the
//! configured share of its window; qualifying clips are ranked by their
//! average happy score. Each window ends with a short pitch dive so the
//! listener hears the transition.

pub mod audio;
pub mod cli;
pub mod completion;
pub mod config;
pub mod emotion;
pub mod evaluator;
pub mod feed;
pub mod host;
pub mod library;
pub mod sampler;
pub mod scheduler;
pub mod simulate;
pub mod window;
