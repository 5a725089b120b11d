//! # Integration Tests for Moodmix
//!
//! End-to-end tests that drive the engine the way a host does: a library on
//! disk, a classifier on a real socket, and whole selection passes.

use anyhow::Result;
use moodmix::audio::{AudioCommand, RecordingOutput};
use moodmix::emotion::EmotionEvent;
use moodmix::evaluator::EvaluationSettings;
use moodmix::library::{Clip, ClipLibrary, Role};
use moodmix::scheduler::{Phase, SelectionScheduler};
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

const LIBRARY_JSON: &str = r#"{
    "styles": [
        { "name": "latin",    "beats": ["latin_beat_1", "latin_beat_2"], "leads": ["latin_lead_1", "latin_lead_2"], "melodies": ["latin_melody"] },
        { "name": "rave",     "beats": ["rave_beat_1", "rave_beat_2"],   "leads": ["rave_lead_1", "rave_lead_2"],   "melodies": ["rave_melody"] },
        { "name": "nineties", "beats": ["nineties_beat_1"],              "leads": ["nineties_lead_1"] }
    ]
}"#;

/// Test helper to write the sample library to a temporary directory
fn create_test_library() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("library.json");
    std::fs::write(&path, LIBRARY_JSON)?;
    Ok((temp_dir, path))
}

fn settings() -> EvaluationSettings {
    EvaluationSettings {
        song_duration: 2.0,
        pitch_down_duration: 1.0,
        happiness_threshold: 50.0,
    }
}

/// Runs a pass at 10 ticks per second. The listener's mood follows whatever
/// clip is being auditioned, as given by `mood`.
fn run_pass(
    scheduler: &mut SelectionScheduler,
    output: &mut RecordingOutput,
    mood: impl Fn(&str) -> EmotionEvent,
) -> Phase {
    scheduler.play(output);
    loop {
        let emotion = scheduler
            .next_audition()
            .map(|(_, clip)| mood(clip.name()))
            .unwrap_or_default();
        let phase = scheduler.tick(0.1, &emotion, output);
        if matches!(phase, Phase::Idle | Phase::Committed) {
            return phase;
        }
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn moodmix() -> Command {
        Command::new(env!("CARGO_BIN_EXE_moodmix"))
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = moodmix().arg("--help").output().expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("moodmix"));
        assert!(stdout.contains("run"));
        assert!(stdout.contains("simulate"));
        assert!(stdout.contains("library"));
    }

    #[test]
    fn test_completion_generation() {
        let output = moodmix()
            .args(["completion", "bash"])
            .output()
            .expect("Failed to run completion command");

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("_moodmix"));
        assert!(stdout.contains("complete"));
    }

    #[test]
    fn test_library_summary() -> Result<()> {
        let (_temp_dir, path) = create_test_library()?;
        let output = moodmix().arg("library").arg(&path).output()?;

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("latin"));
        assert!(stdout.contains("nineties"));
        Ok(())
    }

    #[test]
    fn test_library_summary_uses_configured_duration() -> Result<()> {
        let (temp_dir, path) = create_test_library()?;
        let config_path = temp_dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"song_duration": 5.0, "pitch_down_duration": 1.0}"#)?;

        let output = moodmix()
            .arg("library")
            .arg(&path)
            .arg("--config")
            .arg(&config_path)
            .output()?;

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        // Five beats plus the two leads of the widest style.
        assert!(stdout.contains("at most 35s at 5s per clip"), "unexpected summary: {stdout}");
        Ok(())
    }

    #[test]
    fn test_invalid_library_is_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, r#"{"styles": [{"name": "a", "beats": ["x"]}, {"name": "b", "beats": ["x"]}]}"#)?;

        let output = moodmix().arg("library").arg(&path).output()?;
        assert!(!output.status.success());
        Ok(())
    }
}

#[cfg(test)]
mod selection_integration_tests {
    use super::*;

    #[test]
    fn test_full_cascade_from_library_file() -> Result<()> {
        let (_temp_dir, path) = create_test_library()?;
        let library = ClipLibrary::load(&path)?;
        let mut scheduler = SelectionScheduler::new(library, settings());
        let mut output = RecordingOutput::new();

        let phase = run_pass(&mut scheduler, &mut output, |clip| match clip {
            "latin_beat_2" => EmotionEvent::new("happy", 60.0),
            "rave_beat_1" => EmotionEvent::new("happy", 88.0),
            "rave_lead_2" => EmotionEvent::new("happy", 72.0),
            "latin_lead_1" | "nineties_lead_1" => EmotionEvent::new("happy", 100.0),
            _ => EmotionEvent::new("sad", 70.0),
        });

        assert_eq!(phase, Phase::Committed);
        let selection = scheduler.selection().expect("a selection is published");
        assert_eq!(selection.style, "rave");
        assert_eq!(selection.beat.clip, Clip::new("rave_beat_1"));
        assert_eq!(selection.lead.as_ref().map(|l| l.clip.name()), Some("rave_lead_2"));

        // All five beats were auditioned; only rave leads were.
        assert_eq!(output.played_on(Role::Beat).len(), 6);
        assert!(output
            .played_on(Role::Lead)
            .iter()
            .all(|clip| clip.name().starts_with("rave_")));

        // The winning lead starts at normal pitch after the fades.
        let last_lead_play = output.history().iter().rev().find_map(|command| match command {
            AudioCommand::Play { channel: Role::Lead, clip, pitch, looped } => Some((clip.clone(), *pitch, *looped)),
            _ => None,
        });
        assert_eq!(last_lead_play, Some((Clip::new("rave_lead_2"), 1.0, true)));
        Ok(())
    }

    #[test]
    fn test_every_window_fades_to_floor() -> Result<()> {
        let (_temp_dir, path) = create_test_library()?;
        let mut scheduler = SelectionScheduler::new(ClipLibrary::load(&path)?, settings());
        let mut output = RecordingOutput::new();

        run_pass(&mut scheduler, &mut output, |_| EmotionEvent::new("sad", 10.0));

        let pitches = output.pitches_on(Role::Beat);
        let floors = pitches.iter().filter(|pitch| (**pitch - 0.05).abs() < 1e-4).count();
        assert_eq!(floors, 5, "one full fade per beat window");
        assert!(pitches.iter().all(|pitch| (0.05 - 1e-4..=1.0).contains(pitch)));
        Ok(())
    }

    #[test]
    fn test_repeated_passes_are_independent() -> Result<()> {
        let (_temp_dir, path) = create_test_library()?;
        let mut scheduler = SelectionScheduler::new(ClipLibrary::load(&path)?, settings());
        let mut output = RecordingOutput::new();

        run_pass(&mut scheduler, &mut output, |clip| match clip {
            "latin_beat_1" => EmotionEvent::new("happy", 90.0),
            _ => EmotionEvent::new("sad", 50.0),
        });
        assert_eq!(scheduler.state().best_beat, Some(Clip::new("latin_beat_1")));

        let phase = run_pass(&mut scheduler, &mut output, |_| EmotionEvent::new("sad", 50.0));
        assert_eq!(phase, Phase::Idle);
        assert!(scheduler.state().best_beat.is_none());
        assert!(scheduler.selection().is_none());
        assert_eq!(scheduler.passes(), 2);
        Ok(())
    }
}

#[cfg(test)]
mod feed_integration_tests {
    use moodmix::config::EngineConfig;
    use moodmix::feed::EmotionFeed;
    use moodmix::host::{EmotionDisplay, Session};
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;

    #[derive(Default)]
    struct Captions(Vec<String>);

    impl EmotionDisplay for Captions {
        fn show_emotion(&mut self, emotion: &EmotionEvent) {
            self.0.push(emotion.to_string());
        }

        fn set_animation_speed(&mut self, _speed: f32) {}
    }

    /// Polls until `done` holds or two seconds pass.
    fn poll_until(feed: &mut EmotionFeed, done: impl Fn(&EmotionFeed) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done(feed) && Instant::now() < deadline {
            feed.poll();
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_feed_reads_frames_over_tcp() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let address = listener.local_addr()?.to_string();

        let server = thread::spawn(move || -> std::io::Result<()> {
            let (mut client, _) = listener.accept()?;
            client.write_all(b"happy:72.5")?;
            thread::sleep(Duration::from_millis(100));
            client.write_all(b"garbage")?;
            thread::sleep(Duration::from_millis(100));
            client.write_all(b"sad:15")?;
            thread::sleep(Duration::from_millis(200));
            Ok(())
        });

        let mut feed = EmotionFeed::new(address, Duration::from_secs(60));
        feed.connect()?;

        poll_until(&mut feed, |f| f.current_emotion().is_happy());
        assert_eq!(feed.current_emotion(), &EmotionEvent::new("happy", 72.5));

        poll_until(&mut feed, |f| f.current_emotion().label == "sad");
        assert_eq!(feed.current_emotion(), &EmotionEvent::new("sad", 15.0));

        server.join().expect("server thread panicked")?;
        poll_until(&mut feed, |f| !f.is_connected());
        assert!(!feed.is_connected());
        assert_eq!(feed.current_emotion().label, "sad", "last reading survives the hang-up");
        Ok(())
    }

    #[test]
    fn test_session_selects_from_live_classifier() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let address = listener.local_addr()?.to_string();
        let server = thread::spawn(move || -> std::io::Result<()> {
            let (mut client, _) = listener.accept()?;
            client.write_all(b"happy:95")?;
            thread::sleep(Duration::from_millis(300));
            Ok(())
        });

        let (_temp_dir, path) = create_test_library()?;
        let config = EngineConfig {
            classifier_address: address,
            song_duration: 0.5,
            pitch_down_duration: 0.25,
            ..EngineConfig::default()
        };
        let mut session = Session::new(&config, ClipLibrary::load(&path)?, RecordingOutput::new(), Captions::default());
        session.feed_mut().connect()?;

        // Wait for the first frame before starting the pass.
        let deadline = Instant::now() + Duration::from_secs(2);
        while !session.feed().current_emotion().is_happy() && Instant::now() < deadline {
            session.frame(Instant::now(), 0.0);
            thread::sleep(Duration::from_millis(5));
        }
        assert!(session.handle(moodmix::host::HostCommand::Play).is_continue());

        let mut phase = Phase::EvaluatingBeats;
        for _ in 0..200 {
            phase = session.frame(Instant::now(), 0.1);
            if phase == Phase::Committed {
                break;
            }
        }

        assert_eq!(phase, Phase::Committed);
        let selection = session.scheduler().selection().expect("pass should commit");
        assert_eq!(selection.beat.clip, Clip::new("latin_beat_1"), "first clip wins the tie");
        assert_eq!(
            selection.lead.as_ref().map(|l| l.clip.name()),
            Some("latin_lead_1")
        );
        assert_eq!(session.display().0.last().map(String::as_str), Some("happy: 95%"));

        server.join().expect("server thread panicked")?;
        Ok(())
    }
}
