//! # Moodmix - Emotion-Driven Music Selection
//!
//! Moodmix listens to a facial emotion classifier and auditions short musical
//! clips against the listener's mood. Beats from every style are tried first;
//! the happiest beat picks the style whose leads are tried next, and the
//! happiest lead is layered on top.
//!
//! ## Usage
//!
//! ```bash
//! # Stand-in classifier on localhost:8080
//! moodmix simulate --happy-bias 0.6
//!
//! # Run a session, then type `play`
//! RUST_LOG=info moodmix run --library library.json
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::info;
use moodmix::audio::LoggingOutput;
use moodmix::config::{self, EngineConfig};
use moodmix::host::{self, ConsoleDisplay, Session};
use moodmix::library::{ClipLibrary, Role};
use moodmix::{cli, completion, simulate};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

/// Main entry point for the Moodmix application.
///
/// Initializes logging, parses command-line arguments, and routes commands.
///
/// # Logging
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=info moodmix run` - Clip results and selections
/// - `RUST_LOG=moodmix::feed=trace moodmix run` - Every classifier frame
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    match args.command {
        cli::Command::Run { config, library, address } => {
            let mut engine_config = EngineConfig::load(config.as_deref())?;
            if let Some(address) = address {
                engine_config.classifier_address = address;
            }
            let library = load_library(library.as_deref())?;
            run_session(&engine_config, library)?;
        }
        cli::Command::Simulate { port, interval_ms, happy_bias } => {
            simulate::serve(port, Duration::from_millis(interval_ms), happy_bias)?;
        }
        cli::Command::Config { config: config_path, write } => {
            let engine_config = EngineConfig::load(config_path.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&engine_config)?);
            if write {
                let path = match config_path {
                    Some(path) => path,
                    None => config::get_config_path()?,
                };
                engine_config.save(&path)?;
                println!("Configuration written to {}", path.display());
            }
        }
        cli::Command::Library { path, config } => {
            let engine_config = EngineConfig::load(config.as_deref())?;
            let library = ClipLibrary::load(&path)?;
            print_library_summary(&library, &engine_config);
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}

fn load_library(path: Option<&Path>) -> Result<ClipLibrary> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => ClipLibrary::default_path()?,
    };
    info!("Loading clip library from {}", path.display());
    ClipLibrary::load(&path)
}

fn run_session(config: &EngineConfig, library: ClipLibrary) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    // Detached: it stays blocked on stdin until the process exits.
    let _reader = host::spawn_stdin_reader(tx);

    println!("Commands: play, skip, pause, unpause, quit");
    let mut session = Session::new(config, library, LoggingOutput, ConsoleDisplay);
    session.run(&rx)?;

    if let Some(selection) = session.scheduler().selection() {
        println!(
            "Last selection: {} beat {} ({:.1}%)",
            selection.style,
            selection.beat.clip,
            selection.beat.average_score()
        );
        if let Some(lead) = &selection.lead {
            println!("                lead {} ({:.1}%)", lead.clip, lead.average_score());
        }
    }
    Ok(())
}

fn print_library_summary(library: &ClipLibrary, config: &EngineConfig) {
    println!("{:<16} {:>6} {:>6} {:>8}", "Style", "Beats", "Leads", "Melodies");
    println!("{}", "-".repeat(39));
    for style in library.styles() {
        println!(
            "{:<16} {:>6} {:>6} {:>8}",
            style.name,
            style.beats.len(),
            style.leads.len(),
            style.melodies.len()
        );
    }
    println!("{}", "-".repeat(39));
    println!(
        "{:<16} {:>6} {:>6} {:>8}",
        "Total",
        library.clip_count(Role::Beat),
        library.clip_count(Role::Lead),
        library.clip_count(Role::Melody)
    );

    let beats = library.clip_count(Role::Beat) as f32;
    let widest_leads = library.styles().iter().map(|s| s.leads.len()).max().unwrap_or(0) as f32;
    println!(
        "\nA pass takes at most {}s at {}s per clip.",
        (beats + widest_leads) * config.song_duration,
        config.song_duration
    );
}
