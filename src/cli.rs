//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Moodmix using Clap
//! derive macros.
//!
//! ## Commands
//!
//! - `run`: Start a session against the emotion classifier
//! - `simulate`: Serve random emotion frames in place of the classifier
//! - `config`: Show or write the effective configuration
//! - `library`: Validate and summarize a clip library file
//! - `completion`: Generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! moodmix simulate --happy-bias 0.6 &
//! moodmix run --library ~/music/library.json
//! moodmix config --write
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// All functionality is reached through a subcommand.
#[derive(Parser, Debug)]
#[command(name = "moodmix")]
#[command(about = "Moodmix: emotion-driven background music selection")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a selection session
    ///
    /// Connects to the emotion classifier and waits for commands on stdin:
    /// `play`, `skip`, `pause`, `unpause` and `quit`. Clip playback is
    /// reported through the log (set `RUST_LOG=info` to see it).
    Run {
        /// Configuration file (defaults to the platform config directory)
        #[arg(long, env = "MOODMIX_CONFIG")]
        config: Option<PathBuf>,

        /// Clip library file (defaults to the platform data directory)
        #[arg(long, env = "MOODMIX_LIBRARY")]
        library: Option<PathBuf>,

        /// Classifier address, overriding the configuration
        #[arg(long)]
        address: Option<String>,
    },

    /// Stream random emotion frames like the classifier does
    ///
    /// Listens on localhost and sends one `<label>:<score>` frame per
    /// interval to each connected client.
    Simulate {
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Milliseconds between frames
        #[arg(long, default_value_t = 200)]
        interval_ms: u64,

        /// Probability (0 to 1) that a frame reports `happy`
        #[arg(long, default_value_t = 0.5)]
        happy_bias: f64,
    },

    /// Print the effective configuration
    Config {
        /// Configuration file (defaults to the platform config directory)
        #[arg(long, env = "MOODMIX_CONFIG")]
        config: Option<PathBuf>,

        /// Write the configuration back to disk with every field filled in
        #[arg(long)]
        write: bool,
    },

    /// Validate a clip library file and summarize its styles
    Library {
        /// Path to the library JSON file
        path: PathBuf,

        /// Configuration file used for pass timings
        #[arg(long, env = "MOODMIX_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Generate shell completions
    ///
    /// Outputs completion script for the specified shell to stdout.
    /// Redirect to appropriate completion directory for your shell.
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
