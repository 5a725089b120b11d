//! # Shell Completion Module
//!
//! Generation of completion scripts through clap's completion system.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! moodmix completion bash > ~/.local/share/bash-completion/completions/moodmix
//!
//! # Generate zsh completions
//! moodmix completion zsh > ~/.config/zsh/completions/_moodmix
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    write_completions(gen, cmd, &mut io::stdout());
}

/// Writes the completion script into `buf` instead of stdout.
pub fn write_completions<G: Generator>(gen: G, cmd: &mut Command, buf: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, buf);
}

/// Convert our shell enum to clap_complete's shell enum
pub fn shell_to_completion_shell(shell: &Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::CommandFactory;

    #[test]
    fn test_shell_mapping() {
        assert_eq!(shell_to_completion_shell(&Shell::Bash), CompletionShell::Bash);
        assert_eq!(shell_to_completion_shell(&Shell::PowerShell), CompletionShell::PowerShell);
    }

    #[test]
    fn test_completion_script_names_subcommands() {
        let mut cmd = Args::command();
        let mut buf = Vec::new();
        write_completions(CompletionShell::Bash, &mut cmd, &mut buf);

        let script = String::from_utf8(buf).expect("completion script is UTF-8");
        for subcommand in ["run", "simulate", "config", "library", "completion"] {
            assert!(script.contains(subcommand), "missing {subcommand}");
        }
    }
}
