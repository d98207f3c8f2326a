//! # Shell Completion Module
//!
//! Generates completion scripts through clap's completion system.
//!
//! ```bash
//! samplehop completion bash > ~/.local/share/bash-completion/completions/samplehop
//! samplehop completion fish > ~/.config/fish/completions/samplehop.fish
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};

/// Generate shell completions for the given shell
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    write_completions(gen, cmd, &mut io::stdout());
}

/// Same as [`generate_completions`] into any writer.
pub fn write_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Convert our Shell enum to clap_complete's Shell enum
#[must_use]
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
    fn test_shell_conversion() {
        assert_eq!(shell_to_completion_shell(&Shell::Bash), CompletionShell::Bash);
        assert_eq!(shell_to_completion_shell(&Shell::Zsh), CompletionShell::Zsh);
        assert_eq!(
            shell_to_completion_shell(&Shell::PowerShell),
            CompletionShell::PowerShell
        );
    }

    #[test]
    fn test_bash_script_mentions_subcommands() {
        let mut cmd = Args::command();
        let mut out = Vec::new();
        write_completions(CompletionShell::Bash, &mut cmd, &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("samplehop"));
        assert!(script.contains("init-db"));
        assert!(script.contains("analyze"));
    }
}
