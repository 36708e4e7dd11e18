//! Shell completion generation for lpuctl

use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;

use crate::Cli;

const BIN_NAME: &str = "lpuctl";

/// Generate shell completion script
pub fn generate_completion(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, BIN_NAME, &mut io::stdout());
}

/// Print installation instructions for completions
pub fn print_completion_instructions(shell: Shell) {
    match shell {
        Shell::Bash => {
            println!("# Add this to your ~/.bashrc:");
            println!("eval \"$({BIN_NAME} completion bash)\"");
        }
        Shell::Zsh => {
            println!("# Save to a directory in your fpath:");
            println!("{BIN_NAME} completion zsh > ~/.zsh/completions/_{BIN_NAME}");
        }
        Shell::Fish => {
            println!("# Save completion to fish completions directory:");
            println!("{BIN_NAME} completion fish > ~/.config/fish/completions/{BIN_NAME}.fish");
        }
        Shell::PowerShell => {
            println!("# Add this to your PowerShell profile:");
            println!("Invoke-Expression (& {BIN_NAME} completion powershell | Out-String)");
        }
        _ => {
            println!("Completion generated for {:?}", shell);
            println!("Please refer to your shell's documentation for installation instructions.");
        }
    }
}
