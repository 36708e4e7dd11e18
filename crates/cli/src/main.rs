//! lpuctl - LPU237 reader protocol tool
//!
//! Plans, decodes and simulates the request/response sessions the LPU237
//! magnetic-stripe and iButton reader speaks over USB HID.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod completion;
mod config;
mod error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::*;
use crate::config::CliConfig;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "lpuctl")]
#[command(about = "LPU237 reader protocol tool - plan, decode and simulate reader sessions")]
#[command(version)]
#[command(long_about = "
lpuctl drives the LPU237 protocol engine without hardware attached.
It prints the exact wire strings a configuration session sends, decodes
responses and card-swipe reports, runs sessions against an in-memory
reader, and replays recorded device responses.

Use --json or --format for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Output format; overrides the config file
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// YAML file describing the simulated reader and output defaults
    #[arg(long, global = true, env = "LPUCTL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the requests a sequence would send to a freshly read reader
    Plan {
        /// Sequence to plan
        #[arg(value_enum)]
        sequence: SequenceKind,
        /// Settings XML to import before planning
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },

    /// Decode responses and reader reports
    #[command(subcommand)]
    Decode(DecodeCommands),

    /// Run sequences against the in-memory reader
    Simulate {
        /// Sequences to run, in order
        #[arg(short = 'q', long = "sequence", value_enum, default_value = "set-parameters")]
        sequences: Vec<SequenceKind>,
        /// Settings XML to import before running
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },

    /// Drive sequences from recorded responses, one hex frame per line
    Replay {
        /// Response file
        responses: PathBuf,
        /// Sequences to run, in order
        #[arg(short = 'q', long = "sequence", value_enum, default_value = "system-info")]
        sequences: Vec<SequenceKind>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
        /// Print installation instructions instead of the script
        #[arg(long)]
        instructions: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "lpuctl={log_level},lpu237_protocol={log_level},lpu237_settings={log_level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let result = execute_command(&cli);

    // Handle errors with appropriate exit codes
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            if cli.json || cli.format == Some(OutputFormat::Json) {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }
            std::process::exit(error::exit_code_for(&e));
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let format = OutputFormat::resolve(cli.json, cli.format, config.output.format);

    match &cli.command {
        Commands::Plan { sequence, settings } => {
            commands::plan::execute(*sequence, settings.as_deref(), &config, format)
        }
        Commands::Decode(cmd) => commands::decode::execute(cmd, format),
        Commands::Simulate {
            sequences,
            settings,
        } => commands::simulate::execute(sequences, settings.as_deref(), &config, format),
        Commands::Replay {
            responses,
            sequences,
        } => commands::replay::execute(responses, sequences, format),
        Commands::Completion {
            shell,
            instructions,
        } => {
            if *instructions {
                completion::print_completion_instructions(*shell);
            } else {
                completion::generate_completion(*shell);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    // --- Global flag parsing ---

    #[test]
    fn parse_plan_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["lpuctl", "plan", "system-info"])?;
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        assert!(cli.format.is_none());
        assert!(matches!(
            cli.command,
            Commands::Plan {
                sequence: SequenceKind::SystemInfo,
                settings: None
            }
        ));
        Ok(())
    }

    #[test]
    fn parse_global_json_flag_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from(["lpuctl", "plan", "get-record", "--json"])?;
        assert!(cli.json);
        Ok(())
    }

    #[test]
    fn parse_verbose_levels() -> TestResult {
        for (args, expected) in [
            (vec!["lpuctl", "plan", "bootloader"], 0),
            (vec!["lpuctl", "-v", "plan", "bootloader"], 1),
            (vec!["lpuctl", "-vvv", "plan", "bootloader"], 3),
        ] {
            let cli = Cli::try_parse_from(args)?;
            assert_eq!(cli.verbose, expected);
        }
        Ok(())
    }

    #[test]
    fn parse_format_and_config() -> TestResult {
        let cli = Cli::try_parse_from([
            "lpuctl",
            "--format",
            "yaml",
            "--config",
            "reader.yaml",
            "plan",
            "set-parameters",
        ])?;
        assert_eq!(cli.format, Some(OutputFormat::Yaml));
        assert_eq!(cli.config, Some(PathBuf::from("reader.yaml")));
        Ok(())
    }

    // --- Command parsing ---

    #[test]
    fn parse_plan_with_settings() -> TestResult {
        let cli = Cli::try_parse_from([
            "lpuctl",
            "plan",
            "set-parameters",
            "--settings",
            "lpu237.xml",
        ])?;
        match &cli.command {
            Commands::Plan { sequence, settings } => {
                assert_eq!(*sequence, SequenceKind::SetParameters);
                assert_eq!(settings.as_deref(), Some(std::path::Path::new("lpu237.xml")));
            }
            _ => return Err("expected Plan command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_unknown_sequence_rejected() {
        assert!(Cli::try_parse_from(["lpuctl", "plan", "format-disk"]).is_err());
    }

    #[test]
    fn parse_decode_response() -> TestResult {
        let cli = Cli::try_parse_from(["lpuctl", "decode", "response", "52ff0105"])?;
        match &cli.command {
            Commands::Decode(DecodeCommands::Response { hex }) => assert_eq!(hex, "52ff0105"),
            _ => return Err("expected Decode Response command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_simulate_default_sequence() -> TestResult {
        let cli = Cli::try_parse_from(["lpuctl", "simulate"])?;
        match &cli.command {
            Commands::Simulate { sequences, .. } => {
                assert_eq!(sequences, &[SequenceKind::SetParameters]);
            }
            _ => return Err("expected Simulate command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_simulate_several_sequences() -> TestResult {
        let cli = Cli::try_parse_from([
            "lpuctl",
            "simulate",
            "-q",
            "get-record",
            "-q",
            "set-record",
        ])?;
        match &cli.command {
            Commands::Simulate { sequences, .. } => {
                assert_eq!(
                    sequences,
                    &[SequenceKind::GetRecord, SequenceKind::SetRecord]
                );
            }
            _ => return Err("expected Simulate command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_replay() -> TestResult {
        let cli = Cli::try_parse_from(["lpuctl", "replay", "session.txt"])?;
        match &cli.command {
            Commands::Replay {
                responses,
                sequences,
            } => {
                assert_eq!(responses, &PathBuf::from("session.txt"));
                assert_eq!(sequences, &[SequenceKind::SystemInfo]);
            }
            _ => return Err("expected Replay command".into()),
        }
        Ok(())
    }

    #[test]
    fn parse_completion_instructions() -> TestResult {
        let cli = Cli::try_parse_from(["lpuctl", "completion", "bash", "--instructions"])?;
        assert!(matches!(
            cli.command,
            Commands::Completion {
                shell: clap_complete::Shell::Bash,
                instructions: true
            }
        ));
        Ok(())
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
