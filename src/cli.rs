//! CLI argument parsing for cpel

use crate::event::TrackMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cpel")]
#[command(version)]
#[command(about = "Encode event data into CPEL trace files and inspect them", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode an event-data file into a CPEL file
    Write {
        /// Event-data file (JSON header line, then `time#type#datum0#datum1` lines)
        input: PathBuf,

        /// Destination CPEL file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// What to draw as tracks (overrides the config file)
        #[arg(short, long, value_enum)]
        track: Option<TrackMode>,

        /// Configuration file (cpel.toml)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Write directly to the destination instead of renaming a temp file
        #[arg(long = "no-atomic")]
        no_atomic: bool,
    },

    /// Print a section-by-section dump of a CPEL file
    Dump {
        /// CPEL file to inspect
        file: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_write() {
        let cli = Cli::parse_from(["cpel", "write", "events.txt", "-o", "out.cpel"]);
        match cli.command {
            Command::Write {
                input,
                output,
                track,
                config,
                no_atomic,
            } => {
                assert_eq!(input, PathBuf::from("events.txt"));
                assert_eq!(output, PathBuf::from("out.cpel"));
                assert_eq!(track, None);
                assert_eq!(config, None);
                assert!(!no_atomic);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_track_flag() {
        let cli = Cli::parse_from([
            "cpel", "write", "in", "--output", "out", "--track", "cpu", "--no-atomic",
        ]);
        match cli.command {
            Command::Write {
                track, no_atomic, ..
            } => {
                assert_eq!(track, Some(TrackMode::Cpu));
                assert!(no_atomic);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_track() {
        let result = Cli::try_parse_from(["cpel", "write", "in", "-o", "out", "--track", "tid"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parses_dump() {
        let cli = Cli::parse_from(["cpel", "--debug", "dump", "trace.cpel"]);
        assert!(cli.debug);
        assert!(matches!(cli.command, Command::Dump { ref file } if file == &PathBuf::from("trace.cpel")));
    }

    #[test]
    fn test_cli_requires_output_for_write() {
        assert!(Cli::try_parse_from(["cpel", "write", "in"]).is_err());
    }
}
