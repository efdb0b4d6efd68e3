//! Command-line interface for Airway
//!
//! Handles argument parsing and logging configuration.

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

use crate::models::SummaryMetric;

/// Airway - Annotate events in audio recordings
#[derive(Parser, Debug)]
#[command(name = "airway")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity
    /// -v = info, -vv = debug, -vvv = trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Event class configuration (setup.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Annotate a recording interactively (.wav to start, .airway to continue)
    Annotate {
        path: PathBuf,
    },
    /// Print per-class totals of a saved bundle
    Summary {
        bundle: PathBuf,
        #[arg(long, value_enum, default_value_t = MetricArg::Duration)]
        metric: MetricArg,
    },
    /// Write a bundle's annotations as a CSV report
    ExportCsv {
        bundle: PathBuf,
        output: PathBuf,
    },
    /// Write every labeled event of a bundle as its own WAV file
    ExportEvents {
        bundle: PathBuf,
        directory: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricArg {
    Count,
    Duration,
}

impl From<MetricArg> for SummaryMetric {
    fn from(value: MetricArg) -> Self {
        match value {
            MetricArg::Count => SummaryMetric::Count,
            MetricArg::Duration => SummaryMetric::TotalDuration,
        }
    }
}

impl Args {
    /// Get the log level filter based on verbosity flags
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else {
            match self.verbose {
                0 => LevelFilter::Warn,
                1 => LevelFilter::Info,
                2 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        }
    }
}

/// Initialize the logging system based on CLI arguments
pub fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::new();

    // Base level for all modules - keep at warn to suppress noisy deps
    builder.filter_level(LevelFilter::Warn);

    // Set airway modules to requested verbosity level
    builder.filter_module("airway", args.log_level());

    builder.format_timestamp_millis().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        let args = Args::parse_from(["airway", "-vv", "annotate", "take.wav"]);
        assert_eq!(args.log_level(), LevelFilter::Debug);

        let args = Args::parse_from(["airway", "annotate", "take.wav", "-q", "-v"]);
        assert_eq!(args.log_level(), LevelFilter::Error);
    }

    #[test]
    fn test_summary_metric() {
        let args = Args::parse_from(["airway", "summary", "take.airway", "--metric", "count"]);
        match args.command {
            Command::Summary { metric, .. } => {
                assert_eq!(SummaryMetric::from(metric), SummaryMetric::Count)
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
