//! Airway - An annotation tool for events in audio recordings
//!
//! This is the main entry point for the Airway application.

use airway::app::{self, Session};
use airway::cli::{self, Command};
use airway::settings::EventTaxonomy;
use anyhow::Result;
use clap::Parser;
use log::{error, info};
use std::io;

fn main() {
    // Parse command-line arguments and initialize logging
    let args = cli::Args::parse();
    cli::init_logging(&args);

    info!("Starting Airway");

    if let Err(e) = run(args) {
        error!("{:#}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: cli::Args) -> Result<()> {
    let taxonomy = EventTaxonomy::load(args.config.as_deref())?;

    match args.command {
        Command::Annotate { path } => {
            let mut session = Session::from_path(&path, taxonomy)?;
            let stdin = io::stdin();
            session.run(stdin.lock(), io::stdout())
        }
        Command::Summary { bundle, metric } => {
            app::print_summary(&bundle, taxonomy, metric.into(), io::stdout())
        }
        Command::ExportCsv { bundle, output } => app::export_csv(&bundle, taxonomy, &output),
        Command::ExportEvents { bundle, directory } => {
            app::export_events(&bundle, taxonomy, &directory)
        }
    }
}
