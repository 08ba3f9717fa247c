use anyhow::{Context, Result};
use clap::Parser;
use cpel::cli::{Cli, Command};
use cpel::config::CpelConfig;
use cpel::decoder::CpelFile;
use cpel::event::TrackMode;
use cpel::event_data::EventDataFile;
use cpel::layout::CpelLayout;
use cpel::writer::CpelWriter;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Encode an event-data file into a CPEL file
fn run_write(
    input: &Path,
    output: &Path,
    track: Option<TrackMode>,
    config_path: Option<PathBuf>,
    no_atomic: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => CpelConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CpelConfig::default(),
    };

    // Reject a bad track mode before touching any input
    let mode = match track {
        Some(mode) => mode,
        None => config.track_mode()?,
    };

    let data = EventDataFile::from_file(input)
        .with_context(|| format!("Failed to read event data {}", input.display()))?;

    let layout = CpelLayout::collect(&data.events, mode)?;
    CpelWriter::new(&layout)
        .with_atomic(config.g2.atomic_write && !no_atomic)
        .write(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Wrote {}: {} events, {} event types, {} tracks ({} mode)",
        output.display(),
        layout.entries().len(),
        layout.event_definitions().len(),
        layout.track_definitions().len(),
        mode
    );
    Ok(())
}

/// Print the diagnostic dump of a CPEL file
fn run_dump(file: &Path) -> Result<()> {
    let cpel = CpelFile::from_file(file)
        .with_context(|| format!("Unable to parse {}", file.display()))?;
    print!("{}", cpel);
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    match args.command {
        Command::Write {
            input,
            output,
            track,
            config,
            no_atomic,
        } => run_write(&input, &output, track, config, no_atomic),
        Command::Dump { file } => run_dump(&file),
    }
}
