use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use exif_restore::config::{
    DEFAULT_ERROR, DEFAULT_EXIFTOOL, DEFAULT_OUTPUT, DEFAULT_SCRATCH, DEFAULT_SOURCE,
};
use exif_restore::{Config, ExifTool, Processor};

#[derive(Parser, Debug)]
#[command(
    name = "exif-restore",
    version,
    about = "Re-embed JSON sidecar metadata (date, description, GPS) into exported photos and videos"
)]
struct Cli {
    /// Source directory (the export). Never modified.
    #[arg(short, long, value_name = "PATH", env = "EXIF_RESTORE_SOURCE", default_value = DEFAULT_SOURCE)]
    source: PathBuf,

    /// Output directory for processed files
    #[arg(short, long, value_name = "PATH", env = "EXIF_RESTORE_OUTPUT", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Error directory for untouched copies of failed files
    #[arg(short, long, value_name = "PATH", env = "EXIF_RESTORE_ERROR", default_value = DEFAULT_ERROR)]
    error: PathBuf,

    /// Temporary directory for staged copies
    #[arg(short, long, value_name = "PATH", env = "EXIF_RESTORE_TMP", default_value = DEFAULT_SCRATCH)]
    tmp: PathBuf,

    /// exiftool executable
    #[arg(long, value_name = "FILE", env = "EXIF_RESTORE_EXIFTOOL", default_value = DEFAULT_EXIFTOOL)]
    exiftool: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            source: self.source.clone(),
            output: self.output.clone(),
            error: self.error.clone(),
            scratch: self.tmp.clone(),
            exiftool: self.exiftool.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = cli.config().resolve()?;
    log::info!("Source: {}", config.source.display());
    log::info!("Output: {}", config.output.display());
    log::info!("Error:  {}", config.error.display());
    log::debug!("Scratch: {}", config.scratch.display());

    let mut exiftool = ExifTool::with_executable(&config.exiftool)
        .with_context(|| format!("Could not start {}", config.exiftool.display()))?;

    let result = Processor::new(config, &mut exiftool).run();

    log::info!("Closing ExifTool...");
    if let Err(e) = exiftool.shutdown() {
        log::warn!("ExifTool did not shut down cleanly: {e}");
    }

    result.context("Fatal error")?;
    Ok(())
}
