//! sensor-logit CLI
//!
//! # Commands
//!
//! - `acquire` - Log labeled samples from the serial port (or a replay file)
//! - `normalize` - Standardize the raw CSV and write the scaler parameters
//! - `train` - Fit the classifier and report held-out metrics
//! - `fold` - Fold the scaler into the classifier
//! - `export` - Write the firmware header
//! - `pipeline` - normalize, train, fold and export in one go

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sensor_logit::acquisition::{
    open_output, AcquisitionLogger, LineSource, ReaderLineSource, SerialLineSource,
};
use sensor_logit::config::PipelineConfig;
use sensor_logit::export::ExportStage;
use sensor_logit::folding::FoldStage;
use sensor_logit::preprocessing::NormalizeStage;
use sensor_logit::trainer::TrainStage;

/// Train a sensor classifier and export it as a C header.
#[derive(Parser)]
#[command(name = "sensor-logit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON configuration file; missing fields use defaults
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log samples from the serial port until Ctrl-C
    ///
    /// Examples:
    ///   sensor-logit acquire --port /dev/ttyUSB0 --label 2
    ///   sensor-logit acquire --input capture.log --label 1
    Acquire {
        /// Serial device
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate
        #[arg(short, long)]
        baud: Option<u32>,

        /// Class id stored with every sample of this run
        #[arg(short, long)]
        label: Option<u8>,

        /// Raw CSV to append to
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sample count that triggers the "target reached" notice
        #[arg(short, long)]
        target: Option<u64>,

        /// Replay a captured serial log instead of opening the port ("-" for stdin)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Standardize the raw CSV
    Normalize {
        /// Raw CSV to read
        #[arg(short, long)]
        raw: Option<PathBuf>,
    },
    /// Fit the classifier on the standardized data
    Train,
    /// Fold the scaler into the trained model
    Fold {
        /// Check the folded model against every row of this raw CSV
        #[arg(long, value_name = "FILE")]
        verify_raw: Option<PathBuf>,
    },
    /// Write the C header
    Export {
        /// Header path
        #[arg(long, value_name = "FILE")]
        header: Option<PathBuf>,
    },
    /// Run normalize, train, fold and export
    Pipeline,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Acquire {
            port,
            baud,
            label,
            output,
            target,
            input,
        } => {
            let acq = &mut config.acquisition;
            if let Some(port) = port {
                acq.port = port;
            }
            if let Some(baud) = baud {
                acq.baud_rate = baud;
            }
            if let Some(label) = label {
                acq.label = label;
            }
            if let Some(output) = output {
                acq.output = output;
            }
            if let Some(target) = target {
                acq.target_samples = target;
            }
            acquire(&config, input)?;
        }
        Commands::Normalize { raw } => {
            if let Some(raw) = raw {
                config.paths.raw_csv = raw;
            }
            NormalizeStage::run(&config.paths).context("normalize stage")?;
        }
        Commands::Train => {
            TrainStage::run(&config.paths, &config.training).context("train stage")?;
        }
        Commands::Fold { verify_raw } => {
            FoldStage::run(&config.paths, verify_raw.as_deref()).context("fold stage")?;
        }
        Commands::Export { header } => {
            if let Some(header) = header {
                config.paths.header = header;
            }
            ExportStage::run(&config.paths, &config.export).context("export stage")?;
        }
        Commands::Pipeline => {
            let paths = &config.paths;
            NormalizeStage::run(paths).context("normalize stage")?;
            TrainStage::run(paths, &config.training).context("train stage")?;
            FoldStage::run(paths, Some(paths.raw_csv.as_path())).context("fold stage")?;
            ExportStage::run(paths, &config.export).context("export stage")?;
            log::info!("pipeline complete: {}", paths.header.display());
        }
    }

    Ok(())
}

fn acquire(config: &PipelineConfig, input: Option<PathBuf>) -> Result<()> {
    let acq = &config.acquisition;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("installing Ctrl-C handler")?;

    let mut source: Box<dyn LineSource> = match input {
        Some(path) if path.as_os_str() == "-" => Box::new(ReaderLineSource::new(
            io::stdin().lock(),
            "<stdin>",
        )),
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("opening replay input {}", path.display()))?;
            Box::new(ReaderLineSource::new(
                BufReader::new(file),
                path.display().to_string(),
            ))
        }
        None => Box::new(
            SerialLineSource::from_config(acq)
                .with_context(|| format!("opening serial port {}", acq.port))?,
        ),
    };

    let mut output = open_output(&acq.output)
        .with_context(|| format!("opening output {}", acq.output.display()))?;

    let summary = AcquisitionLogger::from_config(acq)
        .run(source.as_mut(), &mut output, &cancel)
        .context("acquisition")?;

    log::info!(
        "{} samples appended to {} ({} lines skipped)",
        summary.accepted,
        acq.output.display(),
        summary.skipped
    );
    Ok(())
}
