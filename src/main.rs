use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use hive_spectra::analysis::report::{
    correlation_report, mean_spectra_report, write_json, write_matrix_csv,
};
use hive_spectra::data::loader::{load_inputs, parse_timestamp};
use hive_spectra::{AlignedDataset, AnalysisConfig, DatasetBuilder, SensorId, TimeWindow};

#[derive(Parser)]
#[command(name = "hive-spectra")]
#[command(about = "Diurnal mean spectra and distance matrices for hive sensors", version)]
struct Cli {
    /// Path to JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Window selection shared by the analysis commands.
#[derive(clap::Args)]
struct WindowArgs {
    /// Window start (defaults to `end` minus the configured number of days)
    #[arg(long)]
    start: Option<String>,
    /// Window end (defaults to the latest timestamp in the data)
    #[arg(long)]
    end: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Align the inputs and print dataset dimensions
    Inspect {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Hour-of-day folded mean spectrum per sensor
    MeanSpectra {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Sensors to include (defaults to config, then to every sensor)
        #[arg(short, long)]
        sensor: Vec<String>,
        #[command(flatten)]
        window: WindowArgs,
        /// Output JSON file
        #[arg(short, long, default_value = "mean-spectra.json")]
        output: PathBuf,
    },

    /// Pairwise distance matrices for one sensor's spectra
    Distances {
        /// Input files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Sensor to analyse
        #[arg(short, long)]
        sensor: String,
        #[command(flatten)]
        window: WindowArgs,
        /// Output JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write one CSV per metric into this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            let cfg = AnalysisConfig::from_json_file(path)?;
            info!("Loaded config from: {}", path.display());
            cfg
        }
        None => AnalysisConfig::default(),
    };

    match cli.command {
        Commands::Inspect { inputs } => cmd_inspect(&inputs, &config),
        Commands::MeanSpectra {
            inputs,
            sensor,
            window,
            output,
        } => cmd_mean_spectra(&inputs, sensor, &window, &output, &config),
        Commands::Distances {
            inputs,
            sensor,
            window,
            output,
            csv_dir,
        } => cmd_distances(&inputs, &sensor, &window, output, csv_dir, &config),
    }
}

fn load_dataset(inputs: &[PathBuf], config: &AnalysisConfig) -> Result<AlignedDataset> {
    let readings = load_inputs(inputs)?;
    let ds = DatasetBuilder::new(config.builder.clone())
        .build(&readings)
        .context("aligning readings")?;
    Ok(ds)
}

fn resolve_window(
    args: &WindowArgs,
    ds: &AlignedDataset,
    config: &AnalysisConfig,
) -> Result<TimeWindow> {
    let end = match &args.end {
        Some(s) => parse_timestamp(s).context("--end")?,
        None => match ds.timestamps().last() {
            Some(ts) => *ts,
            None => bail!("dataset has no timestamps"),
        },
    };
    let window = match &args.start {
        Some(s) => TimeWindow::new(parse_timestamp(s).context("--start")?, end)?,
        None => TimeWindow::ending_at(end, config.window.length()?)?,
    };
    info!("Window: {} – {}", window.start, window.end);
    Ok(window)
}

fn cmd_inspect(inputs: &[PathBuf], config: &AnalysisConfig) -> Result<()> {
    let ds = load_dataset(inputs, config)?;
    let first = ds.timestamps().first().map(DateTime::<Utc>::to_rfc3339);
    let last = ds.timestamps().last().map(DateTime::<Utc>::to_rfc3339);

    println!("timestamps : {}", ds.timestamps().len());
    println!("sensors    : {}", ds.sensors().len());
    println!("channels   : {}", ds.channels());
    println!("readings   : {}", ds.reading_count());
    println!("occupancy  : {:.1}%", ds.occupancy() * 100.0);
    println!("from       : {}", first.unwrap_or_default());
    println!("to         : {}", last.unwrap_or_default());

    for (s, sensor) in ds.sensors().iter().enumerate() {
        let n = (0..ds.timestamps().len())
            .filter(|&t| ds.has_reading(t, s))
            .count();
        println!("  sensor {sensor:>6}: {n} readings");
    }
    Ok(())
}

fn cmd_mean_spectra(
    inputs: &[PathBuf],
    sensors: Vec<String>,
    window_args: &WindowArgs,
    output: &Path,
    config: &AnalysisConfig,
) -> Result<()> {
    let ds = load_dataset(inputs, config)?;
    let window = resolve_window(window_args, &ds, config)?;
    let folder = config.folding.folder()?;

    let sensors: Vec<SensorId> = if !sensors.is_empty() {
        sensors.into_iter().map(SensorId::from).collect()
    } else if !config.sensors.is_empty() {
        config.sensors.iter().map(|s| SensorId::from(s.as_str())).collect()
    } else {
        ds.sensors().to_vec()
    };

    let report = mean_spectra_report(&ds, &sensors, &window, &folder)?;
    if report.sensors.len() < sensors.len() {
        warn!(
            "{} of {} sensors had too few readings in the window",
            sensors.len() - report.sensors.len(),
            sensors.len()
        );
    }
    write_json(&report, output)?;
    println!("Mean spectra for {} sensors written to {}", report.sensors.len(), output.display());
    Ok(())
}

fn cmd_distances(
    inputs: &[PathBuf],
    sensor: &str,
    window_args: &WindowArgs,
    output: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
    config: &AnalysisConfig,
) -> Result<()> {
    let ds = load_dataset(inputs, config)?;
    let window = resolve_window(window_args, &ds, config)?;
    let sensor = SensorId::from(sensor);

    let folder = config.folding.folder()?;
    let report = correlation_report(&ds, &sensor, &window, folder.offset())
        .with_context(|| format!("distances for sensor {sensor}"))?;

    let stem = format!("distance-measures-sensor-{sensor}");
    let output = output.unwrap_or_else(|| PathBuf::from(format!("{stem}.json")));
    write_json(&report, &output)?;

    if let Some(dir) = csv_dir {
        write_matrix_csv(&report, &dir, &stem)?;
    }

    println!(
        "{n}×{n} distance matrices for sensor {sensor} written to {}",
        output.display(),
        n = report.timestamps.len()
    );
    Ok(())
}
