use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use raman_map::batch::run_batch;
use raman_map::config::PipelineConfig;
use raman_map::data::container::load_map;
use raman_map::log::reproducibility::ReproLog;
use raman_map::ProcessResult;

#[derive(Parser)]
#[command(
    name = "raman-map",
    version,
    about = "Batch processing of point-scanned Raman spectral maps"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a pipeline over one or more map files
    Process {
        /// Input map files (.rmap)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Pipeline configuration (JSON); the default pipeline when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory override
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Tag appended to output file names
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Print the shape and axis of a map file
    Info {
        input: PathBuf,
    },
    /// Print the default pipeline configuration as JSON
    Recipe {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            ::log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> ProcessResult<ExitCode> {
    match command {
        Command::Process {
            inputs,
            config,
            output,
            tag,
        } => {
            let mut config = match config {
                Some(path) => PipelineConfig::load(&path)?,
                None => PipelineConfig::default(),
            };
            if let Some(dir) = output {
                config.output_dir = dir;
            }
            if tag.is_some() {
                config.tag = tag;
            }
            let report = run_batch(&inputs, &config)?;
            for (input, err) in &report.failed {
                eprintln!("FAILED {}: {}", input.display(), err);
            }
            println!("{}", report.summary());
            Ok(if report.failed.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Info { input } => {
            let mut log = ReproLog::new();
            let mut map = load_map(&input, &mut log)?;
            let (rows, cols, bins) = map.shape();
            println!("File:    {}", input.display());
            println!("Pixels:  {} × {}", rows, cols);
            println!("Bins:    {}", bins);
            if let (Some(first), Some(last)) = (map.x_axis().first(), map.x_axis().last()) {
                println!("Axis:    {:.2} – {:.2} ({})", first, last, map.unit());
            }
            let peak = map.maxima().iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if peak.is_finite() {
                println!("Max:     {:.3}", peak);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Recipe { out } => {
            let config = PipelineConfig::default();
            match out {
                Some(path) => {
                    config.save(&path)?;
                    ::log::info!("Wrote default pipeline to {}", path.display());
                }
                None => println!("{}", config.to_json()?),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
