//!
//! This binary runs trigger maker chains over primitive files.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{ArgAction, Parser, Subcommand};

use rayon::prelude::*;
use rustrig_algorithms::{run_partitions, ChainOutput, ChainSpec, MakerRegistry, MakerStatistics};
use rustrig_core::Primitive;
use rustrig_io::{CsvEventSink, PrimitiveFileReader, TriggerFileWriter};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    RustrigIo(#[from] rustrig_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] rustrig_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid chain file: {0}")]
    ChainFile(String),
}

/// Streaming trigger activity and candidate maker.
#[derive(Parser)]
#[command(name = "rustrig")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a maker chain over primitive files, one partition per file
    Process {
        /// Input primitive file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output directory for activity and candidate CSV files
        #[arg(short, long)]
        output: PathBuf,

        /// JSON chain file with maker names and configurations
        #[arg(short, long)]
        chain: Option<PathBuf>,

        /// Activity maker name (overrides the chain file)
        #[arg(long)]
        activity_maker: Option<String>,

        /// Candidate maker name (overrides the chain file)
        #[arg(long)]
        candidate_maker: Option<String>,

        /// Directory for per-partition debug event CSV files
        #[arg(long)]
        debug_dir: Option<PathBuf>,
    },

    /// Show information about primitive files
    Info {
        /// Input primitive file(s)
        #[arg(required = true)]
        input: Vec<PathBuf>,
    },

    /// List registered makers
    Makers,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Reads a chain file:
///
/// ```json
/// { "activity_maker": "michel_electron", "activity": { ... },
///   "candidate_maker": "bundle_n", "candidate": { ... } }
/// ```
///
/// Every key is optional; missing ones keep the [`ChainSpec`] default.
fn chain_from_json(value: &Value) -> Result<ChainSpec> {
    let Value::Object(map) = value else {
        return Err(CliError::ChainFile("expected a JSON object".to_string()));
    };

    let mut spec = ChainSpec::default();
    for (key, v) in map {
        match key.as_str() {
            "activity_maker" => spec.activity_maker = maker_name(key, v)?,
            "candidate_maker" => spec.candidate_maker = maker_name(key, v)?,
            "activity" => spec.activity_config = v.clone(),
            "candidate" => spec.candidate_config = v.clone(),
            other => return Err(CliError::ChainFile(format!("unknown key `{other}`"))),
        }
    }
    Ok(spec)
}

fn maker_name(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| CliError::ChainFile(format!("`{key}` must be a string")))
}

fn load_chain(
    path: Option<&Path>,
    activity_maker: Option<String>,
    candidate_maker: Option<String>,
) -> Result<ChainSpec> {
    let mut spec = match path {
        Some(path) => chain_from_json(&serde_json::from_str(&std::fs::read_to_string(path)?)?)?,
        None => ChainSpec::default(),
    };
    if let Some(name) = activity_maker {
        spec.activity_maker = name;
    }
    if let Some(name) = candidate_maker {
        spec.candidate_maker = name;
    }
    Ok(spec)
}

fn file_stem(path: &Path, index: usize) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map_or_else(|| format!("partition{index}"), ToString::to_string)
}

fn print_statistics(label: &str, stats: &MakerStatistics) {
    println!(
        "  {:<10} in {:>8}  fired {:>6}  prescaled {:>6}  out {:>6}  max adjacency {}",
        label,
        stats.inputs_processed,
        stats.triggers_fired,
        stats.triggers_prescaled,
        stats.outputs_emitted,
        stats.max_adjacency
    );
}

fn write_outputs(dir: &Path, stem: &str, out: &ChainOutput) -> Result<()> {
    TriggerFileWriter::create(dir.join(format!("{stem}_activities.csv")))?
        .write_activities_csv(&out.activities)?;
    TriggerFileWriter::create(dir.join(format!("{stem}_candidates.csv")))?
        .write_candidates_csv(&out.candidates)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process {
            input,
            output,
            chain,
            activity_maker,
            candidate_maker,
            debug_dir,
        } => {
            let registry = MakerRegistry::with_builtin();
            let spec = load_chain(chain.as_deref(), activity_maker, candidate_maker)?;
            // Fail on a bad configuration before any file is read.
            spec.build(&registry)?;
            log::info!(
                "chain {} -> {} over {} file(s)",
                spec.activity_maker,
                spec.candidate_maker,
                input.len()
            );

            std::fs::create_dir_all(&output)?;
            if let Some(dir) = &debug_dir {
                std::fs::create_dir_all(dir)?;
            }

            let start = Instant::now();
            let partitions: Vec<Vec<Primitive>> = input
                .par_iter()
                .map(|path| -> Result<Vec<Primitive>> {
                    let tps = PrimitiveFileReader::open(path)?.read_time_ordered()?;
                    log::info!("{}: {} primitives", path.display(), tps.len());
                    Ok(tps)
                })
                .collect::<Result<_>>()?;
            let stems: Vec<String> = input
                .iter()
                .enumerate()
                .map(|(i, path)| file_stem(path, i))
                .collect();

            let outputs = run_partitions(&partitions, |i| -> Result<_> {
                let (mut activity, mut candidate) = spec.build(&registry)?;
                if let Some(dir) = &debug_dir {
                    let stem = &stems[i];
                    activity.attach_sink(Box::new(CsvEventSink::create(
                        dir,
                        &format!("{stem}_activity"),
                    )?));
                    candidate.attach_sink(Box::new(CsvEventSink::create(
                        dir,
                        &format!("{stem}_candidate"),
                    )?));
                }
                Ok((activity, candidate))
            })?;

            let mut total_activities = 0usize;
            let mut total_candidates = 0usize;
            for ((path, stem), out) in input.iter().zip(&stems).zip(&outputs) {
                write_outputs(&output, stem, out)?;
                total_activities += out.activities.len();
                total_candidates += out.candidates.len();

                println!("{}:", path.display());
                print_statistics(&spec.activity_maker, &out.activity_statistics);
                print_statistics(&spec.candidate_maker, &out.candidate_statistics);
            }

            println!(
                "Processed {} files in {:.2}s",
                input.len(),
                start.elapsed().as_secs_f64()
            );
            println!("Total primitives: {}", partitions.iter().map(Vec::len).sum::<usize>());
            println!("Total activities: {}", total_activities);
            println!("Total candidates: {}", total_candidates);
        }

        Commands::Info { input } => {
            for path in &input {
                let reader = PrimitiveFileReader::open(path)?;
                let file_size = reader.file_size();
                let summary = reader.summary()?;

                println!("File: {}", path.display());
                println!(
                    "Size: {} bytes ({:.2} MB)",
                    file_size,
                    file_size as f64 / 1_000_000.0
                );
                println!("Primitives: {}", summary.n_primitives);
                if summary.n_primitives > 0 {
                    println!(
                        "Time range: {} - {} ({} ticks)",
                        summary.first_time,
                        summary.last_time,
                        summary.duration()
                    );
                    println!(
                        "Channels: {} distinct, {} - {}",
                        summary.n_channels, summary.min_channel, summary.max_channel
                    );
                    println!("ADC total: {}", summary.adc_total);
                    println!("Detector ids: {:?}", summary.detids);
                }
            }
        }

        Commands::Makers => {
            let registry = MakerRegistry::with_builtin();
            println!("Activity makers:");
            for name in registry.activity_maker_names() {
                println!("  {}", name);
            }
            println!("Candidate makers:");
            for name in registry.candidate_maker_names() {
                println!("  {}", name);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chain_from_json() {
        let spec = chain_from_json(&json!({
            "activity_maker": "michel_electron",
            "activity": {"adjacency_threshold": 10},
            "candidate_maker": "bundle_n"
        }))
        .unwrap();
        assert_eq!(spec.activity_maker, "michel_electron");
        assert_eq!(spec.activity_config, json!({"adjacency_threshold": 10}));
        assert_eq!(spec.candidate_maker, "bundle_n");
        assert_eq!(spec.candidate_config, json!({}));
    }

    #[test]
    fn test_chain_from_json_rejects_unknown_keys() {
        assert!(chain_from_json(&json!({"activty": {}})).is_err());
        assert!(chain_from_json(&json!({"activity_maker": 3})).is_err());
        assert!(chain_from_json(&json!([])).is_err());
    }

    #[test]
    fn test_flags_override_chain_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"activity_maker": "prescale"}"#).unwrap();

        let spec = load_chain(Some(file.path()), None, Some("bundle_n".to_string())).unwrap();
        assert_eq!(spec.activity_maker, "prescale");
        assert_eq!(spec.candidate_maker, "bundle_n");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("/data/run42.txt"), 0), "run42");
        assert_eq!(file_stem(Path::new("/"), 3), "partition3");
    }
}
