use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use frame_seq_burn::grid::create_comparison_grid;
use frame_seq_burn::iterator::HandleStats;
use frame_seq_burn::{DataConfig, DataProvider, SequenceBatcher};

#[derive(Parser, Debug)]
#[command(name = "frame-seq", about = "Sequence batching for frame-prediction models")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load both splits and walk one epoch of each
    Inspect {
        /// JSON data config
        #[arg(long)]
        config: PathBuf,

        #[arg(long, default_value_t = false)]
        no_shuffle: bool,
    },
    /// Compose GT*/PD* images into comparison.png
    Grid {
        #[arg(long, default_value = "results/temperature_predrnn_v2/1000/1")]
        input_dir: PathBuf,
    },
}

#[derive(Serialize)]
struct EpochReport {
    split: &'static str,
    batches: usize,
    batch_shape: Option<[usize; 5]>,
    stats: HandleStats,
}

fn walk_epoch(split: &'static str, mut handle: SequenceBatcher, shuffle: bool) -> EpochReport {
    handle.begin(shuffle);
    let mut batches = 0;
    let mut batch_shape = None;
    while let Some(batch) = handle.fetch() {
        batch_shape = Some(batch.shape());
        batches += 1;
        handle.advance();
    }
    handle.print_stat();
    EpochReport {
        split,
        batches,
        batch_shape,
        stats: handle.stats(),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("frame_seq_burn=info".parse()?),
        )
        .init();

    match Cli::parse().command {
        Command::Inspect { config, no_shuffle } => {
            let provider = DataProvider::new(DataConfig::from_file(&config)?)?;
            let reports = vec![
                walk_epoch("train", provider.train_handle()?, !no_shuffle),
                walk_epoch("test", provider.test_handle()?, !no_shuffle),
            ];
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Command::Grid { input_dir } => {
            if !input_dir.exists() {
                bail!("input directory does not exist: {}", input_dir.display());
            }
            let input_dir = input_dir.canonicalize()?;
            let output = input_dir.join("comparison.png");
            let summary = create_comparison_grid(&input_dir, &output)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
