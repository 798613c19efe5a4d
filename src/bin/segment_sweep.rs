//! Sweep segment aggregation across many dimensions
//!
//! Outputs one JSON document with a full segment report per dimension,
//! for downstream reporting layers.

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Datelike;
use clap::Parser;

use motor_analytics::dataset::load_dataset;
use motor_analytics::{aggregate_many, derive, AggregateOptions, DeriveConfig};

#[derive(Parser, Debug)]
#[command(name = "segment_sweep", about = "Aggregate a motor book across several dimensions")]
struct Args {
    /// Input CSV file with policy/claim rows
    input: PathBuf,

    /// Dimensions to aggregate by
    #[arg(long, default_value = "region,brand,usage_type", value_delimiter = ',')]
    dimensions: Vec<String>,

    /// Hide segments with fewer policies than this
    #[arg(long, default_value_t = 1)]
    min_count: usize,

    /// Keep only the worst N segments per dimension
    #[arg(long)]
    top: Option<usize>,

    /// JSON output file
    #[arg(long, default_value = "segment_sweep.json")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start = Instant::now();
    let dataset = load_dataset(&args.input)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("loading {}", args.input.display()))?;
    println!(
        "Loaded {} rows in {:?}",
        dataset.n_rows(),
        start.elapsed()
    );

    let records = derive(&dataset, &DeriveConfig::new(chrono::Local::now().year()))?;

    let options = AggregateOptions {
        min_policy_count: args.min_count,
        top_n: args.top,
    };

    let sweep_start = Instant::now();
    // Dimensions aggregate independently over the shared records
    let sweep = aggregate_many(&dataset, &records, &args.dimensions, &options)?;
    println!(
        "Aggregated {} dimensions in {:?}",
        sweep.len(),
        sweep_start.elapsed()
    );

    for (dimension, reports) in &sweep {
        let worst = reports.first();
        match worst {
            Some(report) => println!(
                "  {:<16} {} segments, worst: {} ({:.1}% {})",
                dimension,
                reports.len(),
                report.key,
                report.loss_ratio,
                report.status.as_str()
            ),
            None => println!("  {:<16} no segments above min count", dimension),
        }
    }

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let document: serde_json::Map<String, serde_json::Value> = sweep
        .into_iter()
        .map(|(dimension, reports)| Ok((dimension, serde_json::to_value(reports)?)))
        .collect::<Result<_>>()?;
    serde_json::to_writer_pretty(file, &document)?;

    println!("Sweep written to: {}", args.output.display());
    Ok(())
}
