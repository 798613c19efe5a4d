//! Motor Analytics CLI
//!
//! Command-line interface for portfolio analysis: derives loss metrics,
//! segments the book by a chosen dimension, and fits a pricing GLM.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Datelike;
use clap::Parser;
use log::warn;

use motor_analytics::dataset::load_dataset;
use motor_analytics::{
    aggregate, derive, fit, portfolio_summary, scoring, AggregateOptions, DeriveConfig, Family,
    FitSpec, LabelEncoding, RiskWeights, ScoreConfig, Value,
};

#[derive(Parser, Debug)]
#[command(name = "motor_analytics", version, about = "Motor insurance portfolio analytics")]
struct Args {
    /// Input CSV file with policy/claim rows
    input: PathBuf,

    /// Dimension to segment the book by
    #[arg(long, default_value = "region")]
    dimension: String,

    /// Target column for the pricing model
    #[arg(long, default_value = "earned_premium")]
    target: String,

    /// Predictor columns (categorical ones are label-encoded automatically)
    #[arg(long, default_value = "driver_age,model_year", value_delimiter = ',')]
    predictors: Vec<String>,

    /// Model family: gamma, poisson, or tweedie
    #[arg(long, default_value = "gamma")]
    family: String,

    /// Tweedie variance power (only used with --family tweedie)
    #[arg(long, default_value_t = motor_analytics::glm::DEFAULT_TWEEDIE_POWER)]
    var_power: f64,

    /// Seed for the train/test split
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Fraction of usable rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,

    /// Hide segments with fewer policies than this
    #[arg(long, default_value_t = 1)]
    min_count: usize,

    /// Keep only the worst N segments
    #[arg(long)]
    top: Option<usize>,

    /// Segment report output file
    #[arg(long, default_value = "segment_report.csv")]
    output: PathBuf,
}

fn parse_family(name: &str, var_power: f64) -> Result<Family> {
    match name.to_ascii_lowercase().as_str() {
        "gamma" => Ok(Family::Gamma),
        "poisson" => Ok(Family::Poisson),
        "tweedie" => Ok(Family::Tweedie { var_power }),
        other => bail!("unknown family '{}': expected gamma, poisson, or tweedie", other),
    }
}

/// Whether a column holds text cells (and so needs label encoding)
fn is_categorical(dataset: &motor_analytics::Dataset, column: &str) -> bool {
    dataset
        .column(column)
        .map(|cells| {
            cells
                .iter()
                .find(|cell| !cell.is_null())
                .map(|cell| matches!(cell, Value::Text(_)))
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let family = parse_family(&args.family, args.var_power)?;

    println!("Motor Analytics v0.1.0");
    println!("======================\n");

    let dataset = load_dataset(&args.input)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("loading {}", args.input.display()))?;
    println!(
        "Loaded {} rows x {} columns from {}",
        dataset.n_rows(),
        dataset.n_columns(),
        args.input.display()
    );

    // ---- Derived metrics and headline figures ----

    let reference_year = chrono::Local::now().year();
    let records = derive(&dataset, &DeriveConfig::new(reference_year))?;
    let summary = portfolio_summary(&records);

    println!("\nPortfolio Summary:");
    println!("  Policies:      {}", summary.policy_count);
    println!("  Premium:       {:.2}", summary.total_premium);
    println!("  Net Loss:      {:.2}", summary.total_net_loss);
    println!("  Claims:        {:.0}", summary.total_claims);
    println!("  Loss Ratio:    {:.1}%", summary.loss_ratio);
    println!("  Frequency:     {:.2}%", summary.frequency);
    println!("  Severity:      {:.2}", summary.severity);

    // ---- Segmentation ----

    let options = AggregateOptions {
        min_policy_count: args.min_count,
        top_n: args.top,
    };
    let reports = aggregate(&dataset, &records, &args.dimension, &options)?;

    println!("\nSegments by {} ({}):", args.dimension, reports.len());
    println!(
        "{:<20} {:>12} {:>12} {:>8} {:>8} {:>10} {:>12}",
        "Segment", "Premium", "Net Loss", "H/P %", "Count", "Freq %", "Status"
    );
    println!("{}", "-".repeat(88));
    for report in &reports {
        println!(
            "{:<20} {:>12.2} {:>12.2} {:>8.1} {:>8} {:>10.2} {:>12}",
            report.key,
            report.earned_premium,
            report.net_loss,
            report.loss_ratio,
            report.policy_count,
            report.frequency,
            report.status.as_str()
        );
    }

    let mut file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    writeln!(
        file,
        "segment,earned_premium,net_loss,loss_incl_reserve,claim_count,exposure,policy_count,loss_ratio,frequency,severity,profit,status"
    )?;
    for report in &reports {
        writeln!(
            file,
            "{},{:.2},{:.2},{:.2},{:.2},{:.2},{},{:.4},{:.4},{:.4},{:.2},{}",
            report.key,
            report.earned_premium,
            report.net_loss,
            report.loss_incl_reserve,
            report.claim_count,
            report.exposure,
            report.policy_count,
            report.loss_ratio,
            report.frequency,
            report.severity,
            report.profit,
            report.status.as_str()
        )?;
    }
    println!("\nSegment report written to: {}", args.output.display());

    // ---- Pricing model ----

    // Label-encode categorical predictors so coefficients stay interpretable
    let mut model_dataset = dataset.clone();
    let mut encodings: Vec<LabelEncoding> = Vec::new();
    for predictor in &args.predictors {
        if is_categorical(&model_dataset, predictor) {
            let (encoded, encoding) = LabelEncoding::encode_into(&model_dataset, predictor)?;
            println!(
                "Encoded '{}' to {} category codes",
                predictor,
                encoding.len()
            );
            model_dataset = encoded;
            encodings.push(encoding);
        }
    }

    let mut spec = FitSpec::new(args.predictors.clone(), args.target.clone(), family);
    spec.seed = args.seed;
    spec.test_fraction = args.test_fraction;

    match fit(&model_dataset, &spec) {
        Ok(model) => {
            println!(
                "\n{} model for '{}' ({} train / {} test rows, {} iterations):",
                model.family.name(),
                args.target,
                model.train_rows,
                model.test_rows,
                model.iterations
            );
            println!(
                "{:<20} {:>12} {:>10} {:>8} {:>10}",
                "Term", "Estimate", "Std Err", "z", "p"
            );
            println!("{}", "-".repeat(64));
            for coefficient in &model.coefficients {
                println!(
                    "{:<20} {:>12.6} {:>10.6} {:>8.2} {:>10.4}",
                    coefficient.term,
                    coefficient.estimate,
                    coefficient.std_error,
                    coefficient.z_value,
                    coefficient.p_value
                );
            }
            for encoding in &encodings {
                println!("\nCategory codes for '{}':", encoding.column());
                for code in 0..encoding.len() {
                    if let Some(label) = encoding.label_of(code) {
                        println!("  {:>4} = {}", code, label);
                    }
                }
            }
            println!("\nDiagnostics:");
            println!("  Deviance:      {:.4}", model.deviance);
            println!("  Log-Lik:       {:.4}", model.log_likelihood);
            println!("  AIC:           {:.2}", model.aic);
            println!("  BIC:           {:.2}", model.bic);
            println!("  Dispersion:    {:.4}", model.dispersion);
            println!("  Holdout RMSE:  {:.4}", model.rmse);
            println!("  Holdout MAE:   {:.4}", model.mae);
            println!("  Holdout R2:    {:.4}", model.r_squared);
        }
        // The model is optional output; segmentation results stand alone
        Err(e) => warn!("model fit skipped: {}", e),
    }

    // ---- Risk scores (only when the scoring columns are present) ----

    let score_config = ScoreConfig::default();
    if dataset.has_column(&score_config.region_column)
        && dataset.has_column(&score_config.brand_column)
        && dataset.has_column(&score_config.model_year_column)
    {
        let scores = scoring::score(&dataset, &records, &RiskWeights::default(), &score_config)?;
        let mean = scores.iter().map(|s| s.score).sum::<f64>() / scores.len().max(1) as f64;
        let riskiest = scores
            .iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
        println!("\nRisk Scores:");
        println!("  Mean score:    {:.1}", mean);
        if let Some(top) = riskiest {
            println!(
                "  Riskiest row:  #{} (score {:.1}, adjusted premium x{:.3})",
                top.row,
                top.score,
                scoring::adjusted_premium(1.0, top.score, 0.5)
            );
        }
    }

    Ok(())
}
