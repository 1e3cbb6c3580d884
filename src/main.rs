//! pricesense: score customers one at a time or in bulk, and explore scored files
//!
//! This is the main entrypoint that wires the command line to the scoring pipeline.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use pricesense::cli::{Command, PredictArgs};
use pricesense::source::sheet_row;
use pricesense::{
    data, export, summary, viz, Args, BatchScorer, PredictionClient, RecordSource, Scorer,
    SingleRecordSource, TableFormat, TabularRecordSource,
};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(args.log_filter()))
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "pricesense starting");

    match &args.command {
        Command::Predict(predict) => run_single_prediction(&args, predict),
        Command::Batch {
            input,
            output,
            workers,
            preview,
        } => run_batch(&args, input, output, *workers, *preview),
        Command::Summarize {
            input,
            charts_dir,
            bins,
            json,
        } => run_summary(input, charts_dir.as_deref(), *bins, *json),
    }
}

/// Score one customer entered on the command line
fn run_single_prediction(args: &Args, predict: &PredictArgs) -> Result<()> {
    println!("=== Single-customer Prediction ===");

    let source = SingleRecordSource::new(predict.to_attributes())?;
    let client = PredictionClient::new(args.client_config()?)?;

    if args.verbose {
        println!("Endpoint: {}", client.config().endpoint);
    }

    let start_time = Instant::now();
    let result = client.score(source.record())?;

    let label = if result.will_continue {
        "Likely to continue buying"
    } else {
        "Likely to stop buying"
    };
    println!("\n{label}");
    println!("Probability of continuing: {:.1}%", result.probability * 100.0);
    if args.verbose {
        println!("Request time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    Ok(())
}

/// Score every row of an uploaded file and write the scored table
fn run_batch(args: &Args, input: &Path, output: &Path, workers: usize, preview: usize) -> Result<()> {
    println!("=== Batch Prediction ===\n");

    let output_format = TableFormat::from_path(output)?;
    let start_time = Instant::now();

    let df = data::load_table(input)
        .with_context(|| format!("failed to load {}", input.display()))?;
    let source = TabularRecordSource::from_frame(&df)?;

    println!("Loaded {} records from {}", source.len(), input.display());
    println!("Preview of uploaded data:\n{}", df.head(Some(preview)));

    let client = PredictionClient::new(args.client_config()?)?;
    let scorer = BatchScorer::new().with_workers(workers);
    let cancel = scorer.cancel_token();
    ctrlc::set_handler(move || cancel.cancel()).context("failed to install Ctrl-C handler")?;

    let report = scorer.run(RecordSource::from(source), &client)?;

    println!("\nBatch prediction complete.");
    println!("Scored: {} of {}", report.scored(), report.table.len());
    if report.cancelled > 0 {
        println!("Cancelled: {} (left empty in the output)", report.cancelled);
    }
    if !report.failures.is_empty() {
        println!("Failed: {} (left empty in the output)", report.failures.len());
        if args.verbose {
            for failure in &report.failures {
                println!("  row {}: {}", sheet_row(failure.index), failure.message);
            }
        }
    }

    let scored = export::to_frame(&report.table)?;
    println!("{}", scored.head(Some(preview)));

    let bytes = export::export(&report.table, output_format)?;
    std::fs::write(output, bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let summary = summary::summarize(&report.table, summary::DEFAULT_BINS)?;
    if let Some(share) = summary.continue_share {
        println!("\nShare predicted to continue buying: {:.2}%", share * 100.0);
    }

    println!("\nResults saved to: {}", output.display());
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Summarize an existing scored file
fn run_summary(input: &Path, charts_dir: Option<&Path>, bins: usize, json: bool) -> Result<()> {
    let df = data::load_table(input)
        .with_context(|| format!("failed to load {}", input.display()))?;
    let summary = summary::summarize_frame(&df, bins)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("=== Visual Analytics ===");
        viz::print_summary(&summary);
    }

    if let Some(dir) = charts_dir {
        let written = viz::write_report(&summary, dir)?;
        if !json {
            println!();
            for path in written {
                println!("Chart saved to: {}", path.display());
            }
        }
    }

    Ok(())
}
