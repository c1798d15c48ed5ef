//! GHOST evaluation CLI
//!
//! Scores vision-language model predictions on the GHOST benchmark with the
//! GhostConsistencyScore metric.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ghost_eval::{
    Category,
    config::Config,
    dataset::GhostDataset,
    persistence::{load_checkpoint, load_predictions, report_path_for, save_report, save_reports},
    prompts::plan_requests,
    report::{Comparison, EvaluationReport, compare_dir, evaluate},
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// GHOST evaluator - consistency-aware scoring of visual question answering
#[derive(Parser)]
#[command(name = "ghost-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a prediction file with GhostConsistencyScore
    Evaluate {
        /// Path to the prediction JSON file
        #[arg(long)]
        pred_path: PathBuf,

        /// Print the abbreviated report instead of the full one
        #[arg(long)]
        summary: bool,

        /// Also write the report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate every prediction file in a directory and rank the models
    Compare {
        /// Directory containing prediction JSON files
        dir: PathBuf,

        /// Write all reports as a JSON array to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the prompts still to be answered for a dataset
    Prompts {
        /// Path to the GHOST dataset JSON file
        #[arg(long)]
        data_path: PathBuf,

        /// Existing prediction file; questions already answered are skipped
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Maximum number of prompts to print
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Evaluate {
            pred_path,
            summary,
            output,
        } => cmd_evaluate(&config, &pred_path, summary, output),
        Commands::Compare { dir, output } => cmd_compare(&config, &dir, output),
        Commands::Prompts {
            data_path,
            checkpoint,
            limit,
        } => cmd_prompts(&config, &data_path, checkpoint, limit),
    }
}

fn cmd_evaluate(
    config: &Config,
    pred_path: &Path,
    summary: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let start = Instant::now();

    let records = load_predictions(pred_path, config.evaluation.validation_sample)
        .context("Failed to load predictions")?;
    let report = evaluate(&records).context("Evaluation failed")?;

    if summary || config.evaluation.summary_only {
        print!("{}", report.format_summary());
    } else {
        print!("{}", report.format_full());
        println!("Evaluated in {:.2?}", start.elapsed());
    }

    let output = output.or_else(|| {
        config
            .evaluation
            .output_dir
            .as_deref()
            .map(|dir| report_path_for(pred_path, Some(dir)))
    });

    if let Some(path) = output {
        save_report(&report, &path).context("Failed to save report")?;
        info!(path = %path.display(), "report saved");
    }

    Ok(())
}

fn cmd_compare(config: &Config, dir: &Path, output: Option<PathBuf>) -> Result<()> {
    let comparison = compare_dir(dir, config.evaluation.validation_sample)
        .with_context(|| format!("Failed to compare '{}'", dir.display()))?;

    if comparison.ranked.is_empty() {
        anyhow::bail!("No valid prediction files found in '{}'", dir.display());
    }

    println!(
        "{:<4} {:<28} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "#", "Model", "Objects", "Attrs", "Rels", "Combined", "Accuracy"
    );
    println!("{}", "─".repeat(84));
    for (rank, (path, report)) in comparison.ranked.iter().enumerate() {
        let [objects, attributes, relations] = Category::ALL.map(|c| report.gcs(c));
        println!(
            "{:<4} {:<28} {:>8.2}% {:>8.2}% {:>8.2}% {:>8.2}% {:>8.2}%",
            rank + 1,
            Comparison::display_name(path, report),
            objects,
            attributes,
            relations,
            report.combined_gcs,
            report.accuracy
        );
    }
    if !comparison.skipped.is_empty() {
        println!("Skipped {} file(s), see warnings", comparison.skipped.len());
    }

    if let Some(output_path) = output {
        let all: Vec<&EvaluationReport> = comparison.ranked.iter().map(|(_, r)| r).collect();
        save_reports(&all, &output_path).context("Failed to save reports")?;
        println!("Reports saved to {}", output_path.display());
    }

    Ok(())
}

fn cmd_prompts(
    config: &Config,
    data_path: &Path,
    checkpoint: Option<PathBuf>,
    limit: Option<usize>,
) -> Result<()> {
    let dataset = GhostDataset::load(data_path, config.evaluation.validation_sample)
        .context("Failed to load dataset")?;

    let completed: HashSet<String> = match checkpoint {
        Some(path) => {
            load_checkpoint(&path)
                .context("Failed to load checkpoint")?
                .completed
        }
        None => HashSet::new(),
    };

    let mut requests = plan_requests(&dataset, &completed, &config.dataset.image_extension)
        .context("Failed to build prompts")?;
    info!(
        total = dataset.len(),
        completed = completed.len(),
        pending = requests.len(),
        "planned prompts"
    );

    if let Some(limit) = limit {
        requests.truncate(limit);
    }

    println!("{}", serde_json::to_string_pretty(&requests)?);
    Ok(())
}
