// ABOUTME: Command-line front end for compiling drafted meal plans and searching food sources
// ABOUTME: Configuration comes from NUTRITION_* environment variables; output is JSON on stdout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Usage:
//! ```bash
//! # Compile a drafted plan
//! nutrition-compiler compile --input draft.json --output compiled.json
//!
//! # Force the keto swap pass
//! nutrition-compiler compile --input draft.json --keto
//!
//! # Search the alias cache and every configured source
//! nutrition-compiler search --query "chicken breast"
//!
//! # Draft a plan without a language model
//! nutrition-compiler fallback --days 7 --calories 2000
//!
//! # Breaker and cache state of each source
//! nutrition-compiler health
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nutrition_compiler::compiler::CompileProgress;
use nutrition_compiler::config::PipelineConfig;
use nutrition_compiler::logging::LoggingConfig;
use nutrition_compiler::pipeline::NutritionPipeline;
use nutrition_core::models::{DietaryPreferences, DietaryStyle, MealPlanDraft};
use serde::Serialize;
use tokio::fs;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "nutrition-compiler",
    about = "Verify and compile AI-drafted meal plans",
    long_about = "Resolves drafted ingredients against local and remote food composition sources and writes a compiled plan with per-meal confidence tags."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a drafted plan
    Compile {
        /// Draft plan JSON file
        #[arg(long, short = 'i')]
        input: PathBuf,

        /// Output file; stdout when omitted
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Run the keto swap pass regardless of the draft's dietary style
        #[arg(long)]
        keto: bool,
    },
    /// Search for a food
    Search {
        /// Food name
        #[arg(long, short = 'q')]
        query: String,

        /// Maximum results to print
        #[arg(long, default_value = "10")]
        max: usize,
    },
    /// Generate a deterministic draft plan
    Fallback {
        /// Number of days
        #[arg(long, default_value = "7")]
        days: u32,

        /// Daily calorie target
        #[arg(long)]
        calories: Option<f64>,

        /// Dietary style (standard, keto, vegetarian, vegan, pescatarian, paleo)
        #[arg(long, default_value = "standard")]
        style: String,

        /// Preferred cuisine; repeatable
        #[arg(long = "cuisine")]
        cuisines: Vec<String>,

        /// Output file; stdout when omitted
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Show source health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if cli.verbose {
        logging = logging.with_level("debug");
    }
    logging.init()?;

    let config = PipelineConfig::from_env()?;
    let pipeline = NutritionPipeline::from_config(config).await?;

    match cli.command {
        Command::Compile {
            input,
            output,
            keto,
        } => compile(&pipeline, &input, output, keto).await,
        Command::Search { query, max } => {
            let mut hits = pipeline.search(&query).await;
            hits.truncate(max);
            write_json(&hits, None).await
        }
        Command::Fallback {
            days,
            calories,
            style,
            cuisines,
            output,
        } => {
            let preferences = DietaryPreferences {
                style: DietaryStyle::from_str_lossy(&style),
                allergens: Vec::new(),
                preferred_cuisines: cuisines,
            };
            let draft = pipeline.fallback_draft(preferences, days, calories);
            write_json(&draft, output).await
        }
        Command::Health => write_json(&pipeline.source_health().await, None).await,
    }
}

async fn compile(
    pipeline: &NutritionPipeline,
    input: &Path,
    output: Option<PathBuf>,
    keto: bool,
) -> Result<()> {
    let raw = fs::read_to_string(input)
        .await
        .with_context(|| format!("failed to read draft {}", input.display()))?;
    let draft: MealPlanDraft = serde_json::from_str(&raw)
        .with_context(|| format!("invalid draft JSON in {}", input.display()))?;

    let (sender, mut receiver) = mpsc::unbounded_channel::<CompileProgress>();
    let reporter = tokio::spawn(async move {
        while let Some(progress) = receiver.recv().await {
            info!(completed = progress.completed, total = progress.total, "progress");
        }
    });

    let result = pipeline.run(&draft, keto, Some(sender)).await;
    // Sender is dropped with the run, which ends the reporter
    reporter.await.context("progress reporter panicked")?;
    let output_value = result?;

    info!(
        verified = output_value.plan.verified_meals,
        total = output_value.plan.total_meals,
        violations = output_value.compliance.violations.len(),
        "compile finished"
    );
    write_json(&output_value, output).await
}

async fn write_json<T: Serialize + Sync>(value: &T, output: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(&path, json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
