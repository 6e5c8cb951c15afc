//! innovation-lab entry point.
//!
//! Usage:
//!   innovation-lab                      # same as `serve`
//!   innovation-lab serve
//!   innovation-lab generate --problem "Reduce plastic waste in oceans" --context sustainability
//!   innovation-lab rank photo.jpg
//!   innovation-lab summarize data.csv
//!   innovation-lab random

use anyhow::Result;
use clap::{Parser, Subcommand};
use innovation_lab::{
    concepts::rank_concepts,
    config::Config,
    innovation::{Context, generate_innovation},
    models::load_models,
    random_concept,
    server::{AppState, render::format_probability, start_http_server},
    tabular::summarize_csv,
};
use rand::{SeedableRng, rngs::StdRng};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "innovation-lab")]
#[command(about = "AI innovation generator: text, image and CSV driven ideas", long_about = None)]
struct Cli {
    /// Fixed seed for sampling and random picks
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web UI (default)
    Serve,
    /// Generate one innovation idea for a problem statement
    Generate {
        #[arg(long)]
        problem: String,
        #[arg(long, default_value = "general")]
        context: String,
    },
    /// Rank the concept vocabulary against an image
    Rank { image: PathBuf },
    /// Summarize a CSV file
    Summarize { csv: PathBuf },
    /// Print a random innovation concept
    Random,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    if cli.seed.is_some() {
        config.runtime.seed = cli.seed;
    }
    innovation_lab::init_tracing(&config.runtime.log_level);

    let mut rng = match config.runtime.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            info!("Starting AI Innovation Generator");
            let models = load_models(&config).map_err(|e| {
                eprintln!("{}", e);
                e
            })?;
            info!("Models ready: {:?}", models);
            start_http_server(AppState::new(config, models)).await?;
        }
        Commands::Generate { problem, context } => {
            if problem.trim().is_empty() {
                anyhow::bail!("Please enter a valid problem statement or idea.");
            }
            let context: Context = context.parse()?;
            let models = load_models(&config)?;
            let idea = tokio::task::spawn_blocking(move || {
                generate_innovation(&models, &problem, context.label(), &mut rng)
            })
            .await??;
            println!("{idea}");
        }
        Commands::Rank { image } => {
            let bytes = std::fs::read(&image)?;
            let models = load_models(&config)?;
            let scores =
                tokio::task::spawn_blocking(move || rank_concepts(&models, &bytes)).await??;
            for (i, score) in scores.iter().enumerate() {
                let marker = if i < innovation_lab::concepts::TOP_K { "*" } else { " " };
                println!(
                    "{marker} {:<22} {:>7}",
                    score.concept,
                    format_probability(score.probability)
                );
            }
        }
        Commands::Summarize { csv } => {
            let bytes = std::fs::read(&csv)?;
            let summary = summarize_csv(&bytes)?;
            println!("{}", summary.shape_sentence());
            println!("{}", summary.columns_sentence());
            println!("{}", summary.statistics_json()?);
            println!("{}", summary.advisory);
        }
        Commands::Random => {
            let concept = random_concept::pick(&mut rng);
            println!("Idea: {}", concept.idea);
            println!("Use Case: {}", concept.use_case);
        }
    }

    Ok(())
}
