//! CLI interface for adaptive-playbook

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::adapter::{Adapter, OfflineAdapter};
use crate::config::Config;
use crate::environment::ExactMatchEnvironment;
use crate::llm::{CompletionClient, CompletionOptions, OpenRouterClient, ProviderConfig, QueueClient};
use crate::playbook::Playbook;
use crate::roles::{Curator, Generator, Reflector};
use crate::types::Sample;

#[derive(Parser)]
#[command(name = "adaptive-playbook")]
#[command(about = "Self-improving playbook memory engine for LLM pipelines", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run offline adaptation over a JSONL sample file
    Run {
        /// Path to a JSONL file of samples ({"question", "context"?, "ground_truth"?})
        samples: PathBuf,
        /// Number of passes over the sample set
        #[arg(short, long, default_value = "1")]
        epochs: usize,
        /// Playbook snapshot to load before and save after the run
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
        /// Use canned replies instead of a live provider (no API key needed)
        #[arg(long)]
        mock: bool,
    },
    /// Inspect a playbook snapshot
    Playbook {
        #[command(subcommand)]
        command: PlaybookCommands,
    },
    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
enum PlaybookCommands {
    /// Render a snapshot as prompt text
    Show { path: PathBuf },
    /// Print section/bullet/tag counts
    Stats { path: PathBuf },
}

/// CLI entry point
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Run {
            samples,
            epochs,
            snapshot,
            mock,
        } => run_offline(&config, &samples, epochs, snapshot.as_deref(), mock).await,
        Commands::Playbook { command } => match command {
            PlaybookCommands::Show { path } => {
                let playbook = Playbook::load_from(&path)?;
                println!("{}", playbook.as_prompt());
                Ok(())
            }
            PlaybookCommands::Stats { path } => {
                let playbook = Playbook::load_from(&path)?;
                let stats = playbook.stats();
                println!("sections: {}", stats.sections);
                println!("bullets:  {}", stats.bullets);
                println!(
                    "tags:     helpful={} harmful={} neutral={}",
                    stats.tags.helpful, stats.tags.harmful, stats.tags.neutral
                );
                Ok(())
            }
        },
        Commands::Config => {
            let content = toml::to_string_pretty(&config).context("Failed to render config")?;
            println!("{}", content);
            Ok(())
        }
    }
}

async fn run_offline(
    config: &Config,
    samples_path: &Path,
    epochs: usize,
    snapshot: Option<&Path>,
    mock: bool,
) -> Result<()> {
    let samples = load_samples(samples_path)?;
    anyhow::ensure!(!samples.is_empty(), "Sample file is empty");

    let client: Arc<dyn CompletionClient> = if mock {
        Arc::new(mock_client(&samples, epochs))
    } else {
        let provider = ProviderConfig::custom(
            config.provider.base_url.clone(),
            config.api_key()?,
            config.provider.model.clone(),
        );
        Arc::new(OpenRouterClient::with_provider(provider))
    };

    let options = CompletionOptions {
        temperature: Some(config.provider.temperature),
        max_tokens: Some(config.provider.max_tokens),
        ..Default::default()
    };

    let mut adapter = Adapter::new(
        Generator::new(client.clone()).with_max_retries(config.engine.max_retries),
        Reflector::new(client.clone()).with_max_retries(config.engine.max_retries),
        Curator::new(client.clone()).with_max_retries(config.engine.max_retries),
    )
    .with_reflection_window(config.engine.reflection_window)
    .with_max_refinement_rounds(config.engine.max_refinement_rounds)
    .with_options(options);

    if let Some(path) = snapshot {
        if path.exists() {
            adapter = adapter.with_playbook(Playbook::load_from(path)?);
        }
    }

    let mut offline = OfflineAdapter::new(adapter);
    let mut environment = ExactMatchEnvironment;
    let results = offline.run(&samples, &mut environment, epochs).await?;

    for result in &results {
        let accuracy = result
            .environment_result
            .metrics
            .get("accuracy")
            .copied()
            .unwrap_or(0.0);
        println!(
            "{:>4} {} -> {}",
            if accuracy >= 1.0 { "ok" } else { "miss" },
            result.sample.question,
            result.generator_output.final_answer
        );
    }

    let playbook = offline.into_playbook();
    let stats = playbook.stats();
    println!(
        "\nplaybook: {} sections, {} bullets",
        stats.sections, stats.bullets
    );

    if let Some(path) = snapshot {
        playbook.save_to(path)?;
        println!("snapshot saved to {}", path.display());
    }
    Ok(())
}

fn load_samples(path: &Path) -> Result<Vec<Sample>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read samples from {}", path.display()))?;
    let mut samples = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let sample: Sample = serde_json::from_str(line)
            .with_context(|| format!("Invalid sample on line {}", number + 1))?;
        samples.push(sample);
    }
    Ok(samples)
}

/// Canned replies simulating a model that answers with the ground truth and
/// files one heuristic per sample: three replies (generator, reflector,
/// curator) per sample per epoch.
fn mock_client(samples: &[Sample], epochs: usize) -> QueueClient {
    let client = QueueClient::new();
    for _ in 0..epochs {
        for sample in samples {
            let answer = sample.ground_truth.clone().unwrap_or_default();
            client.push_json(&json!({
                "reasoning": "replaying the known answer",
                "final_answer": answer,
                "bullet_ids": [],
            }));
            client.push_json(&json!({
                "reasoning": "answer matched the reference",
                "error_identification": "",
                "root_cause_analysis": "",
                "correct_approach": "",
                "key_insight": format!("'{}' answers '{}'", answer, sample.question),
                "bullet_tags": [],
            }));
            client.push_json(&json!({
                "reasoning": "record the confirmed answer",
                "operations": [{
                    "type": "ADD",
                    "section": "default_answers",
                    "content": format!("{} -> {}", sample.question, answer),
                    "metadata": {"helpful": 1},
                }],
            }));
        }
    }
    client
}
