use std::path::PathBuf;

use anyhow::{Context, Result};
use basin_topics::{ModelType, Pipeline, PipelineConfig, Settings};
use clap::Parser;
use tracing::info;

/// Basin Topics - corpus, group-term matrix and topic model sweep
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Project root holding `.env`, data/, models/ and reports/ (default: ".")
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// JSON run configuration, missing keys take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run version used in every artifact name (e.g. V5)
    #[arg(long)]
    version_tag: Option<String>,

    /// Raw file glob, relative to DATA_RAW
    #[arg(long)]
    glob: Option<String>,

    /// Topic model types to sweep
    #[arg(long, value_delimiter = ',')]
    models: Option<Vec<ModelType>>,

    /// Topic counts to sweep
    #[arg(long, value_delimiter = ',')]
    topics: Option<Vec<usize>>,

    /// Termite plot term counts to sweep
    #[arg(long, value_delimiter = ',')]
    terms: Option<Vec<usize>>,

    /// Do not save fitted topic models
    #[arg(long)]
    no_save_models: bool,

    /// Do not draw termite plots
    #[arg(long)]
    no_plot_topics: bool,

    /// Do not write word count tables and charts
    #[arg(long)]
    no_plot_counts: bool,

    /// Delete cached corpus, vectorizer and matrix before running
    #[arg(long)]
    force: bool,
}

impl Args {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("loading run configuration {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(v) = &self.version_tag {
            config.version = v.clone();
        }
        if let Some(g) = &self.glob {
            config.raw_glob = g.clone();
        }
        if let Some(m) = &self.models {
            config.grid.model_types = m.clone();
        }
        if let Some(t) = &self.topics {
            config.grid.topic_counts = t.clone();
        }
        if let Some(t) = &self.terms {
            config.grid.term_counts = t.clone();
        }
        config.save_models &= !self.no_save_models;
        config.plot_topics &= !self.no_plot_topics;
        config.plot_counts &= !self.no_plot_counts;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let settings = Settings::from_env(&args.root).context("resolving project directories")?;
    let config = args.pipeline_config()?;
    let pipeline = Pipeline::new(settings, config)?;

    if args.force {
        let removed = pipeline.invalidate_all()?;
        info!(removed, "cached artifacts removed");
    }

    let summary = pipeline.run()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    if summary.n_failures > 0 {
        info!(failures = summary.n_failures, "see the sweep report for failed items");
    }
    Ok(())
}
