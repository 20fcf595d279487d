//! Project layout from `.env` and the run configuration

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::corpus::metadata::GroupField;
use crate::error::{PipelineError, Result};
use crate::features::TermsConfig;
use crate::text::NormalizerConfig;
use crate::topics::{ModelType, SweepPlan};
use crate::vectorizer::VectorizerConfig;
use crate::viz::TermiteOptions;

/// File name prefix shared by every artifact
pub const DEFAULT_PREFIX: &str = "BBC_2007_07_04_CORPUS_TEXTACY";
pub const DEFAULT_VERSION: &str = "V5";

/// Project directories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub project_root: PathBuf,
    pub data_raw: PathBuf,
    pub data_interim: PathBuf,
    pub data_processed: PathBuf,
    pub model_dir: PathBuf,
    pub figure_dir: PathBuf,
    /// extra stopwords, one per line
    pub stopwords_file: Option<PathBuf>,
}

impl Settings {
    /// Conventional layout under `root`, no environment lookup
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            project_root: root.to_path_buf(),
            data_raw: root.join("data").join("raw"),
            data_interim: root.join("data").join("interim"),
            data_processed: root.join("data").join("processed"),
            model_dir: root.join("models"),
            figure_dir: root.join("reports").join("figures"),
            stopwords_file: None,
        }
    }

    /// Load the nearest `.env` found in `root` or one of its parents, then
    /// read the directory keys. Variables already set in the process win.
    /// Relative values are resolved against `root`.
    pub fn from_env<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if let Some(dotenv) = find_dotenv(root) {
            dotenvy::from_path(&dotenv)
                .map_err(|e| PipelineError::config(format!("cannot read {}: {e}", dotenv.display())))?;
            debug!(path = %dotenv.display(), ".env loaded");
        }
        let defaults = Self::with_root(root);
        let dir = |key: &str, default: PathBuf| match env::var_os(key) {
            Some(v) if !v.is_empty() => root.join(PathBuf::from(v)),
            _ => default,
        };
        let settings = Self {
            data_raw: dir("DATA_RAW", defaults.data_raw),
            data_interim: dir("DATA_INTERIM", defaults.data_interim),
            data_processed: dir("DATA_PROCESSED", defaults.data_processed),
            model_dir: dir("MODEL_DIR", defaults.model_dir),
            figure_dir: dir("FIGURE_DIR", defaults.figure_dir),
            stopwords_file: env::var_os("STOPWORDS_FILE")
                .filter(|v| !v.is_empty())
                .map(|v| root.join(PathBuf::from(v))),
            project_root: defaults.project_root,
        };
        info!(root = %root.display(), "project settings resolved");
        Ok(settings)
    }
}

/// First `.env` file walking up from `start`
pub fn find_dotenv(start: &Path) -> Option<PathBuf> {
    start.ancestors().map(|dir| dir.join(".env")).find(|p| p.is_file())
}

/// Topic model grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepGrid {
    pub model_types: Vec<ModelType>,
    pub topic_counts: Vec<usize>,
    pub term_counts: Vec<usize>,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            model_types: ModelType::ALL.to_vec(),
            topic_counts: (2..=9).collect(),
            term_counts: vec![10, 30, 50],
        }
    }
}

impl SweepGrid {
    pub fn plan(&self) -> SweepPlan {
        SweepPlan::grid(&self.model_types, &self.topic_counts, &self.term_counts)
    }
}

/// Everything one pipeline run needs besides the directories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub version: String,
    pub prefix: String,
    /// raw file glob, relative to `DATA_RAW`
    pub raw_glob: String,
    pub normalizer: NormalizerConfig,
    pub terms: TermsConfig,
    /// metadata field whose values become matrix rows
    pub group_by: GroupField,
    pub vectorizer: VectorizerConfig,
    pub grid: SweepGrid,
    pub termite: TermiteOptions,
    pub seed: u64,
    /// rows shown in the word-count bar charts
    pub word_count_n: usize,
    pub save_models: bool,
    pub plot_topics: bool,
    pub plot_counts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            raw_glob: "BBC_2007_07_04_TXT_V2/*.txt".to_string(),
            normalizer: NormalizerConfig::default(),
            terms: TermsConfig::default(),
            group_by: GroupField::Basin,
            vectorizer: VectorizerConfig::default(),
            grid: SweepGrid::default(),
            termite: TermiteOptions::default(),
            seed: 0,
            word_count_n: 30,
            save_models: true,
            plot_topics: true,
            plot_counts: true,
        }
    }
}

impl PipelineConfig {
    /// JSON file, missing keys take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// `{prefix}_{version}`
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.prefix, self.version)
    }

    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() || self.prefix.is_empty() {
            return Err(PipelineError::config("version and prefix must not be empty"));
        }
        if self.group_by == GroupField::Month {
            return Err(PipelineError::config("documents can be grouped by basin or year only"));
        }
        if self.grid.topic_counts.contains(&0) || self.grid.term_counts.contains(&0) {
            return Err(PipelineError::config("topic and term counts must be at least 1"));
        }
        Ok(())
    }
}
