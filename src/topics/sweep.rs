use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::topics::{FittedTopicModel, ModelType, TopicModel};
use crate::vectorizer::{matrix::GroupTermMatrix, tfidf::WeightingEngine, GroupVectorizer};
use crate::viz::{termite::TermiteOptions, termite_plot, write_svg};

/// One point of the sweep grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SweepItem {
    pub model_type: ModelType,
    pub n_topics: usize,
    /// terms drawn in the termite plot
    pub n_terms: usize,
}

impl SweepItem {
    /// `{prefix}_{version}_TM_{MODEL}_{k}x{n}`
    pub fn file_stem(&self, prefix: &str, version: &str) -> String {
        format!(
            "{prefix}_{version}_TM_{}_{}x{}",
            self.model_type.as_upper(),
            self.n_topics,
            self.n_terms
        )
    }
}

/// Explicit work-list of sweep items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPlan {
    pub items: Vec<SweepItem>,
}

impl SweepPlan {
    /// Full cross product, nested model -> topics -> terms
    pub fn grid(model_types: &[ModelType], topic_counts: &[usize], term_counts: &[usize]) -> Self {
        let mut items = Vec::with_capacity(model_types.len() * topic_counts.len() * term_counts.len());
        for &model_type in model_types {
            for &n_topics in topic_counts {
                for &n_terms in term_counts {
                    items.push(SweepItem { model_type, n_topics, n_terms });
                }
            }
        }
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SweepItem> {
        self.items.iter()
    }
}

impl Default for SweepPlan {
    fn default() -> Self {
        let topics: Vec<usize> = (2..=9).collect();
        Self::grid(&ModelType::ALL, &topics, &[10, 30, 50])
    }
}

/// Where and how sweep items are persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepOptions {
    /// models are saved here when set
    pub model_dir: Option<PathBuf>,
    /// termite plots are saved here when set
    pub figure_dir: Option<PathBuf>,
    pub prefix: String,
    pub seed: u64,
    /// `n_terms` is replaced by each item's term count
    pub termite: TermiteOptions,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            model_dir: None,
            figure_dir: None,
            prefix: "BBC_2007_07_04_CORPUS_TEXTACY".to_string(),
            seed: 0,
            termite: TermiteOptions::default(),
        }
    }
}

/// Fitted model of one sweep item
#[derive(Debug, Clone)]
pub struct TopicModelResult {
    pub model_type: ModelType,
    pub n_topics: usize,
    pub n_terms: usize,
    pub model: FittedTopicModel,
    /// (n_groups, n_topics)
    pub group_topic: Array2<f64>,
}

impl TopicModelResult {
    pub fn item(&self) -> SweepItem {
        SweepItem {
            model_type: self.model_type,
            n_topics: self.n_topics,
            n_terms: self.n_terms,
        }
    }
}

/// An item that did not finish, with its error message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub item: SweepItem,
    pub error: String,
}

/// Partial results plus the failed items, in plan order
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub results: Vec<TopicModelResult>,
    pub failures: Vec<SweepFailure>,
}

#[derive(Serialize)]
struct ReportSummary<'a> {
    version: &'a str,
    results: Vec<ResultSummary>,
    failures: &'a [SweepFailure],
}

#[derive(Serialize)]
struct ResultSummary {
    #[serde(flatten)]
    item: SweepItem,
    group_topic_shape: (usize, usize),
    /// dominant topic per group row
    dominant_topics: Vec<usize>,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Results and failures as pretty JSON
    pub fn save_json<P: AsRef<Path>>(&self, version: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        let summary = ReportSummary {
            version,
            results: self
                .results
                .iter()
                .map(|r| ResultSummary {
                    item: r.item(),
                    group_topic_shape: r.group_topic.dim(),
                    dominant_topics: r
                        .group_topic
                        .rows()
                        .into_iter()
                        .map(|row| crate::utils::sort::argmax(&row.to_vec()).unwrap_or(0))
                        .collect(),
                })
                .collect(),
            failures: &self.failures,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
            }
        }
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(path, json).map_err(|e| PipelineError::io(path, e))
    }
}

/// Topic model permutation sweep.
///
/// Every item of the plan is attempted. A failing item is logged and
/// recorded in [`SweepReport::failures`], the remaining items still run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicModelSweep {
    pub plan: SweepPlan,
    pub version: String,
}

impl TopicModelSweep {
    pub fn new(plan: SweepPlan, version: impl Into<String>) -> Self {
        Self { plan, version: version.into() }
    }

    /// Fit every item on `matrix`, whose columns follow `vectorizer.terms()`.
    /// Only a matrix/vocabulary mismatch fails the whole call.
    pub fn run<E: WeightingEngine>(
        &self,
        matrix: &GroupTermMatrix,
        vectorizer: &GroupVectorizer<E>,
        opts: &SweepOptions,
    ) -> Result<SweepReport> {
        let (n_groups, n_cols) = matrix.shape();
        if n_cols != vectorizer.terms().len() {
            return Err(PipelineError::config(format!(
                "matrix has {n_cols} columns but the vectorizer has {} terms",
                vectorizer.terms().len()
            )));
        }
        info!(items = self.plan.len(), n_groups, n_terms = n_cols, version = %self.version, "topic model sweep started");

        let dense = matrix.to_dense();
        let col_sums = matrix.col_sums();
        let mut report = SweepReport::default();
        for item in self.plan.iter() {
            match self.run_item(item, &dense, &col_sums, vectorizer, opts) {
                Ok(result) => {
                    debug!(model = %item.model_type, n_topics = item.n_topics, n_terms = item.n_terms, "sweep item done");
                    report.results.push(result);
                }
                Err(e) => {
                    warn!(model = %item.model_type, n_topics = item.n_topics, n_terms = item.n_terms, error = %e, "sweep item failed");
                    report.failures.push(SweepFailure { item: *item, error: e.to_string() });
                }
            }
        }
        info!(
            results = report.results.len(),
            failures = report.failures.len(),
            "topic model sweep finished"
        );
        Ok(report)
    }

    fn run_item<E: WeightingEngine>(
        &self,
        item: &SweepItem,
        dense: &Array2<f64>,
        col_sums: &[f64],
        vectorizer: &GroupVectorizer<E>,
        opts: &SweepOptions,
    ) -> Result<TopicModelResult> {
        let mut model = item.model_type.build(item.n_topics, opts.seed);
        model.fit(dense)?;
        let group_topic = model.transform(dense)?;

        let stem = item.file_stem(&opts.prefix, &self.version);
        if let Some(dir) = &opts.model_dir {
            model.save(dir.join(format!("{stem}.cbor.gz")))?;
        }
        if let Some(dir) = &opts.figure_dir {
            let components = model
                .components()
                .ok_or_else(|| PipelineError::Model(format!("{} has no components after fit", item.model_type)))?;
            let termite = TermiteOptions { n_terms: item.n_terms, ..opts.termite.clone() };
            let svg = termite_plot(components, vectorizer.terms(), Some(col_sums), &termite)?;
            write_svg(&svg, dir.join(format!("{stem}.svg")))?;
        }

        Ok(TopicModelResult {
            model_type: item.model_type,
            n_topics: item.n_topics,
            n_terms: item.n_terms,
            model,
            group_topic,
        })
    }
}
