//! End-to-end run: raw files -> corpus -> group-term matrix -> topic sweep

use std::collections::BTreeSet;

use once_cell::unsync::OnceCell;
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{fingerprint, fingerprint_files, ArtifactCache};
use crate::config::{PipelineConfig, Settings};
use crate::corpus::{find_files, metadata::GroupField, Corpus, CorpusBuilder};
use crate::error::{PipelineError, Result};
use crate::features::{tokenize_corpus, TermsConfig};
use crate::text::{stopwords::load_stopwords, LanguageModel};
use crate::topics::{SweepOptions, SweepReport, TopicModelSweep};
use crate::vectorizer::{matrix::GroupTermMatrix, GroupVectorizer};
use crate::viz::counts::{word_counts, word_doc_counts, write_count_outputs};

pub const STAGE_CORPUS: &str = "CORPUS";
pub const STAGE_VECTORIZER: &str = "VECTORIZER";
pub const STAGE_MATRIX: &str = "GROUPTERMMATRIX";

/// A stage output together with the fingerprint it was cached under
#[derive(Debug, Clone)]
pub struct Fingerprinted<T> {
    pub value: T,
    pub fingerprint: u64,
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub n_docs: usize,
    pub n_sents: usize,
    pub n_tokens: usize,
    pub matrix_shape: (usize, usize),
    pub n_results: usize,
    pub n_failures: usize,
}

/// Owns the language model and wires the stages with the artifact caches
#[derive(Debug)]
pub struct Pipeline {
    settings: Settings,
    config: PipelineConfig,
    lm: LanguageModel,
    case_stopwords: BTreeSet<String>,
}

impl Pipeline {
    /// English rule-based language model, plus `STOPWORDS_FILE` when configured
    pub fn new(settings: Settings, config: PipelineConfig) -> Result<Self> {
        Self::with_language_model(settings, config, LanguageModel::english())
    }

    pub fn with_language_model(settings: Settings, config: PipelineConfig, lm: LanguageModel) -> Result<Self> {
        config.validate()?;
        let case_stopwords = match &settings.stopwords_file {
            Some(path) => load_stopwords(path)?.into_iter().collect(),
            None => BTreeSet::new(),
        };
        Ok(Self {
            settings,
            config,
            lm,
            case_stopwords,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn language_model(&self) -> &LanguageModel {
        &self.lm
    }

    fn processed_cache(&self) -> ArtifactCache {
        ArtifactCache::new(&self.settings.data_processed, self.config.file_stem())
    }

    fn model_cache(&self) -> ArtifactCache {
        ArtifactCache::new(&self.settings.model_dir, self.config.file_stem())
    }

    /// Drop cached artifacts of every stage
    pub fn invalidate_all(&self) -> Result<usize> {
        Ok(self.processed_cache().invalidate(STAGE_CORPUS)?
            + self.processed_cache().invalidate(STAGE_MATRIX)?
            + self.model_cache().invalidate(STAGE_VECTORIZER)?)
    }

    /// Build the corpus from `DATA_RAW/raw_glob`, or load it from the cache
    pub fn corpus(&self) -> Result<Fingerprinted<Corpus>> {
        let pattern = self.settings.data_raw.join(&self.config.raw_glob);
        let pattern = pattern.to_string_lossy();
        let paths = find_files(&pattern)?;
        if paths.is_empty() {
            warn!(pattern = %pattern, "no raw files match");
        }
        let fp = fingerprint(&(
            fingerprint_files(&paths)?,
            &self.config.normalizer,
            &self.case_stopwords,
            sorted_stopwords(&self.lm),
        ))?;
        let corpus = self.processed_cache().get_or_compute(STAGE_CORPUS, fp, || {
            CorpusBuilder::new(&self.lm, self.config.normalizer.clone(), &self.case_stopwords).build_from_paths(&paths)
        })?;
        info!(n_docs = corpus.n_docs(), n_sents = corpus.n_sents(), n_tokens = corpus.n_tokens(), "corpus ready");
        Ok(Fingerprinted { value: corpus, fingerprint: fp })
    }

    /// Word count and word-document count tables with their bar charts
    pub fn word_statistics(&self, corpus: &Corpus) -> Result<()> {
        let stem = self.config.file_stem();
        let n = self.config.word_count_n;
        write_count_outputs(
            &word_counts(corpus),
            &self.settings.data_interim,
            &self.settings.figure_dir,
            &format!("{stem}_WORDCOUNT"),
            n,
        )?;
        write_count_outputs(
            &word_doc_counts(corpus),
            &self.settings.data_interim,
            &self.settings.figure_dir,
            &format!("{stem}_WORDDOCCOUNT"),
            n,
        )?;
        info!(n, "word statistics written");
        Ok(())
    }

    /// Fit the group vectorizer and build the group-term matrix, each cached
    /// separately. Terms are only extracted when one of them is missing.
    pub fn vectorize(&self, corpus: &Fingerprinted<Corpus>) -> Result<(GroupVectorizer, GroupTermMatrix)> {
        let fp = fingerprint(&(
            corpus.fingerprint,
            terms_key(&self.config.terms),
            self.config.group_by,
            &self.config.vectorizer,
        ))?;

        let inputs: OnceCell<(Vec<Vec<String>>, Vec<String>)> = OnceCell::new();
        let get_inputs = || {
            inputs.get_or_try_init(|| -> Result<_> {
                let tokenized = tokenize_corpus(&corpus.value, &self.lm, &self.config.terms)?;
                let (terms, basins, years) = tokenized.unzip();
                let groups = match self.config.group_by {
                    GroupField::Basin => basins,
                    GroupField::Year => years,
                    GroupField::Month => {
                        return Err(PipelineError::config("documents can be grouped by basin or year only"))
                    }
                };
                Ok((terms, groups))
            })
        };

        let vectorizer: GroupVectorizer = self.model_cache().get_or_compute(STAGE_VECTORIZER, fp, || {
            let (terms, groups) = get_inputs()?;
            let mut v = GroupVectorizer::new(self.config.vectorizer.clone());
            v.fit(terms, groups)?;
            Ok(v)
        })?;
        let matrix = self.processed_cache().get_or_compute(STAGE_MATRIX, fp, || {
            let (terms, groups) = get_inputs()?;
            vectorizer.transform(terms, groups)
        })?;
        if matrix.shape() != (vectorizer.groups().len(), vectorizer.terms().len()) {
            return Err(PipelineError::Decode {
                path: self.processed_cache().path_for::<GroupTermMatrix>(STAGE_MATRIX, fp),
                reason: "matrix shape does not match the vectorizer vocabulary".to_string(),
            });
        }
        info!(shape = ?matrix.shape(), nnz = matrix.nnz(), "group-term matrix ready");
        Ok((vectorizer, matrix))
    }

    /// Topic model sweep over the configured grid, report saved as JSON
    pub fn sweep(&self, vectorizer: &GroupVectorizer, matrix: &GroupTermMatrix) -> Result<SweepReport> {
        let opts = SweepOptions {
            model_dir: self.config.save_models.then(|| self.settings.model_dir.clone()),
            figure_dir: self.config.plot_topics.then(|| self.settings.figure_dir.clone()),
            prefix: self.config.prefix.clone(),
            seed: self.config.seed,
            termite: self.config.termite.clone(),
        };
        let sweep = TopicModelSweep::new(self.config.grid.plan(), self.config.version.clone());
        let report = sweep.run(matrix, vectorizer, &opts)?;
        let path = self
            .settings
            .model_dir
            .join(format!("{}_SWEEP.json", self.config.file_stem()));
        report.save_json(&self.config.version, &path)?;
        if !report.is_complete() {
            warn!(failures = report.failures.len(), path = %path.display(), "sweep finished with failures");
        }
        Ok(report)
    }

    /// Every stage in order
    pub fn run(&self) -> Result<RunSummary> {
        info!(version = %self.config.version, root = %self.settings.project_root.display(), "pipeline started");
        let corpus = self.corpus()?;
        if self.config.plot_counts {
            self.word_statistics(&corpus.value)?;
        }
        let (vectorizer, matrix) = self.vectorize(&corpus)?;
        let report = self.sweep(&vectorizer, &matrix)?;
        let summary = RunSummary {
            n_docs: corpus.value.n_docs(),
            n_sents: corpus.value.n_sents(),
            n_tokens: corpus.value.n_tokens(),
            matrix_shape: matrix.shape(),
            n_results: report.results.len(),
            n_failures: report.failures.len(),
        };
        info!(?summary, "pipeline finished");
        Ok(summary)
    }
}

fn sorted_stopwords(lm: &LanguageModel) -> BTreeSet<&str> {
    lm.stopwords().iter().map(String::as_str).collect()
}

/// Order-stable view of [`TermsConfig`] for fingerprinting
fn terms_key(config: &TermsConfig) -> impl Serialize + '_ {
    let pos: Option<BTreeSet<_>> = config.include_pos.as_ref().map(|p| p.iter().copied().collect());
    (
        config.ngrams,
        pos,
        config.filter_stops,
        config.filter_nums,
        config.min_freq,
        config.normalize,
    )
}
