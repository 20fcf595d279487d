pub mod metadata;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::text::{LanguageModel, NormalizerConfig, TextNormalizer};
use crate::utils::io::{read_compressed, write_compressed};
use crate::vectorizer::doc_freq::DocFrequency;
use crate::vectorizer::token::TermFrequency;

pub use metadata::{DocMeta, GroupField};

const CORPUS_FORMAT_VERSION: u32 = 1;

/// One normalized raw file with its filename metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub basin: String,
    pub year: String,
    pub month: Option<String>,
    pub raw_text: String,
    pub processed_text: String,
    pub tokens: Vec<String>,
    /// sentences in the raw text
    pub n_sents: usize,
}

impl Document {
    pub fn meta(&self) -> DocMeta {
        DocMeta {
            basin: self.basin.clone(),
            year: self.year.clone(),
            month: self.month.clone(),
        }
    }

    pub fn field(&self, field: GroupField) -> Option<&str> {
        match field {
            GroupField::Basin => Some(&self.basin),
            GroupField::Year => Some(&self.year),
            GroupField::Month => self.month.as_deref(),
        }
    }
}

/// Word count weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// absolute count
    Count,
    /// count / total token count
    Freq,
}

/// Word-document count weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocWeighting {
    /// number of documents containing the word
    Count,
    /// document count / n_docs
    Freq,
    /// ln(1 + n_docs / document count)
    Idf,
}

/// Ordered documents sharing one normalizer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    config: NormalizerConfig,
    docs: Vec<Document>,
}

#[derive(Serialize)]
struct CorpusArtifactRef<'a> {
    format_version: u32,
    config: &'a NormalizerConfig,
    docs: &'a [Document],
}

#[derive(Deserialize)]
struct CorpusArtifact {
    format_version: u32,
    config: NormalizerConfig,
    docs: Vec<Document>,
}

impl Corpus {
    pub(crate) fn new(config: NormalizerConfig) -> Self {
        Self { config, docs: Vec::new() }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn docs(&self) -> &[Document] {
        &self.docs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.docs.iter()
    }

    pub fn n_docs(&self) -> usize {
        self.docs.len()
    }

    pub fn n_sents(&self) -> usize {
        self.docs.iter().map(|d| d.n_sents).sum()
    }

    pub fn n_tokens(&self) -> usize {
        self.docs.iter().map(|d| d.tokens.len()).sum()
    }

    /// Persist documents and normalizer config as one gzip CBOR file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let artifact = CorpusArtifactRef {
            format_version: CORPUS_FORMAT_VERSION,
            config: &self.config,
            docs: &self.docs,
        };
        write_compressed(&artifact, path.as_ref())?;
        info!(path = %path.as_ref().display(), n_docs = self.n_docs(), "corpus saved");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let artifact: CorpusArtifact = read_compressed(path)?;
        if artifact.format_version != CORPUS_FORMAT_VERSION {
            return Err(PipelineError::Decode {
                path: path.to_path_buf(),
                reason: format!(
                    "unsupported corpus format version {} (expected {})",
                    artifact.format_version, CORPUS_FORMAT_VERSION
                ),
            });
        }
        info!(path = %path.display(), n_docs = artifact.docs.len(), "corpus loaded");
        Ok(Self {
            config: artifact.config,
            docs: artifact.docs,
        })
    }
}

/// statistics
impl Corpus {
    /// Token counts over the whole corpus, most frequent first (ties by word)
    pub fn word_counts(&self, weighting: Weighting) -> Vec<(String, f64)> {
        let mut freq = TermFrequency::new();
        for doc in &self.docs {
            freq.add_terms(&doc.tokens);
        }
        let total = freq.term_sum().max(1) as f64;
        freq.sorted_frequency_vector()
            .into_iter()
            .map(|(word, count)| {
                let value = match weighting {
                    Weighting::Count => count as f64,
                    Weighting::Freq => count as f64 / total,
                };
                (word, value)
            })
            .collect()
    }

    /// Number of documents each token appears in, most common first (ties by word)
    pub fn word_doc_counts(&self, weighting: DocWeighting) -> Vec<(String, f64)> {
        let mut df = DocFrequency::new();
        for doc in &self.docs {
            df.add_set(&doc.tokens);
        }
        let n_docs = df.doc_num().max(1) as f64;
        let mut counts: Vec<(&str, u64)> = df.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts
            .into_iter()
            .map(|(word, count)| {
                let count = count as f64;
                let value = match weighting {
                    DocWeighting::Count => count,
                    DocWeighting::Freq => count / n_docs,
                    DocWeighting::Idf => (1.0 + n_docs / count).ln(),
                };
                (word.to_string(), value)
            })
            .collect()
    }

    /// Document indices per value of `field`, in first appearance order.
    /// Documents without the field (unset month) are left out.
    pub fn groups_by(&self, field: GroupField) -> IndexMap<String, Vec<usize>> {
        let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (i, doc) in self.docs.iter().enumerate() {
            if let Some(key) = doc.field(field) {
                groups.entry(key.to_string()).or_default().push(i);
            }
        }
        groups
    }
}

/// Files matching `file_glob`, sorted by path
pub fn find_files(file_glob: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob::glob(file_glob)? {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            PipelineError::io(path, e.into_error())
        })?;
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}

/// Walks raw files and turns them into a [`Corpus`]
#[derive(Debug)]
pub struct CorpusBuilder<'a> {
    lm: &'a LanguageModel,
    normalizer: TextNormalizer,
    stopwords: HashSet<String>,
}

impl<'a> CorpusBuilder<'a> {
    /// The normalizer drops the language model's stopwords plus `case_stopwords`
    pub fn new<I, S>(lm: &'a LanguageModel, config: NormalizerConfig, case_stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stopwords = lm.stopwords().clone();
        stopwords.extend(case_stopwords.into_iter().map(|w| w.as_ref().to_lowercase()));
        Self {
            lm,
            normalizer: TextNormalizer::new(config),
            stopwords,
        }
    }

    /// Build from every file matching `file_glob`, in lexicographic path order.
    /// A file name that does not parse aborts the whole build.
    pub fn build(&self, file_glob: &str) -> Result<Corpus> {
        let paths = find_files(file_glob)?;
        info!(pattern = file_glob, n_files = paths.len(), "building corpus");
        self.build_from_paths(&paths)
    }

    pub fn build_from_paths(&self, paths: &[PathBuf]) -> Result<Corpus> {
        self.normalizer.validate(Some(&self.stopwords))?;
        let mut corpus = Corpus::new(self.normalizer.config().clone());
        for path in paths {
            let doc = self.read_document(path)?;
            debug!(path = %path.display(), n_tokens = doc.tokens.len(), n_sents = doc.n_sents, "document added");
            corpus.docs.push(doc);
        }
        info!(
            n_docs = corpus.n_docs(),
            n_sents = corpus.n_sents(),
            n_tokens = corpus.n_tokens(),
            "corpus built"
        );
        Ok(corpus)
    }

    fn read_document(&self, path: &Path) -> Result<Document> {
        let meta = DocMeta::from_path(path)?;
        let raw_text = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let processed_text = self.normalizer.normalize(&raw_text, Some(&self.stopwords))?;
        let tokens = self
            .lm
            .tokenize(&processed_text)
            .into_iter()
            .map(str::to_string)
            .collect();
        let n_sents = self.lm.count_sentences(&raw_text);
        Ok(Document {
            basin: meta.basin,
            year: meta.year,
            month: meta.month,
            raw_text,
            processed_text,
            tokens,
            n_sents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(basin: &str, year: &str, tokens: &[&str]) -> Document {
        Document {
            basin: basin.into(),
            year: year.into(),
            month: None,
            raw_text: tokens.join(" "),
            processed_text: tokens.join(" "),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            n_sents: 1,
        }
    }

    fn sample() -> Corpus {
        let mut c = Corpus::new(NormalizerConfig::default());
        c.docs.push(doc("nile", "2007", &["water", "dam", "water"]));
        c.docs.push(doc("nile", "2008", &["water", "river"]));
        c.docs.push(doc("indus", "2007", &["treaty"]));
        c
    }

    #[test]
    fn word_counts_weightings() {
        let c = sample();
        let counts = c.word_counts(Weighting::Count);
        assert_eq!(counts[0], ("water".to_string(), 3.0));
        assert_eq!(counts.len(), 4);
        let freqs = c.word_counts(Weighting::Freq);
        assert!((freqs[0].1 - 0.5).abs() < 1e-12);
        let total: f64 = freqs.iter().map(|(_, f)| f).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn word_doc_counts_weightings() {
        let c = sample();
        let counts = c.word_doc_counts(DocWeighting::Count);
        assert_eq!(counts[0], ("water".to_string(), 2.0));
        let freq = c.word_doc_counts(DocWeighting::Freq);
        assert!((freq[0].1 - 2.0 / 3.0).abs() < 1e-12);
        let idf = c.word_doc_counts(DocWeighting::Idf);
        assert!((idf[0].1 - (1.0f64 + 1.5).ln()).abs() < 1e-12);
    }

    #[test]
    fn groups_keep_first_appearance_order() {
        let c = sample();
        let by_basin = c.groups_by(GroupField::Basin);
        assert_eq!(by_basin.keys().collect::<Vec<_>>(), vec!["nile", "indus"]);
        assert_eq!(by_basin["nile"], vec![0, 1]);
        assert!(c.groups_by(GroupField::Month).is_empty());
    }

    #[test]
    fn aggregate_counts() {
        let c = sample();
        assert_eq!(c.n_docs(), 3);
        assert_eq!(c.n_tokens(), 6);
        assert_eq!(c.n_sents(), 3);
    }
}
