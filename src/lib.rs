//! This crate turns river-basin news monitoring text into a group-term matrix
//! and explores it with topic models.

pub mod cache;
pub mod config;
pub mod corpus;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod text;
pub mod topics;
pub mod utils;
pub mod vectorizer;
pub mod viz;

/// Pipeline Error
/// The single error type of every stage, with `Result<T>` as its alias.
/// Configuration mistakes, unparsable file names, i/o and artifact decoding
/// failures and topic model errors are distinct variants.
pub use error::{PipelineError, Result};

/// Text Normalizer
/// Deterministic cleanup of raw text: quotation marks, hyphenated words,
/// accents, punctuation, digits, case, stopwords and token length.
///
/// Normalizing an already normalized text yields the same text.
pub use text::{NormalizerConfig, ReplacePolicy, TextNormalizer};

/// Language Model
/// Stopwords, whitespace tokenizer, sentence counter, part-of-speech tagger
/// and stemmer in one explicitly constructed resource.
/// The tagger is pluggable through `PosTagger`; `RuleTagger` is the default.
pub use text::{LanguageModel, Pos, PosTagger, RuleTagger, TermNormalize};

/// Corpus and Corpus Builder
/// `CorpusBuilder` walks raw files named `<basin>_<year>[_<month>].txt`,
/// normalizes them one at a time and appends `Document`s to a `Corpus`.
/// A file name that does not parse aborts the whole build.
///
/// # Serialization
/// `Corpus::save` / `Corpus::load`, gzip compressed CBOR.
pub use corpus::{Corpus, CorpusBuilder, Document};

/// Term extraction
/// Filtered n-grams per document, lazily produced together with the
/// document's basin and year.
pub use features::{tokenize_corpus, TermsConfig, TokenizedCorpus};

/// Group Vectorizer
/// Sums the term counts of every document sharing a group key into one row,
/// then applies the TF, IDF, length and row norm schemes of
/// `VectorizerConfig`. Document frequency is counted over groups.
///
/// `GroupVectorizer<E>` is generic over the weighting engine `E`,
/// `DefaultWeightingEngine` by default.
///
/// # Serialization
/// The vectorizer and its `GroupTermMatrix` are saved separately.
/// `VectorizerData` is the engine independent form of a fitted vectorizer.
pub use vectorizer::{DocFreq, GroupVectorizer, VectorizerConfig};
pub use vectorizer::matrix::GroupTermMatrix;
pub use vectorizer::serde::VectorizerData;

/// Weighting Engine Trait
/// Computes the IDF vector and the weighted TF row of one group.
/// Implement it to plug in a different weighting scheme.
pub use vectorizer::tfidf::{DefaultWeightingEngine, DlType, IdfType, TfType, WeightingEngine};

/// Term Frequency structure
/// Occurrence counts of each term plus the total number of terms.
/// Used as the base data of one group row.
pub use vectorizer::token::TermFrequency;

/// Topic models
/// NMF, LSA and LDA behind the `TopicModel` trait, and the permutation sweep
/// over model type x topic count x term count. A failing sweep item is
/// recorded and the sweep continues.
pub use topics::{
    FittedTopicModel, ModelType, SweepFailure, SweepItem, SweepOptions, SweepPlan, SweepReport, TopicModel,
    TopicModelResult, TopicModelSweep,
};

/// Figures
/// Termite plots and word count bar charts as SVG, count tables as CSV.
pub use viz::{CountTable, RankTerms, SortTerms, TermiteOptions};

/// Pipeline
/// `Settings` (directories from `.env`), `PipelineConfig` and the driver
/// that runs every stage through the artifact cache.
pub use cache::{Artifact, ArtifactCache};
pub use config::{PipelineConfig, Settings, SweepGrid};
pub use pipeline::{Pipeline, RunSummary};
