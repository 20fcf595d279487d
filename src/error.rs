use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by every pipeline stage
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unsupported option combination, e.g. length filtering without stopwords
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A raw file name does not split into `<basin>_<year>[_<month>]`
    #[error("cannot parse metadata from {path:?}: expected 2 or 3 '_' separated parts, found {parts}")]
    MetadataParse { path: PathBuf, parts: usize },

    #[error("i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("failed to encode artifact: {0}")]
    Encode(String),

    #[error("failed to decode artifact {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// No term survived the document frequency cutoffs
    #[error("vocabulary is empty after filtering (min_df={min_df}, max_df={max_df})")]
    EmptyVocabulary { min_df: usize, max_df: usize },

    #[error("topic model error: {0}")]
    Model(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io { path: path.into(), source }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PipelineError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
