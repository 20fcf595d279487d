//! Text cleanup and the linguistic resources used on top of it

pub mod language;
pub mod normalizer;
pub(crate) mod patterns;
pub mod stopwords;

pub use language::{LanguageModel, Pos, PosTagger, RuleTagger, TermNormalize};
pub use normalizer::{normalize, NormalizerConfig, ReplacePolicy, TextNormalizer};
