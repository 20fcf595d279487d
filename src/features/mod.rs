//! Per-document term lists for the group vectorizer

use std::collections::HashSet;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::{Corpus, Document};
use crate::error::{PipelineError, Result};
use crate::text::{LanguageModel, Pos, TermNormalize};

/// Term extraction options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsConfig {
    /// inclusive n-gram range
    pub ngrams: (usize, usize),
    /// allowed tags, `None` keeps every tag
    pub include_pos: Option<HashSet<Pos>>,
    pub filter_stops: bool,
    pub filter_nums: bool,
    /// minimum occurrences across the whole corpus
    pub min_freq: usize,
    /// Snowball stems by default, the rule based model has no lemmatizer
    pub normalize: TermNormalize,
}

impl Default for TermsConfig {
    fn default() -> Self {
        Self {
            ngrams: (1, 2),
            include_pos: Some([Pos::Adj, Pos::Noun, Pos::Verb].into_iter().collect()),
            filter_stops: true,
            filter_nums: true,
            min_freq: 2,
            normalize: TermNormalize::Stem,
        }
    }
}

/// Lazily tokenized corpus.
/// Corpus-wide term counts are computed up front, the per-document
/// term lists are produced on iteration.
#[derive(Debug)]
pub struct TokenizedCorpus<'a> {
    corpus: &'a Corpus,
    lm: &'a LanguageModel,
    config: TermsConfig,
    freqs: AHashMap<String, u64>,
}

/// Extract filtered n-gram terms for every document of `corpus`
pub fn tokenize_corpus<'a>(
    corpus: &'a Corpus,
    lm: &'a LanguageModel,
    config: &TermsConfig,
) -> Result<TokenizedCorpus<'a>> {
    let (lo, hi) = config.ngrams;
    if lo == 0 || lo > hi {
        return Err(PipelineError::config(format!(
            "invalid n-gram range ({lo}, {hi})"
        )));
    }
    let mut freqs: AHashMap<String, u64> = AHashMap::new();
    for doc in corpus.iter() {
        for term in candidate_terms(doc, lm, config)? {
            *freqs.entry(term).or_insert(0) += 1;
        }
    }
    info!(
        n_docs = corpus.n_docs(),
        n_candidates = freqs.len(),
        min_freq = config.min_freq,
        "terms counted"
    );
    Ok(TokenizedCorpus {
        corpus,
        lm,
        config: config.clone(),
        freqs,
    })
}

impl<'a> TokenizedCorpus<'a> {
    /// Per document, in corpus order: `(terms, basin, year)`
    pub fn iter(&self) -> impl Iterator<Item = (std::vec::IntoIter<String>, &'a str, &'a str)> + '_ {
        self.corpus.iter().map(move |doc| {
            // tag counts were checked for every document in tokenize_corpus
            let terms: Vec<String> = candidate_terms(doc, self.lm, &self.config)
                .unwrap_or_default()
                .into_iter()
                .filter(|t| self.term_freq(t) >= self.config.min_freq as u64)
                .collect();
            (terms.into_iter(), doc.basin.as_str(), doc.year.as_str())
        })
    }

    /// Collect the three parallel outputs, index `i` of each refers to document `i`
    pub fn unzip(&self) -> (Vec<Vec<String>>, Vec<String>, Vec<String>) {
        let mut terms = Vec::with_capacity(self.corpus.n_docs());
        let mut basins = Vec::with_capacity(self.corpus.n_docs());
        let mut years = Vec::with_capacity(self.corpus.n_docs());
        for (doc_terms, basin, year) in self.iter() {
            terms.push(doc_terms.collect());
            basins.push(basin.to_string());
            years.push(year.to_string());
        }
        (terms, basins, years)
    }

    /// Corpus-wide occurrences of a candidate term
    pub fn term_freq(&self, term: &str) -> u64 {
        self.freqs.get(term).copied().unwrap_or(0)
    }
}

fn is_numeric(token: &str, pos: Pos) -> bool {
    pos == Pos::Num || (!token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
}

/// Every n-gram of `doc` passing the tag, stopword and number filters.
/// Unigrams first, then bigrams, ..., each in text order.
fn candidate_terms(doc: &Document, lm: &LanguageModel, config: &TermsConfig) -> Result<Vec<String>> {
    let tokens: Vec<&str> = doc.tokens.iter().map(String::as_str).collect();
    let tags = lm.tag(&tokens);
    if tags.len() != tokens.len() {
        return Err(PipelineError::config(format!(
            "tagger returned {} tags for {} tokens of {}_{}",
            tags.len(),
            tokens.len(),
            doc.basin,
            doc.year
        )));
    }
    let pos_ok = |i: usize| match &config.include_pos {
        Some(include) => include.contains(&tags[i]),
        None => true,
    };
    let stop = |i: usize| config.filter_stops && lm.is_stop(tokens[i]);
    let num = |i: usize| config.filter_nums && is_numeric(tokens[i], tags[i]);

    let (lo, hi) = config.ngrams;
    let mut out = Vec::new();
    for n in lo..=hi {
        if n > tokens.len() {
            break;
        }
        for start in 0..=tokens.len() - n {
            let end = start + n - 1;
            if stop(start) || stop(end) {
                continue;
            }
            if !(start..=end).all(|i| pos_ok(i) && !num(i)) {
                continue;
            }
            let term = (start..=end)
                .map(|i| lm.term(tokens[i], config.normalize))
                .collect::<Vec<_>>()
                .join(" ");
            out.push(term);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusBuilder;
    use crate::text::NormalizerConfig;

    fn corpus(dir: &std::path::Path, files: &[(&str, &str)], lm: &LanguageModel) -> Corpus {
        let mut paths = Vec::new();
        for (name, text) in files {
            let p = dir.join(name);
            std::fs::write(&p, text).unwrap();
            paths.push(p);
        }
        CorpusBuilder::new(lm, NormalizerConfig::default(), Vec::<String>::new())
            .build_from_paths(&paths)
            .unwrap()
    }

    #[test]
    fn unigrams_and_bigrams_with_min_freq() {
        let dir = tempfile::tempdir().unwrap();
        let lm = LanguageModel::english();
        let c = corpus(
            dir.path(),
            &[
                ("nile_2007.txt", "Water conflict on the river. Water conflict grows."),
                ("indus_2008.txt", "Water treaty."),
            ],
            &lm,
        );
        let tc = tokenize_corpus(&c, &lm, &TermsConfig::default()).unwrap();
        let (terms, basins, years) = tc.unzip();
        assert_eq!(basins, vec!["nile", "indus"]);
        assert_eq!(years, vec!["2007", "2008"]);
        assert_eq!(terms.len(), 2);
        // water x3, conflict x2, "water conflict" x2 survive min_freq 2
        assert!(terms[0].contains(&"water conflict".to_string()));
        assert!(terms[0].contains(&"conflict".to_string()));
        assert!(!terms[0].iter().any(|t| t == "river" || t == "grows"));
        assert_eq!(terms[1], vec!["water".to_string()]);
    }

    #[test]
    fn pos_filter_applies_to_every_token() {
        let dir = tempfile::tempdir().unwrap();
        let lm = LanguageModel::english();
        let c = corpus(dir.path(), &[("nile_2007.txt", "dangerous river quickly flooding")], &lm);
        let config = TermsConfig {
            include_pos: Some([Pos::Noun, Pos::Adj].into_iter().collect()),
            min_freq: 1,
            normalize: TermNormalize::Text,
            ..Default::default()
        };
        let (terms, _, _) = tokenize_corpus(&c, &lm, &config).unwrap().unzip();
        assert_eq!(
            terms[0],
            vec!["dangerous".to_string(), "river".to_string(), "dangerous river".to_string()]
        );
    }

    #[test]
    fn ngram_range_lower_bound_skips_unigrams() {
        let dir = tempfile::tempdir().unwrap();
        let lm = LanguageModel::english();
        let c = corpus(dir.path(), &[("nile_2007.txt", "water basin")], &lm);
        let config = TermsConfig {
            ngrams: (2, 3),
            include_pos: None,
            min_freq: 1,
            ..Default::default()
        };
        let (terms, _, _) = tokenize_corpus(&c, &lm, &config).unwrap().unzip();
        assert_eq!(terms[0], vec!["water basin".to_string()]);
    }

    #[test]
    fn terms_are_stemmed_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let lm = LanguageModel::english();
        let c = corpus(dir.path(), &[("nile_2007.txt", "rivers flooding rivers flooding")], &lm);
        let (terms, _, _) = tokenize_corpus(&c, &lm, &TermsConfig::default()).unwrap().unzip();
        assert!(terms[0].contains(&"river".to_string()), "{:?}", terms[0]);
        assert!(terms[0].contains(&"flood".to_string()), "{:?}", terms[0]);
        assert!(!terms[0].contains(&"rivers".to_string()));
    }

    struct ShortTagger;

    impl crate::text::PosTagger for ShortTagger {
        fn tag(&self, tokens: &[&str]) -> Vec<Pos> {
            vec![Pos::Noun; tokens.len().saturating_sub(1)]
        }
    }

    #[test]
    fn tagger_with_missing_tags_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let english = LanguageModel::english();
        let c = corpus(dir.path(), &[("nile_2007.txt", "water river flood")], &english);
        let lm = LanguageModel::new(english.stopwords().clone(), Box::new(ShortTagger));
        assert!(matches!(
            tokenize_corpus(&c, &lm, &TermsConfig::default()),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn bad_ngram_range_is_rejected() {
        let lm = LanguageModel::english();
        let c = Corpus::new(NormalizerConfig::default());
        let config = TermsConfig { ngrams: (2, 1), ..Default::default() };
        assert!(matches!(
            tokenize_corpus(&c, &lm, &config),
            Err(PipelineError::Configuration(_))
        ));
    }
}
