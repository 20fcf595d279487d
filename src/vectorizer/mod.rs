pub mod doc_freq;
pub mod matrix;
pub mod serde;
pub mod tfidf;
pub mod token;

use std::marker::PhantomData;

use ::serde::{Deserialize, Serialize};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::utils::normalizer::{Norm, RowNormalizer};
use crate::vectorizer::{
    doc_freq::DocFrequency,
    matrix::GroupTermMatrix,
    tfidf::{DefaultWeightingEngine, DlType, IdfType, TfType, WeightingEngine},
    token::TermFrequency,
};

/// Document frequency cutoff, counted in groups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DocFreq {
    /// share of groups, resolved as floor(f * n_groups)
    Fraction(f64),
    /// absolute number of groups
    Count(usize),
}

impl DocFreq {
    fn resolve(self, n_groups: usize) -> Result<usize> {
        match self {
            DocFreq::Fraction(f) if (0.0..=1.0).contains(&f) => Ok((f * n_groups as f64).floor() as usize),
            DocFreq::Fraction(f) => Err(PipelineError::config(format!(
                "document frequency fraction {f} is outside [0, 1]"
            ))),
            DocFreq::Count(c) => Ok(c),
        }
    }
}

/// Group vectorizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    pub tf_type: TfType,
    pub apply_idf: bool,
    pub idf_type: IdfType,
    /// divide each row by a function of the group length (vocabulary terms only)
    pub apply_dl: bool,
    pub dl_type: DlType,
    pub norm: Option<Norm>,
    pub min_df: DocFreq,
    pub max_df: DocFreq,
    pub max_n_terms: Option<usize>,
    /// fixed term vocabulary, disables df filtering
    pub vocabulary_terms: Option<Vec<String>>,
    /// fixed group vocabulary
    pub vocabulary_grps: Option<Vec<String>>,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            tf_type: TfType::Linear,
            apply_idf: true,
            idf_type: IdfType::Standard,
            apply_dl: false,
            dl_type: DlType::Linear,
            norm: Some(Norm::L2),
            min_df: DocFreq::Fraction(0.3),
            max_df: DocFreq::Fraction(0.95),
            max_n_terms: None,
            vocabulary_terms: None,
            vocabulary_grps: None,
        }
    }
}

/// Group vectorizer
///
/// All documents sharing a group key are summed into one row before
/// weighting, so the output is a group-term matrix and document frequency
/// means "number of groups containing the term".
///
/// `E` is the weighting engine, [`DefaultWeightingEngine`] computes the
/// schemes named in [`VectorizerConfig`].
#[derive(Debug, Clone)]
pub struct GroupVectorizer<E = DefaultWeightingEngine>
where
    E: WeightingEngine,
{
    pub(crate) config: VectorizerConfig,
    /// column index
    pub(crate) terms: IndexSet<String>,
    /// row index
    pub(crate) groups: IndexSet<String>,
    /// per column, 1.0 when idf is off
    pub(crate) idf: Vec<f64>,
    pub(crate) fitted: bool,
    pub(crate) _marker: PhantomData<E>,
}

impl<E> GroupVectorizer<E>
where
    E: WeightingEngine,
{
    pub fn new(config: VectorizerConfig) -> Self {
        Self {
            config,
            terms: IndexSet::new(),
            groups: IndexSet::new(),
            idf: Vec::new(),
            fitted: false,
            _marker: PhantomData,
        }
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Terms in column order
    pub fn terms(&self) -> &IndexSet<String> {
        &self.terms
    }

    /// Groups in row order
    pub fn groups(&self) -> &IndexSet<String> {
        &self.groups
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.terms.get_index_of(term)
    }

    pub fn group_index(&self, group: &str) -> Option<usize> {
        self.groups.get_index_of(group)
    }

    pub fn id_to_term(&self, id: usize) -> Option<&str> {
        self.terms.get_index(id).map(String::as_str)
    }

    /// Learn groups, vocabulary and idf
    pub fn fit<T>(&mut self, terms_per_doc: &[Vec<T>], group_per_doc: &[String]) -> Result<&mut Self>
    where
        T: AsRef<str>,
    {
        let counts = self.group_counts(terms_per_doc, group_per_doc, None)?;

        let mut df = DocFrequency::new();
        let mut totals = TermFrequency::new();
        for freq in counts.values() {
            df.add_set(freq.iter().map(|(t, _)| t));
            totals.merge(freq);
        }
        let n_groups = counts.len();

        let terms: IndexSet<String> = match &self.config.vocabulary_terms {
            Some(vocab) => vocab.iter().cloned().collect(),
            None => {
                let min_df = self.config.min_df.resolve(n_groups)?;
                let max_df = self.config.max_df.resolve(n_groups)?;
                if min_df > max_df {
                    return Err(PipelineError::config(format!(
                        "min_df ({min_df}) resolves above max_df ({max_df}) for {n_groups} groups"
                    )));
                }
                let pruned = totals.remove_terms_by_condition(|t, _| {
                    let d = df.term_doc_count(t) as usize;
                    d < min_df || d > max_df
                });
                debug!(pruned, min_df, max_df, "occurrences outside the document frequency bounds");
                let mut kept: Vec<String> = totals
                    .sorted_frequency_vector()
                    .into_iter()
                    .map(|(t, _)| t)
                    .collect();
                if let Some(limit) = self.config.max_n_terms {
                    kept.truncate(limit);
                }
                kept.sort();
                if kept.is_empty() {
                    return Err(PipelineError::EmptyVocabulary { min_df, max_df });
                }
                kept.into_iter().collect()
            }
        };
        if terms.is_empty() {
            return Err(PipelineError::EmptyVocabulary { min_df: 0, max_df: 0 });
        }

        self.idf = if self.config.apply_idf {
            E::idf_vec(&self.config, &df, &terms)
        } else {
            vec![1.0; terms.len()]
        };
        self.groups = counts.into_keys().collect();
        self.terms = terms;
        self.fitted = true;
        info!(n_groups = self.groups.len(), n_terms = self.terms.len(), "group vectorizer fitted");
        Ok(self)
    }

    /// Weight grouped counts into a group-term matrix.
    /// Groups outside the fitted vocabulary are skipped.
    pub fn transform<T>(&self, terms_per_doc: &[Vec<T>], group_per_doc: &[String]) -> Result<GroupTermMatrix>
    where
        T: AsRef<str>,
    {
        if !self.fitted {
            return Err(PipelineError::config("transform called on an unfitted vectorizer"));
        }
        let counts = self.group_counts(terms_per_doc, group_per_doc, Some(&self.groups))?;
        let rows: Vec<Vec<(usize, f64)>> = self
            .groups
            .iter()
            .map(|group| match counts.get(group) {
                Some(freq) => self.weight_row(freq),
                None => Vec::new(),
            })
            .collect();
        let matrix = GroupTermMatrix::from_rows(&rows, self.terms.len());
        debug!(shape = ?matrix.shape(), nnz = matrix.nnz(), "group-term matrix built");
        Ok(matrix)
    }

    pub fn fit_transform<T>(&mut self, terms_per_doc: &[Vec<T>], group_per_doc: &[String]) -> Result<GroupTermMatrix>
    where
        T: AsRef<str>,
    {
        self.fit(terms_per_doc, group_per_doc)?;
        self.transform(terms_per_doc, group_per_doc)
    }

    fn weight_row(&self, freq: &TermFrequency) -> Vec<(usize, f64)> {
        let mut row = E::tf_vec(&self.config, freq, &self.terms);
        for (col, v) in row.iter_mut() {
            *v *= self.idf[*col];
        }
        if let Some(norm) = self.config.norm {
            let mut values: Vec<f64> = row.iter().map(|&(_, v)| v).collect();
            values.normalize_with(norm);
            for ((_, v), n) in row.iter_mut().zip(values) {
                *v = n;
            }
        }
        row.retain(|&(_, v)| v != 0.0);
        row
    }

    /// Term counts per group, groups in sorted order (or the fixed group
    /// vocabulary order when one is set)
    fn group_counts<T>(
        &self,
        terms_per_doc: &[Vec<T>],
        group_per_doc: &[String],
        known: Option<&IndexSet<String>>,
    ) -> Result<IndexMap<String, TermFrequency>>
    where
        T: AsRef<str>,
    {
        if terms_per_doc.len() != group_per_doc.len() {
            return Err(PipelineError::config(format!(
                "{} term lists but {} group keys",
                terms_per_doc.len(),
                group_per_doc.len()
            )));
        }
        let fixed: Option<IndexSet<String>> = match known {
            Some(k) => Some(k.clone()),
            None => self
                .config
                .vocabulary_grps
                .as_ref()
                .map(|v| v.iter().cloned().collect()),
        };

        let mut counts: IndexMap<String, TermFrequency> = IndexMap::new();
        if let Some(fixed) = &fixed {
            for g in fixed {
                counts.insert(g.clone(), TermFrequency::new());
            }
        }
        for (terms, group) in terms_per_doc.iter().zip(group_per_doc) {
            if let Some(fixed) = &fixed {
                if !fixed.contains(group) {
                    continue;
                }
            }
            counts.entry(group.clone()).or_default().add_terms(terms);
        }
        if fixed.is_none() {
            counts.sort_keys();
        }
        Ok(counts)
    }
}
