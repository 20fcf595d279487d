use indexmap::IndexSet;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::utils::normalizer::non_negative;
use crate::utils::sort::{argmax, top_k_desc};
use crate::viz::{svg_open, xml_escape};

/// How the plotted terms are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankTerms {
    /// sum of the term's (clamped) weights over every topic
    #[default]
    TopicWeight,
    /// column sum of the group-term matrix
    CorpusWeight,
}

/// Order of the plotted terms, top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortTerms {
    /// grouped by dominant topic, heaviest first inside a topic
    #[default]
    Seriation,
    Weight,
    Index,
    Alphabetical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermiteOptions {
    pub n_terms: usize,
    pub rank_terms: RankTerms,
    pub sort_terms: SortTerms,
    /// topic columns drawn in color
    pub highlight_topics: Vec<usize>,
}

impl Default for TermiteOptions {
    fn default() -> Self {
        Self {
            n_terms: 25,
            rank_terms: RankTerms::TopicWeight,
            sort_terms: SortTerms::Seriation,
            highlight_topics: Vec::new(),
        }
    }
}

/// Selected terms and their per-topic weights, ready to draw
#[derive(Debug, Clone, PartialEq)]
pub struct TermiteData {
    pub topics: Vec<String>,
    pub terms: Vec<String>,
    /// (terms.len(), topics.len()), negatives clamped to zero
    pub weights: Array2<f64>,
}

impl TermiteData {
    /// `components` is (n_topics, n_terms) aligned with `vocabulary`.
    /// `corpus_weights` is only read for [`RankTerms::CorpusWeight`].
    pub fn from_components(
        components: &Array2<f64>,
        vocabulary: &IndexSet<String>,
        corpus_weights: Option<&[f64]>,
        opts: &TermiteOptions,
    ) -> Result<Self> {
        let (n_topics, n_vocab) = components.dim();
        if n_vocab != vocabulary.len() {
            return Err(PipelineError::Model(format!(
                "components have {n_vocab} terms, vocabulary has {}",
                vocabulary.len()
            )));
        }
        if opts.n_terms == 0 {
            return Err(PipelineError::config("termite plot needs n_terms >= 1"));
        }
        let clamped = components.mapv(non_negative);

        let scores: Vec<f64> = match opts.rank_terms {
            RankTerms::TopicWeight => clamped.columns().into_iter().map(|c| c.sum()).collect(),
            RankTerms::CorpusWeight => {
                let w = corpus_weights.ok_or_else(|| {
                    PipelineError::config("corpus weight ranking needs the group-term matrix column sums")
                })?;
                if w.len() != n_vocab {
                    return Err(PipelineError::Model(format!(
                        "corpus weights have {} terms, vocabulary has {n_vocab}",
                        w.len()
                    )));
                }
                w.to_vec()
            }
        };
        if opts.n_terms > n_vocab {
            debug!(requested = opts.n_terms, available = n_vocab, "termite plot uses every term");
        }
        let mut selected = top_k_desc(&scores, opts.n_terms);

        match opts.sort_terms {
            SortTerms::Weight => {}
            SortTerms::Index => selected.sort_unstable(),
            SortTerms::Alphabetical => {
                selected.sort_by(|&a, &b| vocabulary[a].cmp(&vocabulary[b]));
            }
            SortTerms::Seriation => {
                let key = |t: usize| {
                    let col: Vec<f64> = clamped.column(t).to_vec();
                    let topic = argmax(&col).unwrap_or(0);
                    (topic, col[topic])
                };
                selected.sort_by(|&a, &b| {
                    let (ta, wa) = key(a);
                    let (tb, wb) = key(b);
                    ta.cmp(&tb).then_with(|| wb.total_cmp(&wa)).then_with(|| a.cmp(&b))
                });
            }
        }

        let weights = Array2::from_shape_fn((selected.len(), n_topics), |(i, k)| clamped[[k, selected[i]]]);
        Ok(Self {
            topics: (0..n_topics).map(|k| format!("topic {k}")).collect(),
            terms: selected.iter().map(|&t| vocabulary[t].clone()).collect(),
            weights,
        })
    }

    /// Circles on a term x topic grid, area proportional to weight
    pub fn render(&self, highlight_topics: &[usize]) -> String {
        const CELL: f64 = 28.0;
        const LEFT: f64 = 130.0;
        const TOP: f64 = 80.0;
        const PALETTE: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

        let n_topics = self.topics.len();
        let width = LEFT + CELL * n_topics.max(1) as f64 + 20.0;
        let height = TOP + CELL * self.terms.len().max(1) as f64 + 20.0;
        let max = self.weights.iter().copied().fold(0.0f64, f64::max);
        let mut svg = svg_open(width, height);

        for (k, topic) in self.topics.iter().enumerate() {
            let x = LEFT + CELL * (k as f64 + 0.5);
            svg.push_str(&format!(
                "<text x=\"{x:.1}\" y=\"{y:.1}\" font-size=\"11\" transform=\"rotate(-45 {x:.1} {y:.1})\">{}</text>\n",
                xml_escape(topic),
                x = x,
                y = TOP - 10.0
            ));
            svg.push_str(&format!(
                "<line x1=\"{x:.1}\" y1=\"{:.1}\" x2=\"{x:.1}\" y2=\"{:.1}\" stroke=\"#dddddd\"/>\n",
                TOP,
                TOP + CELL * self.terms.len() as f64,
                x = x
            ));
        }

        for (i, term) in self.terms.iter().enumerate() {
            let y = TOP + CELL * (i as f64 + 0.5);
            svg.push_str(&format!(
                "<text x=\"{:.1}\" y=\"{:.1}\" font-size=\"11\" text-anchor=\"end\">{}</text>\n",
                LEFT - 8.0,
                y + 4.0,
                xml_escape(term)
            ));
            for k in 0..n_topics {
                let w = self.weights[[i, k]];
                if w <= 0.0 || max <= 0.0 {
                    continue;
                }
                let r = (CELL / 2.0 - 1.0) * (w / max).sqrt();
                let color = match highlight_topics.iter().position(|&h| h == k) {
                    Some(p) => PALETTE[p % PALETTE.len()],
                    None => "#999999",
                };
                svg.push_str(&format!(
                    "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{:.2}\" fill=\"{}\" fill-opacity=\"0.8\"/>\n",
                    LEFT + CELL * (k as f64 + 0.5),
                    y,
                    r,
                    color
                ));
            }
        }
        svg.push_str("</svg>\n");
        svg
    }
}

/// Select terms and render the termite plot in one step
pub fn termite_plot(
    components: &Array2<f64>,
    vocabulary: &IndexSet<String>,
    corpus_weights: Option<&[f64]>,
    opts: &TermiteOptions,
) -> Result<String> {
    let data = TermiteData::from_components(components, vocabulary, corpus_weights, opts)?;
    Ok(data.render(&opts.highlight_topics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn vocab() -> IndexSet<String> {
        ["conflict", "dam", "river", "treaty", "water"].iter().map(|s| s.to_string()).collect()
    }

    fn components() -> Array2<f64> {
        // topic 0: dam, water. topic 1: treaty, conflict
        array![[0.0, 0.9, 0.1, 0.0, 0.5], [0.4, 0.0, 0.05, 0.8, -0.3]]
    }

    #[test]
    fn topic_weight_keeps_heaviest_terms() {
        let opts = TermiteOptions { n_terms: 3, sort_terms: SortTerms::Weight, ..Default::default() };
        let data = TermiteData::from_components(&components(), &vocab(), None, &opts).unwrap();
        assert_eq!(data.terms, vec!["dam", "treaty", "water"]);
        assert_eq!(data.weights.dim(), (3, 2));
    }

    #[test]
    fn negative_weights_are_clamped() {
        let opts = TermiteOptions { n_terms: 5, sort_terms: SortTerms::Index, ..Default::default() };
        let data = TermiteData::from_components(&components(), &vocab(), None, &opts).unwrap();
        assert_eq!(data.terms[4], "water");
        assert_eq!(data.weights[[4, 1]], 0.0);
        assert!(data.weights.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn seriation_groups_by_dominant_topic() {
        let opts = TermiteOptions { n_terms: 4, ..Default::default() };
        let data = TermiteData::from_components(&components(), &vocab(), None, &opts).unwrap();
        assert_eq!(data.terms, vec!["dam", "water", "treaty", "conflict"]);
    }

    #[test]
    fn corpus_weight_uses_column_sums() {
        let opts = TermiteOptions {
            n_terms: 2,
            rank_terms: RankTerms::CorpusWeight,
            sort_terms: SortTerms::Alphabetical,
            ..Default::default()
        };
        let sums = [1.0, 0.0, 5.0, 0.0, 3.0];
        let data = TermiteData::from_components(&components(), &vocab(), Some(&sums), &opts).unwrap();
        assert_eq!(data.terms, vec!["river", "water"]);
        assert!(TermiteData::from_components(&components(), &vocab(), None, &opts).is_err());
    }

    #[test]
    fn render_draws_circle_per_positive_cell() {
        let opts = TermiteOptions { n_terms: 5, highlight_topics: vec![1], ..Default::default() };
        let svg = termite_plot(&components(), &vocab(), None, &opts).unwrap();
        assert_eq!(svg.matches("<circle").count(), 6);
        assert!(svg.contains("#1f77b4"));
        assert!(svg.contains(">treaty</text>"));
    }

    #[test]
    fn vocabulary_mismatch_is_an_error() {
        let small: IndexSet<String> = ["a".to_string()].into_iter().collect();
        assert!(matches!(
            termite_plot(&components(), &small, None, &TermiteOptions::default()),
            Err(PipelineError::Model(_))
        ));
    }
}
