use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::topics::{check_input, not_fitted, TopicModel};

/// Latent Dirichlet allocation fitted with batch variational Bayes.
///
/// Matrix values are used as (possibly fractional) pseudo-counts.
/// Priors default to `1 / n_topics` for both document-topic and topic-word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lda {
    pub n_topics: usize,
    pub max_iter: usize,
    pub max_doc_iter: usize,
    pub doc_tol: f64,
    pub seed: u64,
    /// document-topic prior
    pub alpha: Option<f64>,
    /// topic-word prior
    pub eta: Option<f64>,
    /// variational topic-word parameters, (n_topics, n_terms)
    components: Option<Array2<f64>>,
}

impl Lda {
    pub fn new(n_topics: usize, seed: u64) -> Self {
        Self {
            n_topics,
            max_iter: 10,
            max_doc_iter: 100,
            doc_tol: 1e-3,
            seed,
            alpha: None,
            eta: None,
            components: None,
        }
    }

    fn alpha(&self) -> f64 {
        self.alpha.unwrap_or(1.0 / self.n_topics as f64)
    }

    fn eta(&self) -> f64 {
        self.eta.unwrap_or(1.0 / self.n_topics as f64)
    }

    /// E-step for every row of `x`.
    /// Returns gamma (n_docs, n_topics) and the sufficient statistics (n_topics, n_terms).
    fn e_step(&self, x: &Array2<f64>, exp_elog_beta: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
        let k = self.n_topics;
        let alpha = self.alpha();
        let mut gamma = Array2::<f64>::ones((x.nrows(), k));
        let mut sstats = Array2::<f64>::zeros(exp_elog_beta.dim());

        for (d, row) in x.axis_iter(Axis(0)).enumerate() {
            let (ids, cts): (Vec<usize>, Vec<f64>) = row
                .iter()
                .enumerate()
                .filter(|&(_, &c)| c > 0.0)
                .map(|(i, &c)| (i, c))
                .unzip();
            if ids.is_empty() {
                gamma.row_mut(d).fill(alpha);
                continue;
            }
            let beta_d = exp_elog_beta.select(Axis(1), &ids);
            let cts = Array1::from(cts);

            let mut gamma_d = Array1::<f64>::ones(k);
            let mut exp_elog_theta = dirichlet_expectation_1d(gamma_d.view()).mapv(f64::exp);
            let mut phinorm = exp_elog_theta.dot(&beta_d) + 1e-100;
            for _ in 0..self.max_doc_iter {
                let last = gamma_d.clone();
                let ratio = &cts / &phinorm;
                gamma_d = &exp_elog_theta * &beta_d.dot(&ratio) + alpha;
                exp_elog_theta = dirichlet_expectation_1d(gamma_d.view()).mapv(f64::exp);
                phinorm = exp_elog_theta.dot(&beta_d) + 1e-100;
                let change = (&gamma_d - &last).mapv(f64::abs).mean().unwrap_or(0.0);
                if change < self.doc_tol {
                    break;
                }
            }
            gamma.row_mut(d).assign(&gamma_d);

            let ratio = &cts / &phinorm;
            for t in 0..k {
                for (pos, &term) in ids.iter().enumerate() {
                    sstats[[t, term]] += exp_elog_theta[t] * ratio[pos];
                }
            }
        }
        (gamma, sstats)
    }
}

impl TopicModel for Lda {
    fn n_topics(&self) -> usize {
        self.n_topics
    }

    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        check_input(x, self.n_topics)?;
        if x.iter().any(|&v| v < 0.0) {
            return Err(PipelineError::Model("LDA input must be non-negative".to_string()));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        // gamma(100, 1/100)-like start, mean 1 with small spread
        let mut lambda = Array2::from_shape_fn((self.n_topics, x.ncols()), |_| rng.gen_range(0.9..1.1));
        let eta = self.eta();

        for iter in 0..self.max_iter {
            let exp_elog_beta = dirichlet_expectation_2d(&lambda).mapv(f64::exp);
            let (_, sstats) = self.e_step(x, &exp_elog_beta);
            lambda = &sstats * &exp_elog_beta + eta;
            debug!(iter, "lda em iteration");
        }
        self.components = Some(lambda);
        Ok(())
    }

    /// normalized document-topic distribution, rows sum to 1
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let lambda = self.components.as_ref().ok_or_else(|| not_fitted("LDA"))?;
        if x.ncols() != lambda.ncols() {
            return Err(PipelineError::Model(format!(
                "matrix has {} terms, model was fitted on {}",
                x.ncols(),
                lambda.ncols()
            )));
        }
        if x.iter().any(|&v| v < 0.0) {
            return Err(PipelineError::Model("LDA input must be non-negative".to_string()));
        }
        let exp_elog_beta = dirichlet_expectation_2d(lambda).mapv(f64::exp);
        let (mut gamma, _) = self.e_step(x, &exp_elog_beta);
        for mut row in gamma.axis_iter_mut(Axis(0)) {
            let s = row.sum();
            if s > 0.0 {
                row.mapv_inplace(|v| v / s);
            }
        }
        Ok(gamma)
    }

    fn components(&self) -> Option<&Array2<f64>> {
        self.components.as_ref()
    }
}

/// E[log theta] for theta ~ Dir(alpha)
fn dirichlet_expectation_1d(alpha: ArrayView1<f64>) -> Array1<f64> {
    let total = digamma(alpha.sum());
    alpha.mapv(|a| digamma(a) - total)
}

/// row-wise [`dirichlet_expectation_1d`]
fn dirichlet_expectation_2d(alpha: &Array2<f64>) -> Array2<f64> {
    let mut out = Array2::zeros(alpha.dim());
    for (i, row) in alpha.axis_iter(Axis(0)).enumerate() {
        out.row_mut(i).assign(&dirichlet_expectation_1d(row));
    }
    out
}

/// Digamma via recurrence up to x >= 6 and the asymptotic series
pub(crate) fn digamma(mut x: f64) -> f64 {
    if x <= 0.0 {
        return f64::NEG_INFINITY;
    }
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    result + x.ln() - 0.5 * inv
        - inv2 * (1.0 / 12.0 - inv2 * (1.0 / 120.0 - inv2 * (1.0 / 252.0 - inv2 * (1.0 / 240.0 - inv2 / 132.0))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn digamma_known_values() {
        // psi(1) = -euler gamma, psi(0.5) = -gamma - 2 ln 2
        let euler = 0.577_215_664_901_532_9;
        assert!((digamma(1.0) + euler).abs() < 1e-10);
        assert!((digamma(0.5) + euler + 2.0 * 2f64.ln()).abs() < 1e-10);
        assert!((digamma(10.0) - 2.251_752_589_066_721).abs() < 1e-10);
    }

    #[test]
    fn topics_separate_block_structure() {
        let x = array![
            [8.0, 6.0, 0.0, 0.0],
            [7.0, 9.0, 0.0, 0.0],
            [0.0, 0.0, 6.0, 8.0],
            [0.0, 0.0, 9.0, 7.0]
        ];
        let mut lda = Lda::new(2, 5);
        lda.max_iter = 50;
        lda.fit(&x).unwrap();
        let theta = lda.transform(&x).unwrap();
        assert_eq!(theta.dim(), (4, 2));
        for row in theta.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        // the two halves load on different topics
        let top = |r: usize| if theta[[r, 0]] > theta[[r, 1]] { 0 } else { 1 };
        assert_eq!(top(0), top(1));
        assert_eq!(top(2), top(3));
        assert_ne!(top(0), top(2));
    }

    #[test]
    fn empty_rows_get_uniform_topics() {
        let x = array![[0.0, 0.0], [1.0, 2.0]];
        let mut lda = Lda::new(2, 0);
        lda.fit(&x).unwrap();
        let theta = lda.transform(&x).unwrap();
        assert!((theta[[0, 0]] - 0.5).abs() < 1e-12);
    }
}
