use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::topics::{check_input, not_fitted, TopicModel};

const EPS: f64 = 1e-10;

/// Non-negative matrix factorization `X ~ W H` with multiplicative
/// updates on the Frobenius loss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nmf {
    pub n_topics: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
    /// H, (n_topics, n_terms)
    components: Option<Array2<f64>>,
    /// final reconstruction error of fit
    pub reconstruction_err: Option<f64>,
}

impl Nmf {
    pub fn new(n_topics: usize, seed: u64) -> Self {
        Self {
            n_topics,
            max_iter: 200,
            tol: 1e-4,
            seed,
            components: None,
            reconstruction_err: None,
        }
    }

    fn check_non_negative(x: &Array2<f64>) -> Result<()> {
        if x.iter().any(|&v| v < 0.0) {
            return Err(PipelineError::Model("NMF input must be non-negative".to_string()));
        }
        Ok(())
    }

    /// random start scaled like sqrt(mean(X) / k)
    fn init(rng: &mut StdRng, shape: (usize, usize), x: &Array2<f64>, k: usize) -> Array2<f64> {
        let scale = (x.mean().unwrap_or(0.0).max(EPS) / k as f64).sqrt();
        Array2::from_shape_fn(shape, |_| scale * rng.gen_range(0.01..1.0))
    }

    fn update_w(x: &Array2<f64>, w: &mut Array2<f64>, h: &Array2<f64>) {
        let numer = x.dot(&h.t());
        let denom = w.dot(&h.dot(&h.t()));
        w.zip_mut_with(&numer, |wv, &n| *wv *= n);
        w.zip_mut_with(&denom, |wv, &d| *wv /= d + EPS);
    }

    fn update_h(x: &Array2<f64>, w: &Array2<f64>, h: &mut Array2<f64>) {
        let numer = w.t().dot(x);
        let denom = w.t().dot(w).dot(&*h);
        h.zip_mut_with(&numer, |hv, &n| *hv *= n);
        h.zip_mut_with(&denom, |hv, &d| *hv /= d + EPS);
    }

    fn error(x: &Array2<f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
        let diff = x - &w.dot(h);
        diff.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

impl TopicModel for Nmf {
    fn n_topics(&self) -> usize {
        self.n_topics
    }

    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        check_input(x, self.n_topics)?;
        Self::check_non_negative(x)?;
        let k = self.n_topics;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut w = Self::init(&mut rng, (x.nrows(), k), x, k);
        let mut h = Self::init(&mut rng, (k, x.ncols()), x, k);

        let initial = Self::error(x, &w, &h);
        let mut previous = initial;
        for iter in 0..self.max_iter {
            Self::update_h(x, &w, &mut h);
            Self::update_w(x, &mut w, &h);
            if iter % 10 == 9 {
                let err = Self::error(x, &w, &h);
                if initial > 0.0 && (previous - err) / initial < self.tol {
                    debug!(iter, err, "nmf converged");
                    break;
                }
                previous = err;
            }
        }
        self.reconstruction_err = Some(Self::error(x, &w, &h));
        self.components = Some(h);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let h = self.components.as_ref().ok_or_else(|| not_fitted("NMF"))?;
        check_input(x, self.n_topics)?;
        Self::check_non_negative(x)?;
        if x.ncols() != h.ncols() {
            return Err(PipelineError::Model(format!(
                "matrix has {} terms, model was fitted on {}",
                x.ncols(),
                h.ncols()
            )));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut w = Self::init(&mut rng, (x.nrows(), self.n_topics), x, self.n_topics);
        for _ in 0..self.max_iter {
            Self::update_w(x, &mut w, h);
        }
        Ok(w)
    }

    fn components(&self) -> Option<&Array2<f64>> {
        self.components.as_ref()
    }
}
