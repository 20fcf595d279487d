use ndarray::{Array1, Array2, Axis};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::topics::{check_input, not_fitted, TopicModel};

/// Latent semantic analysis: truncated SVD `X ~ U S V^T`.
///
/// The small Gram matrix `X X^T` (groups x groups) is decomposed by power
/// iteration with deflation, then `V = X^T U / s`. Components are the rows
/// of `V^T`, signs flipped so the largest absolute weight of each row is
/// positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lsa {
    pub n_topics: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
    /// V^T, (n_topics, n_terms)
    components: Option<Array2<f64>>,
    pub singular_values: Option<Vec<f64>>,
}

impl Lsa {
    pub fn new(n_topics: usize, seed: u64) -> Self {
        Self {
            n_topics,
            max_iter: 1000,
            tol: 1e-10,
            seed,
            components: None,
            singular_values: None,
        }
    }

    /// dominant eigenpair of a symmetric positive semi-definite matrix,
    /// kept orthogonal to `found`
    fn power_iteration(&self, g: &Array2<f64>, found: &[Array1<f64>], rng: &mut StdRng) -> (f64, Array1<f64>) {
        let n = g.nrows();
        let mut v = Array1::from_shape_fn(n, |_| rng.gen_range(-1.0..1.0));
        orthonormalize(&mut v, found);
        let mut lambda = 0.0;
        for _ in 0..self.max_iter {
            let mut next = g.dot(&v);
            orthonormalize(&mut next, found);
            let next_lambda = next.dot(&g.dot(&next));
            let delta = (&next - &v).mapv(f64::abs).sum();
            v = next;
            let done = (next_lambda - lambda).abs() <= self.tol * next_lambda.abs().max(1.0) && delta < 1e-9;
            lambda = next_lambda;
            if done {
                break;
            }
        }
        (lambda.max(0.0), v)
    }
}

/// remove projections on `basis`, then scale to unit length (left as zero if degenerate)
fn orthonormalize(v: &mut Array1<f64>, basis: &[Array1<f64>]) {
    for b in basis {
        let p = v.dot(b);
        v.scaled_add(-p, b);
    }
    let len = v.dot(v).sqrt();
    if len > 1e-300 {
        v.mapv_inplace(|x| x / len);
    } else {
        v.fill(0.0);
    }
}

impl TopicModel for Lsa {
    fn n_topics(&self) -> usize {
        self.n_topics
    }

    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        check_input(x, self.n_topics)?;
        let rank_bound = x.nrows().min(x.ncols());
        if self.n_topics > rank_bound {
            return Err(PipelineError::Model(format!(
                "LSA needs n_topics <= min(n_groups, n_terms) = {rank_bound}, got {}",
                self.n_topics
            )));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut gram = x.dot(&x.t());
        let mut us: Vec<Array1<f64>> = Vec::with_capacity(self.n_topics);
        let mut sigmas = Vec::with_capacity(self.n_topics);
        let mut components = Array2::zeros((self.n_topics, x.ncols()));

        for k in 0..self.n_topics {
            let (lambda, u) = self.power_iteration(&gram, &us, &mut rng);
            let sigma = lambda.sqrt();
            let mut v = x.t().dot(&u);
            if sigma > 1e-12 {
                v.mapv_inplace(|a| a / sigma);
            } else {
                v.fill(0.0);
            }
            // deterministic sign
            let pivot = v.iter().copied().fold(0.0f64, |m, a| if a.abs() > m.abs() { a } else { m });
            if pivot < 0.0 {
                v.mapv_inplace(|a| -a);
            }
            components.row_mut(k).assign(&v);

            // deflate
            for i in 0..gram.nrows() {
                for j in 0..gram.ncols() {
                    gram[[i, j]] -= lambda * u[i] * u[j];
                }
            }
            sigmas.push(sigma);
            us.push(u);
        }
        self.singular_values = Some(sigmas);
        self.components = Some(components);
        Ok(())
    }

    /// `X V`, the projection of each group on the topics
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let vt = self.components.as_ref().ok_or_else(|| not_fitted("LSA"))?;
        if x.ncols() != vt.len_of(Axis(1)) {
            return Err(PipelineError::Model(format!(
                "matrix has {} terms, model was fitted on {}",
                x.ncols(),
                vt.ncols()
            )));
        }
        Ok(x.dot(&vt.t()))
    }

    fn components(&self) -> Option<&Array2<f64>> {
        self.components.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn recovers_singular_values_of_diagonal() {
        let x = array![[3.0, 0.0, 0.0], [0.0, 2.0, 0.0]];
        let mut lsa = Lsa::new(2, 1);
        lsa.fit(&x).unwrap();
        let s = lsa.singular_values.clone().unwrap();
        assert!((s[0] - 3.0).abs() < 1e-6);
        assert!((s[1] - 2.0).abs() < 1e-6);
        let vt = lsa.components().unwrap();
        assert!((vt[[0, 0]] - 1.0).abs() < 1e-6);
        assert!((vt[[1, 1]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn components_are_orthonormal() {
        let x = array![[1.0, 2.0, 0.0, 1.0], [0.0, 1.0, 3.0, 1.0], [2.0, 0.0, 1.0, 0.5]];
        let mut lsa = Lsa::new(3, 9);
        lsa.fit(&x).unwrap();
        let vt = lsa.components().unwrap();
        let gram = vt.dot(&vt.t());
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[[i, j]] - expected).abs() < 1e-6, "({i},{j}) = {}", gram[[i, j]]);
            }
        }
        assert_eq!(lsa.transform(&x).unwrap().dim(), (3, 3));
    }

    #[test]
    fn too_many_topics_for_rank_bound() {
        let x = array![[1.0, 2.0, 3.0], [3.0, 2.0, 1.0]];
        assert!(matches!(Lsa::new(3, 0).fit(&x), Err(PipelineError::Model(_))));
    }
}
