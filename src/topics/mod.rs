//! Topic models over a group-term matrix and the permutation sweep

pub mod lda;
pub mod lsa;
pub mod nmf;
pub mod sweep;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::utils::io::{read_compressed, write_compressed};

pub use lda::Lda;
pub use lsa::Lsa;
pub use nmf::Nmf;
pub use sweep::{SweepFailure, SweepItem, SweepOptions, SweepPlan, SweepReport, TopicModelResult, TopicModelSweep};

/// Decomposition behind a topic model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Nmf,
    Lsa,
    Lda,
}

impl ModelType {
    pub const ALL: [ModelType; 3] = [ModelType::Nmf, ModelType::Lsa, ModelType::Lda];

    /// Unfitted model with `n_topics` components
    pub fn build(self, n_topics: usize, seed: u64) -> FittedTopicModel {
        match self {
            ModelType::Nmf => FittedTopicModel::Nmf(Nmf::new(n_topics, seed)),
            ModelType::Lsa => FittedTopicModel::Lsa(Lsa::new(n_topics, seed)),
            ModelType::Lda => FittedTopicModel::Lda(Lda::new(n_topics, seed)),
        }
    }

    pub fn as_upper(&self) -> &'static str {
        match self {
            ModelType::Nmf => "NMF",
            ModelType::Lsa => "LSA",
            ModelType::Lda => "LDA",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelType::Nmf => "nmf",
            ModelType::Lsa => "lsa",
            ModelType::Lda => "lda",
        })
    }
}

impl FromStr for ModelType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nmf" => Ok(ModelType::Nmf),
            "lsa" => Ok(ModelType::Lsa),
            "lda" => Ok(ModelType::Lda),
            other => Err(PipelineError::config(format!("unknown topic model type '{other}'"))),
        }
    }
}

/// Common interface of the decompositions.
/// `x` is (n_groups, n_terms), components are (n_topics, n_terms).
pub trait TopicModel {
    fn n_topics(&self) -> usize;
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;
    /// group-topic matrix (n_groups, n_topics)
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;
    /// topic-term weights, `None` before fit
    fn components(&self) -> Option<&Array2<f64>>;
}

/// Any of the supported models, serializable as one artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedTopicModel {
    Nmf(Nmf),
    Lsa(Lsa),
    Lda(Lda),
}

impl FittedTopicModel {
    pub fn model_type(&self) -> ModelType {
        match self {
            FittedTopicModel::Nmf(_) => ModelType::Nmf,
            FittedTopicModel::Lsa(_) => ModelType::Lsa,
            FittedTopicModel::Lda(_) => ModelType::Lda,
        }
    }

    fn inner(&self) -> &dyn TopicModel {
        match self {
            FittedTopicModel::Nmf(m) => m,
            FittedTopicModel::Lsa(m) => m,
            FittedTopicModel::Lda(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn TopicModel {
        match self {
            FittedTopicModel::Nmf(m) => m,
            FittedTopicModel::Lsa(m) => m,
            FittedTopicModel::Lda(m) => m,
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_compressed(self, path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        read_compressed(path)
    }
}

impl TopicModel for FittedTopicModel {
    fn n_topics(&self) -> usize {
        self.inner().n_topics()
    }

    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.inner_mut().fit(x)
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.inner().transform(x)
    }

    fn components(&self) -> Option<&Array2<f64>> {
        self.inner().components()
    }
}

/// Shared argument checks for every decomposition
pub(crate) fn check_input(x: &Array2<f64>, n_topics: usize) -> Result<()> {
    if n_topics == 0 {
        return Err(PipelineError::Model("n_topics must be at least 1".to_string()));
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(PipelineError::Model(format!("empty input matrix {:?}", x.dim())));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(PipelineError::Model("input matrix contains non-finite values".to_string()));
    }
    Ok(())
}

pub(crate) fn not_fitted(model: &str) -> PipelineError {
    PipelineError::Model(format!("{model} model is not fitted"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn model_type_names() {
        assert_eq!("NMF".parse::<ModelType>().unwrap(), ModelType::Nmf);
        assert_eq!(ModelType::Lda.to_string(), "lda");
        assert_eq!(ModelType::Lsa.as_upper(), "LSA");
        assert!("pca".parse::<ModelType>().is_err());
    }

    #[test]
    fn every_model_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let x = array![[1.0, 0.0, 2.0], [0.0, 3.0, 1.0], [2.0, 1.0, 0.0]];
        for ty in ModelType::ALL {
            let mut model = ty.build(2, 7);
            model.fit(&x).unwrap();
            let path = dir.path().join(format!("{ty}.cbor.gz"));
            model.save(&path).unwrap();
            let back = FittedTopicModel::load(&path).unwrap();
            assert_eq!(back.model_type(), ty);
            assert_eq!(back.components(), model.components());
            assert_eq!(back.transform(&x).unwrap().dim(), (3, 2));
        }
    }

    #[test]
    fn zero_topics_and_empty_input_fail() {
        let x = array![[1.0, 2.0]];
        for ty in ModelType::ALL {
            assert!(matches!(ty.build(0, 0).fit(&x), Err(PipelineError::Model(_))));
            assert!(matches!(
                ty.build(1, 0).fit(&Array2::zeros((0, 3))),
                Err(PipelineError::Model(_))
            ));
        }
    }
}
