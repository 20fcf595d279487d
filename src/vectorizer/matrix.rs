use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::error::{PipelineError, Result};
use crate::utils::io::{read_compressed, write_compressed};
use crate::vectorizer::{GroupVectorizer, WeightingEngine};

/// Sparse group-term matrix, rows = groups, columns = terms,
/// both in the fitted vectorizer's vocabulary order
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTermMatrix {
    matrix: CsMat<f64>,
}

/// on-disk layout: COO triples plus shape
#[derive(Debug, Serialize, Deserialize)]
struct SparseTriples {
    shape: (usize, usize),
    row: Vec<usize>,
    col: Vec<usize>,
    data: Vec<f64>,
}

impl GroupTermMatrix {
    /// Build from sparse rows of `(column, value)`
    pub fn from_rows(rows: &[Vec<(usize, f64)>], n_cols: usize) -> Self {
        let mut tri = TriMat::new((rows.len(), n_cols));
        for (i, row) in rows.iter().enumerate() {
            for &(j, v) in row {
                if v != 0.0 {
                    tri.add_triplet(i, j, v);
                }
            }
        }
        Self { matrix: tri.to_csr() }
    }

    pub fn from_dense(dense: &Array2<f64>) -> Self {
        let rows: Vec<Vec<(usize, f64)>> = dense
            .rows()
            .into_iter()
            .map(|r| r.iter().copied().enumerate().filter(|&(_, v)| v != 0.0).collect())
            .collect();
        Self::from_rows(&rows, dense.ncols())
    }

    pub fn csr(&self) -> &CsMat<f64> {
        &self.matrix
    }

    /// (n_groups, n_terms)
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Value at (row, col), zero when not stored
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.matrix.get(row, col).copied().unwrap_or(0.0)
    }

    /// Look up a value by group and term name.
    /// `None` when either name is outside the vectorizer's vocabulary.
    pub fn get<E: WeightingEngine>(&self, vectorizer: &GroupVectorizer<E>, group: &str, term: &str) -> Option<f64> {
        let row = vectorizer.group_index(group)?;
        let col = vectorizer.term_index(term)?;
        if row >= self.matrix.rows() || col >= self.matrix.cols() {
            return None;
        }
        Some(self.value(row, col))
    }

    pub fn row_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.matrix.rows()];
        for (&v, (i, _)) in self.matrix.iter() {
            sums[i] += v;
        }
        sums
    }

    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.matrix.cols()];
        for (&v, (_, j)) in self.matrix.iter() {
            sums[j] += v;
        }
        sums
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros(self.shape());
        for (&v, (i, j)) in self.matrix.iter() {
            dense[[i, j]] = v;
        }
        dense
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut triples = SparseTriples {
            shape: self.shape(),
            row: Vec::with_capacity(self.nnz()),
            col: Vec::with_capacity(self.nnz()),
            data: Vec::with_capacity(self.nnz()),
        };
        for (&v, (i, j)) in self.matrix.iter() {
            triples.row.push(i);
            triples.col.push(j);
            triples.data.push(v);
        }
        write_compressed(&triples, path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let t: SparseTriples = read_compressed(path)?;
        let (n_rows, n_cols) = t.shape;
        let consistent = t.row.len() == t.data.len()
            && t.col.len() == t.data.len()
            && t.row.iter().all(|&i| i < n_rows)
            && t.col.iter().all(|&j| j < n_cols);
        if !consistent {
            return Err(PipelineError::Decode {
                path: path.to_path_buf(),
                reason: "sparse triples do not match the stored shape".to_string(),
            });
        }
        let tri = TriMat::from_triplets(t.shape, t.row, t.col, t.data);
        Ok(Self { matrix: tri.to_csr() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn dense_round_trip_and_sums() {
        let dense = array![[0.0, 1.5, 0.0], [2.0, 0.0, 0.5]];
        let m = GroupTermMatrix::from_dense(&dense);
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.to_dense(), dense);
        assert_eq!(m.row_sums(), vec![1.5, 2.5]);
        assert_eq!(m.col_sums(), vec![2.0, 1.5, 0.5]);
        assert_eq!(m.value(0, 0), 0.0);
    }

    #[test]
    fn triples_survive_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.cbor.gz");
        let m = GroupTermMatrix::from_rows(&[vec![(1, 0.25)], vec![], vec![(0, 1.0), (2, 3.0)]], 4);
        m.save(&path).unwrap();
        let back = GroupTermMatrix::load(&path).unwrap();
        assert_eq!(back.shape(), (3, 4));
        assert_eq!(back.to_dense(), m.to_dense());
    }

    #[test]
    fn inconsistent_triples_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.cbor.gz");
        let bad = SparseTriples { shape: (1, 1), row: vec![3], col: vec![0], data: vec![1.0] };
        write_compressed(&bad, &path).unwrap();
        assert!(matches!(GroupTermMatrix::load(&path), Err(PipelineError::Decode { .. })));
    }
}
