use num::Float;
use serde::{Deserialize, Serialize};

/// 行ベクトルの正規化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Norm {
    /// sum of absolute values becomes 1.0
    L1,
    /// euclidean length becomes 1.0
    L2,
}

/// Row normalization over a slice of float values.
/// Rows whose norm is zero (or NaN) are left untouched.
pub trait RowNormalizer<N>
where
    N: Float,
{
    /// normalize in place with the given norm
    fn normalize_with(&mut self, norm: Norm);

    fn l1_norm(&self) -> N;
    fn l2_norm(&self) -> N;
}

impl<N> RowNormalizer<N> for [N]
where
    N: Float,
{
    fn normalize_with(&mut self, norm: Norm) {
        let denom = match norm {
            Norm::L1 => self.l1_norm(),
            Norm::L2 => self.l2_norm(),
        };
        if denom.is_nan() || denom <= N::zero() {
            return;
        }
        for v in self.iter_mut() {
            *v = *v / denom;
        }
    }

    #[inline]
    fn l1_norm(&self) -> N {
        self.iter().fold(N::zero(), |acc, v| acc + v.abs())
    }

    #[inline]
    fn l2_norm(&self) -> N {
        self.iter().fold(N::zero(), |acc, v| acc + *v * *v).sqrt()
    }
}

/// Clamp a weight into `[0, +inf)`, mapping NaN to zero
#[inline]
pub fn non_negative<N: Float>(v: N) -> N {
    if v.is_nan() || v < N::zero() {
        N::zero()
    } else {
        v
    }
}
