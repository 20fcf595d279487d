use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::vectorizer::{doc_freq::DocFrequency, token::TermFrequency, VectorizerConfig};

/// Term frequency transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TfType {
    /// c
    #[default]
    Linear,
    /// sqrt(c)
    Sqrt,
    /// 1 + ln(c)
    Log,
    /// 1 if c > 0
    Binary,
}

/// Inverse document frequency scheme, n = number of groups, df = groups containing the term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IdfType {
    /// ln(n / df) + 1
    #[default]
    Standard,
    /// ln(1 + n / df) + 1
    Smooth,
    /// ln((n - df + 0.5) / (df + 0.5)), clamped at 0
    Bm25,
}

/// Group length normalization, L = occurrences of vocabulary terms in the group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DlType {
    /// L
    #[default]
    Linear,
    /// sqrt(L)
    Sqrt,
    /// 1 + ln(L)
    Log,
}

pub trait WeightingEngine {
    /// IDFベクトルを生成するメソッド
    /// # Arguments
    /// * `config` - 重み付け設定
    /// * `df` - グループ単位の文書頻度
    /// * `terms` - 語彙 (列の順序)
    /// # Returns
    /// * `Vec<f64>` - 語彙順のIDFベクトル
    fn idf_vec(config: &VectorizerConfig, df: &DocFrequency, terms: &IndexSet<String>) -> Vec<f64>;

    /// 1グループ分のTF行を生成するメソッド
    /// 長さ正規化 (apply_dl) もここで行う
    /// # Returns
    /// * `Vec<(usize, f64)>` - (列番号, 値) の疎な行、列番号の昇順
    fn tf_vec(config: &VectorizerConfig, freq: &TermFrequency, terms: &IndexSet<String>) -> Vec<(usize, f64)>;
}

/// デフォルトの重み付けエンジン
/// 設定の TfType / IdfType / DlType をそのまま計算する
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWeightingEngine;

impl DefaultWeightingEngine {
    #[inline]
    pub fn tf(tf_type: TfType, count: f64) -> f64 {
        if count <= 0.0 {
            return 0.0;
        }
        match tf_type {
            TfType::Linear => count,
            TfType::Sqrt => count.sqrt(),
            TfType::Log => 1.0 + count.ln(),
            TfType::Binary => 1.0,
        }
    }

    #[inline]
    pub fn idf(idf_type: IdfType, n_docs: f64, df: f64) -> f64 {
        if df <= 0.0 {
            return 0.0;
        }
        match idf_type {
            IdfType::Standard => (n_docs / df).ln() + 1.0,
            IdfType::Smooth => (1.0 + n_docs / df).ln() + 1.0,
            IdfType::Bm25 => ((n_docs - df + 0.5) / (df + 0.5)).ln().max(0.0),
        }
    }

    #[inline]
    pub fn dl(dl_type: DlType, len: f64) -> f64 {
        match dl_type {
            DlType::Linear => len,
            DlType::Sqrt => len.sqrt(),
            DlType::Log => 1.0 + len.ln(),
        }
    }
}

impl WeightingEngine for DefaultWeightingEngine {
    fn idf_vec(config: &VectorizerConfig, df: &DocFrequency, terms: &IndexSet<String>) -> Vec<f64> {
        let n_docs = df.doc_num() as f64;
        terms
            .iter()
            .map(|term| Self::idf(config.idf_type, n_docs, df.term_doc_count(term) as f64))
            .collect()
    }

    fn tf_vec(config: &VectorizerConfig, freq: &TermFrequency, terms: &IndexSet<String>) -> Vec<(usize, f64)> {
        // group length counts in-vocabulary occurrences only
        let mut in_vocab: u64 = 0;
        let mut row: Vec<(usize, f64)> = freq
            .iter()
            .filter_map(|(term, count)| {
                let col = terms.get_index_of(term)?;
                in_vocab += count;
                Some((col, Self::tf(config.tf_type, count as f64)))
            })
            .filter(|&(_, v)| v != 0.0)
            .collect();
        row.sort_unstable_by_key(|&(col, _)| col);

        if config.apply_dl {
            let len = in_vocab as f64;
            let denom = Self::dl(config.dl_type, len);
            if len > 0.0 && denom > 0.0 {
                for (_, v) in row.iter_mut() {
                    *v /= denom;
                }
            }
        }
        row
    }
}
