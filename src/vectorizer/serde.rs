use std::marker::PhantomData;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::utils::io::{read_compressed, write_compressed};
use crate::vectorizer::{tfidf::WeightingEngine, GroupVectorizer, VectorizerConfig};

/// GroupVectorizerのシリアライズ用のデータ構造
/// エンジンの型情報を含まないため、そのまま保存できます。
/// `into_vectorizer`メソッドで`GroupVectorizer`に戻せます。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerData {
    /// 重み付け設定
    pub config: VectorizerConfig,
    /// 列の順序の語彙
    pub terms: Vec<String>,
    /// 行の順序のグループ
    pub groups: Vec<String>,
    /// IDFベクトル
    pub idf: Vec<f64>,
}

impl VectorizerData {
    /// `VectorizerData`から`GroupVectorizer`に変換します。
    pub fn into_vectorizer<E: WeightingEngine>(self) -> Result<GroupVectorizer<E>> {
        if self.idf.len() != self.terms.len() {
            return Err(PipelineError::config(format!(
                "idf has {} entries for {} terms",
                self.idf.len(),
                self.terms.len()
            )));
        }
        Ok(GroupVectorizer {
            config: self.config,
            terms: self.terms.into_iter().collect(),
            groups: self.groups.into_iter().collect(),
            idf: self.idf,
            fitted: true,
            _marker: PhantomData,
        })
    }
}

impl<E: WeightingEngine> GroupVectorizer<E> {
    /// 学習済みの状態を`VectorizerData`として取り出します
    pub fn to_data(&self) -> VectorizerData {
        VectorizerData {
            config: self.config.clone(),
            terms: self.terms.iter().cloned().collect(),
            groups: self.groups.iter().cloned().collect(),
            idf: self.idf.clone(),
        }
    }

    /// gzip CBORで保存します
    /// 未学習のベクトライザは保存できません
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if !self.fitted {
            return Err(PipelineError::config("cannot save an unfitted vectorizer"));
        }
        write_compressed(&self.to_data(), path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data: VectorizerData = read_compressed(path.as_ref())?;
        data.into_vectorizer().map_err(|e| PipelineError::Decode {
            path: path.as_ref().to_path_buf(),
            reason: e.to_string(),
        })
    }
}
