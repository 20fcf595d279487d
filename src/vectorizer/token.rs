use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

///  TermFrequency 構造体
/// termの出現回数を管理するための構造体です
/// 1グループ (または1文書) 分のカウントを保持し、TF変換の入力になります
///
/// # Examples
/// ```
/// use basin_topics::TermFrequency;
/// let mut freq = TermFrequency::new();
/// freq.add_terms(&["water", "river", "water"]);
/// assert_eq!(freq.term_count("water"), 2);
/// assert_eq!(freq.term_sum(), 3);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TermFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    term_count: IndexMap<String, u64>,
    total_term_count: u64,
}

/// termの追加、削除の実装
impl TermFrequency {
    /// 新しいTermFrequencyを作成するメソッド
    pub fn new() -> Self {
        TermFrequency {
            term_count: IndexMap::new(),
            total_term_count: 0,
        }
    }

    /// termを追加する
    ///
    /// # Arguments
    /// * `term` - 追加するterm
    #[inline]
    pub fn add_term(&mut self, term: &str) -> &mut Self {
        if let Some(count) = self.term_count.get_mut(term) {
            *count += 1;
        } else {
            self.term_count.insert(term.to_string(), 1);
        }
        self.total_term_count += 1;
        self
    }

    /// 複数のtermを追加する
    ///
    /// # Arguments
    /// * `terms` - 追加するtermのスライス
    #[inline]
    pub fn add_terms<T>(&mut self, terms: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for term in terms {
            self.add_term(term.as_ref());
        }
        self
    }

    /// 別のカウントを足し込む
    pub fn merge(&mut self, other: &TermFrequency) -> &mut Self {
        for (term, &count) in &other.term_count {
            *self.term_count.entry(term.clone()).or_insert(0) += count;
        }
        self.total_term_count += other.total_term_count;
        self
    }

    /// 条件に基づいてtermを削除します
    ///
    /// # Returns
    /// * `u64` - 削除されたtermの合計数
    #[inline]
    pub fn remove_terms_by_condition<F>(&mut self, condition: F) -> u64
    where
        F: Fn(&str, u64) -> bool,
    {
        let mut removed_total_count: u64 = 0;
        self.term_count.retain(|term, count| {
            if condition(term, *count) {
                removed_total_count += *count;
                false
            } else {
                true
            }
        });
        self.total_term_count -= removed_total_count;
        removed_total_count
    }
}

/// TermFrequencyの情報を取得するための実装
impl TermFrequency {
    /// あるtermの出現回数を取得します
    #[inline]
    pub fn term_count(&self, term: &str) -> u64 {
        self.term_count.get(term).copied().unwrap_or(0)
    }

    /// 全termのカウントの合計
    #[inline]
    pub fn term_sum(&self) -> u64 {
        self.total_term_count
    }

    /// 挿入順で (term, count) を走査
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.term_count.iter().map(|(t, &c)| (t.as_str(), c))
    }

    /// 頻度でソートされたtermのベクタを取得(降順)
    /// 同じ頻度のtermは辞書順
    ///
    /// # Returns
    /// * `Vec<(String, u64)>` - 頻度でソートされたtermのベクタ
    #[inline]
    pub fn sorted_frequency_vector(&self) -> Vec<(String, u64)> {
        let mut term_list: Vec<(String, u64)> = self
            .term_count
            .iter()
            .map(|(term, &count)| (term.clone(), count))
            .collect();
        term_list.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        term_list
    }
}
