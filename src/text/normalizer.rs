use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::error::{PipelineError, Result};
use crate::text::patterns::*;

/// What to put where a currency symbol, email, url, ... used to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplacePolicy {
    /// remove the match entirely
    #[default]
    Delete,
    /// replace the match with a placeholder like `_url_`.
    /// punctuation stripping later turns it into the plain token `url`
    Placeholder,
}

impl ReplacePolicy {
    #[inline]
    fn pick<'a>(&self, placeholder: &'a str) -> &'a str {
        match self {
            ReplacePolicy::Delete => "",
            ReplacePolicy::Placeholder => placeholder,
        }
    }
}

/// Normalizer settings shared by every document of a corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// drop tokens outside `[min_len, max_len]`, requires a stopword set
    pub char_count_filter: bool,
    pub min_len: usize,
    pub max_len: usize,
    pub replace: ReplacePolicy,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            char_count_filter: true,
            min_len: 3,
            max_len: 15,
            replace: ReplacePolicy::Delete,
        }
    }
}

/// Deterministic text cleanup run before any tokenization.
///
/// Steps, each feeding the next:
/// 1. lowercase
/// 2. normalize quotation marks, hyphenated line breaks and whitespace
/// 3. replace currency symbols, emails, emoji, hashtags, numbers, phone numbers, urls, user handles
/// 4. strip accents and punctuation, collapse other non-alphanumeric runs to one space
/// 5. split into alphabetic tokens, filter by length and stopwords
/// 6. join with single spaces
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    config: NormalizerConfig,
}

impl TextNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Validate the option combination without touching any text
    pub fn validate(&self, stopwords: Option<&HashSet<String>>) -> Result<()> {
        if !self.config.char_count_filter {
            return Err(PipelineError::config(
                "normalization without token length filtering is not supported",
            ));
        }
        if stopwords.is_none() {
            return Err(PipelineError::config(
                "token length filtering requires a stopword set",
            ));
        }
        if self.config.min_len > self.config.max_len {
            return Err(PipelineError::config(format!(
                "min_len ({}) is greater than max_len ({})",
                self.config.min_len, self.config.max_len
            )));
        }
        Ok(())
    }

    /// Normalize one text
    ///
    /// # Arguments
    /// * `text` - raw text
    /// * `stopwords` - words removed after length filtering
    ///
    /// # Returns
    /// * `String` - surviving tokens joined by single spaces
    pub fn normalize(&self, text: &str, stopwords: Option<&HashSet<String>>) -> Result<String> {
        self.validate(stopwords)?;
        let stopwords = stopwords.ok_or_else(|| PipelineError::config("stopword set missing"))?;

        let text = text.to_lowercase();
        let text = normalize_whitespace(&normalize_hyphenated_words(&normalize_quotation_marks(&text)));
        let text = self.replace_entities(&text);
        let text = remove_punctuation(&remove_accents(&text));
        let text = NON_ALNUM.replace_all(&text, " ");

        let mut out = String::with_capacity(text.len());
        for token in ALPHA_RUN.find_iter(&text).map(|m| m.as_str()) {
            let len = token.chars().count();
            if len < self.config.min_len || len > self.config.max_len {
                continue;
            }
            if stopwords.contains(token) {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(token);
        }
        Ok(out)
    }

    fn replace_entities(&self, text: &str) -> String {
        let p = self.config.replace;
        let text = CURRENCY.replace_all(text, p.pick("_cur_"));
        let text = EMAIL.replace_all(&text, p.pick("_email_"));
        let text = EMOJI.replace_all(&text, p.pick("_emoji_"));
        let text = HASHTAG.replace_all(&text, format!("${{1}}{}", p.pick("_tag_")).as_str());
        let text = NUMBER.replace_all(&text, p.pick("_number_"));
        let text = PHONE.replace_all(&text, p.pick("_phone_"));
        let text = URL.replace_all(&text, p.pick("_url_"));
        let text = USER_HANDLE.replace_all(&text, format!("${{1}}{}", p.pick("_user_")).as_str());
        text.into_owned()
    }
}

/// Normalize with length bounds and the default replace policy
pub fn normalize(
    text: &str,
    min_len: usize,
    max_len: usize,
    stopwords: Option<&HashSet<String>>,
) -> Result<String> {
    TextNormalizer::new(NormalizerConfig {
        char_count_filter: true,
        min_len,
        max_len,
        replace: ReplacePolicy::Delete,
    })
    .normalize(text, stopwords)
}

pub fn normalize_quotation_marks(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '\u{0060}' | '\u{00B4}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{00AB}' | '\u{00BB}' => '"',
            c => c,
        })
        .collect()
}

/// `wa-\nter` -> `water`
pub fn normalize_hyphenated_words(text: &str) -> String {
    LINEBREAK_HYPHEN.replace_all(text, "$1$2").into_owned()
}

/// horizontal whitespace runs -> one space, line break runs -> one newline, trimmed
pub fn normalize_whitespace(text: &str) -> String {
    let text = CRLF.replace_all(text, "\n");
    let text = HSPACE.replace_all(&text, " ");
    let text = LINEBREAKS.replace_all(&text, "\n");
    text.trim().to_string()
}

pub fn remove_accents(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

pub fn remove_punctuation(text: &str) -> String {
    PUNCT.replace_all(text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn cleans_news_sentence() {
        let sw = stops(&["the", "along"]);
        let out = normalize("Water conflict rises along the Nile river.", 3, 15, Some(&sw)).unwrap();
        assert_eq!(out, "water conflict rises nile river");
    }

    #[test]
    fn length_filter_and_stopwords_hold() {
        let sw = stops(&["dam"]);
        let text = "A dam on the Blue Nile; hydropower-negotiations continue internationalisation";
        let out = normalize(text, 4, 10, Some(&sw)).unwrap();
        for tok in out.split(' ') {
            let len = tok.chars().count();
            assert!((4..=10).contains(&len), "{tok} violates length bounds");
            assert_ne!(tok, "dam");
        }
        assert!(out.contains("blue"));
        assert!(out.contains("hydropower"));
        assert!(!out.contains("internationalisation"));
    }

    #[test]
    fn is_idempotent() {
        let sw = stops(&["the", "and", "with"]);
        let text = "“Cooperation” on the Mekong; see https://example.org/2007 and mail@ex.org, \
                    #waterwars @minister 3,000 m³ café déjà-vu\nwa-\nter";
        for policy in [ReplacePolicy::Delete, ReplacePolicy::Placeholder] {
            let n = TextNormalizer::new(NormalizerConfig { replace: policy, ..Default::default() });
            let once = n.normalize(text, Some(&sw)).unwrap();
            let twice = n.normalize(&once, Some(&sw)).unwrap();
            assert_eq!(once, twice, "policy {policy:?}");
        }
    }

    fn assert_clean(out: &str, min_len: usize, max_len: usize, sw: &HashSet<String>) {
        if out.is_empty() {
            return;
        }
        assert!(!out.contains("  ") && !out.starts_with(' ') && !out.ends_with(' '), "{out:?}");
        for tok in out.split(' ') {
            assert!(tok.chars().all(|c| c.is_ascii_lowercase()), "{tok:?} in {out:?}");
            let len = tok.chars().count();
            assert!((min_len..=max_len).contains(&len), "{tok:?} in {out:?}");
            assert!(!sw.contains(tok), "stopword {tok:?} in {out:?}");
        }
    }

    #[test]
    fn varied_inputs_keep_token_invariants_and_are_idempotent() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let sw = stops(&["the", "and", "with", "for", "river"]);
        let mut inputs: Vec<String> = [
            "",
            "   \n\t  ",
            "!!! ... ??? --- ;;; ()[]{}",
            "Crème brûlée à São Paulo, Zürich and Ærøskøbing; naïve façade",
            "Ελληνικά και русский текст 中文 العربية",
            "2007 3,000 12.5 +44 20 7946 0958 (555) 123-4567",
            "https://www.bbc.co.uk/news/world-africa-6270000 and www.nilebasin.org/dams?x=1",
            "contact press@unwater.org or mailto:info@nile-basin.org now",
            "#NileBasin @UN_Water 🌊💧 €45m £3bn $12",
            "The   RIVER\r\nriver-\nbank  The river",
            "supercalifragilisticexpialidocious ok hydroelectricity",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let pieces = [
            "water", "Río", "déjà", "42", "x", "the", "https://a.org/b", "a@b.io", "—", "…", "#tag", "@user",
            "Dam-\nbuilding", "“quoted”", "ÆØÅ", "ok", "treaty,", "€", "\t", "\n\n",
        ];
        let mut rng = StdRng::seed_from_u64(2007);
        for _ in 0..200 {
            let n = rng.gen_range(0..12);
            let text: Vec<&str> = (0..n).map(|_| pieces[rng.gen_range(0..pieces.len())]).collect();
            inputs.push(text.join(if rng.gen_bool(0.5) { " " } else { "" }));
        }

        for (min_len, max_len) in [(3, 15), (1, 5), (4, 10)] {
            for policy in [ReplacePolicy::Delete, ReplacePolicy::Placeholder] {
                let n = TextNormalizer::new(NormalizerConfig {
                    replace: policy,
                    min_len,
                    max_len,
                    ..Default::default()
                });
                for text in &inputs {
                    let once = n.normalize(text, Some(&sw)).unwrap();
                    assert_clean(&once, min_len, max_len, &sw);
                    let twice = n.normalize(&once, Some(&sw)).unwrap();
                    assert_eq!(once, twice, "{policy:?} ({min_len}, {max_len}) on {text:?}");
                }
            }
        }
        let empty = normalize("", 3, 15, Some(&sw)).unwrap();
        assert_eq!(empty, "");
    }

    #[test]
    fn delete_policy_drops_entities() {
        let sw = stops(&[]);
        let out = normalize(
            "Visit www.nilebasin.org or write to info@nilebasin.org about €5 million #nile @unwater",
            3,
            15,
            Some(&sw),
        )
        .unwrap();
        assert_eq!(out, "visit write about million");
    }

    #[test]
    fn placeholder_policy_keeps_marker_tokens() {
        let sw = stops(&[]);
        let n = TextNormalizer::new(NormalizerConfig {
            replace: ReplacePolicy::Placeholder,
            ..Default::default()
        });
        let out = n.normalize("see https://bbc.co.uk for 42 reports", Some(&sw)).unwrap();
        assert_eq!(out, "see url for number reports");
    }

    #[test]
    fn accents_and_hyphen_breaks() {
        assert_eq!(remove_accents("café déjà"), "cafe deja");
        assert_eq!(normalize_hyphenated_words("wa-\n  ter"), "water");
        assert_eq!(normalize_whitespace("  a \t b\r\n\n\nc  "), "a b\nc");
        assert_eq!(normalize_quotation_marks("‘x’ “y”"), "'x' \"y\"");
    }

    #[test]
    fn digits_split_alphabetic_runs() {
        let sw = stops(&[]);
        assert_eq!(normalize("abc123def 2007", 3, 15, Some(&sw)).unwrap(), "abc def");
    }

    #[test]
    fn length_filter_without_stopwords_is_configuration_error() {
        let err = normalize("text", 3, 15, None).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn disabled_length_filter_is_configuration_error() {
        let n = TextNormalizer::new(NormalizerConfig { char_count_filter: false, ..Default::default() });
        let err = n.normalize("text", Some(&HashSet::new())).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn inverted_length_bounds_are_rejected() {
        let err = normalize("text", 10, 3, Some(&HashSet::new())).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
