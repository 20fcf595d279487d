use std::collections::HashSet;
use std::fmt;

use ahash::AHashMap;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};

use crate::text::patterns::SENTENCE_END;
use crate::text::stopwords::english_stopwords;

/// Universal part-of-speech tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pos {
    Adj,
    Adp,
    Adv,
    Aux,
    Cconj,
    Det,
    Intj,
    Noun,
    Num,
    Part,
    Pron,
    Propn,
    Punct,
    Sconj,
    Sym,
    Verb,
    X,
}

/// Part-of-speech tagger seam.
/// The output has exactly one tag per input token.
pub trait PosTagger {
    fn tag(&self, tokens: &[&str]) -> Vec<Pos>;
}

/// How a surviving term is written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TermNormalize {
    /// the token as it appears in the normalized text
    #[default]
    Text,
    /// Snowball English stem
    Stem,
}

const CLOSED_CLASS: &[(&str, Pos)] = &[
    ("the", Pos::Det), ("a", Pos::Det), ("an", Pos::Det), ("this", Pos::Det), ("that", Pos::Det),
    ("these", Pos::Det), ("those", Pos::Det), ("each", Pos::Det), ("every", Pos::Det),
    ("some", Pos::Det), ("any", Pos::Det), ("all", Pos::Det), ("both", Pos::Det), ("no", Pos::Det),
    ("either", Pos::Det), ("neither", Pos::Det),
    ("i", Pos::Pron), ("you", Pos::Pron), ("he", Pos::Pron), ("she", Pos::Pron), ("it", Pos::Pron),
    ("we", Pos::Pron), ("they", Pos::Pron), ("me", Pos::Pron), ("him", Pos::Pron), ("her", Pos::Pron),
    ("us", Pos::Pron), ("them", Pos::Pron), ("its", Pos::Pron), ("their", Pos::Pron), ("our", Pos::Pron),
    ("his", Pos::Pron), ("my", Pos::Pron), ("your", Pos::Pron), ("who", Pos::Pron), ("whom", Pos::Pron),
    ("which", Pos::Pron), ("what", Pos::Pron),
    ("of", Pos::Adp), ("in", Pos::Adp), ("on", Pos::Adp), ("at", Pos::Adp), ("by", Pos::Adp),
    ("for", Pos::Adp), ("with", Pos::Adp), ("from", Pos::Adp), ("to", Pos::Adp), ("into", Pos::Adp),
    ("over", Pos::Adp), ("under", Pos::Adp), ("between", Pos::Adp), ("among", Pos::Adp),
    ("along", Pos::Adp), ("across", Pos::Adp), ("through", Pos::Adp), ("during", Pos::Adp),
    ("against", Pos::Adp), ("about", Pos::Adp), ("after", Pos::Adp), ("before", Pos::Adp),
    ("without", Pos::Adp), ("within", Pos::Adp), ("towards", Pos::Adp), ("upon", Pos::Adp),
    ("is", Pos::Aux), ("are", Pos::Aux), ("was", Pos::Aux), ("were", Pos::Aux), ("be", Pos::Aux),
    ("been", Pos::Aux), ("being", Pos::Aux), ("has", Pos::Aux), ("have", Pos::Aux), ("had", Pos::Aux),
    ("will", Pos::Aux), ("would", Pos::Aux), ("shall", Pos::Aux), ("should", Pos::Aux),
    ("can", Pos::Aux), ("could", Pos::Aux), ("may", Pos::Aux), ("might", Pos::Aux),
    ("must", Pos::Aux), ("do", Pos::Aux), ("does", Pos::Aux), ("did", Pos::Aux),
    ("and", Pos::Cconj), ("or", Pos::Cconj), ("but", Pos::Cconj), ("nor", Pos::Cconj),
    ("if", Pos::Sconj), ("because", Pos::Sconj), ("while", Pos::Sconj), ("although", Pos::Sconj),
    ("though", Pos::Sconj), ("whereas", Pos::Sconj), ("since", Pos::Sconj), ("unless", Pos::Sconj),
    ("whether", Pos::Sconj),
    ("not", Pos::Part),
    ("very", Pos::Adv), ("also", Pos::Adv), ("too", Pos::Adv), ("already", Pos::Adv),
    ("still", Pos::Adv), ("yet", Pos::Adv), ("now", Pos::Adv), ("then", Pos::Adv),
    ("again", Pos::Adv), ("soon", Pos::Adv), ("here", Pos::Adv), ("there", Pos::Adv),
    ("oh", Pos::Intj), ("yes", Pos::Intj),
];

// frequent reporting verbs in news text that no suffix rule catches
const VERBS: &[&str] = &[
    "say", "says", "said", "agree", "agrees", "warn", "warns", "sign", "signs", "rise", "rises",
    "rose", "fall", "falls", "fell", "meet", "meets", "met", "build", "builds", "built", "share",
    "shares", "claim", "claims", "threaten", "threatens", "urge", "urges", "call", "calls",
    "improve", "improves", "plan", "plans", "accuse", "accuses", "demand", "demands", "seek",
    "seeks", "sought", "reject", "rejects", "announce", "announces", "hold", "holds", "held",
    "told", "tell", "tells", "make", "makes", "take", "takes", "took", "give", "gives", "gave",
];

const NOUN_SUFFIXES: &[&str] = &["tion", "sion", "ment", "ness", "ity", "ism", "ship", "ance", "ence"];
const ADJ_SUFFIXES: &[&str] = &["ous", "ful", "ive", "able", "ible", "ical", "less", "ish", "ic", "al"];
const ADV_SUFFIXES: &[&str] = &["ly"];
const VERB_SUFFIXES: &[&str] = &["ing", "ed", "ise", "ize"];

/// Lexicon and suffix based tagger.
///
/// Order of rules:
/// 1. digits -> `Num`
/// 2. closed class lexicon and the reporting-verb list
/// 3. suffix rules, only when the stem left over has at least 3 characters
/// 4. everything else -> `Noun`
#[derive(Debug, Clone)]
pub struct RuleTagger {
    lexicon: AHashMap<&'static str, Pos>,
}

impl Default for RuleTagger {
    fn default() -> Self {
        let mut lexicon: AHashMap<&'static str, Pos> = CLOSED_CLASS.iter().copied().collect();
        for &v in VERBS {
            lexicon.entry(v).or_insert(Pos::Verb);
        }
        Self { lexicon }
    }
}

impl RuleTagger {
    pub fn new() -> Self {
        Self::default()
    }

    fn tag_one(&self, token: &str) -> Pos {
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            return Pos::Num;
        }
        if let Some(pos) = self.lexicon.get(token) {
            return *pos;
        }
        if token.chars().all(|c| !c.is_alphanumeric()) {
            return Pos::Punct;
        }
        let has_suffix = |suffixes: &[&str]| {
            suffixes
                .iter()
                .any(|s| token.len() >= s.len() + 3 && token.ends_with(s))
        };
        if has_suffix(NOUN_SUFFIXES) {
            Pos::Noun
        } else if has_suffix(ADV_SUFFIXES) {
            Pos::Adv
        } else if has_suffix(VERB_SUFFIXES) {
            Pos::Verb
        } else if has_suffix(ADJ_SUFFIXES) {
            Pos::Adj
        } else {
            Pos::Noun
        }
    }
}

impl PosTagger for RuleTagger {
    fn tag(&self, tokens: &[&str]) -> Vec<Pos> {
        tokens.iter().map(|t| self.tag_one(t)).collect()
    }
}

/// Linguistic resources shared by every stage.
/// Built once per process and passed around by reference.
pub struct LanguageModel {
    stopwords: HashSet<String>,
    tagger: Box<dyn PosTagger>,
    stemmer: Stemmer,
}

impl fmt::Debug for LanguageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageModel")
            .field("stopwords", &self.stopwords.len())
            .finish_non_exhaustive()
    }
}

impl Default for LanguageModel {
    fn default() -> Self {
        Self::english()
    }
}

impl LanguageModel {
    /// English stopwords, rule based tagger and Snowball stemmer
    pub fn english() -> Self {
        Self::new(english_stopwords(), Box::new(RuleTagger::new()))
    }

    pub fn new(stopwords: HashSet<String>, tagger: Box<dyn PosTagger>) -> Self {
        Self {
            stopwords,
            tagger,
            stemmer: Stemmer::create(Algorithm::English),
        }
    }

    /// Add words to the stopword set, lowercased
    pub fn with_extra_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords
            .extend(words.into_iter().map(|w| w.as_ref().to_lowercase()));
        self
    }

    pub fn stopwords(&self) -> &HashSet<String> {
        &self.stopwords
    }

    #[inline]
    pub fn is_stop(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Whitespace tokenization of already normalized text
    pub fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_whitespace().collect()
    }

    pub fn tag(&self, tokens: &[&str]) -> Vec<Pos> {
        self.tagger.tag(tokens)
    }

    pub fn term(&self, token: &str, normalize: TermNormalize) -> String {
        match normalize {
            TermNormalize::Text => token.to_string(),
            TermNormalize::Stem => self.stemmer.stem(token).into_owned(),
        }
    }

    /// Number of sentences in raw text.
    /// A trailing fragment without terminal punctuation counts as one sentence.
    pub fn count_sentences(&self, text: &str) -> usize {
        let text = text.trim();
        if text.is_empty() {
            return 0;
        }
        let mut count = 0;
        let mut last_end = 0;
        for m in SENTENCE_END.find_iter(text) {
            count += 1;
            last_end = m.end();
        }
        if text[last_end..].chars().any(char::is_alphanumeric) {
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_news_tokens() {
        let lm = LanguageModel::english();
        let tokens = ["water", "conflict", "rises", "nile", "river", "the", "2007", "sharing", "dangerous", "quickly"];
        let tags = lm.tag(&tokens);
        assert_eq!(
            tags,
            vec![
                Pos::Noun,
                Pos::Noun,
                Pos::Verb,
                Pos::Noun,
                Pos::Noun,
                Pos::Det,
                Pos::Num,
                Pos::Verb,
                Pos::Adj,
                Pos::Adv
            ]
        );
    }

    #[test]
    fn short_words_skip_suffix_rules() {
        let tagger = RuleTagger::new();
        assert_eq!(tagger.tag(&["thing", "red", "ruling"]), vec![Pos::Noun, Pos::Noun, Pos::Verb]);
    }

    #[test]
    fn cooperation_is_a_noun_not_a_verb() {
        let tagger = RuleTagger::new();
        assert_eq!(tagger.tag(&["cooperation", "negotiations"]), vec![Pos::Noun, Pos::Noun]);
    }

    #[test]
    fn sentence_count() {
        let lm = LanguageModel::english();
        assert_eq!(lm.count_sentences("Water conflict rises. Talks resume! Why?"), 3);
        assert_eq!(lm.count_sentences("No terminal punctuation"), 1);
        assert_eq!(lm.count_sentences("One. Two"), 2);
        assert_eq!(lm.count_sentences("  "), 0);
        assert_eq!(lm.count_sentences("He said \"stop.\" Then left."), 2);
    }

    #[test]
    fn stemming_and_extra_stopwords() {
        let lm = LanguageModel::english().with_extra_stopwords(["BBC"]);
        assert!(lm.is_stop("bbc"));
        assert!(lm.is_stop("the"));
        assert_eq!(lm.term("rivers", TermNormalize::Stem), "river");
        assert_eq!(lm.term("rivers", TermNormalize::Text), "rivers");
    }
}
