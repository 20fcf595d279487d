use once_cell::sync::Lazy;
use regex::Regex;

// 前処理で使う正規表現群 (lowercase 済みテキスト前提)

pub(crate) static LINEBREAK_HYPHEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w)-\s*\n\s*(\w)").expect("valid regex"));
pub(crate) static CRLF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").expect("valid regex"));
pub(crate) static HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));
pub(crate) static LINEBREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r" ?\n\s*").expect("valid regex"));

pub(crate) static CURRENCY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Sc}").expect("valid regex"));
pub(crate) static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:mailto:)?[\w.%+-]+@[\w-]+(?:\.[\w-]+)*\.[a-z]{2,}").expect("valid regex")
});
pub(crate) static EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}\x{FE0E}\x{FE0F}\x{200D}]+")
        .expect("valid regex")
});
pub(crate) static HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\s)#\w+").expect("valid regex"));
pub(crate) static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[+-]?\b\d+(?:[.,]\d+)*\b").expect("valid regex"));
pub(crate) static PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}\b").expect("valid regex")
});
pub(crate) static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:\b(?:https?|ftp)://|\bwww\.)[^\s<>"]+"#).expect("valid regex")
});
pub(crate) static USER_HANDLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w@])@\w+").expect("valid regex"));

pub(crate) static PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{P}\p{S}]").expect("valid regex"));
pub(crate) static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));
pub(crate) static ALPHA_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+").expect("valid regex"));

/// sentence boundary: terminal punctuation followed by whitespace or end of text
pub(crate) static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[.!?]+["')\]]*(?:\s+|$)"#).expect("valid regex"));
