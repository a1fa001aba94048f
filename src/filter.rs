// src/filter.rs
//! Keyword gate: per-source accept-all policy plus compiled keyword
//! patterns. Boolean relevance only; the first matching keyword is kept
//! for logs.

use anyhow::Result;
use regex::Regex;

use crate::config::SourceSection;

struct Keyword {
    raw: String,
    re: Regex,
}

pub struct FilterEngine {
    accept_all: Vec<String>,
    keywords: Vec<Keyword>,
}

/// Hashtag keywords must not match inside a longer tag (`#AFC` vs
/// `#AFCB`), so the tag is followed by a non-word char or end of input.
/// Plain keywords sit between word boundaries. The regex crate has no
/// lookahead; consuming the trailing non-word char is equivalent for a
/// boolean containment test.
fn keyword_pattern(raw: &str) -> String {
    let escaped = regex::escape(raw);
    if raw.starts_with('#') {
        format!(r"(?i){escaped}(?:\W|$)")
    } else {
        format!(r"(?i)\b{escaped}\b")
    }
}

impl FilterEngine {
    pub fn new(accept_all: &[String], keywords: &[String]) -> Result<Self> {
        let compiled = keywords
            .iter()
            .map(|kw| {
                let re = Regex::new(&keyword_pattern(kw))
                    .map_err(|e| anyhow::anyhow!("keyword `{}` regex error: {}", kw, e))?;
                Ok(Keyword {
                    raw: kw.clone(),
                    re,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            accept_all: accept_all.to_vec(),
            keywords: compiled,
        })
    }

    pub fn from_config(src: &SourceSection) -> Result<Self> {
        Self::new(&src.accept_all, &src.keywords)
    }

    /// True when every post from `origin` is relayed regardless of text.
    pub fn accepts_all(&self, origin: &str) -> bool {
        self.accept_all
            .iter()
            .any(|a| a.eq_ignore_ascii_case(origin))
    }

    /// The configured keyword (verbatim) that first matches `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|kw| kw.re.is_match(text))
            .map(|kw| kw.raw.as_str())
    }

    /// Relevance decision for one post.
    pub fn matches(&self, origin: &str, text: &str) -> bool {
        self.accepts_all(origin) || self.first_match(text).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eng() -> FilterEngine {
        FilterEngine::new(
            &["HandofArsenal".to_string()],
            &[
                "Arsenal".to_string(),
                "#AFC".to_string(),
                "Gunners".to_string(),
                "Emirates".to_string(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn hashtag_requires_tag_end() {
        let e = eng();
        assert!(e.matches("x", "Great day for #AFC fans"));
        assert!(e.matches("x", "what a finish #AFC"));
        assert!(e.matches("x", "#AFC, top of the league"));
        assert!(!e.matches("x", "#AFCB win again"));
    }

    #[test]
    fn plain_keyword_respects_word_boundaries() {
        let e = eng();
        assert!(e.matches("x", "Arsenal won the derby"));
        assert!(e.matches("x", "late win for arsenal!"));
        assert!(!e.matches("x", "the Arsenalization of football"));
    }

    #[test]
    fn accept_all_bypasses_keywords() {
        let e = eng();
        assert!(e.matches("HandofArsenal", "transfer gossip, nothing else"));
        assert!(e.matches("handofarsenal", "case should not matter"));
        assert!(!e.matches("David_Ornstein", "transfer gossip, nothing else"));
    }

    #[test]
    fn first_match_reports_configured_spelling() {
        let e = eng();
        assert_eq!(e.first_match("ARSENAL news incoming"), Some("Arsenal"));
        assert_eq!(e.first_match("quiet news day"), None);
        // Configuration order wins, not position in the text.
        assert_eq!(e.first_match("Gunners and Arsenal both"), Some("Arsenal"));
    }

    #[test]
    fn empty_keyword_set_matches_nothing() {
        let e = FilterEngine::new(&[], &[]).unwrap();
        assert!(!e.matches("anyone", "Arsenal #AFC Gunners"));
    }
}
