//! Blacklist similarity validator
//!
//! Compares the set of meaningful words in a comment to each blacklist using
//! the Tanimoto coefficient, weights each result by the blacklist's weight,
//! and sums the weighted coefficients.

use super::{CommentValidator, ValidationContext};
use crate::error::ValidatorError;
use crate::score::{Outcome, Score};
use crate::store::Blacklist;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static SPLITTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("valid splitter"));

/// Common English words ignored when comparing text. Sorted for binary search.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything",
    "anyway", "anywhere", "are", "around", "as", "at", "back", "be", "became", "because",
    "become", "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below",
    "beside", "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call",
    "can", "cannot", "cant", "co", "computer", "con", "could", "couldnt", "cry", "de",
    "describe", "detail", "do", "done", "down", "due", "during", "each", "eg", "eight",
    "either", "eleven", "else", "elsewhere", "empty", "enough", "etc", "even", "ever", "every",
    "everyone", "everything", "everywhere", "except", "few", "fifteen", "fify", "fill", "find",
    "fire", "first", "five", "for", "former", "formerly", "forty", "found", "four", "from",
    "front", "full", "further", "get", "give", "go", "had", "has", "hasnt", "have", "he",
    "hence", "her", "here", "hereafter", "hereby", "herein", "hereupon", "hers", "herself",
    "him", "himself", "his", "how", "however", "hundred", "i", "ie", "if", "in", "inc",
    "indeed", "interest", "into", "is", "it", "its", "itself", "keep", "last", "latter",
    "latterly", "least", "less", "ltd", "made", "many", "may", "me", "meanwhile", "might",
    "mill", "mine", "more", "moreover", "most", "mostly", "move", "much", "must", "my",
    "myself", "name", "namely", "neither", "never", "nevertheless", "next", "nine", "no",
    "nobody", "none", "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off", "often",
    "on", "once", "one", "only", "onto", "or", "other", "others", "otherwise", "our", "ours",
    "ourselves", "out", "over", "own", "part", "per", "perhaps", "please", "put", "rather",
    "re", "same", "see", "seem", "seemed", "seeming", "seems", "serious", "several", "she",
    "should", "show", "side", "since", "sincere", "six", "sixty", "so", "some", "somehow",
    "someone", "something", "sometime", "sometimes", "somewhere", "still", "such", "system",
    "take", "ten", "than", "that", "the", "their", "them", "themselves", "then", "thence",
    "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these", "they",
    "thick", "thin", "third", "this", "those", "though", "three", "through", "throughout",
    "thru", "thus", "to", "together", "too", "top", "toward", "towards", "twelve", "twenty",
    "two", "un", "under", "until", "up", "upon", "us", "very", "via", "was", "we", "well",
    "were", "what", "whatever", "when", "whence", "whenever", "where", "whereafter", "whereas",
    "whereby", "wherein", "whereupon", "wherever", "whether", "which", "while", "whither",
    "who", "whoever", "whole", "whom", "whose", "why", "will", "with", "within", "without",
    "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

/// Extract the comparable words of `text`
pub fn meaningful_words(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    SPLITTER
        .split(&lowered)
        .filter(|w| w.chars().count() > 2)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| *w != "href" && !w.starts_with("http"))
        .filter(|w| STOP_WORDS.binary_search(w).is_err())
        .map(str::to_string)
        .collect()
}

/// Tanimoto coefficient `|A ∩ B| / (|A| + |B| - |A ∩ B|)`; zero for two empty sets
pub fn tanimoto(words: &BTreeSet<String>, phrases: &BTreeSet<String>) -> f64 {
    let shared = words.intersection(phrases).count() as f64;
    let union = words.len() as f64 + phrases.len() as f64 - shared;
    if union == 0.0 { 0.0 } else { shared / union }
}

/// Combined weighted similarity of `text` to every blacklist, clamped to `[0, 1]`
pub fn similarity(text: &str, blacklists: &[Blacklist]) -> f64 {
    let words = meaningful_words(text);
    tracing::debug!(?words, "Words from comment text");
    let mut total = 0.0;
    for list in blacklists {
        let phrases: BTreeSet<String> = list.phrases.iter().map(|p| p.to_lowercase()).collect();
        let coefficient = tanimoto(&words, &phrases);
        let weighted = (coefficient * list.weight).clamp(0.0, 1.0);
        tracing::debug!(
            blacklist = %list.name,
            coefficient,
            weighted,
            "Similarity to blacklist"
        );
        total += weighted;
    }
    total.clamp(0.0, 1.0)
}

/// Validator that scores comment text by similarity to the blacklists
pub struct SimilarityValidator;

impl SimilarityValidator {
    async fn check(&self, ctx: &ValidationContext<'_>) -> Result<Option<Score>, ValidatorError> {
        if ctx.comment.text.trim().is_empty() {
            return Ok(None);
        }
        let blacklists = ctx.store.list_blacklists().await?;
        let value = similarity(&ctx.comment.text, &blacklists);
        Ok((value > 0.0).then(|| Score::new(value)))
    }
}

#[async_trait::async_trait]
impl CommentValidator for SimilarityValidator {
    async fn evaluate(&self, ctx: &ValidationContext<'_>) -> Outcome {
        self.check(ctx).await.into()
    }

    fn name(&self) -> &'static str {
        "text"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(name: &str, weight: f64, phrases: &[&str]) -> Blacklist {
        Blacklist {
            id: 0,
            name: name.to_string(),
            weight,
            phrases: phrases.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_stop_words_sorted() {
        assert!(STOP_WORDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_meaningful_words_filters_noise() {
        let words = meaningful_words("The 2024 http://spam.example href Cheap PILLS, go go!");
        let expected: BTreeSet<String> = ["cheap", "pills", "spam", "example"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(words, expected);
    }

    #[test]
    fn test_tanimoto() {
        let a: BTreeSet<String> = ["cheap", "pills"].iter().map(|s| s.to_string()).collect();
        let b: BTreeSet<String> = ["pills", "viagra", "casino"].iter().map(|s| s.to_string()).collect();
        assert!((tanimoto(&a, &b) - 0.25).abs() < 1e-9);
        assert_eq!(tanimoto(&BTreeSet::new(), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn test_similarity_applies_weights() {
        let lists = vec![
            list("pharmacy", 2.0, &["pills", "viagra"]),
            list("casino", 1.0, &["poker"]),
        ];
        // words {cheap, pills}: pharmacy tc = 1/3, weighted 2/3; casino tc = 0
        let score = similarity("cheap pills", &lists);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_clamps() {
        let lists = vec![
            list("a", 5.0, &["poker"]),
            list("b", 5.0, &["poker"]),
        ];
        assert_eq!(similarity("poker", &lists), 1.0);
        assert_eq!(similarity("poker", &[]), 0.0);
    }
}
