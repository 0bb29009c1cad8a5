//! Link count validator
//!
//! Scores comments by how many links they carry once a threshold is passed.

use super::{CommentValidator, ValidationContext};
use crate::score::Outcome;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(https?://|href|mailto)").expect("valid link pattern"));

fn default_saturation() -> u32 {
    10
}

#[derive(Deserialize, Clone, Debug)]
pub struct LinkLimitConfig {
    /// Link counts at or below this abstain
    #[serde(default)]
    pub threshold: u32,
    /// Link count at which the score reaches 1.0
    #[serde(default = "default_saturation")]
    pub saturation: u32,
}

impl Default for LinkLimitConfig {
    fn default() -> Self {
        Self {
            threshold: 0,
            saturation: default_saturation(),
        }
    }
}

pub fn count_links(text: &str) -> usize {
    LINK_RE.find_iter(text).count()
}

/// Validator that limits the number of links in a comment
#[derive(Default)]
pub struct LinkLimitValidator {
    config: LinkLimitConfig,
}

impl LinkLimitValidator {
    pub fn new(config: LinkLimitConfig) -> Self {
        Self { config }
    }

    pub fn score_text(&self, text: &str) -> Outcome {
        let count = count_links(text);
        if count <= self.config.threshold as usize {
            return Outcome::Abstain;
        }
        let saturation = self.config.saturation.max(1) as usize;
        let value = count.min(saturation) as f64 / saturation as f64;
        tracing::debug!(links = count, score = value, "Counted links in comment");
        Outcome::nonzero(value)
    }
}

#[async_trait::async_trait]
impl CommentValidator for LinkLimitValidator {
    async fn evaluate(&self, ctx: &ValidationContext<'_>) -> Outcome {
        self.score_text(&ctx.comment.text)
    }

    fn name(&self) -> &'static str {
        "link_limit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(threshold: u32) -> LinkLimitValidator {
        LinkLimitValidator::new(LinkLimitConfig {
            threshold,
            ..LinkLimitConfig::default()
        })
    }

    #[test]
    fn test_count_links() {
        assert_eq!(count_links("see http://a.example and HTTPS://b.example"), 2);
        assert_eq!(count_links("<a href=\"x\">mailto:me@example.com</a>"), 2);
        assert_eq!(count_links("no links at all"), 0);
    }

    #[test]
    fn test_above_threshold_scores() {
        let text = "http://a.example http://b.example http://c.example http://d.example";
        let score = limiter(3).score_text(text).score().unwrap();
        assert!((score.value() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_at_or_below_threshold_abstains() {
        assert!(matches!(
            limiter(3).score_text("one link http://a.example"),
            Outcome::Abstain
        ));
        assert!(matches!(
            limiter(1).score_text("one link http://a.example"),
            Outcome::Abstain
        ));
        assert!(matches!(limiter(0).score_text("plain"), Outcome::Abstain));
    }

    #[test]
    fn test_score_saturates() {
        let text = "http://x ".repeat(25);
        assert_eq!(limiter(0).score_text(&text).score().unwrap().value(), 1.0);
    }
}
