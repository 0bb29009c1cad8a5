//! Blacklist phrase validator
//!
//! Flags comments whose text contains any stored blacklist phrase.

use super::{CommentValidator, ValidationContext};
use crate::error::ValidatorError;
use crate::score::{Outcome, Score};
use serde::Deserialize;

fn default_match_score() -> f64 {
    1.0
}

#[derive(Deserialize, Clone, Debug)]
pub struct BlacklistConfig {
    /// Score assigned when any phrase matches
    #[serde(default = "default_match_score")]
    pub score: f64,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            score: default_match_score(),
        }
    }
}

/// Count how many of `phrases` occur in `haystack`, ignoring case
pub fn phrase_hits<'a, I>(haystack: &str, phrases: I) -> usize
where
    I: IntoIterator<Item = &'a String>,
{
    let haystack = haystack.to_lowercase();
    phrases
        .into_iter()
        .filter(|p| !p.is_empty() && haystack.contains(&p.to_lowercase()))
        .count()
}

/// Validator that matches comment text against blacklist phrases
#[derive(Default)]
pub struct BlacklistValidator {
    config: BlacklistConfig,
}

impl BlacklistValidator {
    pub fn new(config: BlacklistConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ValidationContext<'_>) -> Result<Option<Score>, ValidatorError> {
        let text = ctx.comment.text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let phrases = ctx.store.all_phrases().await?;
        if phrase_hits(text, &phrases) > 0 {
            tracing::info!("Comment text contains a blacklisted phrase");
            return Ok(Some(Score::new(self.config.score)));
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
impl CommentValidator for BlacklistValidator {
    async fn evaluate(&self, ctx: &ValidationContext<'_>) -> Outcome {
        self.check(ctx).await.into()
    }

    fn name(&self) -> &'static str {
        "blacklist"
    }
}
