//! Banned address validator
//!
//! Comments from a banned address or range score 1.0. Otherwise the
//! submitter's earlier held comments count against this one.

use super::{CommentValidator, ValidationContext};
use crate::comment::submitter_ip;
use crate::error::ValidatorError;
use crate::score::{Outcome, Score};
use serde::Deserialize;

fn default_history() -> bool {
    true
}

fn default_per_held_comment() -> f64 {
    0.1
}

#[derive(Deserialize, Clone, Debug)]
pub struct BannedIpConfig {
    /// Score repeat submitters by their held comment count
    #[serde(default = "default_history")]
    pub history: bool,
    #[serde(default = "default_per_held_comment")]
    pub per_held_comment: f64,
}

impl Default for BannedIpConfig {
    fn default() -> Self {
        Self {
            history: default_history(),
            per_held_comment: default_per_held_comment(),
        }
    }
}

/// Validator that checks the submitter address against the ban table
#[derive(Default)]
pub struct BannedIpValidator {
    config: BannedIpConfig,
}

impl BannedIpValidator {
    pub fn new(config: BannedIpConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ValidationContext<'_>) -> Result<Option<Score>, ValidatorError> {
        let Some(ip) = submitter_ip(ctx.comment, ctx.request) else {
            return Ok(None);
        };
        let ip = ip.to_canonical();
        if ctx.store.is_banned(ip).await? {
            tracing::info!(%ip, "Comment from banned address");
            return Ok(Some(Score::SPAM));
        }
        if !self.config.history {
            return Ok(None);
        }
        let held = ctx.store.count_held(&ip.to_string()).await?;
        if held == 0 {
            return Ok(None);
        }
        let score = Score::new(held as f64 * self.config.per_held_comment);
        tracing::debug!(%ip, held, %score, "Address has held comments on record");
        Ok(Some(score))
    }
}

#[async_trait::async_trait]
impl CommentValidator for BannedIpValidator {
    async fn evaluate(&self, ctx: &ValidationContext<'_>) -> Outcome {
        self.check(ctx).await.into()
    }

    fn name(&self) -> &'static str {
        "ip"
    }
}
