//! Reduction of per-validator scores into a moderation verdict

use crate::config::Config;
use crate::score::Score;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// How non-abstaining scores combine into one spam probability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPolicy {
    /// Sum of scores, capped at 1.0
    #[default]
    Sum,
    /// Strongest single signal
    Max,
    /// Arithmetic mean of the scores that were produced
    Mean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accept,
    /// Keep the comment but mark it non-public
    Hold,
    Reject,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    policy: AggregationPolicy,
    public_threshold: f64,
    reject_threshold: f64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(AggregationPolicy::Sum, 0.1, 0.9)
    }
}

impl Aggregator {
    pub fn new(policy: AggregationPolicy, public_threshold: f64, reject_threshold: f64) -> Self {
        Self {
            policy,
            public_threshold,
            reject_threshold,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.aggregation, cfg.public_threshold, cfg.reject_threshold)
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Combine scores. An empty set combines to zero.
    pub fn combine<I>(&self, scores: I) -> Score
    where
        I: IntoIterator<Item = Score>,
    {
        // Sorted so the floating point reduction does not depend on chain order.
        let mut values: SmallVec<[f64; 8]> = scores.into_iter().map(Score::value).collect();
        if values.is_empty() {
            return Score::HAM;
        }
        values.sort_by(f64::total_cmp);
        let combined = match self.policy {
            AggregationPolicy::Sum => values.iter().sum(),
            AggregationPolicy::Max => values[values.len() - 1],
            AggregationPolicy::Mean => values.iter().sum::<f64>() / values.len() as f64,
        };
        Score::new(combined)
    }

    pub fn classify(&self, score: Score) -> Verdict {
        let value = score.value();
        if value > self.reject_threshold {
            Verdict::Reject
        } else if value > self.public_threshold {
            Verdict::Hold
        } else {
            Verdict::Accept
        }
    }

    pub fn decide<I>(&self, scores: I) -> (Score, Verdict)
    where
        I: IntoIterator<Item = Score>,
    {
        let combined = self.combine(scores);
        (combined, self.classify(combined))
    }
}
