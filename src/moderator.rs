//! Entry point for hosts: run a comment through the chain and decide.

use crate::aggregate::{Aggregator, Verdict};
use crate::comment::{Comment, RequestContext, submitter_ip};
use crate::config::Config;
use crate::error::SieveError;
use crate::score::Score;
use crate::store::{DynStore, seed};
use crate::validators::factory::create_validator_chain;
use crate::validators::{ValidationContext, ValidatorChain};
use serde::Serialize;

/// The outcome of moderating one comment
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    pub score: Score,
    /// Non-abstaining validator scores, in chain order
    pub scores: Vec<(&'static str, Score)>,
    /// Validators that failed and were counted as abstaining
    pub failed: Vec<&'static str>,
}

impl Decision {
    /// Whether the host should publish the comment
    pub fn is_public(&self) -> bool {
        self.verdict == Verdict::Accept
    }

    pub fn is_rejected(&self) -> bool {
        self.verdict == Verdict::Reject
    }
}

pub struct Moderator {
    chain: ValidatorChain,
    aggregator: Aggregator,
    store: DynStore,
    record_history: bool,
}

impl Moderator {
    pub fn new(chain: ValidatorChain, aggregator: Aggregator, store: DynStore) -> Self {
        Self {
            chain,
            aggregator,
            store,
            record_history: false,
        }
    }

    /// Log each accepted or held comment so later submissions can be
    /// scored by their address's history
    pub fn with_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    /// Build a moderator from configuration.
    ///
    /// Resolves the validator list and imports `blacklist_source` if set.
    ///
    /// # Errors
    ///
    /// Fails on unknown validators, missing API keys, an unreadable seed
    /// file, or store errors during import.
    pub async fn from_config(cfg: &Config, store: DynStore) -> Result<Self, SieveError> {
        let chain = create_validator_chain(cfg)?;
        if let Some(path) = &cfg.blacklist_source {
            let seed = seed::SeedFile::from_file(path)?;
            seed::import(store.as_ref(), &seed).await?;
        }
        Ok(Self::new(chain, Aggregator::from_config(cfg), store).with_history(cfg.record_history))
    }

    pub fn chain(&self) -> &ValidatorChain {
        &self.chain
    }

    /// Run every validator and classify the comment.
    ///
    /// Never fails: validator problems only remove that validator's signal.
    pub async fn moderate(&self, comment: &Comment, request: &RequestContext) -> Decision {
        let ctx = ValidationContext {
            comment,
            request,
            store: &self.store,
        };
        let report = self.chain.run(&ctx).await;
        let scores: Vec<(&'static str, Score)> = report.scores().collect();
        let (score, verdict) = self.aggregator.decide(scores.iter().map(|(_, s)| *s));
        let failed = report.failures().map(|(name, _)| name).collect();

        match verdict {
            Verdict::Reject => tracing::info!(
                %score,
                ip = %comment.ip_address,
                name = %comment.user_name,
                email = %comment.user_email,
                url = %comment.user_url,
                "Rejected comment"
            ),
            Verdict::Hold => tracing::info!(%score, "Comment held for review; marking it non-public"),
            Verdict::Accept => tracing::debug!(%score, "Comment accepted"),
        }

        let decision = Decision {
            verdict,
            score,
            scores,
            failed,
        };
        if self.record_history && !decision.is_rejected() {
            self.record(comment, request, decision.is_public()).await;
        }
        decision
    }

    async fn record(&self, comment: &Comment, request: &RequestContext, is_public: bool) {
        let Some(ip) = submitter_ip(comment, request) else {
            return;
        };
        // Store IPv4-mapped IPv6 submitters under their IPv4 form
        let ip = ip.to_canonical().to_string();
        if let Err(e) = self.store.record_comment(&ip, is_public).await {
            tracing::warn!(error = %e, "Failed to record comment disposition");
        }
    }
}
