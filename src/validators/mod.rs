//! Comment validators
//!
//! Each validator implements `CommentValidator` and either scores a comment
//! with a spam probability or abstains. Validators are combined into a
//! `ValidatorChain` that runs them in configured order and collects the
//! scores for the aggregator.

use crate::comment::{Comment, RequestContext};
use crate::error::ValidatorError;
use crate::score::{Outcome, Score};
use crate::store::DynStore;
use std::time::Duration;

pub mod banned_ip;
pub mod blacklist;
pub mod factory;
pub mod fields;
pub mod link_limit;
pub mod remote;
pub mod similarity;

/// Everything a validator may look at for one submission
pub struct ValidationContext<'a> {
    pub comment: &'a Comment,
    pub request: &'a RequestContext,
    pub store: &'a DynStore,
}

/// Trait for comment validators
#[async_trait::async_trait]
pub trait CommentValidator: Send + Sync {
    /// Score the comment, abstain, or report why it could not.
    ///
    /// Malformed input must abstain rather than fail.
    async fn evaluate(&self, ctx: &ValidationContext<'_>) -> Outcome;

    /// Get a descriptive name for this validator (for logging/debugging)
    fn name(&self) -> &'static str;
}

/// Result of one validator in a chain run
#[derive(Debug)]
pub struct ValidatorRun {
    pub name: &'static str,
    pub outcome: Outcome,
}

/// Everything a chain run produced, in chain order
#[derive(Debug, Default)]
pub struct ChainReport {
    runs: Vec<ValidatorRun>,
}

impl ChainReport {
    pub fn runs(&self) -> &[ValidatorRun] {
        &self.runs
    }

    /// Scores from validators that did not abstain or fail
    pub fn scores(&self) -> impl Iterator<Item = (&'static str, Score)> + '_ {
        self.runs
            .iter()
            .filter_map(|run| run.outcome.score().map(|score| (run.name, score)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &ValidatorError)> + '_ {
        self.runs.iter().filter_map(|run| match &run.outcome {
            Outcome::Failure(e) => Some((run.name, e)),
            _ => None,
        })
    }
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// An ordered list of validators
pub struct ValidatorChain {
    validators: Vec<Box<dyn CommentValidator>>,
    timeout: Duration,
}

impl ValidatorChain {
    /// Create a new empty validator chain
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Add a validator to the end of the chain
    pub fn add_validator(mut self, validator: Box<dyn CommentValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Bound each validator call by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run every validator in order.
    ///
    /// A validator that fails or exceeds the timeout is logged and counted as
    /// abstaining; the remaining validators still run.
    pub async fn run(&self, ctx: &ValidationContext<'_>) -> ChainReport {
        let mut runs = Vec::with_capacity(self.validators.len());
        for validator in &self.validators {
            let name = validator.name();
            let outcome = match tokio::time::timeout(self.timeout, validator.evaluate(ctx)).await {
                Ok(outcome) => outcome,
                Err(_) => Outcome::Failure(ValidatorError::Timeout(self.timeout)),
            };
            match &outcome {
                Outcome::Score(score) => tracing::debug!(validator = name, %score, "Validator scored comment"),
                Outcome::Abstain => tracing::debug!(validator = name, "Validator abstained"),
                Outcome::Failure(e) => {
                    tracing::warn!(validator = name, error = %e, "Validator failed; treating as abstention")
                }
            }
            runs.push(ValidatorRun { name, outcome });
        }
        ChainReport { runs }
    }

    /// Get a list of validator names in the chain
    pub fn validator_names(&self) -> Vec<&'static str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Default for ValidatorChain {
    /// The standard chain of local validators
    fn default() -> Self {
        Self::new()
            .add_validator(Box::new(fields::EmailValidator::default()))
            .add_validator(Box::new(banned_ip::BannedIpValidator::default()))
            .add_validator(Box::new(link_limit::LinkLimitValidator::default()))
            .add_validator(Box::new(fields::NameValidator::default()))
            .add_validator(Box::new(similarity::SimilarityValidator))
            .add_validator(Box::new(fields::UrlValidator::default()))
    }
}
