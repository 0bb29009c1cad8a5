//! Per-validator results

use crate::error::ValidatorError;
use serde::Serialize;
use std::fmt;

/// Spam probability, always within `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Score(f64);

impl Score {
    pub const HAM: Score = Score(0.0);
    pub const SPAM: Score = Score(1.0);

    /// Clamp `value` into range. NaN maps to zero.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::HAM;
        }
        Score(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Score {
    fn from(value: f64) -> Self {
        Score::new(value)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// What a validator had to say about one comment
#[derive(Debug)]
pub enum Outcome {
    Score(Score),
    /// No opinion; not the same as a zero score
    Abstain,
    /// The validator could not run; treated like `Abstain` by the chain
    Failure(ValidatorError),
}

impl Outcome {
    /// Score `value`, or abstain when it is zero
    pub fn nonzero(value: f64) -> Self {
        let score = Score::new(value);
        if score.value() > 0.0 {
            Outcome::Score(score)
        } else {
            Outcome::Abstain
        }
    }

    pub fn score(&self) -> Option<Score> {
        match self {
            Outcome::Score(s) => Some(*s),
            Outcome::Abstain | Outcome::Failure(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

impl From<Result<Option<Score>, ValidatorError>> for Outcome {
    fn from(result: Result<Option<Score>, ValidatorError>) -> Self {
        match result {
            Ok(Some(score)) => Outcome::Score(score),
            Ok(None) => Outcome::Abstain,
            Err(e) => Outcome::Failure(e),
        }
    }
}
