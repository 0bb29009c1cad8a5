//! Chainable spam validation for submitted comments.
//!
//! A [`Moderator`] runs a [`Comment`] through an ordered
//! [`ValidatorChain`](validators::ValidatorChain). Each validator returns a
//! spam probability or abstains; the [`Aggregator`](aggregate::Aggregator)
//! reduces the scores to a [`Verdict`](aggregate::Verdict):
//!
//! - above `reject_threshold` the comment is rejected,
//! - above `public_threshold` it is kept but held as non-public,
//! - otherwise it is accepted.
//!
//! Validators that fail (an unreachable remote service, a store error) are
//! treated as abstaining, so moderation always produces a decision.

pub mod aggregate;
pub mod comment;
pub mod config;
pub mod error;
pub mod moderator;
pub mod score;
pub mod store;
pub mod validators;

pub use comment::{Comment, RequestContext};
pub use moderator::{Decision, Moderator};
