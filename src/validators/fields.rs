//! Author field validators
//!
//! Sanity checks for the commenter's name, email, and URL. A malformed field
//! earns a moderate score; a well-formed one is scored by the blacklist
//! phrases it contains.

use super::blacklist::phrase_hits;
use super::{CommentValidator, ValidationContext};
use crate::error::ValidatorError;
use crate::score::{Outcome, Score};
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("valid email pattern")
});

const MAX_NAME_CHARS: usize = 50;

fn default_malformed_score() -> f64 {
    0.5
}

fn default_per_phrase() -> f64 {
    0.1
}

fn default_presence_score() -> f64 {
    0.1
}

#[derive(Deserialize, Clone, Debug)]
pub struct FieldConfig {
    #[serde(default = "default_malformed_score")]
    pub malformed_score: f64,
    /// Added for each blacklist phrase found in the field
    #[serde(default = "default_per_phrase")]
    pub per_phrase: f64,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            malformed_score: default_malformed_score(),
            per_phrase: default_per_phrase(),
        }
    }
}

async fn score_phrases(
    ctx: &ValidationContext<'_>,
    value: &str,
    per_phrase: f64,
    base: f64,
) -> Result<Option<Score>, ValidatorError> {
    let phrases = ctx.store.all_phrases().await?;
    let hits = phrase_hits(value, &phrases);
    let total = base + hits as f64 * per_phrase;
    Ok((total > 0.0).then(|| Score::new(total)))
}

pub fn is_well_formed_name(name: &str) -> bool {
    !name.chars().any(char::is_control)
        && !name.contains("://")
        && name.chars().count() <= MAX_NAME_CHARS
}

pub fn is_well_formed_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_well_formed_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Requires a plausible author name
#[derive(Default)]
pub struct NameValidator {
    config: FieldConfig,
}

impl NameValidator {
    pub fn new(config: FieldConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ValidationContext<'_>) -> Result<Option<Score>, ValidatorError> {
        let name = ctx.comment.user_name.trim();
        if name.is_empty() || !is_well_formed_name(name) {
            return Ok(Some(Score::new(self.config.malformed_score)));
        }
        score_phrases(ctx, name, self.config.per_phrase, 0.0).await
    }
}

#[async_trait::async_trait]
impl CommentValidator for NameValidator {
    async fn evaluate(&self, ctx: &ValidationContext<'_>) -> Outcome {
        self.check(ctx).await.into()
    }

    fn name(&self) -> &'static str {
        "name"
    }
}

/// Checks the optional author email
#[derive(Default)]
pub struct EmailValidator {
    config: FieldConfig,
}

impl EmailValidator {
    pub fn new(config: FieldConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ValidationContext<'_>) -> Result<Option<Score>, ValidatorError> {
        let email = ctx.comment.user_email.trim();
        if email.is_empty() {
            return Ok(None);
        }
        if !is_well_formed_email(email) {
            return Ok(Some(Score::new(self.config.malformed_score)));
        }
        score_phrases(ctx, email, self.config.per_phrase, 0.0).await
    }
}

#[async_trait::async_trait]
impl CommentValidator for EmailValidator {
    async fn evaluate(&self, ctx: &ValidationContext<'_>) -> Outcome {
        self.check(ctx).await.into()
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct UrlConfig {
    #[serde(flatten)]
    pub field: FieldConfig,
    /// Score for merely supplying a URL
    #[serde(default = "default_presence_score")]
    pub presence_score: f64,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            field: FieldConfig::default(),
            presence_score: default_presence_score(),
        }
    }
}

/// Checks the optional author URL
#[derive(Default)]
pub struct UrlValidator {
    config: UrlConfig,
}

impl UrlValidator {
    pub fn new(config: UrlConfig) -> Self {
        Self { config }
    }

    async fn check(&self, ctx: &ValidationContext<'_>) -> Result<Option<Score>, ValidatorError> {
        let url = ctx.comment.user_url.trim();
        if url.is_empty() {
            return Ok(None);
        }
        if !is_well_formed_url(url) {
            return Ok(Some(Score::new(self.config.field.malformed_score)));
        }
        score_phrases(
            ctx,
            url,
            self.config.field.per_phrase,
            self.config.presence_score,
        )
        .await
    }
}

#[async_trait::async_trait]
impl CommentValidator for UrlValidator {
    async fn evaluate(&self, ctx: &ValidationContext<'_>) -> Outcome {
        self.check(ctx).await.into()
    }

    fn name(&self) -> &'static str {
        "url"
    }
}
