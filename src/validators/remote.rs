//! Remote anti-spam service validators
//!
//! Akismet and TypePad AntiSpam speak the same REST protocol: a
//! `verify-key` call to check the API key and a `comment-check` call that
//! answers `true` for spam and `false` for ham. Every failure mode maps to
//! `Outcome::Failure`, so an unreachable service never blocks a comment.

use super::{CommentValidator, ValidationContext};
use crate::comment::submitter_ip;
use crate::error::ValidatorError;
use crate::score::{Outcome, Score};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;

const API_VERSION: &str = "1.1";

/// A hosted service speaking the Akismet protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntispamService {
    Akismet,
    TypePad,
}

impl AntispamService {
    pub fn name(self) -> &'static str {
        match self {
            AntispamService::Akismet => "akismet",
            AntispamService::TypePad => "typepad",
        }
    }

    fn host(self) -> &'static str {
        match self {
            AntispamService::Akismet => "rest.akismet.com",
            AntispamService::TypePad => "api.antispam.typepad.com",
        }
    }

    fn scheme(self) -> &'static str {
        match self {
            AntispamService::Akismet => "https",
            AntispamService::TypePad => "http",
        }
    }
}

/// Client for one anti-spam service and API key
pub struct AntispamClient {
    service: AntispamService,
    key: String,
    blog: String,
    endpoint: Option<String>,
    http: reqwest::Client,
    key_valid: OnceCell<bool>,
}

impl AntispamClient {
    /// Create a client. `endpoint` replaces the service host when set.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        service: AntispamService,
        key: &str,
        blog: &str,
        endpoint: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(concat!("comment-sieve/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            service,
            key: key.to_string(),
            blog: blog.to_string(),
            endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
            http,
            key_valid: OnceCell::new(),
        })
    }

    pub fn service(&self) -> AntispamService {
        self.service
    }

    fn verify_url(&self) -> String {
        match &self.endpoint {
            Some(base) => format!("{base}/{API_VERSION}/verify-key"),
            None => format!(
                "{}://{}/{API_VERSION}/verify-key",
                self.service.scheme(),
                self.service.host()
            ),
        }
    }

    fn comment_check_url(&self) -> String {
        match &self.endpoint {
            Some(base) => format!("{base}/{API_VERSION}/comment-check"),
            None => format!(
                "{}://{}.{}/{API_VERSION}/comment-check",
                self.service.scheme(),
                self.key,
                self.service.host()
            ),
        }
    }

    async fn post(&self, url: &str, form: &[(&str, &str)]) -> Result<String, ValidatorError> {
        let response = self.http.post(url).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ValidatorError::MalformedResponse(format!(
                "{} returned HTTP {status}",
                self.service.name()
            )));
        }
        Ok(body.trim().to_string())
    }

    /// Ask the service whether the API key is valid.
    pub async fn verify_key(&self) -> Result<bool, ValidatorError> {
        let body = self
            .post(
                &self.verify_url(),
                &[("key", self.key.as_str()), ("blog", self.blog.as_str())],
            )
            .await?;
        match body.as_str() {
            "valid" => Ok(true),
            "invalid" => Ok(false),
            other => Err(ValidatorError::MalformedResponse(format!(
                "unexpected verify-key reply: {other:?}"
            ))),
        }
    }

    /// Verify the key once per client; network errors are not cached.
    async fn ensure_key(&self) -> Result<(), ValidatorError> {
        let valid = self
            .key_valid
            .get_or_try_init(|| self.verify_key())
            .await?;
        if *valid {
            Ok(())
        } else {
            Err(ValidatorError::Auth(self.service.name()))
        }
    }

    /// Returns `true` when the service considers the comment spam.
    pub async fn comment_check(&self, ctx: &ValidationContext<'_>) -> Result<bool, ValidatorError> {
        self.ensure_key().await?;

        let comment = ctx.comment;
        let request = ctx.request;
        let user_ip = submitter_ip(comment, request)
            .map(|ip| ip.to_string())
            .unwrap_or_default();
        let user_agent = if request.user_agent.is_empty() {
            request.header("User-Agent").unwrap_or_default()
        } else {
            request.user_agent.as_str()
        };
        let referrer = if request.referrer.is_empty() {
            request.header("Referer").unwrap_or_default()
        } else {
            request.referrer.as_str()
        };

        let form = [
            ("blog", self.blog.as_str()),
            ("user_ip", user_ip.as_str()),
            ("user_agent", user_agent),
            ("referrer", referrer),
            ("comment_type", "comment"),
            ("comment_author", comment.user_name.as_str()),
            ("comment_author_email", comment.user_email.as_str()),
            ("comment_author_url", comment.user_url.as_str()),
            ("comment_content", comment.text.as_str()),
        ];
        let body = self.post(&self.comment_check_url(), &form).await?;
        match body.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            "invalid" => Err(ValidatorError::Auth(self.service.name())),
            other => Err(ValidatorError::MalformedResponse(format!(
                "unexpected comment-check reply: {other:?}"
            ))),
        }
    }
}

fn default_spam_score() -> f64 {
    0.5
}

#[derive(Deserialize, Clone, Debug)]
pub struct RemoteConfig {
    /// Score reported when the service calls the comment spam
    #[serde(default = "default_spam_score")]
    pub spam_score: f64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            spam_score: default_spam_score(),
        }
    }
}

/// Validator backed by a remote anti-spam service
pub struct RemoteValidator {
    client: AntispamClient,
    config: RemoteConfig,
}

impl RemoteValidator {
    pub fn new(client: AntispamClient, config: RemoteConfig) -> Self {
        Self { client, config }
    }

    async fn check(&self, ctx: &ValidationContext<'_>) -> Result<Option<Score>, ValidatorError> {
        if ctx.comment.text.trim().is_empty() {
            return Ok(None);
        }
        if self.client.comment_check(ctx).await? {
            tracing::debug!(service = self.name(), "Remote service flagged comment as spam");
            return Ok(Some(Score::new(self.config.spam_score)));
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
impl CommentValidator for RemoteValidator {
    async fn evaluate(&self, ctx: &ValidationContext<'_>) -> Outcome {
        self.check(ctx).await.into()
    }

    fn name(&self) -> &'static str {
        self.client.service().name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(service: AntispamService, endpoint: Option<&str>) -> AntispamClient {
        AntispamClient::new(
            service,
            "abc123",
            "http://blog.example/",
            endpoint,
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn test_service_urls() {
        let akismet = client(AntispamService::Akismet, None);
        assert_eq!(akismet.verify_url(), "https://rest.akismet.com/1.1/verify-key");
        assert_eq!(
            akismet.comment_check_url(),
            "https://abc123.rest.akismet.com/1.1/comment-check"
        );

        let typepad = client(AntispamService::TypePad, None);
        assert_eq!(
            typepad.comment_check_url(),
            "http://abc123.api.antispam.typepad.com/1.1/comment-check"
        );
    }

    #[test]
    fn test_endpoint_override() {
        let c = client(AntispamService::Akismet, Some("http://127.0.0.1:9000/"));
        assert_eq!(c.verify_url(), "http://127.0.0.1:9000/1.1/verify-key");
        assert_eq!(c.comment_check_url(), "http://127.0.0.1:9000/1.1/comment-check");
    }

    #[test]
    fn test_validator_names() {
        let v = RemoteValidator::new(client(AntispamService::TypePad, None), RemoteConfig::default());
        assert_eq!(v.name(), "typepad");
    }
}
