//! Comment submission data handed to the validator chain
//!
//! Both types are owned by the host; the chain only ever borrows them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// A submitted comment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// The comment body
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_url: String,
    /// Address the comment was submitted from, as recorded by the host
    #[serde(default)]
    pub ip_address: String,
    /// Opaque key of the object being commented on
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// Build a comment with only its body set
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Transport-level metadata for one submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub remote_addr: Option<String>,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl RequestContext {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Resolve the submitter address, preferring the one stored on the comment.
///
/// Returns `None` when neither source holds a parseable address.
pub fn submitter_ip(comment: &Comment, request: &RequestContext) -> Option<IpAddr> {
    let raw = if comment.ip_address.trim().is_empty() {
        request.remote_addr.as_deref()?
    } else {
        comment.ip_address.as_str()
    };
    raw.trim().parse().ok()
}
