use crate::aggregate::AggregationPolicy;
use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;

fn default_db_path() -> String {
    "sqlite:///var/lib/comment-sieve/sieve.db".into()
}

fn default_site_url() -> String {
    "http://localhost/".into()
}

fn default_public_threshold() -> f64 {
    0.1
}

fn default_reject_threshold() -> f64 {
    0.9
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_record_history() -> bool {
    true
}

/// Byte offset of the `#` starting a comment on `line`, ignoring `#` inside
/// basic and literal strings
fn comment_start(line: &str) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' => return Some(i),
            None => {}
        }
    }
    None
}

fn expand_with<F>(text: &str, re: &Regex, mut resolve: F) -> Result<String, ConfigError>
where
    F: FnMut(&str) -> Result<String, ConfigError>,
{
    let mut out = String::new();
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&text[last..m.start()]);
        out.push_str(&resolve(&caps[1])?);
        last = m.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Expand `$ENV{NAME}` and `$FILE{path}` outside of comments
fn expand_placeholders(text: &str) -> Result<String, ConfigError> {
    let env_re = Regex::new(r"\$ENV\{([^}]+)\}").map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let file_re =
        Regex::new(r"\$FILE\{([^}]+)\}").map_err(|e| ConfigError::Invalid(e.to_string()))?;
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (code, comment) = line.split_at(comment_start(line).unwrap_or(line.len()));
        let code = expand_with(code, &env_re, |var| {
            std::env::var(var).map_err(|_| ConfigError::UndefinedVariable(var.to_string()))
        })?;
        let code = expand_with(&code, &file_re, |path| {
            std::fs::read_to_string(path)
                .map(|contents| contents.trim_end().to_string())
                .map_err(|_| ConfigError::FileNotFound(path.to_string()))
        })?;
        out.push_str(&code);
        out.push_str(comment);
    }
    Ok(out)
}

/// One entry of the validator registry
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct ValidatorConfig {
    pub name: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

impl ValidatorConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: serde_json::Map::new(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Site URL reported to remote anti-spam services
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Ordered validator list. `None` selects the default chain; an empty list
    /// runs no validators at all.
    #[serde(default)]
    pub validators: Option<Vec<ValidatorConfig>>,
    #[serde(default)]
    pub akismet_key: Option<String>,
    #[serde(default)]
    pub typepad_key: Option<String>,
    /// Replaces the remote service host, e.g. for a compatible self-hosted service
    #[serde(default)]
    pub antispam_endpoint: Option<String>,
    #[serde(default)]
    pub link_threshold: u32,
    /// Blacklist seed file imported at startup
    #[serde(default)]
    pub blacklist_source: Option<String>,
    #[serde(default)]
    pub aggregation: AggregationPolicy,
    #[serde(default = "default_public_threshold")]
    pub public_threshold: f64,
    #[serde(default = "default_reject_threshold")]
    pub reject_threshold: f64,
    #[serde(default = "default_timeout_secs")]
    pub validator_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub remote_timeout_secs: u64,
    #[serde(default = "default_record_history")]
    pub record_history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            site_url: default_site_url(),
            validators: None,
            akismet_key: None,
            typepad_key: None,
            antispam_endpoint: None,
            link_threshold: 0,
            blacklist_source: None,
            aggregation: AggregationPolicy::default(),
            public_threshold: default_public_threshold(),
            reject_threshold: default_reject_threshold(),
            validator_timeout_secs: default_timeout_secs(),
            remote_timeout_secs: default_timeout_secs(),
            record_history: default_record_history(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// `$ENV{NAME}` and `$FILE{path}` placeholders are expanded before parsing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a placeholder cannot be
    /// resolved, the TOML is invalid, or the values fail [`Config::validate`].
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.to_string()))?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let text = expand_placeholders(text)?;
        let cfg: Config = toml::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("public_threshold", self.public_threshold),
            ("reject_threshold", self.reject_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between 0 and 1, got {value}"
                )));
            }
        }
        if self.public_threshold > self.reject_threshold {
            return Err(ConfigError::Invalid(
                "public_threshold must not exceed reject_threshold".into(),
            ));
        }
        if self.validator_timeout_secs == 0 || self.remote_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn validator_timeout(&self) -> Duration {
        Duration::from_secs(self.validator_timeout_secs)
    }

    #[must_use]
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}
