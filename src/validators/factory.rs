//! Validator factory for building validator chains from configuration
//!
//! Validator identifiers are resolved once, at startup. Unknown identifiers,
//! bad parameters, and missing API keys are reported immediately instead of
//! leaving a silently incomplete chain.

use super::banned_ip::{BannedIpConfig, BannedIpValidator};
use super::blacklist::{BlacklistConfig, BlacklistValidator};
use super::fields::{EmailValidator, FieldConfig, NameValidator, UrlConfig, UrlValidator};
use super::link_limit::{LinkLimitConfig, LinkLimitValidator};
use super::remote::{AntispamClient, AntispamService, RemoteConfig, RemoteValidator};
use super::similarity::SimilarityValidator;
use super::{CommentValidator, ValidatorChain};
use crate::config::{Config, ValidatorConfig};
use crate::error::FactoryError;
use serde::de::DeserializeOwned;
use std::collections::HashSet;

/// Identifiers accepted in the `validators` list
pub const KNOWN_VALIDATORS: &[&str] = &[
    "akismet",
    "blacklist",
    "email",
    "ip",
    "link_limit",
    "name",
    "text",
    "typepad",
    "url",
];

fn parameters<T: DeserializeOwned>(config: &ValidatorConfig) -> Result<T, FactoryError> {
    serde_json::from_value(serde_json::Value::Object(config.parameters.clone())).map_err(|e| {
        FactoryError::InvalidParameters(format!("{} configuration error: {e}", config.name))
    })
}

fn remote_validator(
    service: AntispamService,
    key: Option<&String>,
    setting: &'static str,
    config: &ValidatorConfig,
    cfg: &Config,
) -> Result<Box<dyn CommentValidator>, FactoryError> {
    let key = key
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .ok_or(FactoryError::MissingCredential {
            validator: service.name(),
            setting,
        })?;
    let client = AntispamClient::new(
        service,
        key,
        &cfg.site_url,
        cfg.antispam_endpoint.as_deref(),
        cfg.remote_timeout(),
    )
    .map_err(|e| FactoryError::InvalidParameters(format!("{} client: {e}", service.name())))?;
    Ok(Box::new(RemoteValidator::new(client, parameters::<RemoteConfig>(config)?)))
}

/// Create a validator instance from configuration
pub fn create_validator(
    config: &ValidatorConfig,
    cfg: &Config,
) -> Result<Box<dyn CommentValidator>, FactoryError> {
    match config.name.as_str() {
        "blacklist" => Ok(Box::new(BlacklistValidator::new(parameters::<BlacklistConfig>(
            config,
        )?))),
        "text" => Ok(Box::new(SimilarityValidator)),
        "ip" => Ok(Box::new(BannedIpValidator::new(parameters::<BannedIpConfig>(
            config,
        )?))),
        "link_limit" => {
            let mut params = config.parameters.clone();
            params
                .entry("threshold")
                .or_insert_with(|| serde_json::Value::from(cfg.link_threshold));
            let link_config: LinkLimitConfig =
                serde_json::from_value(serde_json::Value::Object(params)).map_err(|e| {
                    FactoryError::InvalidParameters(format!("link_limit configuration error: {e}"))
                })?;
            Ok(Box::new(LinkLimitValidator::new(link_config)))
        }
        "name" => Ok(Box::new(NameValidator::new(parameters::<FieldConfig>(config)?))),
        "email" => Ok(Box::new(EmailValidator::new(parameters::<FieldConfig>(config)?))),
        "url" => Ok(Box::new(UrlValidator::new(parameters::<UrlConfig>(config)?))),
        "akismet" => remote_validator(
            AntispamService::Akismet,
            cfg.akismet_key.as_ref(),
            "akismet_key",
            config,
            cfg,
        ),
        "typepad" => remote_validator(
            AntispamService::TypePad,
            cfg.typepad_key.as_ref(),
            "typepad_key",
            config,
            cfg,
        ),
        _ => Err(FactoryError::UnknownValidator(config.name.clone())),
    }
}

/// The validator list used when the configuration does not name one
pub fn default_validator_configs() -> Vec<ValidatorConfig> {
    ["email", "ip", "link_limit", "name", "text", "url"]
        .into_iter()
        .map(ValidatorConfig::named)
        .collect()
}

/// Create a validator chain from the configuration
///
/// A missing `validators` list selects the default chain; an explicitly
/// empty list yields an empty chain. Each validator may appear once.
pub fn create_validator_chain(cfg: &Config) -> Result<ValidatorChain, FactoryError> {
    let defaults;
    let configs = match &cfg.validators {
        Some(configs) => configs.as_slice(),
        None => {
            defaults = default_validator_configs();
            defaults.as_slice()
        }
    };

    let mut seen = HashSet::new();
    let mut chain = ValidatorChain::new().with_timeout(cfg.validator_timeout());
    for config in configs {
        if !seen.insert(config.name.as_str()) {
            return Err(FactoryError::InvalidParameters(format!(
                "validator {} listed more than once",
                config.name
            )));
        }
        let validator = create_validator(config, cfg)?;
        chain = chain.add_validator(validator);
    }
    tracing::debug!(validators = ?chain.validator_names(), "Built validator chain");
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn test_create_known_validators() {
        let mut cfg = cfg();
        cfg.akismet_key = Some("k".to_string());
        cfg.typepad_key = Some("t".to_string());
        for name in KNOWN_VALIDATORS {
            let validator = create_validator(&ValidatorConfig::named(name), &cfg).unwrap();
            assert_eq!(validator.name(), *name);
        }
    }

    #[test]
    fn test_unknown_validator() {
        let result = create_validator(&ValidatorConfig::named("fccv.check_everything"), &cfg());
        if let Err(FactoryError::UnknownValidator(name)) = result {
            assert_eq!(name, "fccv.check_everything");
        } else {
            panic!("Expected UnknownValidator error");
        }
    }

    #[test]
    fn test_missing_akismet_key() {
        let result = create_validator(&ValidatorConfig::named("akismet"), &cfg());
        assert!(matches!(
            result,
            Err(FactoryError::MissingCredential {
                setting: "akismet_key",
                ..
            })
        ));

        let mut blank = cfg();
        blank.typepad_key = Some("  ".to_string());
        assert!(create_validator(&ValidatorConfig::named("typepad"), &blank).is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        let mut parameters = serde_json::Map::new();
        parameters.insert("threshold".to_string(), json!("lots"));
        let config = ValidatorConfig {
            name: "link_limit".to_string(),
            parameters,
        };
        assert!(matches!(
            create_validator(&config, &cfg()),
            Err(FactoryError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_default_chain_when_unset() {
        let chain = create_validator_chain(&cfg()).unwrap();
        assert_eq!(
            chain.validator_names(),
            vec!["email", "ip", "link_limit", "name", "text", "url"]
        );
        assert_eq!(
            chain.validator_names(),
            ValidatorChain::default().validator_names()
        );
    }

    #[test]
    fn test_explicitly_empty_chain() {
        let mut cfg = cfg();
        cfg.validators = Some(Vec::new());
        assert!(create_validator_chain(&cfg).unwrap().is_empty());
    }

    #[test]
    fn test_custom_chain_keeps_order() {
        let mut cfg = cfg();
        cfg.validators = Some(vec![
            ValidatorConfig::named("url"),
            ValidatorConfig::named("blacklist"),
            ValidatorConfig::named("ip"),
        ]);
        let chain = create_validator_chain(&cfg).unwrap();
        assert_eq!(chain.validator_names(), vec!["url", "blacklist", "ip"]);
    }

    #[test]
    fn test_duplicate_validator_rejected() {
        let mut cfg = cfg();
        cfg.validators = Some(vec![
            ValidatorConfig::named("ip"),
            ValidatorConfig::named("url"),
            ValidatorConfig::named("ip"),
        ]);
        match create_validator_chain(&cfg) {
            Err(FactoryError::InvalidParameters(msg)) => assert!(msg.contains("ip")),
            Ok(chain) => panic!("expected an error, got {:?}", chain.validator_names()),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_chain_with_unknown_validator_fails() {
        let mut cfg = cfg();
        cfg.validators = Some(vec![
            ValidatorConfig::named("ip"),
            ValidatorConfig::named("bogus"),
        ]);
        assert!(create_validator_chain(&cfg).is_err());
    }
}
