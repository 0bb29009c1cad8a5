//! Bulk loading of blacklists from a TOML seed file
//!
//! ```toml
//! [[blacklist]]
//! name = "pharmacy"
//! weight = 1.0
//! phrases = ["viagra", "cialis", "online pharmacy"]
//! ```

use super::ModerationStore;
use crate::error::{ConfigError, SieveError};
use serde::Deserialize;

fn default_weight() -> f64 {
    1.0
}

#[derive(Deserialize, Debug, Clone)]
pub struct SeedBlacklist {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub phrases: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SeedFile {
    #[serde(default)]
    pub blacklist: Vec<SeedBlacklist>,
}

impl SeedFile {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.to_string()))?;
        Self::from_toml(&text)
    }
}

/// Import every blacklist in `seed`, returning how many phrases were processed.
///
/// Existing blacklists keep their id and take the seed's weight; phrases that
/// are already present are left alone.
pub async fn import<S>(store: &S, seed: &SeedFile) -> Result<usize, SieveError>
where
    S: ModerationStore + ?Sized,
{
    let mut phrases = 0;
    for list in &seed.blacklist {
        store.add_blacklist(&list.name, list.weight).await?;
        store.set_blacklist_weight(&list.name, list.weight).await?;
        for phrase in list.phrases.iter().filter(|p| !p.trim().is_empty()) {
            store.add_phrase(&list.name, phrase).await?;
            phrases += 1;
        }
        tracing::info!(blacklist = %list.name, count = list.phrases.len(), "Imported blacklist");
    }
    Ok(phrases)
}
