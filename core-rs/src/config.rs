/**
 * config.rs
 * Prez configuration file (YAML) with environment overrides
 *
 * Format:
 * ```yaml
 * systemUri: https://example.com
 * enabledPrezs: [VocPrez, SpacePrez]
 * stores:
 *   VocPrez:
 *     endpoint: http://localhost:3030/vocabs
 *     timeoutSecs: 30
 * labelLanguages: [en, en-AU]
 * profiles: [profiles/vocprez.ttl]
 * ```
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{
    CacheCapacities, DEFAULT_IDENTITY_CAPACITY, DEFAULT_ITEM_QUERY_CAPACITY, DEFAULT_PREDICATE_CAPACITY,
};
use crate::errors::{PrezError, Result};
use crate::profiles::DEFAULT_BNODE_DEPTH;
use crate::store::remote::DEFAULT_TIMEOUT_SECS;
use crate::store::RemoteStoreConfig;
use crate::vocab;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrezConfig {
    #[serde(default = "default_system_uri")]
    pub system_uri: String,
    #[serde(default = "default_enabled_prezs")]
    pub enabled_prezs: Vec<String>,
    /// Store per Prez name, e.g. "VocPrez"
    #[serde(default)]
    pub stores: BTreeMap<String, StoreConfig>,
    #[serde(default = "default_text_index_predicate")]
    pub text_index_predicate: String,
    #[serde(default = "default_label_languages")]
    pub label_languages: Vec<String>,
    #[serde(default = "default_bnode_depth")]
    pub default_bnode_depth: u32,
    /// Empty means the built-in general classes
    #[serde(default)]
    pub general_classes: Vec<String>,
    #[serde(default = "default_search_predicates")]
    pub search_predicates: Vec<String>,
    #[serde(default)]
    pub cache: CacheConfig,
    /// Turtle files holding profile and shape definitions
    #[serde(default)]
    pub profiles: Vec<PathBuf>,
}

/// SPARQL endpoint settings for one Prez
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn remote(&self) -> RemoteStoreConfig {
        let mut config =
            RemoteStoreConfig::new(self.endpoint.clone()).with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            config = config.with_credentials(username, self.password.clone().unwrap_or_default());
        }
        config
    }
}

/// Memoization cache capacities
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    pub item_queries: usize,
    pub listing_predicates: usize,
    pub item_predicates: usize,
    pub identities: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            item_queries: DEFAULT_ITEM_QUERY_CAPACITY,
            listing_predicates: DEFAULT_PREDICATE_CAPACITY,
            item_predicates: DEFAULT_PREDICATE_CAPACITY,
            identities: DEFAULT_IDENTITY_CAPACITY,
        }
    }
}

impl From<CacheConfig> for CacheCapacities {
    fn from(config: CacheConfig) -> Self {
        CacheCapacities {
            item_queries: config.item_queries,
            listing_predicates: config.listing_predicates,
            item_predicates: config.item_predicates,
            identities: config.identities,
        }
    }
}

fn default_system_uri() -> String {
    "localhost".to_string()
}

fn default_enabled_prezs() -> Vec<String> {
    vec!["VocPrez".to_string(), "SpacePrez".to_string()]
}

fn default_text_index_predicate() -> String {
    vocab::JENA_TEXT_QUERY.to_string()
}

fn default_label_languages() -> Vec<String> {
    vec!["en".to_string(), "en-AU".to_string()]
}

fn default_bnode_depth() -> u32 {
    DEFAULT_BNODE_DEPTH
}

fn default_search_predicates() -> Vec<String> {
    vec![
        vocab::RDFS_LABEL.as_str().to_string(),
        vocab::RDFS_COMMENT.as_str().to_string(),
    ]
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for PrezConfig {
    fn default() -> Self {
        Self {
            system_uri: default_system_uri(),
            enabled_prezs: default_enabled_prezs(),
            stores: BTreeMap::new(),
            text_index_predicate: default_text_index_predicate(),
            label_languages: default_label_languages(),
            default_bnode_depth: default_bnode_depth(),
            general_classes: Vec::new(),
            search_predicates: default_search_predicates(),
            cache: CacheConfig::default(),
            profiles: Vec::new(),
        }
    }
}

impl PrezConfig {
    /// Load a YAML config file. Relative profile paths resolve against the
    /// file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PrezError::Config(format!("config file not found: {}", path.display())));
        }
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        if let Some(base) = path.parent() {
            config.profiles = config
                .profiles
                .into_iter()
                .map(|p| if p.is_relative() { base.join(p) } else { p })
                .collect();
        }
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: PrezConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `SYSTEM_URI`, `ENABLED_PREZS` (JSON array) and per-Prez
    /// `SPARQL_ENDPOINT_<PREZ>`, `SPARQL_USERNAME_<PREZ>`, `SPARQL_PASSWORD_<PREZ>`
    /// from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(system_uri) = lookup("SYSTEM_URI") {
            self.system_uri = system_uri;
        }
        if let Some(enabled) = lookup("ENABLED_PREZS") {
            self.enabled_prezs = serde_json::from_str(&enabled)
                .map_err(|e| PrezError::Config(format!("ENABLED_PREZS must be a JSON array of names: {}", e)))?;
        }
        for prez in &self.enabled_prezs {
            let suffix = prez.to_uppercase();
            if let Some(endpoint) = lookup(&format!("SPARQL_ENDPOINT_{}", suffix)) {
                let store = self.stores.entry(prez.clone()).or_insert_with(|| StoreConfig {
                    endpoint: String::new(),
                    username: None,
                    password: None,
                    timeout_secs: DEFAULT_TIMEOUT_SECS,
                });
                store.endpoint = endpoint;
            }
            if let Some(store) = self.stores.get_mut(prez) {
                if let Some(username) = lookup(&format!("SPARQL_USERNAME_{}", suffix)) {
                    store.username = Some(username);
                }
                if let Some(password) = lookup(&format!("SPARQL_PASSWORD_{}", suffix)) {
                    store.password = Some(password);
                }
            }
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.text_index_predicate.is_empty() {
            return Err(PrezError::Config("textIndexPredicate cannot be empty".to_string()));
        }
        for (name, store) in &self.stores {
            if store.endpoint.is_empty() {
                return Err(PrezError::Config(format!("store {} has no endpoint", name)));
            }
        }
        Ok(())
    }

    /// Configured general classes, or the built-in list when none are given
    pub fn general_classes(&self) -> Vec<String> {
        if self.general_classes.is_empty() {
            vocab::DEFAULT_GENERAL_CLASSES.iter().map(|c| c.to_string()).collect()
        } else {
            self.general_classes.clone()
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)?;
        Ok(())
    }
}
