use crate::persistence::{FileStore, KeyValueStore, MemoryStore, PersistenceError};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_THINKING_BUDGET: u32 = 24_000;
pub const DEFAULT_LLM_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug)]
pub enum ConfigError {
    Invalid { var: &'static str, value: String },
    Store(PersistenceError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { var, value } => write!(f, "invalid value for {var}: '{value}'"),
            ConfigError::Store(err) => write!(f, "failed to open store: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<PersistenceError> for ConfigError {
    fn from(value: PersistenceError) -> Self {
        ConfigError::Store(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    File,
    #[cfg(feature = "sqlite")]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub thinking_budget: u32,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            thinking_budget: DEFAULT_THINKING_BUDGET,
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterConfig {
    pub data_dir: PathBuf,
    pub store: StoreKind,
    pub http_addr: SocketAddr,
    pub log_json: bool,
    pub llm: LlmConfig,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("bar-roster-data"),
            store: StoreKind::File,
            http_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_json: false,
            llm: LlmConfig::default(),
        }
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            value: other.to_string(),
        }),
    }
}

fn parse_num<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

impl RosterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source; unset variables
    /// keep their defaults, malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(dir) = lookup("BAR_ROSTER_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(kind) = lookup("BAR_ROSTER_STORE") {
            config.store = match kind.trim().to_ascii_lowercase().as_str() {
                "file" => StoreKind::File,
                #[cfg(feature = "sqlite")]
                "sqlite" => StoreKind::Sqlite,
                "memory" => StoreKind::Memory,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "BAR_ROSTER_STORE",
                        value: kind,
                    });
                }
            };
        }
        if let Some(addr) = lookup("BAR_ROSTER_HTTP_ADDR") {
            config.http_addr = parse_num("BAR_ROSTER_HTTP_ADDR", &addr)?;
        }
        if let Some(flag) = lookup("BAR_ROSTER_LOG_JSON") {
            config.log_json = parse_bool("BAR_ROSTER_LOG_JSON", &flag)?;
        }
        config.llm.api_key = lookup("GEMINI_API_KEY").or_else(|| lookup("API_KEY"));
        if let Some(model) = lookup("BAR_ROSTER_MODEL") {
            config.llm.model = model;
        }
        if let Some(budget) = lookup("BAR_ROSTER_THINKING_BUDGET") {
            config.llm.thinking_budget = parse_num("BAR_ROSTER_THINKING_BUDGET", &budget)?;
        }
        if let Some(endpoint) = lookup("BAR_ROSTER_LLM_ENDPOINT") {
            config.llm.endpoint = endpoint;
        }
        if let Some(timeout) = lookup("BAR_ROSTER_LLM_TIMEOUT_SECS") {
            config.llm.timeout_secs = parse_num("BAR_ROSTER_LLM_TIMEOUT_SECS", &timeout)?;
        }
        Ok(config)
    }

    pub fn open_store(&self) -> Result<Box<dyn KeyValueStore + Send + Sync>, ConfigError> {
        Ok(match self.store {
            StoreKind::File => Box::new(FileStore::new(&self.data_dir)?),
            #[cfg(feature = "sqlite")]
            StoreKind::Sqlite => {
                std::fs::create_dir_all(&self.data_dir).map_err(PersistenceError::from)?;
                Box::new(crate::persistence::sqlite::SqliteStore::new(
                    self.data_dir.join("bar-roster.db"),
                )?)
            }
            StoreKind::Memory => Box::new(MemoryStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = RosterConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RosterConfig::default());
        assert_eq!(config.llm.model, "gemini-3-pro-preview");
        assert_eq!(config.llm.thinking_budget, 24_000);
    }

    #[test]
    fn api_key_falls_back_to_generic_variable() {
        let config = RosterConfig::from_lookup(lookup(&[("API_KEY", "k1")])).unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("k1"));
        let config =
            RosterConfig::from_lookup(lookup(&[("API_KEY", "k1"), ("GEMINI_API_KEY", "k2")]))
                .unwrap();
        assert_eq!(config.llm.api_key.as_deref(), Some("k2"));
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(RosterConfig::from_lookup(lookup(&[("BAR_ROSTER_HTTP_ADDR", "nope")])).is_err());
        assert!(RosterConfig::from_lookup(lookup(&[("BAR_ROSTER_LOG_JSON", "maybe")])).is_err());
        assert!(RosterConfig::from_lookup(lookup(&[("BAR_ROSTER_STORE", "s3")])).is_err());
    }
}
