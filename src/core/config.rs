use crate::core::market::Symbol;
use crate::core::symbols;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
/// Page whose response sets the Yahoo session cookie.
pub const DEFAULT_YAHOO_SESSION_URL: &str = "https://fc.yahoo.com";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct YahooProviderConfig {
    pub base_url: String,
    /// Per-request timeout for provider calls.
    pub timeout_secs: Option<u64>,
    pub session_url: Option<String>,
}

impl YahooProviderConfig {
    pub fn session_url(&self) -> &str {
        self.session_url.as_deref().unwrap_or(DEFAULT_YAHOO_SESSION_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
                session_url: None,
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Base URL of the HTTP service the dashboard talks to.
    pub api_url: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            api_url: "http://127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// Loads the config from the default location, or built-in defaults when
    /// no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "nsedash", "nsedash")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn yahoo(&self) -> YahooProviderConfig {
        self.providers.yahoo.clone().unwrap_or(YahooProviderConfig {
            base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            timeout_secs: None,
            session_url: None,
        })
    }

    /// The symbol list served to clients, free of duplicate tickers.
    pub fn curated_symbols(&self) -> Vec<Symbol> {
        if self.symbols.is_empty() {
            symbols::default_symbols()
        } else {
            symbols::dedupe(self.symbols.clone())
        }
    }
}
