use crate::core::holding::Holding;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct YahooProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl YahooProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig::default()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_quote_ttl_secs")]
    pub quote_ttl_secs: u64,
    #[serde(default = "default_fundamentals_ttl_secs")]
    pub fundamentals_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            quote_ttl_secs: default_quote_ttl_secs(),
            fundamentals_ttl_secs: default_fundamentals_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn quote_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.quote_ttl_secs as i64)
    }

    pub fn fundamentals_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.fundamentals_ttl_secs as i64)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            interval_secs: default_interval_secs(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Listen address, with the `PORT` environment variable taking precedence
    /// over the configured port.
    pub fn bind_addr(&self) -> String {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(self.port);
        format!("{}:{}", self.host, port)
    }
}

fn default_base_url() -> String {
    DEFAULT_YAHOO_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retries() -> usize {
    1
}

fn default_retry_delay_ms() -> u64 {
    250
}

fn default_quote_ttl_secs() -> u64 {
    10
}

fn default_fundamentals_ttl_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    15
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    pub holdings: Vec<Holding>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "pfdash", "pfdash")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!(holdings = config.holdings.len(), "Successfully loaded config");
        Ok(config)
    }

    /// Yahoo settings, falling back to defaults when the section is absent.
    pub fn yahoo(&self) -> YahooProviderConfig {
        self.providers.yahoo.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
holdings:
  - particulars: "HDFC Bank"
    symbol: "HDFCBANK"
    exchange: "NSE"
    purchasePrice: 1490.10
    quantity: 50
    sector: "Financials"
  - particulars: "Infosys"
    symbol: "INFY"
    exchange: "NSE"
    purchase_price: 1450.35
    quantity: 12.5
    sector: "Technology"
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
    retries: 3
cache:
  quote_ttl_secs: 5
refresh:
  interval_secs: 30
server:
  port: 8080
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.holdings.len(), 2);
        assert_eq!(config.holdings[0].symbol, "HDFCBANK");
        assert_eq!(config.holdings[0].purchase_price, dec!(1490.10));
        assert_eq!(config.holdings[1].purchase_price, dec!(1450.35));
        assert_eq!(config.holdings[1].quantity, dec!(12.5));

        let yahoo = config.yahoo();
        assert_eq!(yahoo.base_url, "http://example.com/yahoo");
        assert_eq!(yahoo.retries, 3);
        assert_eq!(yahoo.timeout_secs, 10);

        assert_eq!(config.cache.quote_ttl_secs, 5);
        assert_eq!(config.cache.fundamentals_ttl_secs, 30);
        assert_eq!(config.refresh.interval(), Duration::from_secs(30));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_optional_sections_default() {
        let config: AppConfig = serde_yaml::from_str("holdings: []").unwrap();
        assert!(config.holdings.is_empty());
        assert_eq!(config.yahoo(), YahooProviderConfig::default());
        assert_eq!(config.cache.quote_ttl(), chrono::Duration::seconds(10));
        assert_eq!(config.cache.fundamentals_ttl(), chrono::Duration::seconds(30));
        assert_eq!(config.refresh.interval(), Duration::from_secs(15));
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_missing_holdings_is_an_error() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("server:\n  port: 5000\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_path_reports_file() {
        let err = AppConfig::load_from_path("/nonexistent/pfdash.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/pfdash.yaml"));
    }
}
