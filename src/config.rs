use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Longest a link code may live
pub const MAX_CODE_TTL_SECS: u64 = 86_400;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub link_codes: LinkCodeConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP API port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkCodeConfig {
    /// Lifetime of an issued link code in seconds
    #[serde(default = "default_code_ttl_secs")]
    pub ttl_secs: u64,
    /// Tag prepended to every code so other flows sharing the bot can tell them apart
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,
    /// Key namespace inside the ephemeral store
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Redis URL; codes are kept in process memory when unset
    #[serde(default)]
    pub redis_url: Option<String>,
}

fn default_code_ttl_secs() -> u64 {
    600
}

fn default_code_prefix() -> String {
    "LT".to_string()
}

fn default_key_prefix() -> String {
    "lazy_trading:link_code".to_string()
}

impl Default for LinkCodeConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_code_ttl_secs(),
            code_prefix: default_code_prefix(),
            key_prefix: default_key_prefix(),
            redis_url: None,
        }
    }
}

impl LinkCodeConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token; handle lookups always fall back when unset
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Handle used when the bot cannot be asked for its own identity
    #[serde(default = "default_bot_handle")]
    pub default_handle: String,
    /// Bot API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Base of the deep link handed to the user
    #[serde(default = "default_deep_link_base")]
    pub deep_link_base: String,
    /// Upper bound for the handle lookup
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

fn default_bot_handle() -> String {
    "LazyTradingBot".to_string()
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_deep_link_base() -> String {
    "https://t.me".to_string()
}

fn default_lookup_timeout_ms() -> u64 {
    3000
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            default_handle: default_bot_handle(),
            api_base: default_api_base(),
            deep_link_base: default_deep_link_base(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl TelegramConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

// Keep the bot token out of logs.
impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("default_handle", &self.default_handle)
            .field("api_base", &self.api_base)
            .field("deep_link_base", &self.deep_link_base)
            .field("lookup_timeout_ms", &self.lookup_timeout_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("database.max_connections", 5)?
            .set_default("link_codes.ttl_secs", 600)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("LAZY_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (LAZY_TELEGRAM__BOT_TOKEN, etc.)
            .add_source(
                Environment::with_prefix("LAZY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Configuration for local runs backed by in-memory stores
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/lazy_onboard".to_string(),
                max_connections: default_max_connections(),
            },
            link_codes: LinkCodeConfig::default(),
            telegram: TelegramConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.link_codes.ttl_secs == 0 || self.link_codes.ttl_secs > MAX_CODE_TTL_SECS {
            errors.push(format!(
                "link_codes.ttl_secs must be between 1 and {}",
                MAX_CODE_TTL_SECS
            ));
        }

        let prefix = &self.link_codes.code_prefix;
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push("link_codes.code_prefix must be non-empty ASCII alphanumeric".to_string());
        }

        if self.telegram.default_handle.trim().is_empty() {
            errors.push("telegram.default_handle cannot be empty".to_string());
        }

        if self.telegram.lookup_timeout_ms == 0 {
            errors.push("telegram.lookup_timeout_ms must be positive".to_string());
        }

        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
