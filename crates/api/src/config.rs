use domain::CardSettings;
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// Member session token verification
    pub jwt: JwtAuthConfig,
    #[serde(default)]
    pub cards: CardsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Per API key budget for all authenticated routes; 0 disables it.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,

    /// Separate, tighter per API key budget for card verification.
    #[serde(default = "default_verify_rate_limit")]
    pub verify_rate_limit_per_minute: u32,

    #[serde(default)]
    pub hsts_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtAuthConfig {
    /// RSA public key in PEM format of the member session issuer
    #[serde(default)]
    pub public_key: String,

    /// RSA private key in PEM format; only set where this service mints
    /// sessions itself (local tooling and tests)
    #[serde(default)]
    pub private_key: String,

    #[serde(default = "default_jwt_leeway")]
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardsConfig {
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,

    /// Base URL embedded in QR codes, e.g. `https://verify.example.com/cards`.
    #[serde(default)]
    pub verification_base_url: Option<String>,

    #[serde(default)]
    pub verification_min_response_ms: u64,

    #[serde(default = "default_analytics_window_days")]
    pub analytics_window_days: u32,
}

impl Default for CardsConfig {
    fn default() -> Self {
        Self {
            validity_days: default_validity_days(),
            verification_base_url: None,
            verification_min_response_ms: 0,
            analytics_window_days: default_analytics_window_days(),
        }
    }
}

impl From<&CardsConfig> for CardSettings {
    fn from(config: &CardsConfig) -> Self {
        Self {
            validity_days: config.validity_days,
            verification_base_url: config
                .verification_base_url
                .clone()
                .filter(|url| !url.trim().is_empty()),
            verification_min_response_ms: config.verification_min_response_ms,
            analytics_window_days: config.analytics_window_days,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_rate_limit() -> u32 {
    100
}
fn default_verify_rate_limit() -> u32 {
    30
}
fn default_jwt_leeway() -> u64 {
    30
}
fn default_validity_days() -> u32 {
    730
}
fn default_analytics_window_days() -> u32 {
    30
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml
    /// 2. config/local.toml (optional, not in git)
    /// 3. Environment variables with MC__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("MC").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Builds a config from embedded defaults plus overrides, without files.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            rate_limit_per_minute = 100
            verify_rate_limit_per_minute = 30

            [jwt]
            public_key = ""
            leeway_secs = 30

            [cards]
            validity_days = 730
            verification_min_response_ms = 0
            analytics_window_days = 30
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "MC__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.server.host.parse::<std::net::IpAddr>().is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Server host '{}' is not an IP address",
                self.server.host
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.cards.validity_days == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "cards.validity_days must be greater than 0".to_string(),
            ));
        }

        if self.cards.analytics_window_days == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "cards.analytics_window_days must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Listen address. `validate` guarantees the host parses.
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self
            .server
            .host
            .parse()
            .unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
        SocketAddr::new(ip, self.server.port)
    }

    pub fn card_settings(&self) -> CardSettings {
        (&self.cards).into()
    }
}
