use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_FOURPM_BASE_URL: &str = "https://api2.4pm.ie";
const DEFAULT_ACQUAINT_BASE_URL: &str = "https://www.acquaintcrm.co.uk/datafeeds/standardxml";
const DEFAULT_MYHOME_BASE_URL: &str = "https://agentapi.myhome.ie";
const PRODUCTION_DAFT_BASE_URL: &str = "https://daftapi.4pm.ie";
const LOCAL_DAFT_BASE_URL: &str = "http://localhost:5050";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub feeds: FeedConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_url = non_empty_var("DATABASE_URL");

        let token_ttl_hours = match non_empty_var("TOKEN_TTL_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or(ConfigError::InvalidTokenTtl)?,
            None => 24,
        };

        let daft_default = match environment {
            AppEnvironment::Production => PRODUCTION_DAFT_BASE_URL,
            _ => LOCAL_DAFT_BASE_URL,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database: DatabaseConfig { url: database_url },
            auth: AuthConfig {
                secret_key: non_empty_var("SECRET_KEY"),
                token_ttl_hours,
            },
            feeds: FeedConfig {
                fourpm_base_url: base_url_var("FOURPM_API_BASE_URL", DEFAULT_FOURPM_BASE_URL),
                agency_directory_key: non_empty_var("FOURPM_AGENCY_KEY"),
                acquaint_base_url: base_url_var(
                    "ACQUAINT_FEED_BASE_URL",
                    DEFAULT_ACQUAINT_BASE_URL,
                ),
                myhome_base_url: base_url_var("MYHOME_API_BASE_URL", DEFAULT_MYHOME_BASE_URL),
                daft_base_url: base_url_var("DAFT_API_BASE_URL", daft_default),
            },
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn base_url_var(name: &str, default: &str) -> String {
    non_empty_var(name)
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Storage selection. `None` keeps everything in process memory.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
}

/// Token signing settings. A missing secret leaves auth endpoints unconfigured
/// rather than failing startup.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_key: Option<String>,
    pub token_ttl_hours: i64,
}

/// Base URLs and credentials for the third-party listing sources.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub fourpm_base_url: String,
    pub agency_directory_key: Option<String>,
    pub acquaint_base_url: String,
    pub myhome_base_url: String,
    pub daft_base_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            fourpm_base_url: DEFAULT_FOURPM_BASE_URL.to_string(),
            agency_directory_key: None,
            acquaint_base_url: DEFAULT_ACQUAINT_BASE_URL.to_string(),
            myhome_base_url: DEFAULT_MYHOME_BASE_URL.to_string(),
            daft_base_url: LOCAL_DAFT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTokenTtl,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTokenTtl => {
                write!(f, "TOKEN_TTL_HOURS must be a positive number of hours")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidTokenTtl => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
