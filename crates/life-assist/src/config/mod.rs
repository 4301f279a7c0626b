use chrono::Duration;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub journeys: JourneyConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            journeys: JourneyConfig::from_env()?,
        })
    }
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Ceiling for every retention window: vault and consent TTLs and consent retention.
pub const MAX_RETENTION_DAYS: u32 = 3650;

pub fn max_retention() -> Duration {
    Duration::days(i64::from(MAX_RETENTION_DAYS))
}

/// Retention windows and submission limits injected into the journey service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JourneyConfig {
    pub jurisdiction: String,
    pub vault_ttl: Duration,
    pub consent_ttl: Duration,
    pub consent_retention: Duration,
    pub executor_timeout: std::time::Duration,
    pub max_submission_attempts: u32,
    pub cleanup_interval: std::time::Duration,
}

impl Default for JourneyConfig {
    fn default() -> Self {
        Self {
            jurisdiction: "NSW".to_string(),
            vault_ttl: Duration::days(30),
            consent_ttl: Duration::days(30),
            consent_retention: Duration::days(90),
            executor_timeout: std::time::Duration::from_secs(30),
            max_submission_attempts: 3,
            cleanup_interval: std::time::Duration::from_secs(3600),
        }
    }
}

impl JourneyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let jurisdiction = env::var("JOURNEY_JURISDICTION")
            .map(|value| value.trim().to_ascii_uppercase())
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.jurisdiction);

        let vault_days = read_days("VAULT_TTL_DAYS", 30)?;
        let consent_days = read_days("CONSENT_TTL_DAYS", 30)?;
        let retention_days = read_days("CONSENT_RETENTION_DAYS", 90)?;
        let timeout_secs = read_positive("EXECUTOR_TIMEOUT_SECS", 30)?;
        let attempts = read_positive("MAX_SUBMISSION_ATTEMPTS", 3)?;
        let cleanup_secs = read_positive("CLEANUP_INTERVAL_SECS", 3600)?;

        Ok(Self {
            jurisdiction,
            vault_ttl: Duration::days(i64::from(vault_days)),
            consent_ttl: Duration::days(i64::from(consent_days)),
            consent_retention: Duration::days(i64::from(retention_days)),
            executor_timeout: std::time::Duration::from_secs(timeout_secs as u64),
            max_submission_attempts: attempts,
            cleanup_interval: std::time::Duration::from_secs(cleanup_secs as u64),
        })
    }
}

fn read_positive(variable: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(variable) {
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidNumber { variable, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

fn read_days(variable: &'static str, default: u32) -> Result<u32, ConfigError> {
    let days = read_positive(variable, default)?;
    if days > MAX_RETENTION_DAYS {
        return Err(ConfigError::OutOfRange {
            variable,
            value: days,
            max: MAX_RETENTION_DAYS,
        });
    }
    Ok(days)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str, value: String },
    OutOfRange { variable: &'static str, value: u32, max: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable, value } => {
                write!(f, "{variable} must be a positive integer (got '{value}')")
            }
            ConfigError::OutOfRange { variable, value, max } => {
                write!(f, "{variable} must be at most {max} (got {value})")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::OutOfRange { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
