use crate::contests::leaderboard::RefreshConfig;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

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
    pub refresh: RefreshSettings,
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

        let refresh = RefreshSettings {
            interval_secs: positive_secs("APP_REFRESH_INTERVAL_SECS", 30)?,
            metrics_deadline_secs: positive_secs("APP_METRICS_DEADLINE_SECS", 10)?,
            pulse_interval_secs: optional_secs("APP_PULSE_INTERVAL_SECS", Some(5))?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            refresh,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Cadence controls for the live refresh loops, expressed in whole seconds
/// so they can come straight from the environment.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub interval_secs: u64,
    pub metrics_deadline_secs: u64,
    /// `None` disables growth pulses between full recomputes.
    pub pulse_interval_secs: Option<u64>,
}

impl RefreshSettings {
    pub fn to_refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            refresh_interval: Duration::from_secs(self.interval_secs),
            metrics_deadline: Duration::from_secs(self.metrics_deadline_secs),
            pulse_interval: self.pulse_interval_secs.map(Duration::from_secs),
            ..RefreshConfig::default()
        }
    }
}

fn positive_secs(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(name) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };

    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidDuration { variable: name }),
    }
}

fn optional_secs(name: &'static str, default: Option<u64>) -> Result<Option<u64>, ConfigError> {
    let value = match env::var(name) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };

    let trimmed = value.trim();
    if trimmed == "0" || trimmed.eq_ignore_ascii_case("off") {
        return Ok(None);
    }

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidDuration { variable: name })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDuration { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDuration { variable } => {
                write!(f, "{} must be a positive number of seconds", variable)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidDuration { .. } => None,
        }
    }
}
