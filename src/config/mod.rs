use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::payroll::settings::PayrollSettings;

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
    pub payroll: PayrollSettings,
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

        let mut payroll = PayrollSettings::default();
        if let Ok(raw) = env::var("PAYROLL_RETENTION_RATE") {
            payroll.retention_rate = parse_rate("PAYROLL_RETENTION_RATE", &raw)?;
        }
        if let Ok(raw) = env::var("PAYROLL_COVER_RATE") {
            payroll.cover_rate = raw.trim().parse::<f64>().map_err(|_| ConfigError::InvalidNumber {
                variable: "PAYROLL_COVER_RATE",
            })?;
        }
        if let Ok(raw) = env::var("PAYROLL_WEEKS_PER_PERIOD") {
            payroll.weeks_per_period =
                raw.trim().parse::<u32>().map_err(|_| ConfigError::InvalidNumber {
                    variable: "PAYROLL_WEEKS_PER_PERIOD",
                })?;
            if payroll.weeks_per_period == 0 {
                return Err(ConfigError::InvalidNumber {
                    variable: "PAYROLL_WEEKS_PER_PERIOD",
                });
            }
        }
        if let Ok(city) = env::var("PAYROLL_CAPITAL_CITY") {
            payroll.capital_city = city.trim().to_string();
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            payroll,
        })
    }
}

fn parse_rate(variable: &'static str, raw: &str) -> Result<f64, ConfigError> {
    let rate = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidNumber { variable })?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::RateOutOfRange { variable });
    }
    Ok(rate)
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

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str },
    RateOutOfRange { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must parse to a positive number")
            }
            ConfigError::RateOutOfRange { variable } => {
                write!(f, "{variable} must fall between 0.0 and 1.0")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("PAYROLL_RETENTION_RATE");
        env::remove_var("PAYROLL_COVER_RATE");
        env::remove_var("PAYROLL_WEEKS_PER_PERIOD");
        env::remove_var("PAYROLL_CAPITAL_CITY");
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.payroll.weeks_per_period, 4);
        assert!((config.payroll.cover_rate - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn retention_rate_override_is_validated() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PAYROLL_RETENTION_RATE", "0.07");
        let config = AppConfig::load().expect("config loads");
        assert!((config.payroll.retention_rate - 0.07).abs() < f64::EPSILON);

        env::set_var("PAYROLL_RETENTION_RATE", "1.7");
        let error = AppConfig::load().expect_err("rate above 1.0 rejected");
        assert!(error.to_string().contains("PAYROLL_RETENTION_RATE"));
        reset_env();
    }
}
