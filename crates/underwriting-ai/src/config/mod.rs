use crate::workflows::underwriting::{DiscardHighRule, ReconciliationConfig};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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
    pub game: GameConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            game: GameConfig::from_env()?,
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

/// How triage notices leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriageDispatchMode {
    Disabled,
    Memory,
}

/// Game rules and data sources.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub reconciliation: ReconciliationConfig,
    pub properties_csv: Option<PathBuf>,
    pub predictions_json: Option<PathBuf>,
    pub triage_base_url: String,
    pub triage_dispatch: TriageDispatchMode,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            reconciliation: ReconciliationConfig::default(),
            properties_csv: None,
            predictions_json: None,
            triage_base_url: "http://localhost:5173".to_string(),
            triage_dispatch: TriageDispatchMode::Disabled,
        }
    }
}

impl GameConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let mut reconciliation = defaults.reconciliation;

        if let Ok(raw) = env::var("UW_EXPECTED_PROPERTIES") {
            reconciliation.expected_property_count = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|count| *count > 0)
                .ok_or(ConfigError::InvalidExpectedProperties(raw))?;
        }

        if let Ok(raw) = env::var("UW_TOP_DRIVERS") {
            reconciliation.top_driver_count = raw
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidTopDrivers(raw))?;
        }

        if let Ok(raw) = env::var("UW_DISCARD_HIGH_RULE") {
            reconciliation.discard_high_rule = DiscardHighRule::parse(&raw)
                .ok_or(ConfigError::InvalidDiscardHighRule(raw))?;
        }

        let triage_dispatch = match env::var("TRIAGE_DISPATCH") {
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "" | "disabled" | "off" => TriageDispatchMode::Disabled,
                "memory" => TriageDispatchMode::Memory,
                _ => return Err(ConfigError::InvalidTriageDispatch(raw)),
            },
            Err(_) => defaults.triage_dispatch,
        };

        Ok(Self {
            reconciliation,
            properties_csv: non_empty_path("UW_PROPERTIES_CSV"),
            predictions_json: non_empty_path("UW_PREDICTIONS_JSON"),
            triage_base_url: env::var("TRIAGE_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.triage_base_url),
            triage_dispatch,
        })
    }
}

impl GameConfig {
    /// Every catalog property is scored, so the denominator must cover the whole round.
    pub fn ensure_covers_catalog(&self, catalog_len: usize) -> Result<(), ConfigError> {
        let expected = self.reconciliation.expected_property_count;
        if expected < catalog_len {
            return Err(ConfigError::ExpectedPropertiesBelowCatalog {
                expected,
                catalog: catalog_len,
            });
        }
        Ok(())
    }
}

fn non_empty_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidExpectedProperties(String),
    InvalidTopDrivers(String),
    InvalidDiscardHighRule(String),
    InvalidTriageDispatch(String),
    ExpectedPropertiesBelowCatalog { expected: usize, catalog: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidExpectedProperties(raw) => write!(
                f,
                "UW_EXPECTED_PROPERTIES must be a positive integer (got '{raw}')"
            ),
            ConfigError::InvalidTopDrivers(raw) => {
                write!(f, "UW_TOP_DRIVERS must be an integer (got '{raw}')")
            }
            ConfigError::InvalidDiscardHighRule(raw) => write!(
                f,
                "UW_DISCARD_HIGH_RULE must be one of always, never, legacy_only (got '{raw}')"
            ),
            ConfigError::InvalidTriageDispatch(raw) => write!(
                f,
                "TRIAGE_DISPATCH must be 'disabled' or 'memory' (got '{raw}')"
            ),
            ConfigError::ExpectedPropertiesBelowCatalog { expected, catalog } => write!(
                f,
                "UW_EXPECTED_PROPERTIES is {expected} but the catalog holds {catalog} properties"
            ),
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
