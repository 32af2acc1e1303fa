use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TARGET_SCORE: f64 = 0.8;
const DEFAULT_JUDGMENT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RECEIPT_COMPANIES: &str = "home_depot,amazon,walmart";

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

/// Top-level configuration for the claim validation service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub validation: ValidationSettings,
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
            validation: ValidationSettings::from_env()?,
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

/// Knobs for the progressive validation loop and its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationSettings {
    pub target_score: f64,
    /// Present when an external judgment service should score claims.
    pub judgment: Option<JudgmentSettings>,
    pub receipts: ReceiptSettings,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            target_score: DEFAULT_TARGET_SCORE,
            judgment: None,
            receipts: ReceiptSettings::default(),
        }
    }
}

impl ValidationSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let target_score = match non_empty_var("CLAIMS_TARGET_SCORE") {
            Some(raw) => parse_target_score(&raw)?,
            None => DEFAULT_TARGET_SCORE,
        };

        let judgment = match non_empty_var("CLAIMS_JUDGMENT_URL") {
            Some(base_url) => Some(JudgmentSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout: timeout_var(
                    "CLAIMS_JUDGMENT_TIMEOUT_SECS",
                    DEFAULT_JUDGMENT_TIMEOUT_SECS,
                )?,
            }),
            None => None,
        };

        let companies = non_empty_var("CLAIMS_RECEIPT_COMPANIES")
            .unwrap_or_else(|| DEFAULT_RECEIPT_COMPANIES.to_string());

        Ok(Self {
            target_score,
            judgment,
            receipts: ReceiptSettings {
                csv_path: non_empty_var("CLAIMS_RECEIPTS_CSV").map(PathBuf::from),
                companies: parse_companies(&companies),
                timeout: timeout_var("CLAIMS_RECEIPT_TIMEOUT_SECS", DEFAULT_RECEIPT_TIMEOUT_SECS)?,
            },
        })
    }
}

/// Location and deadline of the external judgment service.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgmentSettings {
    pub base_url: String,
    pub timeout: Duration,
}

/// Purchase history lookup settings used by the receipt enhancement stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptSettings {
    pub csv_path: Option<PathBuf>,
    pub companies: Vec<String>,
    pub timeout: Duration,
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        Self {
            csv_path: None,
            companies: parse_companies(DEFAULT_RECEIPT_COMPANIES),
            timeout: Duration::from_secs(DEFAULT_RECEIPT_TIMEOUT_SECS),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_target_score(raw: &str) -> Result<f64, ConfigError> {
    match raw.parse::<f64>() {
        Ok(score) if score > 0.0 && score <= 1.0 => Ok(score),
        _ => Err(ConfigError::InvalidTargetScore(raw.to_string())),
    }
}

fn timeout_var(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    match non_empty_var(name) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::InvalidTimeout { variable: name }),
        },
        None => Ok(Duration::from_secs(default_secs)),
    }
}

fn parse_companies(raw: &str) -> Vec<String> {
    let mut companies: Vec<String> = Vec::new();
    for company in raw.split(',') {
        let company = company.trim().to_ascii_lowercase();
        if !company.is_empty() && !companies.contains(&company) {
            companies.push(company);
        }
    }
    companies
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTargetScore(String),
    InvalidTimeout { variable: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTargetScore(value) => write!(
                f,
                "CLAIMS_TARGET_SCORE must be a number in (0, 1], got '{value}'"
            ),
            ConfigError::InvalidTimeout { variable } => {
                write!(f, "{variable} must be a positive number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTargetScore(_)
            | ConfigError::InvalidTimeout { .. } => None,
        }
    }
}
