use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use serde::Serialize;

const DEFAULT_TRACKER_API_BASE: &str = "https://www.meistertask.com/api";
const DEFAULT_MAIL_API_BASE: &str = "https://api.postmarkapp.com";
const DEFAULT_MAIL_FROM: &str = "HausWirtschaft <info@hauswirtschaft.at>";

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

/// Top-level configuration for the application, read once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub tracker: TrackerConfig,
    pub mail: Option<MailConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup so callers and
    /// tests are not tied to the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let environment = AppEnvironment::from_str(
            &lookup("APP_ENV").unwrap_or_else(|| "development".to_string()),
        );

        let host = lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("APP_PORT")
            .unwrap_or_else(|| "3000".to_string())
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = lookup("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let storage = match (lookup("STORAGE_LOCAL_DIR"), lookup("STORAGE_BUCKET")) {
            (Some(root), _) => StorageConfig::LocalDir {
                root: PathBuf::from(root),
            },
            (None, Some(bucket)) => StorageConfig::Bucket { bucket },
            (None, None) => return Err(ConfigError::Missing("STORAGE_BUCKET")),
        };

        let numeric = |key: &'static str| -> Result<u64, ConfigError> {
            let raw = lookup(key).ok_or(ConfigError::Missing(key))?;
            raw.trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::NotNumeric { key, value: raw })
        };

        let labels = LabelTable {
            interested: LabelId(numeric("TRACKER_LABEL_INTERESTED")?),
            from_website: LabelId(numeric("TRACKER_LABEL_FROM_WEBSITE")?),
            packages: [
                LabelId(numeric("TRACKER_LABEL_PACKAGE_1")?),
                LabelId(numeric("TRACKER_LABEL_PACKAGE_2")?),
                LabelId(numeric("TRACKER_LABEL_PACKAGE_3")?),
                LabelId(numeric("TRACKER_LABEL_PACKAGE_4")?),
            ],
            package_default: LabelId(numeric("TRACKER_LABEL_PACKAGE_DEFAULT")?),
        };

        let tracker = TrackerConfig {
            api_base: lookup("TRACKER_API_BASE")
                .unwrap_or_else(|| DEFAULT_TRACKER_API_BASE.to_string()),
            token: lookup("TRACKER_TOKEN").ok_or(ConfigError::Missing("TRACKER_TOKEN"))?,
            section_id: numeric("TRACKER_SECTION_ID")?,
            labels,
        };

        let mail = lookup("MAIL_API_TOKEN").map(|token| MailConfig {
            api_base: lookup("MAIL_API_BASE").unwrap_or_else(|| DEFAULT_MAIL_API_BASE.to_string()),
            token,
            from: lookup("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
        });

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage,
            tracker,
            mail,
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

/// Where raw submissions are archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Bucket { bucket: String },
    LocalDir { root: PathBuf },
}

/// Tracker API access and the label table applied to created tasks.
#[derive(Clone)]
pub struct TrackerConfig {
    pub api_base: String,
    pub token: String,
    pub section_id: u64,
    pub labels: LabelTable,
}

impl fmt::Debug for TrackerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackerConfig")
            .field("api_base", &self.api_base)
            .field("section_id", &self.section_id)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

/// Identifier of a label configured in the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LabelId(pub u64);

/// Fixed label ids, one per package tier plus the categorical labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    pub interested: LabelId,
    pub from_website: LabelId,
    pub packages: [LabelId; 4],
    pub package_default: LabelId,
}

impl LabelTable {
    /// Label for package tier `tier` (1-based); unknown tiers use the default.
    pub fn package(&self, tier: u8) -> LabelId {
        match tier {
            1..=4 => self.packages[usize::from(tier - 1)],
            _ => self.package_default,
        }
    }
}

/// Transactional mail API access. Absent when confirmations are disabled.
#[derive(Clone)]
pub struct MailConfig {
    pub api_base: String,
    pub token: String,
    pub from: String,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("api_base", &self.api_base)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    Missing(&'static str),
    NotNumeric { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::NotNumeric { key, value } => {
                write!(f, "{key} must be a numeric id (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::Missing(_)
            | ConfigError::NotNumeric { .. } => None,
        }
    }
}
