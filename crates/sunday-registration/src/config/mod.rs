use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono_tz::Tz;

use crate::workflows::registration::{
    CommunityDirectory, CommunityId, RegistrationSettings, SundayResolver, DEFAULT_CUTOFF_HOUR,
    DEFAULT_SESSION_LABEL,
};

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
    pub registration: RegistrationConfig,
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
            registration: RegistrationConfig::from_env()?,
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

/// Registration intake settings: cutoff, timezone, communities, and storage.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    pub cutoff_hour: u32,
    pub timezone: Tz,
    pub session_label: String,
    pub default_community: CommunityId,
    pub communities: Vec<CommunityId>,
    pub data_dir: PathBuf,
    pub notify_attempts: u8,
}

impl RegistrationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let cutoff_hour = match env::var("APP_CUTOFF_HOUR") {
            Ok(raw) => parse_cutoff_hour(&raw)?,
            Err(_) => DEFAULT_CUTOFF_HOUR,
        };

        let timezone = match env::var("APP_TIMEZONE") {
            Ok(raw) => parse_timezone(&raw)?,
            Err(_) => chrono_tz::UTC,
        };

        let session_label = env::var("APP_SESSION_LABEL")
            .ok()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_LABEL.to_string());

        let communities: Vec<CommunityId> = env::var("APP_COMMUNITIES")
            .unwrap_or_else(|_| "main".to_string())
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(CommunityId::new)
            .collect();
        if communities.is_empty() {
            return Err(ConfigError::NoCommunities);
        }

        let default_community = match env::var("APP_DEFAULT_COMMUNITY") {
            Ok(raw) => {
                let requested = CommunityId::new(&raw);
                if !communities.contains(&requested) {
                    return Err(ConfigError::UnknownDefaultCommunity(requested.0));
                }
                requested
            }
            Err(_) => communities[0].clone(),
        };

        let data_dir = env::var("APP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let notify_attempts = match env::var("APP_NOTIFY_ATTEMPTS") {
            Ok(raw) => raw
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|attempts| (1..=5).contains(attempts))
                .ok_or(ConfigError::InvalidNotifyAttempts)?,
            Err(_) => 1,
        };

        Ok(Self {
            cutoff_hour,
            timezone,
            session_label,
            default_community,
            communities,
            data_dir,
            notify_attempts,
        })
    }

    pub fn directory(&self) -> CommunityDirectory {
        CommunityDirectory::new(
            self.default_community.clone(),
            self.communities.iter().cloned(),
        )
    }

    pub fn resolver(&self) -> SundayResolver {
        SundayResolver::new(self.cutoff_hour, self.timezone)
    }

    pub fn settings(&self) -> RegistrationSettings {
        RegistrationSettings {
            directory: self.directory(),
            resolver: self.resolver(),
            default_session_label: self.session_label.clone(),
            notify_attempts: self.notify_attempts,
        }
    }
}

fn parse_cutoff_hour(raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|hour| *hour <= 23)
        .ok_or(ConfigError::InvalidCutoffHour)
}

/// IANA zone name such as `America/Chicago`.
pub fn parse_timezone(raw: &str) -> Result<Tz, ConfigError> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone {
            value: raw.to_string(),
        })
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCutoffHour,
    InvalidTimezone { value: String },
    NoCommunities,
    UnknownDefaultCommunity(String),
    InvalidNotifyAttempts,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCutoffHour => {
                write!(f, "APP_CUTOFF_HOUR must be an hour between 0 and 23")
            }
            ConfigError::InvalidTimezone { value } => {
                write!(f, "APP_TIMEZONE '{value}' is not an IANA timezone name")
            }
            ConfigError::NoCommunities => {
                write!(f, "APP_COMMUNITIES must name at least one community")
            }
            ConfigError::UnknownDefaultCommunity(name) => write!(
                f,
                "APP_DEFAULT_COMMUNITY '{name}' is not listed in APP_COMMUNITIES"
            ),
            ConfigError::InvalidNotifyAttempts => {
                write!(f, "APP_NOTIFY_ATTEMPTS must be between 1 and 5")
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
