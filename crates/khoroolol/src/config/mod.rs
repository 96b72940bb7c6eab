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
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    pub mailer: MailerConfig,
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

        let database = DatabaseConfig {
            uri: env::var("MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://127.0.0.1:27017".to_string()),
            database: env::var("MONGODB_DATABASE").unwrap_or_else(|_| "khoroolol".to_string()),
        };

        let media = MediaConfig {
            upload_url: env::var("MEDIA_UPLOAD_URL")
                .unwrap_or_else(|_| "https://media.khoroolol.mn/upload".to_string()),
            delete_url: env::var("MEDIA_DELETE_URL")
                .unwrap_or_else(|_| "https://media.khoroolol.mn/resources/destroy".to_string()),
            upload_preset: env::var("MEDIA_UPLOAD_PRESET")
                .unwrap_or_else(|_| "khoroolol-listings".to_string()),
            api_key: env::var("MEDIA_API_KEY").unwrap_or_default(),
            api_secret: env::var("MEDIA_API_SECRET").unwrap_or_default(),
        };

        let mailer = MailerConfig {
            endpoint: env::var("MAILER_ENDPOINT")
                .unwrap_or_else(|_| "https://api.mailer.khoroolol.mn/v1/send".to_string()),
            api_key: env::var("MAILER_API_KEY").unwrap_or_default(),
            sender: env::var("MAILER_FROM").unwrap_or_else(|_| "noreply@khoroolol.mn".to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            database,
            media,
            mailer,
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

/// Document-store connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub database: String,
}

/// Hosted media-CDN settings used by the property mutation path.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub upload_url: String,
    pub delete_url: String,
    pub upload_preset: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Transactional email delivery settings.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub endpoint: String,
    pub api_key: String,
    pub sender: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
