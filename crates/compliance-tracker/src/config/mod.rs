use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::notifications::emailjs::DEFAULT_EMAILJS_ENDPOINT;
use crate::notifications::EmailJsConfig;
use crate::requirements::DEFAULT_WINDOW_DAYS;

pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000/files";

const EMAIL_VARS: [&str; 3] = [
    "EMAILJS_SERVICE_ID",
    "EMAILJS_TEMPLATE_ID",
    "EMAILJS_USER_ID",
];

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
    pub notifications: NotificationConfig,
    pub storage: StorageConfig,
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

        let public_base_url = env::var("BLOB_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            notifications: NotificationConfig::from_env()?,
            storage: StorageConfig {
                public_base_url: public_base_url.trim_end_matches('/').to_string(),
            },
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

/// Expiration scan behavior and, when configured, EmailJS delivery.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub window_days: i64,
    pub notify_once: bool,
    pub email: Option<EmailJsConfig>,
}

impl NotificationConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let window_days = match env::var("NOTIFY_WINDOW_DAYS") {
            Ok(value) => value
                .trim()
                .parse::<u32>()
                .map(i64::from)
                .map_err(|_| ConfigError::InvalidWindow { value })?,
            Err(_) => DEFAULT_WINDOW_DAYS,
        };

        let notify_once = match env::var("NOTIFY_ONCE") {
            Ok(value) => parse_flag(&value).ok_or(ConfigError::InvalidFlag {
                name: "NOTIFY_ONCE",
                value,
            })?,
            Err(_) => false,
        };

        Ok(Self {
            window_days,
            notify_once,
            email: email_from_env()?,
        })
    }
}

/// Where uploaded evidence is served from.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub public_base_url: String,
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn email_from_env() -> Result<Option<EmailJsConfig>, ConfigError> {
    let values: Vec<Option<String>> = EMAIL_VARS
        .iter()
        .map(|name| {
            env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
        .collect();

    if values.iter().all(Option::is_none) {
        return Ok(None);
    }

    let missing: Vec<&'static str> = EMAIL_VARS
        .iter()
        .zip(&values)
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::IncompleteEmail { missing });
    }

    let mut present = values.into_iter().flatten();
    let (Some(service_id), Some(template_id), Some(user_id)) =
        (present.next(), present.next(), present.next())
    else {
        return Err(ConfigError::IncompleteEmail {
            missing: EMAIL_VARS.to_vec(),
        });
    };

    let endpoint =
        env::var("EMAILJS_ENDPOINT").unwrap_or_else(|_| DEFAULT_EMAILJS_ENDPOINT.to_string());

    Ok(Some(EmailJsConfig {
        service_id,
        template_id,
        user_id,
        endpoint,
    }))
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidWindow { value: String },
    InvalidFlag { name: &'static str, value: String },
    IncompleteEmail { missing: Vec<&'static str> },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidWindow { value } => write!(
                f,
                "NOTIFY_WINDOW_DAYS must be a non-negative number of days, got '{value}'"
            ),
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} must be true or false, got '{value}'")
            }
            ConfigError::IncompleteEmail { missing } => write!(
                f,
                "email delivery is partially configured; missing {}",
                missing.join(", ")
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidWindow { .. }
            | ConfigError::InvalidFlag { .. }
            | ConfigError::IncompleteEmail { .. } => None,
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
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "NOTIFY_WINDOW_DAYS",
            "NOTIFY_ONCE",
            "EMAILJS_SERVICE_ID",
            "EMAILJS_TEMPLATE_ID",
            "EMAILJS_USER_ID",
            "EMAILJS_ENDPOINT",
            "BLOB_PUBLIC_BASE_URL",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.notifications.window_days, 7);
        assert!(!config.notifications.notify_once);
        assert!(config.notifications.email.is_none());
        assert_eq!(config.storage.public_base_url, DEFAULT_PUBLIC_BASE_URL);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn reads_notification_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("NOTIFY_WINDOW_DAYS", "14");
        env::set_var("NOTIFY_ONCE", "yes");
        env::set_var("EMAILJS_SERVICE_ID", "service_compliance");
        env::set_var("EMAILJS_TEMPLATE_ID", "template_expiring");
        env::set_var("EMAILJS_USER_ID", "public-key");

        let config = AppConfig::load().expect("config loads");
        reset_env();

        assert_eq!(config.notifications.window_days, 14);
        assert!(config.notifications.notify_once);
        let email = config.notifications.email.expect("email configured");
        assert_eq!(email.service_id, "service_compliance");
        assert_eq!(email.endpoint, DEFAULT_EMAILJS_ENDPOINT);
    }

    #[test]
    fn partial_email_settings_are_rejected() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("EMAILJS_SERVICE_ID", "service_compliance");

        let result = AppConfig::load();
        reset_env();

        match result {
            Err(ConfigError::IncompleteEmail { missing }) => {
                assert_eq!(missing, vec!["EMAILJS_TEMPLATE_ID", "EMAILJS_USER_ID"]);
            }
            other => panic!("expected incomplete email error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_window_and_flag() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("NOTIFY_WINDOW_DAYS", "-3");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidWindow { .. })
        ));

        reset_env();
        env::set_var("NOTIFY_ONCE", "sometimes");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag { name: "NOTIFY_ONCE", .. })
        ));
        reset_env();
    }
}
