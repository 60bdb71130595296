//! Configuration management
//!
//! This module handles loading and parsing configuration for Commonroom.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Query cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Outgoing email configuration
    #[serde(default)]
    pub email: EmailConfig,
    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors_origin() -> String {
    "http://localhost:5000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/commonroom.db".to_string()
}

/// Query cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_capacity() -> u64 {
    1_000
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 5MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Maximum number of attachments on a single contact message
    #[serde(default = "default_max_attachments")]
    pub max_attachments: usize,
    /// Allowed MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            max_attachments: default_max_attachments(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_max_attachments() -> usize {
    5
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "application/pdf".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(mime_type))
    }

    /// Upper bound for a whole multipart request body
    pub fn max_request_size(&self) -> usize {
        let files = self.max_file_size as usize * self.max_attachments.max(1);
        // room for the text fields and multipart framing
        files + 64 * 1024
    }
}

/// Outgoing email configuration
///
/// `from` and `admin_to` are the two addresses the mailer needs; the SMTP
/// fields are optional and an empty host switches the mailer to log-only mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Sender address for every outgoing message
    #[serde(default = "default_email_from")]
    pub from: String,
    /// Recipient of contact form notifications
    #[serde(default = "default_admin_to")]
    pub admin_to: String,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from: default_email_from(),
            admin_to: default_admin_to(),
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
        }
    }
}

fn default_email_from() -> String {
    "Commonroom <noreply@commonroom.local>".to_string()
}

fn default_admin_to() -> String {
    "admin@commonroom.local".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl EmailConfig {
    /// Whether messages should actually go out over SMTP
    pub fn smtp_enabled(&self) -> bool {
        !self.smtp_host.trim().is_empty()
    }
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: i64,
    /// Add the `Secure` attribute to the session cookie
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
            secure_cookie: false,
        }
    }
}

fn default_session_ttl_days() -> i64 {
    7
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern `COMMONROOM_<SECTION>_<KEY>`:
    /// - COMMONROOM_SERVER_HOST / _PORT / _CORS_ORIGIN
    /// - COMMONROOM_DATABASE_URL
    /// - COMMONROOM_UPLOAD_PATH / _MAX_FILE_SIZE
    /// - COMMONROOM_EMAIL_FROM / _ADMIN_TO / _SMTP_HOST / _SMTP_PORT / _SMTP_USERNAME / _SMTP_PASSWORD
    /// - COMMONROOM_SESSION_TTL_DAYS / _SECURE_COOKIE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_file_size == 0 {
            return Err(ConfigError::ValidationError(
                "upload.max_file_size must be greater than 0".to_string(),
            ));
        }
        if self.session.ttl_days <= 0 {
            return Err(ConfigError::ValidationError(
                "session.ttl_days must be greater than 0".to_string(),
            ));
        }
        if self.email.from.trim().is_empty() || self.email.admin_to.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "email.from and email.admin_to are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("COMMONROOM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("COMMONROOM_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("COMMONROOM_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("COMMONROOM_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(ttl) = env_parse::<u64>("COMMONROOM_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }

        if let Ok(path) = std::env::var("COMMONROOM_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
        if let Some(size) = env_parse::<u64>("COMMONROOM_UPLOAD_MAX_FILE_SIZE") {
            self.upload.max_file_size = size;
        }

        if let Ok(from) = std::env::var("COMMONROOM_EMAIL_FROM") {
            self.email.from = from;
        }
        if let Ok(admin_to) = std::env::var("COMMONROOM_EMAIL_ADMIN_TO") {
            self.email.admin_to = admin_to;
        }
        if let Ok(host) = std::env::var("COMMONROOM_EMAIL_SMTP_HOST") {
            self.email.smtp_host = host;
        }
        if let Some(port) = env_parse::<u16>("COMMONROOM_EMAIL_SMTP_PORT") {
            self.email.smtp_port = port;
        }
        if let Ok(username) = std::env::var("COMMONROOM_EMAIL_SMTP_USERNAME") {
            self.email.smtp_username = username;
        }
        if let Ok(password) = std::env::var("COMMONROOM_EMAIL_SMTP_PASSWORD") {
            self.email.smtp_password = password;
        }

        if let Some(days) = env_parse::<i64>("COMMONROOM_SESSION_TTL_DAYS") {
            self.session.ttl_days = days;
        }
        if let Some(secure) = env_parse::<bool>("COMMONROOM_SESSION_SECURE_COOKIE") {
            self.session.secure_cookie = secure;
        }
    }
}

/// Read and parse an environment variable, ignoring invalid values
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.database.url, "data/commonroom.db");
        assert_eq!(config.upload.max_file_size, 5 * 1024 * 1024);
        assert_eq!(config.session.ttl_days, 7);
        assert!(!config.email.smtp_enabled());
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "email:\n  admin_to: \"board@center.org\"\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.email.admin_to, "board@center.org");
        assert_eq!(config.email.from, default_email_from());
        assert_eq!(config.email.smtp_port, 587);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"
server:
  host: "127.0.0.1"
  port: 9000
database:
  url: "/var/lib/commonroom/site.db"
upload:
  path: "/srv/uploads"
  max_file_size: 1024
  allowed_types: ["image/png"]
email:
  from: "Center <hello@center.org>"
  admin_to: "office@center.org"
  smtp_host: "smtp.center.org"
session:
  ttl_days: 30
  secure_cookie: true
"#).unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.url, "/var/lib/commonroom/site.db");
        assert_eq!(config.upload.path, PathBuf::from("/srv/uploads"));
        assert_eq!(config.upload.max_file_size, 1024);
        assert!(config.upload.is_type_allowed("image/png"));
        assert!(!config.upload.is_type_allowed("image/jpeg"));
        assert!(config.email.smtp_enabled());
        assert_eq!(config.session.ttl_days, 30);
        assert!(config.session.secure_cookie);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_zero_upload_size_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "upload:\n  max_file_size: 0\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_file_size"));
    }

    #[test]
    fn test_type_check_is_case_insensitive() {
        let config = UploadConfig::default();
        assert!(config.is_type_allowed("IMAGE/PNG"));
        assert!(config.is_type_allowed("application/pdf"));
        assert!(!config.is_type_allowed("application/x-msdownload"));
    }

    #[test]
    fn test_env_overrides() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8080\n").unwrap();

        std::env::set_var("COMMONROOM_SERVER_PORT", "4000");
        std::env::set_var("COMMONROOM_EMAIL_ADMIN_TO", "ops@center.org");
        std::env::set_var("COMMONROOM_SESSION_SECURE_COOKIE", "true");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.email.admin_to, "ops@center.org");
        assert!(config.session.secure_cookie);

        std::env::remove_var("COMMONROOM_SERVER_PORT");
        std::env::remove_var("COMMONROOM_EMAIL_ADMIN_TO");
        std::env::remove_var("COMMONROOM_SESSION_SECURE_COOKIE");
    }

    #[test]
    fn test_env_invalid_values_are_ignored() {
        let _guard = lock_env();

        std::env::set_var("COMMONROOM_SERVER_PORT", "not-a-port");
        let config = Config::load_with_env(std::path::Path::new("missing.yml")).unwrap();
        assert_eq!(config.server.port, 5000);
        std::env::remove_var("COMMONROOM_SERVER_PORT");
    }
}
