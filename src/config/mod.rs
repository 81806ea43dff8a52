//! Configuration loading for the connection store.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `SOCIAL_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, fmt, path::PathBuf, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{self, CryptoError, TextEncryptor};

const ENV_PREFIX: &str = "SOCIAL_";
const REDACTED: &str = "[REDACTED]";

/// How stored credentials are protected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionMode {
    /// PBKDF2-derived AES-256-CBC with a random IV per value
    #[default]
    Standard,
    /// Stores plaintext; development only
    Noop,
}

impl FromStr for EncryptionMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "noop" | "no-op" | "none" => Ok(Self::Noop),
            _ => Err(ConfigError::InvalidEncryptionMode {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for EncryptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Noop => f.write_str("noop"),
        }
    }
}

/// Application configuration derived from `SOCIAL_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt_password: Option<String>,
    /// Hex-encoded PBKDF2 salt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypt_salt: Option<String>,
    #[serde(default)]
    pub encryption_mode: EncryptionMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            encrypt_password: None,
            encrypt_salt: None,
            encryption_mode: EncryptionMode::default(),
        }
    }
}

impl AppConfig {
    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.encrypt_password.is_some() {
            config.encrypt_password = Some(REDACTED.to_string());
        }
        if config.encrypt_salt.is_some() {
            config.encrypt_salt = Some(REDACTED.to_string());
        }
        config.database_url = redact_url_password(&config.database_url);
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidDbMaxConnections);
        }

        match self.encryption_mode {
            EncryptionMode::Standard => {
                if self.encrypt_password.as_deref().is_none_or(str::is_empty) {
                    return Err(ConfigError::MissingEncryptPassword);
                }
                let salt = self
                    .encrypt_salt
                    .as_deref()
                    .ok_or(ConfigError::MissingEncryptSalt)?;
                match hex::decode(salt) {
                    Ok(bytes) if !bytes.is_empty() => {}
                    _ => return Err(ConfigError::InvalidEncryptSalt),
                }
            }
            EncryptionMode::Noop => {
                if self.profile == "prod" {
                    return Err(ConfigError::NoopEncryptionInProduction);
                }
            }
        }

        Ok(())
    }

    /// Builds the text encryptor used for credential columns.
    pub fn text_encryptor(&self) -> Result<Arc<dyn TextEncryptor>, CryptoError> {
        match self.encryption_mode {
            EncryptionMode::Standard => {
                let password = self.encrypt_password.as_deref().unwrap_or_default();
                let salt = self.encrypt_salt.as_deref().unwrap_or_default();
                Ok(Arc::new(crypto::encryptor::text(password, salt)?))
            }
            EncryptionMode::Noop => Ok(Arc::new(crypto::encryptor::no_op_text())),
        }
    }
}

fn redact_url_password(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some(REDACTED)).is_err() {
                return REDACTED.to_string();
            }
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "sqlite://social_connect.db?mode=rwc".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid value '{value}' for {key}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("database pool needs at least one connection")]
    InvalidDbMaxConnections,
    #[error("encryption mode must be 'standard' or 'noop', got '{value}'")]
    InvalidEncryptionMode { value: String },
    #[error("encryption password is missing; set SOCIAL_ENCRYPT_PASSWORD")]
    MissingEncryptPassword,
    #[error("encryption salt is missing; set SOCIAL_ENCRYPT_SALT")]
    MissingEncryptSalt,
    #[error("encryption salt must be non-empty hex")]
    InvalidEncryptSalt,
    #[error("noop encryption is not allowed in the prod profile")]
    NoopEncryptionInProduction,
}

/// Loads configuration using layered `.env` files and `SOCIAL_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads `.env`, `.env.local`, `.env.<profile>`, `.env.<profile>.local`
    /// and finally the process environment, later layers winning.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let mut take = |key: &str| layered.remove(key).filter(|v| !v.is_empty());

        let profile = take("PROFILE").unwrap_or(profile_hint);
        let log_level = take("LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = take("LOG_FORMAT").unwrap_or_else(default_log_format);
        let database_url = take("DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = match take("DB_MAX_CONNECTIONS") {
            Some(value) => parse_number("SOCIAL_DB_MAX_CONNECTIONS", value)?,
            None => default_db_max_connections(),
        };
        let db_acquire_timeout_ms = match take("DB_ACQUIRE_TIMEOUT_MS") {
            Some(value) => parse_number("SOCIAL_DB_ACQUIRE_TIMEOUT_MS", value)?,
            None => default_db_acquire_timeout_ms(),
        };
        let encrypt_password = take("ENCRYPT_PASSWORD");
        let encrypt_salt = take("ENCRYPT_SALT").map(|salt| salt.trim().to_string());
        let encryption_mode = match take("ENCRYPTION_MODE") {
            Some(value) => value.parse()?,
            None => EncryptionMode::default(),
        };

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            encrypt_password,
            encrypt_salt,
            encryption_mode,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(self.base_dir.join(format!(".env.{profile}")), &mut values)?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{profile}.local")),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { key, value })
}
