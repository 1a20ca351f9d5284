use crate::codes;
use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Connection to the remote user store
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

impl ApiConfig {
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }
}

/// Values a new user form starts with.
/// Unset fields fall back to the built-in defaults.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DefaultsConfig {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub provisional_password: Option<String>,
}

impl DefaultsConfig {
    pub fn currency(&self) -> &str {
        self.currency.as_deref().unwrap_or("EUR")
    }

    pub fn country(&self) -> &str {
        self.country.as_deref().unwrap_or("PT")
    }

    pub fn provisional_password(&self) -> &str {
        self.provisional_password.as_deref().unwrap_or("123")
    }
}

/// Where backups are written and time records are read from
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BackupConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub records_file: Option<PathBuf>,
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

impl Config {
    /// Load configuration from default paths
    /// Priority: local (.staffdesk/config.local.toml) > project (.staffdesk/config.toml)
    /// > user (~/.staffdesk/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".staffdesk").join("config.toml");
            if user_config.exists() {
                config.merge(Self::load_from(&user_config)?);
            }
        }

        let project_config = Path::new(".staffdesk").join("config.toml");
        if project_config.exists() {
            config.merge(Self::load_from(&project_config)?);
        }

        // Should be gitignored
        let local_config = Path::new(".staffdesk").join("config.local.toml");
        if local_config.exists() {
            config.merge(Self::load_from(&local_config)?);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority).
    /// Values only override when the other layer sets them.
    pub fn merge(&mut self, other: Config) {
        if other.api.base_url.is_some() {
            self.api.base_url = other.api.base_url;
        }
        if other.api.timeout_ms.is_some() {
            self.api.timeout_ms = other.api.timeout_ms;
        }

        if other.defaults.currency.is_some() {
            self.defaults.currency = other.defaults.currency;
        }
        if other.defaults.country.is_some() {
            self.defaults.country = other.defaults.country;
        }
        if other.defaults.provisional_password.is_some() {
            self.defaults.provisional_password = other.defaults.provisional_password;
        }

        if other.backup.dir.is_some() {
            self.backup.dir = other.backup.dir;
        }
        if other.backup.records_file.is_some() {
            self.backup.records_file = other.backup.records_file;
        }
    }

    /// Base URL of the user store, if configured
    pub fn base_url(&self) -> Option<&str> {
        self.api.base_url.as_deref()
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        match self.base_url() {
            None => errors.push(ValidationError {
                field: "api.base_url".to_string(),
                message: "Not set. Use --base-url, STAFFDESK_API_URL or [api] base_url"
                    .to_string(),
            }),
            Some(url) if !is_http_url(url) => {
                errors.push(ValidationError {
                    field: "api.base_url".to_string(),
                    message: format!("Expected an http(s) URL with a host, got '{}'", url),
                });
            }
            Some(_) => {}
        }

        if self.api.timeout_ms() == 0 {
            errors.push(ValidationError {
                field: "api.timeout_ms".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if !codes::is_currency_code(self.defaults.currency()) {
            errors.push(ValidationError {
                field: "defaults.currency".to_string(),
                message: format!(
                    "Invalid currency code '{}', expected three uppercase letters",
                    self.defaults.currency()
                ),
            });
        }

        if !codes::is_country_code(self.defaults.country()) {
            errors.push(ValidationError {
                field: "defaults.country".to_string(),
                message: format!(
                    "Invalid country code '{}', expected two uppercase letters",
                    self.defaults.country()
                ),
            });
        }

        if self.defaults.provisional_password().is_empty() {
            errors.push(ValidationError {
                field: "defaults.provisional_password".to_string(),
                message: "Must not be empty".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_http_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}
