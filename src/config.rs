use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::types::Coordinates;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub otp: OtpConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hosted backend (storage + tables) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`
    #[serde(default)]
    pub url: String,
    /// Anonymous (public) API key
    #[serde(default)]
    pub anon_key: String,
    /// Storage bucket that receives logos and documents
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_users_table")]
    pub users_table: String,
    #[serde(default = "default_companies_table")]
    pub companies_table: String,
    #[serde(default = "default_files_table")]
    pub files_table: String,
}

fn default_bucket() -> String {
    "files".to_string()
}

fn default_users_table() -> String {
    "users".to_string()
}

fn default_companies_table() -> String {
    "companies".to_string()
}

fn default_files_table() -> String {
    "files".to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            bucket: default_bucket(),
            users_table: default_users_table(),
            companies_table: default_companies_table(),
            files_table: default_files_table(),
        }
    }
}

/// One-time code verification endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// Base URL; the verifier posts to `{base_url}/api/send-otp`
    #[serde(default = "default_otp_base_url")]
    pub base_url: String,
}

fn default_otp_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            base_url: default_otp_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_base_url")]
    pub base_url: String,
    /// ISO country code lookups are scoped to
    #[serde(default = "default_country_code")]
    pub country_code: String,
    /// Radius in meters for the nearby-shop lookup (default: 2000)
    #[serde(default = "default_nearby_radius")]
    pub nearby_radius_m: u32,
    /// Quiet period before an address edit is geocoded (default: 500)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Nominatim rejects requests without an identifying User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Map center used before any address is resolved
    #[serde(default)]
    pub fallback: Coordinates,
}

fn default_geocoding_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_country_code() -> String {
    "sa".to_string()
}

fn default_nearby_radius() -> u32 {
    2000
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    format!("onboarding/{}", env!("CARGO_PKG_VERSION"))
}

impl GeocodingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocoding_base_url(),
            country_code: default_country_code(),
            nearby_radius_m: default_nearby_radius(),
            debounce_ms: default_debounce_ms(),
            user_agent: default_user_agent(),
            fallback: Coordinates::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// State directory (logs live under it)
    #[serde(default = "default_state_path")]
    pub state: String,
    /// Saved wizard draft, relative to the state directory unless absolute
    #[serde(default = "default_draft_path")]
    pub draft: String,
}

fn default_state_path() -> String {
    ".onboarding".to_string()
}

fn default_draft_path() -> String {
    "draft.json".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state: default_state_path(),
            draft: default_draft_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to also write logs to a file under the state directory
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

impl Config {
    /// Path to the project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from(".onboarding/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the tool works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // User config in ~/.config/onboarding/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("onboarding").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with ONBOARDING_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("ONBOARDING")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Write the config as TOML, e.g. to seed `.onboarding/config.toml`
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create onboarding config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(config_path, toml_str).context("Failed to write config file")?;

        Ok(())
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }

    /// Get absolute path to the saved wizard draft
    pub fn draft_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.draft);
        if path.is_absolute() {
            path
        } else {
            self.state_path().join(path)
        }
    }
}
