use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STORE_BACKEND: &str = "rest";
const DEFAULT_REORDER_LEVEL: i64 = 50;
const DEFAULT_DECREMENT_MAX_RETRIES: u32 = 3;
/// Hosted-store API keys are long JWTs; anything shorter is a truncated
/// paste, which is the most common misconfiguration in the field.
const MIN_STORE_API_KEY_LEN: usize = 100;

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Record store project URL (without the /rest/v1 suffix)
    #[serde(default)]
    pub store_url: String,

    /// Record store API key
    #[serde(default)]
    pub store_api_key: String,

    /// Store backend: "rest" or "in-memory"
    #[serde(default = "default_store_backend")]
    pub store_backend: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Reorder threshold applied to items created without one
    #[serde(default = "default_reorder_level")]
    #[validate(range(min = 1))]
    pub default_reorder_level: i64,

    /// Attempts for the optimistic conditional decrement before giving up
    #[serde(default = "default_decrement_max_retries")]
    #[validate(range(min = 1, max = 10))]
    pub decrement_max_retries: u32,
}

fn default_store_backend() -> String {
    DEFAULT_STORE_BACKEND.to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_reorder_level() -> i64 {
    DEFAULT_REORDER_LEVEL
}
fn default_decrement_max_retries() -> u32 {
    DEFAULT_DECREMENT_MAX_RETRIES
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn uses_rest_backend(&self) -> bool {
        self.store_backend.eq_ignore_ascii_case("rest")
    }

    /// Constraints that span fields and so cannot be expressed as derive
    /// attributes: the REST backend needs both credentials, and the API
    /// key must not be a truncated paste.
    pub fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.uses_rest_backend() {
            if self.store_url.trim().is_empty() {
                errors.add("store_url", ValidationError::new("required"));
            }
            if self.store_api_key.trim().is_empty() {
                errors.add("store_api_key", ValidationError::new("required"));
            } else if self.store_api_key.len() < MIN_STORE_API_KEY_LEN {
                errors.add("store_api_key", ValidationError::new("too_short"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence over the
/// configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("labstock_api={},tower_http=info", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads configuration from layered sources: `config/default.toml`, then
/// `config/{RUN_ENV}.toml`, then environment variables prefixed `APP` with
/// `__` as separator (e.g. `APP__STORE_URL`). The two store credentials may
/// also arrive through the unprefixed `SUPABASE_URL` / `SUPABASE_KEY`
/// variables older deployments export.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));

    let config = builder.build()?;
    let mut app_config: AppConfig = config.try_deserialize()?;

    // Legacy environment fallback used by existing deployments.
    if app_config.store_url.trim().is_empty() {
        if let Ok(url) = env::var("SUPABASE_URL") {
            app_config.store_url = url;
        }
    }
    if app_config.store_api_key.trim().is_empty() {
        if let Ok(key) = env::var("SUPABASE_KEY") {
            app_config.store_api_key = key;
        }
    }

    if app_config.uses_rest_backend() && app_config.store_url.trim().is_empty() {
        error!(
            "Record store credentials are not configured. Set APP__STORE_URL and APP__STORE_API_KEY \
             (or SUPABASE_URL / SUPABASE_KEY), or select APP__STORE_BACKEND=in-memory."
        );
    }

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            store_url: "https://example.supabase.co".into(),
            store_api_key: "k".repeat(MIN_STORE_API_KEY_LEN),
            store_backend: default_store_backend(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            default_reorder_level: default_reorder_level(),
            decrement_max_retries: default_decrement_max_retries(),
        }
    }

    #[test]
    fn valid_config_passes() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn rest_backend_requires_credentials() {
        let mut cfg = base_config();
        cfg.store_url = String::new();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn truncated_api_key_rejected() {
        let mut cfg = base_config();
        cfg.store_api_key = "short-key".into();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn in_memory_backend_needs_no_credentials() {
        let mut cfg = base_config();
        cfg.store_backend = "in-memory".into();
        cfg.store_url = String::new();
        cfg.store_api_key = String::new();
        assert!(cfg.validate_additional_constraints().is_ok());
    }
}
