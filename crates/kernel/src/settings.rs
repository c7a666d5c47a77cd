use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "LPT_EVENT_ENV";
const CONFIG_DIR_ENV: &str = "LPT_EVENT_CONFIG_DIR";
const ENV_PREFIX: &str = "LPT_EVENT";
const NESTED_SEPARATOR: &str = "__";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Environment::Local),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(anyhow!(
                "unsupported environment '{}'; expected local/staging/production",
                other
            )),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
///
/// Environment variables use the `LPT_EVENT_` prefix and `__` as the nested
/// delimiter, so `LPT_EVENT_DB__INSTANCE_NAME` sets `db.instance_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "Settings::default_app_name")]
    pub app_name: String,
    /// Every API route is mounted under this prefix.
    #[serde(default = "Settings::default_api_prefix")]
    pub api_prefix: String,
    /// Directory holding the built frontend.
    #[serde(default = "Settings::default_static_assets_path")]
    pub static_assets_path: PathBuf,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub db: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay
    /// and `LPT_EVENT_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit config directory and environment name.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment: Environment = environment.parse()?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator(NESTED_SEPARATOR),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;

        Ok(settings)
    }

    fn default_app_name() -> String {
        "lpt-event".to_string()
    }

    fn default_api_prefix() -> String {
        "/api".to_string()
    }

    fn default_static_assets_path() -> PathBuf {
        PathBuf::from("dist")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            app_name: Self::default_app_name(),
            api_prefix: Self::default_api_prefix(),
            static_assets_path: Self::default_static_assets_path(),
            server: ServerSettings::default(),
            db: DatabaseSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

/// Managed Postgres instance and pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Name of the managed database instance; `sqlite-memory` selects the
    /// in-memory development backend.
    #[serde(default)]
    pub instance_name: Option<String>,
    #[serde(default = "DatabaseSettings::default_port")]
    pub port: u16,
    #[serde(default = "DatabaseSettings::default_database_name")]
    pub database_name: String,
    #[serde(default = "DatabaseSettings::default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "DatabaseSettings::default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
    #[serde(default = "DatabaseSettings::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "DatabaseSettings::default_credential_ttl_secs")]
    pub credential_ttl_secs: u64,
    #[serde(default = "DatabaseSettings::default_credential_refresh_margin_secs")]
    pub credential_refresh_margin_secs: u64,
}

impl DatabaseSettings {
    /// The configured instance name, or an error naming the variable to set.
    pub fn instance_name(&self) -> anyhow::Result<&str> {
        self.instance_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "database instance name is not configured; set {}_DB{}INSTANCE_NAME",
                    ENV_PREFIX,
                    NESTED_SEPARATOR
                )
            })
    }

    fn default_port() -> u16 {
        5432
    }

    fn default_database_name() -> String {
        "databricks_postgres".to_string()
    }

    fn default_pool_size() -> u32 {
        4
    }

    fn default_max_lifetime_secs() -> u64 {
        45 * 60
    }

    fn default_connect_timeout_secs() -> u64 {
        10
    }

    fn default_credential_ttl_secs() -> u64 {
        60 * 60
    }

    fn default_credential_refresh_margin_secs() -> u64 {
        10 * 60
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            instance_name: None,
            port: Self::default_port(),
            database_name: Self::default_database_name(),
            pool_size: Self::default_pool_size(),
            max_lifetime_secs: Self::default_max_lifetime_secs(),
            connect_timeout_secs: Self::default_connect_timeout_secs(),
            credential_ttl_secs: Self::default_credential_ttl_secs(),
            credential_refresh_margin_secs: Self::default_credential_refresh_margin_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "TelemetrySettings::default_level")]
    pub level: String,
    #[serde(default = "TelemetrySettings::default_ansi")]
    pub ansi: bool,
}

impl TelemetrySettings {
    fn default_level() -> String {
        "info".to_string()
    }

    fn default_ansi() -> bool {
        true
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            level: Self::default_level(),
            ansi: Self::default_ansi(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
