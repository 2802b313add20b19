use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::env;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub refresh_path: String,
    pub login_path: String,
}

impl ApiConfig {
    pub fn base(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }

    pub fn refresh_url(&self) -> Result<Url, url::ParseError> {
        join_endpoint(&self.base()?, &self.refresh_path)
    }

    pub fn login_url(&self) -> Result<Url, url::ParseError> {
        join_endpoint(&self.base()?, &self.login_path)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Where the user is sent when the session cannot be recovered.
    pub login_route: String,
    pub coalesce_refresh: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    File,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub backend: SessionBackend,
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Appends `path` to `base` without dropping any path prefix the base carries.
///
/// `Url::join` treats a base without a trailing slash as a file and replaces its
/// last segment, which breaks deployments mounted under `/api`.
pub fn join_endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    ))
}

fn with_defaults(environment: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("environment", environment)?
        .set_default("api.base_url", "http://localhost:5000")?
        .set_default("api.refresh_path", "/auth/refresh")?
        .set_default("api.login_path", "/auth/login")?
        .set_default("auth.login_route", "/login")?
        .set_default("auth.coalesce_refresh", true)?
        .set_default("session.backend", "file")?
        .set_default("session.path", ".brighttimes/session.json")?
        .set_default("logging.level", "info")
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load("app")
    }

    pub(crate) fn load(env_prefix: &str) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        with_defaults("development")?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_API__BASE_URL=http://api.example.com` sets `Settings.api.base_url`
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Defaults pointed at `base_url`, with an in-memory session and no file or
    /// environment sources. Used by embedders and tests.
    pub fn for_api(base_url: &str) -> Result<Self, ConfigError> {
        with_defaults("test")?
            .set_override("api.base_url", base_url)?
            .set_override("session.backend", "memory")?
            .build()?
            .try_deserialize()
    }
}
