//! # configs
//!
//! Layered settings: built-in defaults, then `config/default.*` and
//! `config/local.*` if present, then `STORYWEAVE__SECTION__KEY` environment
//! variables. A `.env` file is read into the environment first.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub const ENV_PREFIX: &str = "STORYWEAVE";

const DEV_JWT_SECRET: &str = "storyweave-dev-secret-change-me";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub stories: StorySettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Postgres connection string. Unset means the in-memory store.
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    /// Accept the built-in development secret. Local use only.
    pub allow_dev_secret: bool,
    pub token_ttl_hours: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: SecretString::from(DEV_JWT_SECRET),
            allow_dev_secret: false,
            token_ttl_hours: 24,
        }
    }
}

impl AuthSettings {
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret.expose_secret() == DEV_JWT_SECRET
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorySettings {
    pub max_story_lines: usize,
    pub reject_duplicate_lines: bool,
    /// Hide a story from readers on its blacklist.
    pub blacklist_hides_story: bool,
    pub trending_limit: usize,
    /// Placeholder image for new authors. Unset keeps the service default.
    pub default_profile_image: Option<String>,
}

impl Default for StorySettings {
    fn default() -> Self {
        Self {
            max_story_lines: 30,
            reject_duplicate_lines: true,
            blacklist_hides_story: false,
            trending_limit: 10,
            default_profile_image: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
}

impl Settings {
    /// Reads `.env`, the config files and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "loaded .env"),
            Err(err) if err.not_found() => {}
            Err(err) => warn!(%err, "ignoring unreadable .env"),
        }

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    /// Builds settings from explicit sources, on top of the defaults.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        if settings.auth.uses_dev_secret() {
            warn!("signing tokens with the development secret; never do this in production");
        }
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stories.max_story_lines == 0 {
            return Err(ConfigError::Invalid("stories.max_story_lines must be at least 1".into()));
        }
        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid("auth.token_ttl_hours must be positive".into()));
        }
        if self.auth.jwt_secret.expose_secret().is_empty() {
            return Err(ConfigError::Invalid("auth.jwt_secret must not be empty".into()));
        }
        if self.auth.uses_dev_secret() && !self.auth.allow_dev_secret {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret is the development default; set STORYWEAVE__AUTH__JWT_SECRET \
                 (or auth.allow_dev_secret = true for local development)"
                    .into(),
            ));
        }
        Ok(())
    }
}
