//! Settings read from the process environment at startup, optionally seeded from a
//! `.env` file.
use std::env;
use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use explore_upstream::DEFAULT_CHAT_MODEL;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),
    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("failed to load environment file: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load a `.env` file into the process environment; variables already set keep
/// their value. Without `path` the file is looked up in the working directory and
/// its ancestors. A missing file is not an error.
pub fn load_dotenv(path: Option<&Path>) -> ConfigResult<Option<PathBuf>> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Where a server listens and what it serves besides its API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenConfig {
    pub host: IpAddr,
    pub port: u16,
    pub static_dir: PathBuf,
    /// Allowed browser origins; empty allows any origin without credentials.
    pub cors_origins: Vec<String>,
}

impl ListenConfig {
    fn load(vars: &impl Fn(&str) -> Option<String>, port_key: &'static str, default_port: &str) -> ConfigResult<Self> {
        Ok(Self {
            host: try_load(vars, "BIND_HOST", "0.0.0.0")?,
            port: try_load(vars, port_key, default_port)?,
            static_dir: PathBuf::from(optional(vars, "STATIC_DIR").unwrap_or_else(|| "dist".to_owned())),
            cors_origins: optional(vars, "CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_owned)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Settings of the server in front of the identity provider, document store and
/// blob store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DbConfig {
    pub listen: ListenConfig,
    pub firebase_api_key: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub cookie_secure: bool,
}

impl DbConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let project_id = required(&vars, "FIREBASE_PROJECT_ID", Some("VITE_FIREBASE_PROJECT_ID"))?;
        let storage_bucket =
            optional(&vars, "FIREBASE_STORAGE_BUCKET").unwrap_or_else(|| format!("{project_id}.appspot.com"));
        Ok(Self {
            listen: ListenConfig::load(&vars, "DB_PORT", "4000")?,
            firebase_api_key: required(&vars, "FIREBASE_API_KEY", Some("VITE_FIREBASE_API_KEY"))?,
            project_id,
            storage_bucket,
            cookie_secure: try_load(&vars, "COOKIE_SECURE", "false")?,
        })
    }
}

/// Settings of the server relaying to the completion and video providers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatConfig {
    pub listen: ListenConfig,
    pub openai_api_key: String,
    pub openai_model: String,
    pub youtube_api_key: String,
}

impl ChatConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let youtube_api_key = match optional(&vars, "YOUTUBE_API_KEY") {
            Some(key) => key,
            None => required(&vars, "FIREBASE_API_KEY", Some("VITE_FIREBASE_API_KEY"))
                .map_err(|_| ConfigError::Missing("YOUTUBE_API_KEY"))?,
        };
        Ok(Self {
            listen: ListenConfig::load(&vars, "PORT", "3000")?,
            openai_api_key: required(&vars, "OPENAI_API_KEY", Some("ChatGPT_API_KEY"))?,
            openai_model: optional(&vars, "OPENAI_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_owned()),
            youtube_api_key,
        })
    }
}

/// Value of `key`, ignoring blank values.
fn optional(vars: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    vars(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required(
    vars: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    fallback: Option<&'static str>,
) -> ConfigResult<String> {
    if let Some(value) = optional(vars, key) {
        return Ok(value);
    }
    if let Some(fallback) = fallback
        && let Some(value) = optional(vars, fallback)
    {
        info!("{key} not set, using {fallback}");
        return Ok(value);
    }
    Err(ConfigError::Missing(key))
}

fn try_load<T>(vars: &impl Fn(&str) -> Option<String>, key: &'static str, default: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    let value = optional(vars, key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });
    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }
    })
}
