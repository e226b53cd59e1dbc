//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_DB_PATH: &str = "./data/legal-navigator.db";

/// How chat turns are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerMode {
    /// Real conversations backed by the database.
    #[default]
    Live,
    /// Scripted walkthrough with sample answers and no persistence.
    Demo,
}

impl ServerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Demo => "demo",
        }
    }
}

impl std::str::FromStr for ServerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "demo" => Ok(Self::Demo),
            other => Err(format!("expected 'live' or 'demo', got '{other}'")),
        }
    }
}

/// Where conversations are stored.
#[derive(Debug, Clone)]
pub enum DatabaseTarget {
    /// Local libSQL file, created if missing.
    Local(PathBuf),
    /// Remote libSQL server.
    Remote { url: String, auth_token: SecretString },
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub mode: ServerMode,
    pub bind: String,
    pub port: u16,
    pub database: DatabaseTarget,
    /// Allowed browser origin. `None` allows any origin.
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            mode: ServerMode::Live,
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            database: DatabaseTarget::Local(PathBuf::from(DEFAULT_DB_PATH)),
            cors_origin: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from `NAVIGATOR_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup. Empty values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mode = match get("NAVIGATOR_MODE") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "NAVIGATOR_MODE".to_string(),
                message,
            })?,
            None => ServerMode::default(),
        };

        let port = match get("NAVIGATOR_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "NAVIGATOR_PORT".to_string(),
                    message: e.to_string(),
                })?,
            None => DEFAULT_PORT,
        };

        let bind = get("NAVIGATOR_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());

        let database = match get("NAVIGATOR_DB_URL") {
            Some(url) => {
                let token = get("NAVIGATOR_DB_AUTH_TOKEN").ok_or_else(|| {
                    ConfigError::MissingRequired {
                        key: "NAVIGATOR_DB_AUTH_TOKEN".to_string(),
                        hint: "A remote database URL needs an auth token.".to_string(),
                    }
                })?;
                DatabaseTarget::Remote {
                    url,
                    auth_token: SecretString::from(token),
                }
            }
            None => DatabaseTarget::Local(PathBuf::from(
                get("NAVIGATOR_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            )),
        };

        Ok(Self {
            mode,
            bind,
            port,
            database,
            cors_origin: get("NAVIGATOR_CORS_ORIGIN"),
        })
    }

    /// Socket address to listen on.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
