//! read configuration from a file, the environment, or explicit values

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::auth::AuthPaths;
use crate::errors::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_REFRESH_ATTEMPTS: u32 = 5;
pub const DEFAULT_DEBUG_LOG_CAPACITY: usize = 200;
pub const DEFAULT_LOGIN_PATH: &str = "/api/auth/telegram";
pub const DEFAULT_REFRESH_PATH: &str = "/api/auth/refresh";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Production,
    #[default]
    Development,
}

impl FromStr for BuildMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(BuildMode::Production),
            "development" | "dev" => Ok(BuildMode::Development),
            other => Err(Error::Config(format!(
                "Unknown build mode '{}'; expected 'production' or 'development'",
                other
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub build_mode: BuildMode,
    #[serde(default)]
    pub same_origin: bool,
    pub origin: Option<String>,
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_refresh_attempts: Option<u32>,
    pub debug_log_capacity: Option<usize>,
    pub login_path: Option<String>,
    pub refresh_path: Option<String>,
}

impl Config {
    pub fn from_values(
        build_mode: BuildMode,
        same_origin: bool,
        origin: Option<impl Into<String>>,
        api_url: Option<impl Into<String>>,
        timeout_secs: Option<u64>,
        max_refresh_attempts: Option<u32>,
        debug_log_capacity: Option<usize>,
    ) -> Self {
        Self {
            build_mode,
            same_origin,
            origin: origin.map(Into::into),
            api_url: api_url.map(Into::into),
            timeout_secs,
            max_refresh_attempts,
            debug_log_capacity,
            login_path: None,
            refresh_path: None,
        }
    }

    /// Development config pointing straight at an absolute API URL.
    pub fn for_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: Some(api_url.into()),
            ..Self::default()
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            Error::Config(format!("Failed to parse config '{}': {}", path.display(), e))
        })
    }

    /// # ENV Vars
    /// * `LEDGER_BUILD_MODE` - `production` or `development` (default)
    /// * `LEDGER_SAME_ORIGIN` - `true` to serve the API from the app origin in production
    /// * `LEDGER_ORIGIN` - origin the mini app is served from
    /// * `LEDGER_API_URL` - absolute API base URL
    /// * `LEDGER_HTTP_TIMEOUT_SECS`, `LEDGER_MAX_REFRESH_ATTEMPTS`, `LEDGER_DEBUG_LOG_CAPACITY`
    /// * `LEDGER_LOGIN_PATH`, `LEDGER_REFRESH_PATH`
    pub fn from_env() -> Result<Self, Error> {
        let build_mode = match env_opt("LEDGER_BUILD_MODE") {
            Some(v) => v.parse()?,
            None => BuildMode::default(),
        };
        let same_origin = match env_opt("LEDGER_SAME_ORIGIN") {
            Some(v) => parse_bool("LEDGER_SAME_ORIGIN", &v)?,
            None => false,
        };
        Ok(Self {
            build_mode,
            same_origin,
            origin: env_opt("LEDGER_ORIGIN"),
            api_url: env_opt("LEDGER_API_URL"),
            timeout_secs: env_parse("LEDGER_HTTP_TIMEOUT_SECS")?,
            max_refresh_attempts: env_parse("LEDGER_MAX_REFRESH_ATTEMPTS")?,
            debug_log_capacity: env_parse("LEDGER_DEBUG_LOG_CAPACITY")?,
            login_path: env_opt("LEDGER_LOGIN_PATH"),
            refresh_path: env_opt("LEDGER_REFRESH_PATH"),
        })
    }

    /// Resolves the API base. Build mode only decides which value is consulted.
    pub fn api_base(&self) -> Result<Url, Error> {
        let (name, raw) = if self.build_mode == BuildMode::Production && self.same_origin {
            ("origin", self.origin.as_deref())
        } else {
            ("api_url", self.api_url.as_deref())
        };
        let raw = raw
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config(format!("Missing {name} for API base URL")))?;
        let base = if raw.contains("://") {
            raw.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", raw.trim_end_matches('/'))
        };
        Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid API base URL '{}': {}", base, e)))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn max_refresh_attempts(&self) -> u32 {
        self.max_refresh_attempts
            .unwrap_or(DEFAULT_MAX_REFRESH_ATTEMPTS)
    }

    pub fn debug_log_capacity(&self) -> usize {
        self.debug_log_capacity
            .unwrap_or(DEFAULT_DEBUG_LOG_CAPACITY)
            .max(1)
    }

    pub fn auth_paths(&self) -> AuthPaths {
        AuthPaths::new(
            self.login_path.as_deref().unwrap_or(DEFAULT_LOGIN_PATH),
            self.refresh_path.as_deref().unwrap_or(DEFAULT_REFRESH_PATH),
        )
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, Error> {
    env_opt(name)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid value for {name}: '{v}'")))
        })
        .transpose()
}

fn parse_bool(name: &str, value: &str) -> Result<bool, Error> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(Error::Config(format!("Invalid value for {name}: '{value}'"))),
    }
}
