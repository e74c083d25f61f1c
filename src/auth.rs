use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// The auth endpoints that must never enter the refresh cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthPaths {
    pub login: String,
    pub refresh: String,
}

impl AuthPaths {
    pub fn new(login: impl Into<String>, refresh: impl Into<String>) -> Self {
        let (login, refresh): (String, String) = (login.into(), refresh.into());
        Self {
            login: normalize_path(&login).to_string(),
            refresh: normalize_path(&refresh).to_string(),
        }
    }

    /// Exact match against the login or refresh path, ignoring query and trailing slash.
    pub fn is_auth_endpoint(&self, path: &str) -> bool {
        self.is_login(path) || self.is_refresh(path)
    }

    pub fn is_login(&self, path: &str) -> bool {
        normalize_path(path) == self.login
    }

    pub fn is_refresh(&self, path: &str) -> bool {
        normalize_path(path) == self.refresh
    }
}

fn normalize_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path[..end].trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Signed Telegram webview payload proving the user's identity.
#[derive(Clone, PartialEq, Eq)]
pub struct InitData(String);

impl InitData {
    pub fn new(raw: impl Into<String>) -> Result<Self, Error> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(Error::InitData("initData must not be empty".into()));
        }
        Ok(Self(raw))
    }

    /// Extracts `tgWebAppData` from a Mini App launch URL fragment.
    pub fn from_launch_fragment(fragment: &str) -> Result<Self, Error> {
        let params = fragment.trim_start_matches('#');
        let encoded = params
            .split('&')
            .find_map(|pair| pair.strip_prefix("tgWebAppData="))
            .ok_or_else(|| Error::InitData("launch fragment has no tgWebAppData".into()))?;
        let decoded = urlencoding::decode(encoded)
            .map_err(|e| Error::InitData(format!("tgWebAppData is not valid UTF-8: {e}")))?;
        Self::new(decoded.into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for InitData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InitData(len={})", self.0.len())
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub init_data: String,
}

impl From<&InitData> for LoginRequest {
    fn from(init_data: &InitData) -> Self {
        Self {
            init_data: init_data.as_str().to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    #[serde(default)]
    pub access_token_expires_at: Option<Timestamp>,
    pub refresh_token: String,
    #[serde(default)]
    pub refresh_token_expires_at: Option<Timestamp>,
}
