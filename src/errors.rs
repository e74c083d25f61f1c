use std::fmt;

use reqwest::StatusCode;

/// Structured failure of a single HTTP call.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub url: String,
    pub status: Option<StatusCode>,
    pub message: String,
    pub body: Option<String>,
    pub timed_out: bool,
}

impl HttpError {
    /// Builds the error for a response that came back with a non-2xx status.
    pub fn from_status(url: impl Into<String>, status: StatusCode, body: String) -> Self {
        let message = server_message(&body).unwrap_or_else(|| {
            format!("request failed with status code {}", status.as_u16())
        });
        Self {
            url: url.into(),
            status: Some(status),
            message,
            body: if body.is_empty() { None } else { Some(body) },
            timed_out: false,
        }
    }

    /// Builds the error for a call that never produced a usable response.
    pub fn from_reqwest(url: impl Into<String>, err: &reqwest::Error) -> Self {
        Self {
            url: url.into(),
            status: err.status(),
            message: err.to_string(),
            body: None,
            timed_out: err.is_timeout(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(StatusCode::UNAUTHORIZED)
    }

    /// Server-provided error body parsed as JSON, when it is JSON.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({}): {}", self.url, status, self.message),
            None if self.timed_out => write!(f, "{} (timeout): {}", self.url, self.message),
            None => write!(f, "{}: {}", self.url, self.message),
        }
    }
}

fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[derive(Debug, Clone)]
pub enum Error {
    /// Failure surfaced without any recovery attempt.
    Transport(HttpError),
    /// Too many consecutive refresh attempts; the session needs a fresh login.
    RefreshCeiling { attempts: u32, limit: u32 },
    /// The refresh call itself failed.
    RefreshFailed(HttpError),
    /// The refresh task ended without reporting an outcome.
    RefreshAborted,
    /// The replayed request failed again.
    Replay(HttpError),
    Decode { url: String, message: String },
    Config(String),
    InitData(String),
}

impl Error {
    /// HTTP status carried by the underlying failure, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.http().and_then(|e| e.status)
    }

    pub fn http(&self) -> Option<&HttpError> {
        match self {
            Error::Transport(e) | Error::RefreshFailed(e) | Error::Replay(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_refresh_ceiling(&self) -> bool {
        matches!(self, Error::RefreshCeiling { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "request failed: {e}"),
            Error::RefreshCeiling { attempts, limit } => write!(
                f,
                "max refresh attempts reached ({attempts}/{limit}); login required"
            ),
            Error::RefreshFailed(e) => write!(f, "token refresh failed: {e}"),
            Error::RefreshAborted => write!(f, "token refresh ended without an outcome"),
            Error::Replay(e) => write!(f, "replayed request failed: {e}"),
            Error::Decode { url, message } => {
                write!(f, "failed to decode response from {url}: {message}")
            }
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
            Error::InitData(msg) => write!(f, "invalid initData: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<HttpError> for Error {
    fn from(err: HttpError) -> Self {
        Error::Transport(err)
    }
}
