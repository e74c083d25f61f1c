use std::future::Future;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::auth::AuthPaths;
use crate::config::Config;
use crate::debug_log::DebugLog;
use crate::errors::{Error, HttpError};
use crate::refresh::RefreshSource;
use crate::request::RequestDescriptor;

const CLIENT_USER_AGENT: &str = "ledger-gateway/0.1.0";

/// Successful (2xx) response with its body already read.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub url: String,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_str(&self.body).map_err(|e| Error::Decode {
            url: self.url.clone(),
            message: e.to_string(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// Anything that can put a request on the wire.
pub trait Dispatch: Send + Sync {
    fn dispatch(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = Result<ApiResponse, HttpError>> + Send;
}

/// One HTTP client per session: fixed base URL, timeout, cookie jar and JSON defaults.
#[derive(Clone)]
pub struct Transport {
    http_client: Client,
    base: Url,
    auth: AuthPaths,
    debug_log: DebugLog,
}

impl Transport {
    pub fn new(config: &Config, debug_log: DebugLog) -> Result<Self, Error> {
        let base = config.api_base()?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        let http_client = Client::builder()
            .timeout(config.timeout())
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            base,
            auth: config.auth_paths(),
            debug_log,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn auth_paths(&self) -> &AuthPaths {
        &self.auth
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path)
    }

    /// Issues the call once. Non-2xx outcomes reject; nothing is retried here.
    pub async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse, HttpError> {
        let url = self.url_for(&request.path);

        let mut details = json!({
            "method": request.method.as_str(),
            "url": url,
            "base": self.base.as_str(),
        });
        if self.auth.is_login(&request.path)
            && let Some(payload) = &request.body
        {
            details["payload"] = payload.clone();
        }
        self.debug_log
            .debug(format!("http.request {} {}", request.method, request.path), Some(details));

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(&url, &e))?;
        let status = resp.status();
        if status.is_success() {
            let body = resp
                .text()
                .await
                .map_err(|e| HttpError::from_reqwest(&url, &e))?;
            Ok(ApiResponse { status, url, body })
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(HttpError::from_status(url, status, body))
        }
    }
}

impl Dispatch for Transport {
    async fn dispatch(&self, request: &RequestDescriptor) -> Result<ApiResponse, HttpError> {
        self.send(request).await
    }
}

impl RefreshSource for Transport {
    async fn refresh(&self) -> Result<(), HttpError> {
        let request = RequestDescriptor::post(self.auth.refresh.clone());
        self.send(&request).await.map(|_| ())
    }
}
