use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::info;

use crate::{
    auth::{InitData, LoginRequest, SessionTokens},
    config::Config,
    debug_log::DebugLog,
    errors::Error,
    interceptor::ReplayInterceptor,
    refresh::RefreshCoordinator,
    request::RequestDescriptor,
    transport::{ApiResponse, Transport},
};

/// Session-scoped API client: one transport, one refresh coordinator, one debug log.
pub struct LedgerClient {
    transport: Transport,
    coordinator: Arc<RefreshCoordinator<Transport>>,
    interceptor: ReplayInterceptor<Transport, Transport>,
    debug_log: DebugLog,
}

impl LedgerClient {
    /// Create a new LedgerClient
    /// # Arguments
    /// * `config` - Explicit configuration, typically loaded via `Config::from_file` or `Config::from_env`.
    pub fn new(config: Config) -> Result<Self, Error> {
        let debug_log = DebugLog::new(config.debug_log_capacity());
        let transport = Transport::new(&config, debug_log.clone())?;
        let coordinator = Arc::new(RefreshCoordinator::new(
            transport.clone(),
            config.max_refresh_attempts(),
        ));
        let interceptor = ReplayInterceptor::new(
            transport.clone(),
            Arc::clone(&coordinator),
            config.auth_paths(),
            debug_log.clone(),
        );
        info!(
            base = %transport.base(),
            max_refresh_attempts = coordinator.limit(),
            "ledger client ready"
        );
        Ok(Self {
            transport,
            coordinator,
            interceptor,
            debug_log,
        })
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator<Transport>> {
        &self.coordinator
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.debug_log
    }

    /// Exchanges Telegram initData for session tokens. A 401 here is never refreshed.
    ///
    /// A successful login starts a new session, so the refresh attempt budget is restored.
    pub async fn login(&self, init_data: &InitData) -> Result<SessionTokens, Error> {
        let login_path = self.transport.auth_paths().login.clone();
        let request = RequestDescriptor::post(login_path).with_json(&LoginRequest::from(init_data))?;
        let tokens: SessionTokens = self.interceptor.send(request).await?.json()?;
        self.coordinator.reset();
        info!(
            access_expires = ?tokens.access_token_expires_at,
            refresh_expires = ?tokens.refresh_token_expires_at,
            "login ok"
        );
        Ok(tokens)
    }

    /// Runs (or joins) a session refresh outside the replay path.
    ///
    /// A rejection is recorded in the debug log the same way the interceptor records one.
    pub async fn refresh(&self) -> Result<(), Error> {
        self.coordinator.refresh().await.inspect_err(|err| {
            let http = err.http();
            self.debug_log.error(
                format!(
                    "http.failed POST {}: {}",
                    self.transport.auth_paths().refresh,
                    err
                ),
                Some(json!({
                    "url": http.map(|e| e.url.as_str()),
                    "status": err.status().map(|s| s.as_u16()),
                    "message": http.map(|e| e.message.as_str()),
                    "body": http.and_then(|e| e.body.as_deref()),
                    "retried": false,
                    "reason": "refresh",
                })),
            );
        })
    }

    pub async fn send(&self, request: RequestDescriptor) -> Result<ApiResponse, Error> {
        self.interceptor.send(request).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.send(RequestDescriptor::get(path)).await?.json()
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(RequestDescriptor::post(path).with_json(body)?)
            .await?
            .json()
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(RequestDescriptor::put(path).with_json(body)?)
            .await?
            .json()
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(RequestDescriptor::patch(path).with_json(body)?)
            .await?
            .json()
    }

    pub async fn delete(&self, path: &str) -> Result<(), Error> {
        self.send(RequestDescriptor::delete(path)).await.map(|_| ())
    }
}
