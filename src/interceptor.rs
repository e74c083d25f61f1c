//! Response interceptor: recovers from an expired access token by refreshing the
//! session once and replaying the original request once.

use std::sync::Arc;

use serde_json::json;

use crate::auth::AuthPaths;
use crate::debug_log::DebugLog;
use crate::errors::{Error, HttpError};
use crate::refresh::{RefreshCoordinator, RefreshSource};
use crate::request::RequestDescriptor;
use crate::transport::{ApiResponse, Dispatch};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceReason {
    NotUnauthorized,
    AuthEndpoint,
    AlreadyRetried,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplayDecision {
    Surface(SurfaceReason),
    RefreshAndReplay,
}

pub struct ReplayInterceptor<D, S> {
    inner: D,
    coordinator: Arc<RefreshCoordinator<S>>,
    auth: AuthPaths,
    debug_log: DebugLog,
}

impl<D: Dispatch, S: RefreshSource> ReplayInterceptor<D, S> {
    pub fn new(
        inner: D,
        coordinator: Arc<RefreshCoordinator<S>>,
        auth: AuthPaths,
        debug_log: DebugLog,
    ) -> Self {
        Self {
            inner,
            coordinator,
            auth,
            debug_log,
        }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator<S>> {
        &self.coordinator
    }

    /// Whether a failed request may enter the refresh-and-replay cycle.
    pub fn decide(&self, request: &RequestDescriptor, error: &HttpError) -> ReplayDecision {
        if !error.is_unauthorized() {
            ReplayDecision::Surface(SurfaceReason::NotUnauthorized)
        } else if self.auth.is_auth_endpoint(&request.path) {
            ReplayDecision::Surface(SurfaceReason::AuthEndpoint)
        } else if request.is_retried() {
            ReplayDecision::Surface(SurfaceReason::AlreadyRetried)
        } else {
            ReplayDecision::RefreshAndReplay
        }
    }

    pub async fn send(&self, mut request: RequestDescriptor) -> Result<ApiResponse, Error> {
        let error = match self.inner.dispatch(&request).await {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        if let ReplayDecision::Surface(reason) = self.decide(&request, &error) {
            return Err(self.reject(&request, Error::Transport(error), Some(reason)));
        }

        request.mark_retried();
        self.debug_log.warn(
            format!("http.unauthorized {} {}; refreshing session", request.method, request.path),
            Some(json!({ "url": error.url, "status": 401 })),
        );

        if let Err(refresh_error) = self.coordinator.refresh().await {
            return Err(self.reject(&request, refresh_error, None));
        }

        self.inner
            .dispatch(&request)
            .await
            .map_err(|replay_error| self.reject(&request, Error::Replay(replay_error), None))
    }

    fn reject(
        &self,
        request: &RequestDescriptor,
        error: Error,
        reason: Option<SurfaceReason>,
    ) -> Error {
        let http = error.http();
        self.debug_log.error(
            format!("http.failed {} {}: {}", request.method, request.path, error),
            Some(json!({
                "url": http.map(|e| e.url.as_str()),
                "status": error.status().map(|s| s.as_u16()),
                "message": http.map(|e| e.message.as_str()),
                "body": http.and_then(|e| e.body.as_deref()),
                "retried": request.is_retried(),
                "reason": reason.map(|r| format!("{:?}", r)),
            })),
        );
        error
    }
}
