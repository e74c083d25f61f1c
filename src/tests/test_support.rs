use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use tracing::subscriber::{DefaultGuard, set_default};
use tracing_subscriber::{Registry, fmt, layer::SubscriberExt};

use crate::auth::AuthPaths;
use crate::debug_log::DebugLog;
use crate::errors::HttpError;
use crate::interceptor::ReplayInterceptor;
use crate::refresh::{RefreshCoordinator, RefreshSource};
use crate::request::RequestDescriptor;
use crate::transport::{ApiResponse, Dispatch};

pub const BASE: &str = "http://ledger.test";

pub fn auth_paths() -> AuthPaths {
    AuthPaths::new("/api/auth/telegram", "/api/auth/refresh")
}

pub fn ok(path: &str, body: &str) -> Result<ApiResponse, HttpError> {
    Ok(ApiResponse {
        status: StatusCode::OK,
        url: format!("{BASE}{path}"),
        body: body.to_string(),
    })
}

pub fn failure(path: &str, status: StatusCode, body: &str) -> HttpError {
    HttpError::from_status(format!("{BASE}{path}"), status, body.to_string())
}

pub fn unauthorized(path: &str) -> HttpError {
    failure(path, StatusCode::UNAUTHORIZED, r#"{"message":"token expired"}"#)
}

/// Dispatcher answering from per-path scripts; unscripted calls get `200 {}`.
#[derive(Default)]
pub struct ScriptedDispatch {
    scripts: Mutex<HashMap<String, VecDeque<Result<ApiResponse, HttpError>>>>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl ScriptedDispatch {
    pub fn script(self, path: &str, responses: Vec<Result<ApiResponse, HttpError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(path.to_string(), responses.into());
        self
    }

    /// `(path, retried)` per dispatch, in order.
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|(p, _)| p == path).count()
    }
}

impl Dispatch for ScriptedDispatch {
    async fn dispatch(&self, request: &RequestDescriptor) -> Result<ApiResponse, HttpError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.path.clone(), request.is_retried()));
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.path)
            .and_then(|queue| queue.pop_front());
        tokio::task::yield_now().await;
        next.unwrap_or_else(|| ok(&request.path, "{}"))
    }
}

/// Refresh source that counts calls and answers from a script (default: success).
pub struct FakeRefresh {
    calls: AtomicUsize,
    delay: Duration,
    results: Mutex<VecDeque<Result<(), HttpError>>>,
}

impl FakeRefresh {
    pub fn succeeding(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
            results: Mutex::new(VecDeque::new()),
        }
    }

    pub fn failing(times: usize, delay: Duration) -> Self {
        let fake = Self::succeeding(delay);
        {
            let mut results = fake.results.lock().unwrap();
            for _ in 0..times {
                results.push_back(Err(unauthorized("/api/auth/refresh")));
            }
        }
        fake
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RefreshSource for FakeRefresh {
    async fn refresh(&self) -> Result<(), HttpError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.results.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }
}

pub fn interceptor(
    dispatch: ScriptedDispatch,
    refresh: FakeRefresh,
) -> ReplayInterceptor<ScriptedDispatch, FakeRefresh> {
    ReplayInterceptor::new(
        dispatch,
        Arc::new(RefreshCoordinator::new(refresh, 5)),
        auth_paths(),
        DebugLog::new(64),
    )
}

struct VecWriter {
    lines: Arc<Mutex<Vec<String>>>,
}

impl std::io::Write for VecWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.lines.lock().unwrap();
        guard.push(String::from_utf8_lossy(buf).into_owned());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn make_subscriber(lines: Arc<Mutex<Vec<String>>>) -> impl tracing::Subscriber + Send + Sync {
    let writer_lines = lines.clone();
    Registry::default().with(
        fmt::Layer::default()
            .with_writer(move || VecWriter {
                lines: writer_lines.clone(),
            })
            .with_target(false)
            .with_level(true)
            .with_ansi(false),
    )
}

pub fn capture_logs() -> (Arc<Mutex<Vec<String>>>, DefaultGuard) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let guard = set_default(make_subscriber(lines.clone()));
    (lines, guard)
}

pub fn drain_logs(lines: &Mutex<Vec<String>>) -> Vec<String> {
    std::mem::take(&mut *lines.lock().unwrap())
}
