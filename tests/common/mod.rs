#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use ledger_gateway::{Config, LedgerClient};
use tracing::subscriber::{DefaultGuard, set_default};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Registry, fmt};
use wiremock::MockServer;

pub const LOGIN_PATH: &str = "/api/auth/telegram";
pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const INIT_DATA: &str = "query_id=AAHdF6IQAAAAAN0XohDhrOrc&user=%7B%22id%22%3A279058397%7D&auth_date=1662771648&hash=c501b71e775f74ce10e377dea85a7ea24ecd640b223ea86dfe453e0eaed2e2b2";

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

pub fn config(server: &MockServer) -> Config {
    Config::for_api_url(server.uri())
}

pub fn client(server: &MockServer) -> LedgerClient {
    LedgerClient::new(config(server)).expect("client construction")
}

pub fn session_body() -> serde_json::Value {
    serde_json::json!({
        "accessToken": "access-1",
        "accessTokenExpiresAt": "2026-10-19T12:15:00Z",
        "refreshToken": "refresh-1",
        "refreshTokenExpiresAt": null
    })
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

pub fn capture_logs() -> (Arc<Mutex<Vec<String>>>, DefaultGuard) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let writer_lines = lines.clone();
    let subscriber = Registry::default().with(
        fmt::Layer::default()
            .with_writer(move || VecWriter {
                lines: writer_lines.clone(),
            })
            .with_target(false)
            .with_level(true)
            .with_ansi(false),
    );
    let guard = set_default(subscriber);
    (lines, guard)
}
