pub mod auth;
mod client;
pub mod config;
pub mod debug_log;
pub mod errors;
pub mod interceptor;
pub mod refresh;
pub mod request;
pub mod telemetry;
pub mod transport;

pub use auth::{AuthPaths, InitData, SessionTokens};
pub use client::LedgerClient;
pub use config::{BuildMode, Config};
pub use debug_log::{DebugEntry, DebugLog, LogLevel};
pub use errors::{Error, HttpError};
pub use interceptor::{ReplayDecision, ReplayInterceptor, SurfaceReason};
pub use refresh::{RefreshCoordinator, RefreshSource};
pub use request::RequestDescriptor;
pub use transport::{ApiResponse, Dispatch, Transport};

#[cfg(test)]
mod tests;
