use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::HttpError;

/// Structured events for one refresh attempt.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    attempt: u32,
    limit: u32,
}

impl RefreshTelemetry {
    pub fn new(attempt: u32, limit: u32) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            attempt,
            limit,
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn emit_start(&self) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            attempt = self.attempt,
            limit = self.limit,
            "refresh.start"
        );
    }

    pub fn emit_success(&self) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            attempt = self.attempt,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, error: &HttpError) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            attempt = self.attempt,
            limit = self.limit,
            status = ?error.status,
            error = %error,
            "refresh.failure"
        );
    }

    /// Emitted instead of a start event when the attempt budget is spent.
    pub fn emit_ceiling(attempts: u32, limit: u32) {
        event!(Level::ERROR, attempts, limit, "refresh.ceiling");
    }
}
