use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::errors::Error;
use crate::telemetry::refresh::RefreshTelemetry;

use super::RefreshSource;

type Outcome = Result<(), Error>;
type PendingRefresh = watch::Receiver<Option<Outcome>>;

struct RefreshState {
    /// Set while a refresh call is in flight; every caller in that window attaches to it.
    pending: Option<PendingRefresh>,
    /// Consecutive attempts since the last success.
    attempts: u32,
}

/// Serializes token refreshes into a single in-flight call and bounds consecutive attempts.
///
/// One instance per session, shared by `Arc` between everything that can observe a 401.
pub struct RefreshCoordinator<S> {
    source: Arc<S>,
    limit: u32,
    state: Arc<Mutex<RefreshState>>,
}

impl<S: RefreshSource> RefreshCoordinator<S> {
    pub fn new(source: S, limit: u32) -> Self {
        Self {
            source: Arc::new(source),
            limit,
            state: Arc::new(Mutex::new(RefreshState {
                pending: None,
                attempts: 0,
            })),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn attempts(&self) -> u32 {
        lock(&self.state).attempts
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    /// Clears the attempt counter. Only a fresh login should call this.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        if state.attempts > 0 {
            debug!(attempts = state.attempts, "refresh.reset");
        }
        state.attempts = 0;
    }

    /// Refreshes the session, attaching to the in-flight refresh when there is one.
    ///
    /// All callers attached to the same refresh settle with the same outcome. Once the
    /// attempt budget is spent this fails with [`Error::RefreshCeiling`] without any
    /// network call until [`RefreshCoordinator::reset`] or a success elsewhere.
    pub async fn refresh(&self) -> Result<(), Error> {
        let mut pending = self.join_or_start()?;
        let outcome = match pending.wait_for(Option::is_some).await {
            Ok(settled) => (*settled).clone(),
            Err(_) => None,
        };
        match outcome {
            Some(outcome) => outcome,
            None => {
                // The refresh task died before publishing; don't leave later callers attached to it.
                let mut state = lock(&self.state);
                if state
                    .pending
                    .as_ref()
                    .is_some_and(|p| p.same_channel(&pending))
                {
                    state.pending = None;
                }
                warn!(attempts = state.attempts, "refresh.aborted");
                Err(Error::RefreshAborted)
            }
        }
    }

    /// Check-and-set under one lock with no suspension in between.
    fn join_or_start(&self) -> Result<PendingRefresh, Error> {
        let mut state = lock(&self.state);
        if let Some(pending) = &state.pending {
            debug!(attempt = state.attempts, "refresh.join");
            return Ok(pending.clone());
        }
        if state.attempts >= self.limit {
            RefreshTelemetry::emit_ceiling(state.attempts, self.limit);
            return Err(Error::RefreshCeiling {
                attempts: state.attempts,
                limit: self.limit,
            });
        }

        state.attempts += 1;
        let telemetry = RefreshTelemetry::new(state.attempts, self.limit);
        let (tx, rx) = watch::channel(None);
        state.pending = Some(rx.clone());
        drop(state);

        // Runs detached so a dropped caller cannot strand the others.
        let source = Arc::clone(&self.source);
        let shared = Arc::clone(&self.state);
        tokio::spawn(async move {
            telemetry.emit_start();
            let result = source.refresh().await;
            {
                let mut state = lock(&shared);
                state.pending = None;
                if result.is_ok() {
                    state.attempts = 0;
                }
            }
            let outcome = match result {
                Ok(()) => {
                    telemetry.emit_success();
                    Ok(())
                }
                Err(err) => {
                    telemetry.emit_failure(&err);
                    Err(Error::RefreshFailed(err))
                }
            };
            let _ = tx.send(Some(outcome));
        });

        Ok(rx)
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
