//! In-process diagnostic log: a capped ring buffer that subscribers can follow.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use jiff::Timestamp;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const SUBSCRIBER_BUFFER: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, Serialize)]
pub struct DebugEntry {
    pub sequence: u64,
    pub timestamp: Timestamp,
    pub level: LogLevel,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

struct Ring {
    entries: VecDeque<DebugEntry>,
    capacity: usize,
    next_sequence: u64,
}

/// Cheap to clone; all clones share one buffer.
#[derive(Clone)]
pub struct DebugLog {
    ring: Arc<Mutex<Ring>>,
    events: broadcast::Sender<DebugEntry>,
}

impl DebugLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (events, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        Self {
            ring: Arc::new(Mutex::new(Ring {
                entries: VecDeque::with_capacity(capacity),
                capacity,
                next_sequence: 1,
            })),
            events,
        }
    }

    pub fn capacity(&self) -> usize {
        self.ring().capacity
    }

    /// Appends an entry, evicting the oldest one when full, and mirrors it to `tracing`.
    pub fn record(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> u64 {
        let entry = {
            let mut ring = self.ring();
            let entry = DebugEntry {
                sequence: ring.next_sequence,
                timestamp: Timestamp::now(),
                level,
                message: message.into(),
                details,
            };
            ring.next_sequence += 1;
            if ring.entries.len() == ring.capacity {
                ring.entries.pop_front();
            }
            ring.entries.push_back(entry.clone());
            entry
        };

        match entry.level {
            LogLevel::Debug => debug!(sequence = entry.sequence, details = ?entry.details, "{}", entry.message),
            LogLevel::Info => info!(sequence = entry.sequence, details = ?entry.details, "{}", entry.message),
            LogLevel::Warn => warn!(sequence = entry.sequence, details = ?entry.details, "{}", entry.message),
            LogLevel::Error => error!(sequence = entry.sequence, details = ?entry.details, "{}", entry.message),
        }

        let sequence = entry.sequence;
        // No receivers is not an error for a diagnostics sink.
        let _ = self.events.send(entry);
        sequence
    }

    pub fn debug(&self, message: impl Into<String>, details: Option<serde_json::Value>) -> u64 {
        self.record(LogLevel::Debug, message, details)
    }

    pub fn info(&self, message: impl Into<String>, details: Option<serde_json::Value>) -> u64 {
        self.record(LogLevel::Info, message, details)
    }

    pub fn warn(&self, message: impl Into<String>, details: Option<serde_json::Value>) -> u64 {
        self.record(LogLevel::Warn, message, details)
    }

    pub fn error(&self, message: impl Into<String>, details: Option<serde_json::Value>) -> u64 {
        self.record(LogLevel::Error, message, details)
    }

    /// Snapshot of the retained window, oldest first.
    pub fn entries(&self) -> Vec<DebugEntry> {
        self.ring().entries.iter().cloned().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DebugEntry> {
        self.events.subscribe()
    }

    /// Drops retained entries. Sequence numbers keep counting.
    pub fn clear(&self) {
        self.ring().entries.clear();
    }

    fn ring(&self) -> std::sync::MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_DEBUG_LOG_CAPACITY)
    }
}
