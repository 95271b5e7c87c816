//! Structured progress reporting for sync runs.
//!
//! The orchestrator reports each phase of its state machine
//! (`scan → load → chunk → embed → upsert → commit`) so that a caller can
//! render incremental feedback for long runs.

use std::sync::Arc;
use std::time::Instant;

/// Phases of a sync run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Scan,
    Load,
    Chunk,
    Embed,
    Upsert,
    Commit,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Load => "load",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Upsert => "upsert",
            Self::Commit => "commit",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress event emitted during a sync run.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: SyncPhase,

    /// Work done so far in this phase (files, chunks)
    pub current: u64,

    /// Total expected work, if known
    pub total: Option<u64>,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: Option<f64>,

    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: Option<f64>,
}

impl ProgressEvent {
    pub fn new(
        phase: SyncPhase,
        current: u64,
        total: Option<u64>,
        message: impl Into<String>,
    ) -> Self {
        let percentage = total.map(|t| {
            if t > 0 {
                (current as f64 / t as f64) * 100.0
            } else {
                0.0
            }
        });

        Self {
            phase,
            current,
            total,
            percentage,
            message: message.into(),
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, elapsed_secs: f64) -> Self {
        self.elapsed_secs = Some(elapsed_secs);
        self
    }

    /// Format as a single user-facing line.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };

        let pct = self
            .percentage
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits progress events through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Arc<Instant>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Arc::new(Instant::now()),
        }
    }

    /// A reporter that drops every event.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Arc::new(Instant::now()),
        }
    }

    pub fn emit(&self, event: ProgressEvent) {
        let Some(callback) = &self.callback else {
            return;
        };

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let event = event.with_elapsed(elapsed);

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            message = %event.message,
            elapsed_secs = elapsed,
            "Progress event"
        );

        callback(event);
    }

    pub fn scan(&self, changed: u64, scanned: u64) {
        self.emit(ProgressEvent::new(
            SyncPhase::Scan,
            changed,
            Some(scanned),
            format!("{} of {} files need indexing", changed, scanned),
        ));
    }

    pub fn load(&self, current: u64, total: u64, source: &str) {
        self.emit(ProgressEvent::new(
            SyncPhase::Load,
            current,
            Some(total),
            format!("reading {}", source),
        ));
    }

    pub fn chunk(&self, current: u64, total: u64, chunks: usize) {
        self.emit(ProgressEvent::new(
            SyncPhase::Chunk,
            current,
            Some(total),
            format!("{} chunks created", chunks),
        ));
    }

    pub fn embed(&self, done: u64, total: u64, model: &str) {
        self.emit(ProgressEvent::new(
            SyncPhase::Embed,
            done,
            Some(total),
            format!("model={}", model),
        ));
    }

    pub fn upsert(&self, done: u64, total: u64, backend: &str) {
        self.emit(ProgressEvent::new(
            SyncPhase::Upsert,
            done,
            Some(total),
            format!("writing to {}", backend),
        ));
    }

    pub fn commit(&self, current: u64, total: u64, source: &str) {
        self.emit(ProgressEvent::new(
            SyncPhase::Commit,
            current,
            Some(total),
            format!("recorded {}", source),
        ));
    }
}
