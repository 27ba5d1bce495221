use crate::output;
use folio_groups::MetricsSnapshot;
use serde::Serialize;
use std::io::Write;

/// Emit a JSONL event to stdout and, when configured, the report file.
pub fn emit<T: Serialize>(event: &T) {
    if let Ok(json) = serde_json::to_string(event) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = writeln!(lock, "{json}");
        let _ = lock.flush();

        output::write_jsonl_line(&json);
    }
}

/// RFC 3339 timestamp for JSONL events.
pub fn now_iso() -> String {
    chrono::Local::now().to_rfc3339()
}

#[derive(Serialize)]
pub struct EventStarted {
    pub event: &'static str,
    pub mode: String,
    pub version: &'static str,
    pub timestamp: String,
}

impl EventStarted {
    pub fn new(mode: &str) -> Self {
        Self {
            event: "started",
            mode: mode.to_string(),
            version: env!("CARGO_PKG_VERSION"),
            timestamp: now_iso(),
        }
    }
}

/// Engine counters at the end of a run.
#[derive(Serialize)]
pub struct EventMetrics {
    pub event: &'static str,
    pub mode: String,
    pub metrics: MetricsSnapshot,
    pub timestamp: String,
}

impl EventMetrics {
    pub fn new(mode: &str, metrics: MetricsSnapshot) -> Self {
        Self {
            event: "metrics",
            mode: mode.to_string(),
            metrics,
            timestamp: now_iso(),
        }
    }
}

#[derive(Serialize)]
pub struct EventRace {
    pub event: &'static str,
    pub capacity: u8,
    pub applicants: usize,
    pub approved: usize,
    pub refused: usize,
    pub members: usize,
    pub elapsed_ms: f64,
}

#[derive(Serialize)]
pub struct EventSoak {
    pub event: &'static str,
    pub seed: u64,
    pub groups: usize,
    pub ops: usize,
    pub accepted: usize,
    pub refused: usize,
    pub violations: usize,
    pub elapsed_ms: f64,
}

#[derive(Serialize)]
pub struct EventNotification {
    pub event: &'static str,
    pub kind: String,
    pub group: String,
    pub recipient: String,
    pub message: String,
}
