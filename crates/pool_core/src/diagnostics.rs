//! Diagnostic event sink: structured, fire-and-forget records of every
//! decision branch the engine takes. Recording never influences control flow;
//! a sink that drops everything is a valid implementation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCategory {
    Api,
    Algorithm,
    Booking,
    Trip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub category: DiagnosticCategory,
    pub action: String,
    pub details: Value,
}

/// Injected sink for diagnostic events. Implementations must be cheap;
/// the engine records on its hot path.
pub trait DiagnosticSink {
    fn record(&mut self, category: DiagnosticCategory, action: &str, details: Value);
}

/// Collects events in memory, in recording order.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    pub events: Vec<DiagnosticEvent>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Actions recorded so far, in order.
    pub fn actions(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.action.as_str()).collect()
    }

    /// One JSON object per line, ready for file or pipe export.
    pub fn to_json_lines(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl DiagnosticSink for DiagnosticLog {
    fn record(&mut self, category: DiagnosticCategory, action: &str, details: Value) {
        self.events.push(DiagnosticEvent {
            category,
            action: action.to_string(),
            details,
        });
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullDiagnostics;

impl DiagnosticSink for NullDiagnostics {
    fn record(&mut self, _category: DiagnosticCategory, _action: &str, _details: Value) {}
}
