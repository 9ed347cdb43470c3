//! Diagnostics side-channel for recoverable conditions.
//!
//! ## Purpose
//!
//! Only invariant violations stop a reconciliation run. Everything else
//! degrades gracefully and is reported here instead of through errors.
//!
//! | Condition | Kind | Severity | Effect |
//! |-----------|------|----------|--------|
//! | Dependency cycle among conflicts | GraphCycle | MEDIUM | One edge per cycle ignored |
//! | CONFLICT without all three snapshots | MissingSnapshot | MEDIUM | Generic manual-merge guidance |
//! | Reference resolves to no object | MalformedReference | LOW | Edge omitted |
//! | Both sides converged on same content | ContentConverged | LOW | Downgraded to NO_CONFLICT |
//! | Change universe id matches no rule | InvariantViolation | CRITICAL | Run aborted |
//!
//! ## Metrics Integration
//!
//! Every kind maps to a stable counter name. The [`DiagnosticSink`] trait
//! is the interface for observability backends.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::snapshot::{ObjectId, PackageVersion};

/// Severity levels for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Informational.
    Low,
    /// Degraded output for one object.
    Medium,
    /// Degraded output for many objects.
    High,
    /// Run cannot continue.
    Critical,
}

impl Severity {
    /// Lowercase label for metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Pipeline stage that raised a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Change classification.
    Classification,
    /// Dependency graph building.
    DependencyGraph,
    /// Review ordering.
    Ordering,
    /// Guidance generation.
    Guidance,
}

impl Stage {
    /// Stage label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::DependencyGraph => "dependency_graph",
            Self::Ordering => "ordering",
            Self::Guidance => "guidance",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What was observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// An identifier matched no classification rule.
    InvariantViolation {
        /// Offending identifier.
        object_id: ObjectId,
        /// What went wrong.
        detail: String,
    },
    /// A dependency cycle was broken by ignoring one edge.
    GraphCycle {
        /// Identifiers on the cycle, in discovery order.
        cycle: Vec<ObjectId>,
        /// Dependent side of the ignored edge.
        child: ObjectId,
        /// Depended-on side of the ignored edge.
        parent: ObjectId,
    },
    /// Guidance lacked snapshots it needed.
    MissingSnapshot {
        /// Affected object.
        object_id: ObjectId,
        /// Absent package versions.
        missing: Vec<PackageVersion>,
    },
    /// A reference resolved to no known object.
    MalformedReference {
        /// Object whose text held the reference.
        object_id: ObjectId,
        /// Unresolved reference text.
        reference: String,
    },
    /// Both sides changed an object and converged on identical content.
    ContentConverged {
        /// Affected object.
        object_id: ObjectId,
    },
}

impl DiagnosticKind {
    /// Severity of this kind.
    pub fn severity(&self) -> Severity {
        match self {
            Self::InvariantViolation { .. } => Severity::Critical,
            Self::GraphCycle { .. } => Severity::Medium,
            Self::MissingSnapshot { .. } => Severity::Medium,
            Self::MalformedReference { .. } => Severity::Low,
            Self::ContentConverged { .. } => Severity::Low,
        }
    }

    /// Counter name for this kind.
    pub fn metric_name(&self) -> &'static str {
        match self {
            Self::InvariantViolation { .. } => "reconcile_invariant_violations_total",
            Self::GraphCycle { .. } => "reconcile_graph_cycles_broken_total",
            Self::MissingSnapshot { .. } => "reconcile_missing_snapshots_total",
            Self::MalformedReference { .. } => "reconcile_malformed_references_total",
            Self::ContentConverged { .. } => "reconcile_converged_conflicts_total",
        }
    }

    /// Object the diagnostic is about, if it concerns exactly one.
    pub fn object_id(&self) -> Option<&ObjectId> {
        match self {
            Self::InvariantViolation { object_id, .. }
            | Self::MissingSnapshot { object_id, .. }
            | Self::MalformedReference { object_id, .. }
            | Self::ContentConverged { object_id } => Some(object_id),
            Self::GraphCycle { .. } => None,
        }
    }
}

/// A recorded diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Unique diagnostic ID.
    pub id: String,
    /// When it was observed.
    pub observed_at: DateTime<Utc>,
    /// Raising stage.
    pub stage: Stage,
    /// Severity level.
    pub severity: Severity,
    /// What was observed.
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(stage: Stage, kind: DiagnosticKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            observed_at: Utc::now(),
            stage,
            severity: kind.severity(),
            kind,
        }
    }

    /// Log this diagnostic as a structured event.
    pub fn log(&self) {
        match self.severity {
            Severity::Critical => tracing::error!(
                diagnostic_id = %self.id,
                stage = %self.stage,
                kind = ?self.kind,
                "RECONCILE_INVARIANT: run aborted"
            ),
            Severity::High | Severity::Medium => tracing::warn!(
                diagnostic_id = %self.id,
                stage = %self.stage,
                kind = ?self.kind,
                "reconcile degraded: {}",
                self.kind.metric_name()
            ),
            Severity::Low => tracing::debug!(
                diagnostic_id = %self.id,
                stage = %self.stage,
                kind = ?self.kind,
                "reconcile note: {}",
                self.kind.metric_name()
            ),
        }
    }
}

/// Sink for diagnostics and their counters.
///
/// Implementations must be shareable across concurrently running sessions.
pub trait DiagnosticSink: Send + Sync {
    /// Increment a counter by 1.
    fn increment(&self, metric_name: &str, labels: &[(&str, &str)]);

    /// Record a diagnostic: log it and bump its counter.
    fn record(&self, diagnostic: &Diagnostic) {
        diagnostic.log();
        self.increment(
            diagnostic.kind.metric_name(),
            &[
                ("severity", diagnostic.severity.as_label()),
                ("stage", diagnostic.stage.as_str()),
            ],
        );
    }
}

/// Sink that only logs.
#[derive(Debug, Default)]
pub struct NoOpSink;

impl DiagnosticSink for NoOpSink {
    fn increment(&self, _metric_name: &str, _labels: &[(&str, &str)]) {
        // No-op
    }
}

/// Sink that keeps diagnostics and counters in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    counters: Mutex<HashMap<String, u64>>,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the count for a metric across all label sets.
    pub fn get_count(&self, metric_name: &str) -> u64 {
        self.counters
            .lock()
            .iter()
            .filter(|(k, _)| k.split(':').next() == Some(metric_name))
            .map(|(_, v)| v)
            .sum()
    }

    /// All recorded diagnostics, in recording order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }
}

impl DiagnosticSink for CollectingSink {
    fn increment(&self, metric_name: &str, labels: &[(&str, &str)]) {
        let key = format!("{}:{:?}", metric_name, labels);
        *self.counters.lock().entry(key).or_insert(0) += 1;
    }

    fn record(&self, diagnostic: &Diagnostic) {
        diagnostic.log();
        self.increment(
            diagnostic.kind.metric_name(),
            &[
                ("severity", diagnostic.severity.as_label()),
                ("stage", diagnostic.stage.as_str()),
            ],
        );
        self.diagnostics.lock().push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_by_kind() {
        let violation = DiagnosticKind::InvariantViolation {
            object_id: ObjectId::new("X"),
            detail: "no rule".to_string(),
        };
        assert_eq!(violation.severity(), Severity::Critical);

        let malformed = DiagnosticKind::MalformedReference {
            object_id: ObjectId::new("X"),
            reference: "rule!Missing".to_string(),
        };
        assert_eq!(malformed.severity(), Severity::Low);
        assert!(Severity::Critical > Severity::Low);
    }

    #[test]
    fn test_diagnostic_creation() {
        let diag = Diagnostic::new(
            Stage::Guidance,
            DiagnosticKind::MissingSnapshot {
                object_id: ObjectId::new("X"),
                missing: vec![PackageVersion::Base],
            },
        );
        assert_eq!(diag.severity, Severity::Medium);
        assert_eq!(diag.kind.object_id(), Some(&ObjectId::new("X")));
        assert!(!diag.id.is_empty());
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        let kind = DiagnosticKind::GraphCycle {
            cycle: vec![ObjectId::new("A"), ObjectId::new("B")],
            child: ObjectId::new("B"),
            parent: ObjectId::new("A"),
        };

        sink.record(&Diagnostic::new(Stage::Ordering, kind.clone()));
        sink.record(&Diagnostic::new(Stage::Ordering, kind));

        assert_eq!(sink.get_count("reconcile_graph_cycles_broken_total"), 2);
        assert_eq!(sink.get_count("reconcile_missing_snapshots_total"), 0);
        assert_eq!(sink.diagnostics().len(), 2);
    }

    #[test]
    fn test_diagnostic_kind_serialization() {
        let kind = DiagnosticKind::ContentConverged {
            object_id: ObjectId::new("X"),
        };
        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["type"], "content_converged");
        assert_eq!(json["object_id"], "X");
    }
}
