//! Reconciliation pipeline.
//!
//! Threads one merge session through the four stages:
//!
//! ```text
//! change-sets → ClassificationEngine → buckets
//! vendor snapshots → DependencyGraphBuilder → graph
//! buckets + graph → ReviewOrderer → review order
//! review order + snapshots → GuidanceEngine → working set
//! ```
//!
//! Every stage is a pure function of immutable inputs. A [`Reconciler`] holds
//! no per-run state, so one instance can serve many sessions in parallel.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::canonical::plan_fingerprint;
use crate::classify::{ClassificationEngine, ClassificationResult};
use crate::error::ReconcileError;
use crate::graph::{DependencyGraphBuilder, PatternReferenceExtractor, ReferenceExtractor};
use crate::guidance::GuidanceEngine;
use crate::order::{resolve_dependencies, BrokenEdge, CycleBreaker, LastEdgeCycleBreaker, ReviewOrderer};
use crate::policy::ReconcilePolicyV1;
use crate::stats::ReconcileStats;
use crate::types::{
    Classification, CustomerChangeSet, Diagnostic, DiagnosticKind, DiagnosticSink, NoOpSink, ObjectId,
    ObjectType, OrderedChange, PackageSnapshots, Stage, VendorChangeSet,
};

/// Guidance records generated between two run-context checks.
const GUIDANCE_CHECK_INTERVAL: usize = 256;

/// Inputs of one merge session, as supplied by the extraction collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileInput {
    /// A → C diff.
    pub vendor_changes: VendorChangeSet,
    /// A → B diff.
    pub customer_changes: CustomerChangeSet,
    /// Base, customer and vendor snapshot maps.
    pub snapshots: PackageSnapshots,
}

impl ReconcileInput {
    /// Bundle a session's inputs.
    pub fn new(vendor_changes: VendorChangeSet, customer_changes: CustomerChangeSet, snapshots: PackageSnapshots) -> Self {
        Self {
            vendor_changes,
            customer_changes,
            snapshots,
        }
    }
}

/// Caller-supplied deadline and cancellation for one run.
///
/// Checked between stages and periodically during guidance generation.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    deadline: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl RunContext {
    /// A context with no deadline and no cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the run once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort the run once `timeout` has elapsed from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Abort the run once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    /// Fail if the run was cancelled or ran out of time after `completed`.
    pub fn check(&self, completed: Stage) -> Result<(), ReconcileError> {
        if self.cancelled.as_ref().is_some_and(|f| f.load(Ordering::Relaxed)) {
            tracing::warn!(stage = %completed, "reconciliation cancelled");
            return Err(ReconcileError::Cancelled { stage: completed });
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::warn!(stage = %completed, "reconciliation deadline exceeded");
            return Err(ReconcileError::DeadlineExceeded { stage: completed });
        }
        Ok(())
    }
}

/// The result of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilePlan {
    /// Schema version of this structure.
    pub schema_version: String,
    /// Hash of the policy parameters used.
    pub policy_params_hash: String,
    /// Every changed object, by bucket.
    pub classification: ClassificationResult,
    /// Reviewed changes in display order.
    pub working_set: Vec<OrderedChange>,
    /// Aggregate statistics.
    pub stats: ReconcileStats,
    /// Dependency edges ignored to break cycles among conflicts.
    pub broken_edges: Vec<BrokenEdge>,
    /// Recoverable conditions observed during the run.
    pub diagnostics: Vec<Diagnostic>,
    /// Hash over bucket membership and review order.
    pub plan_fingerprint: String,
}

impl ReconcilePlan {
    /// Fingerprint of bucket membership and review order.
    ///
    /// Identical inputs and policy always yield the same fingerprint. See
    /// [`plan_fingerprint`] for what it covers.
    pub fn compute_fingerprint(classification: &ClassificationResult, working_set: &[OrderedChange]) -> String {
        plan_fingerprint(classification, working_set)
    }

    /// Whether the stored fingerprint matches the plan's content.
    pub fn verify_fingerprint(&self) -> bool {
        Self::compute_fingerprint(&self.classification, &self.working_set) == self.plan_fingerprint
    }

    /// Up to `limit` working-set entries starting at `offset`.
    pub fn page(&self, offset: usize, limit: usize) -> &[OrderedChange] {
        let start = offset.min(self.working_set.len());
        let end = start.saturating_add(limit).min(self.working_set.len());
        &self.working_set[start..end]
    }

    /// Working-set entries of one object type, in display order.
    pub fn filter_by_type(&self, object_type: ObjectType) -> impl Iterator<Item = &OrderedChange> {
        self.working_set
            .iter()
            .filter(move |o| o.change.object_type == object_type)
    }

    /// Working-set entries of one classification, in display order.
    pub fn filter_by_classification(&self, classification: Classification) -> impl Iterator<Item = &OrderedChange> {
        self.working_set
            .iter()
            .filter(move |o| o.classification() == classification)
    }

    /// Working-set entry of an object, if reviewed.
    pub fn get(&self, id: &ObjectId) -> Option<&OrderedChange> {
        self.working_set.iter().find(|o| o.id() == id)
    }
}

/// Runs the reconciliation pipeline.
///
/// ## Diagnostics
///
/// Every recoverable condition is recorded to the configured
/// [`DiagnosticSink`] and returned on [`ReconcilePlan::diagnostics`].
pub struct Reconciler<E: ReferenceExtractor = PatternReferenceExtractor, B: CycleBreaker = LastEdgeCycleBreaker> {
    policy: ReconcilePolicyV1,
    classifier: ClassificationEngine,
    graph_builder: DependencyGraphBuilder<E>,
    orderer: ReviewOrderer<B>,
    guidance: GuidanceEngine,
    sink: Arc<dyn DiagnosticSink>,
}

impl Reconciler {
    /// Create a reconciler with default components for `policy`.
    pub fn new(policy: ReconcilePolicyV1) -> Self {
        Self::with_components(policy.clone(), DependencyGraphBuilder::new(policy), ReviewOrderer::new())
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ReconcilePolicyV1::default())
    }
}

impl<E: ReferenceExtractor, B: CycleBreaker> Reconciler<E, B> {
    /// Create a reconciler with a custom graph builder and orderer.
    pub fn with_components(
        policy: ReconcilePolicyV1,
        graph_builder: DependencyGraphBuilder<E>,
        orderer: ReviewOrderer<B>,
    ) -> Self {
        Self {
            classifier: ClassificationEngine::new(policy.clone()),
            guidance: GuidanceEngine::new(&policy),
            policy,
            graph_builder,
            orderer,
            sink: Arc::new(NoOpSink),
        }
    }

    /// Record diagnostics to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Get the policy.
    pub fn policy(&self) -> &ReconcilePolicyV1 {
        &self.policy
    }

    /// Reconcile one session with no deadline.
    pub fn reconcile(&self, input: &ReconcileInput) -> Result<ReconcilePlan, ReconcileError> {
        self.reconcile_with(input, &RunContext::default())
    }

    /// Reconcile one session under `ctx`.
    ///
    /// Fails only on invariant violations, cancellation or deadline; every
    /// other condition degrades into diagnostics.
    pub fn reconcile_with(&self, input: &ReconcileInput, ctx: &RunContext) -> Result<ReconcilePlan, ReconcileError> {
        let started = Instant::now();

        let (classification, mut diagnostics) = self
            .classifier
            .classify(&input.vendor_changes, &input.customer_changes)
            .map_err(|err| {
                if err.is_invariant() {
                    self.sink.increment(
                        "reconcile_invariant_violations_total",
                        &[("stage", Stage::Classification.as_str())],
                    );
                }
                err
            })?;
        ctx.check(Stage::Classification)?;

        let (graph, graph_diagnostics) = self.graph_builder.build(&input.snapshots.vendor);
        diagnostics.extend(graph_diagnostics);
        ctx.check(Stage::DependencyGraph)?;

        let order = self.orderer.order(&classification, &graph);
        let broken_edges = order.conflict_outcome.broken_edges.clone();
        diagnostics.extend(broken_edges.iter().map(|edge| {
            Diagnostic::new(
                Stage::Ordering,
                DiagnosticKind::GraphCycle {
                    cycle: edge.cycle.clone(),
                    child: edge.child.clone(),
                    parent: edge.parent.clone(),
                },
            )
        }));
        ctx.check(Stage::Ordering)?;

        let dependents = graph.reversed();
        let mut working_set = Vec::with_capacity(order.len());
        for (position, change) in order.sequence.iter().enumerate() {
            if position > 0 && position % GUIDANCE_CHECK_INTERVAL == 0 {
                ctx.check(Stage::Guidance)?;
            }

            let guidance = self.guidance.generate(change, input.snapshots.triple(&change.id));
            if change.classification == Classification::Conflict && guidance.is_degraded() {
                diagnostics.push(Diagnostic::new(
                    Stage::Guidance,
                    DiagnosticKind::MissingSnapshot {
                        object_id: change.id.clone(),
                        missing: guidance.missing.clone(),
                    },
                ));
            }

            working_set.push(OrderedChange {
                change: (*change).clone(),
                display_order: position,
                dependencies: resolve_dependencies(&change.id, &graph, &dependents, &input.snapshots, &order),
                guidance,
            });
        }

        for diagnostic in &diagnostics {
            self.sink.record(diagnostic);
        }

        let stats = ReconcileStats::compute(&classification, &working_set, graph.edge_count(), broken_edges.len());
        let plan_fingerprint = ReconcilePlan::compute_fingerprint(&classification, &working_set);

        tracing::info!(
            changes = classification.len(),
            working_set = working_set.len(),
            conflicts = stats.by_classification.conflict,
            broken_edges = broken_edges.len(),
            diagnostics = diagnostics.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            fingerprint = %plan_fingerprint,
            "reconciliation complete"
        );

        Ok(ReconcilePlan {
            schema_version: crate::RECONCILE_SCHEMA_VERSION.to_string(),
            policy_params_hash: self.policy.params_hash(),
            classification,
            working_set,
            stats,
            broken_edges,
            diagnostics,
            plan_fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeEntry, ChangeSet, CollectingSink, ObjectSnapshot, PackageVersion, Strategy};

    fn base_objects() -> Vec<ObjectSnapshot> {
        vec![
            ObjectSnapshot::new("form", "CustomerForm", ObjectType::Interface).with_code("a!x()"),
            ObjectSnapshot::new("getcust", "GetCustomer", ObjectType::ExpressionRule).with_code("q"),
            ObjectSnapshot::new("max", "MAX_ROWS", ObjectType::Constant).with_code("10"),
            ObjectSnapshot::new("portal", "Portal", ObjectType::Site).with_code("home"),
            ObjectSnapshot::new("admins", "Admins", ObjectType::Group),
            ObjectSnapshot::new("shared", "Shared", ObjectType::Interface).with_code("s"),
        ]
    }

    fn input() -> ReconcileInput {
        let mut snapshots = PackageSnapshots::new();
        for object in base_objects() {
            snapshots.insert(PackageVersion::Base, object.clone());
            snapshots.insert(PackageVersion::Customer, object.clone());
            if object.id.as_str() != "admins" {
                snapshots.insert(PackageVersion::Vendor, object);
            }
        }

        let customer_edits = [
            ObjectSnapshot::new("form", "CustomerForm", ObjectType::Interface).with_code("a!x()\ncustomer line"),
            ObjectSnapshot::new("getcust", "GetCustomer", ObjectType::ExpressionRule).with_code("q\nmine"),
            ObjectSnapshot::new("portal", "Portal", ObjectType::Site).with_code("home\nbanner"),
            ObjectSnapshot::new("admins", "Admins", ObjectType::Group).with_property("members", 3),
            ObjectSnapshot::new("shared", "Shared", ObjectType::Interface).with_code("s\nsame"),
        ];
        let vendor_edits = [
            ObjectSnapshot::new("form", "CustomerForm", ObjectType::Interface)
                .with_code("a!x()\nrule!GetCustomer()"),
            ObjectSnapshot::new("getcust", "GetCustomer", ObjectType::ExpressionRule)
                .with_code("q\nrule!CustomerForm()"),
            ObjectSnapshot::new("max", "MAX_ROWS", ObjectType::Constant).with_code("50"),
            ObjectSnapshot::new("shared", "Shared", ObjectType::Interface).with_code("s\nsame"),
        ];

        let mut customer = ChangeSet::new();
        for edit in customer_edits {
            customer = customer.with_modified(ChangeEntry::from_snapshot(&edit));
            snapshots.insert(PackageVersion::Customer, edit);
        }
        let mut vendor = ChangeSet::new();
        for edit in vendor_edits {
            vendor = vendor.with_modified(ChangeEntry::from_snapshot(&edit));
            snapshots.insert(PackageVersion::Vendor, edit);
        }
        vendor = vendor.with_removed(ChangeEntry::new("admins", "Admins", ObjectType::Group));

        ReconcileInput::new(vendor, customer, snapshots)
    }

    fn ids(plan: &ReconcilePlan) -> Vec<&str> {
        plan.working_set.iter().map(|o| o.id().as_str()).collect()
    }

    #[test]
    fn test_end_to_end() {
        let plan = Reconciler::default().reconcile(&input()).unwrap();

        assert_eq!(plan.stats.by_classification.no_conflict, 2);
        assert_eq!(plan.stats.by_classification.conflict, 2);
        assert_eq!(plan.stats.by_classification.customer_only, 1);
        assert_eq!(plan.stats.by_classification.removed_but_customized, 1);

        // NO_CONFLICT by type, CONFLICT by dependency (cycle broken), then removals
        assert_eq!(ids(&plan), vec!["max", "shared", "getcust", "form", "admins"]);
        for (i, entry) in plan.working_set.iter().enumerate() {
            assert_eq!(entry.display_order, i);
        }

        assert_eq!(plan.broken_edges.len(), 1);
        assert_eq!(plan.stats.dependency_edges, 2);
        assert_eq!(plan.stats.converged_conflicts, 1);
        assert!(plan.verify_fingerprint());
        assert_eq!(plan.schema_version, crate::RECONCILE_SCHEMA_VERSION);
    }

    #[test]
    fn test_guidance_and_dependencies() {
        let plan = Reconciler::default().reconcile(&input()).unwrap();

        let form = plan.get(&ObjectId::new("form")).unwrap();
        assert_eq!(form.guidance.strategy, Strategy::IncorporateVendorAdditions);
        assert_eq!(form.dependencies.parents.len(), 1);
        assert_eq!(form.dependencies.parents[0].name, "GetCustomer");
        assert_eq!(form.dependencies.parents[0].display_order, Some(2));

        let admins = plan.get(&ObjectId::new("admins")).unwrap();
        assert_eq!(admins.guidance.strategy, Strategy::KeepCustomerVersion);

        assert!(plan.get(&ObjectId::new("portal")).is_none());
    }

    #[test]
    fn test_diagnostics_reach_sink_and_plan() {
        let sink = Arc::new(CollectingSink::new());
        let plan = Reconciler::default()
            .with_sink(sink.clone())
            .reconcile(&input())
            .unwrap();

        assert_eq!(sink.get_count("reconcile_graph_cycles_broken_total"), 1);
        assert_eq!(sink.get_count("reconcile_converged_conflicts_total"), 1);
        assert_eq!(sink.diagnostics().len(), plan.diagnostics.len());
    }

    #[test]
    fn test_missing_base_degrades_conflict_guidance() {
        let mut input = input();
        input.snapshots.base.remove(&ObjectId::new("form"));

        let sink = Arc::new(CollectingSink::new());
        let plan = Reconciler::default().with_sink(sink.clone()).reconcile(&input).unwrap();

        let form = plan.get(&ObjectId::new("form")).unwrap();
        assert_eq!(form.guidance.strategy, Strategy::ManualMergeRequired);
        assert_eq!(form.guidance.missing, vec![PackageVersion::Base]);
        assert_eq!(sink.get_count("reconcile_missing_snapshots_total"), 1);
        assert_eq!(plan.stats.degraded_guidance, 1);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let reconciler = Reconciler::default();
        let first = reconciler.reconcile(&input()).unwrap();
        let second = reconciler.reconcile(&input()).unwrap();
        assert_eq!(first.plan_fingerprint, second.plan_fingerprint);
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_expired_deadline_aborts_after_classification() {
        let ctx = RunContext::new().with_deadline(Instant::now());
        let err = Reconciler::default().reconcile_with(&input(), &ctx).unwrap_err();
        assert_eq!(err, ReconcileError::DeadlineExceeded { stage: Stage::Classification });
    }

    #[test]
    fn test_cancel_flag() {
        let flag = Arc::new(AtomicBool::new(true));
        let ctx = RunContext::new().with_cancel_flag(flag);
        let err = Reconciler::default().reconcile_with(&input(), &ctx).unwrap_err();
        assert_eq!(err, ReconcileError::Cancelled { stage: Stage::Classification });

        let ctx = RunContext::new().with_timeout(Duration::from_secs(60));
        assert!(Reconciler::default().reconcile_with(&input(), &ctx).is_ok());
    }

    #[test]
    fn test_duplicate_entry_is_fatal() {
        let mut input = input();
        input.customer_changes = input
            .customer_changes
            .with_removed(ChangeEntry::new("form", "CustomerForm", ObjectType::Interface));

        let sink = Arc::new(CollectingSink::new());
        let err = Reconciler::default().with_sink(sink.clone()).reconcile(&input).unwrap_err();
        assert!(err.is_invariant());
        assert_eq!(sink.get_count("reconcile_invariant_violations_total"), 1);
    }

    #[test]
    fn test_paging_and_filters() {
        let plan = Reconciler::default().reconcile(&input()).unwrap();

        let page: Vec<&str> = plan.page(1, 2).iter().map(|o| o.id().as_str()).collect();
        assert_eq!(page, vec!["shared", "getcust"]);
        assert!(plan.page(10, 5).is_empty());
        assert_eq!(plan.page(4, 100).len(), 1);

        let interfaces: Vec<&str> = plan
            .filter_by_type(ObjectType::Interface)
            .map(|o| o.id().as_str())
            .collect();
        assert_eq!(interfaces, vec!["shared", "form"]);
        assert_eq!(plan.filter_by_classification(Classification::Conflict).count(), 2);
    }

    #[test]
    fn test_parallel_sessions() {
        let reconciler = Arc::new(Reconciler::default());
        let expected = reconciler.reconcile(&input()).unwrap().plan_fingerprint;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let reconciler = Arc::clone(&reconciler);
                std::thread::spawn(move || reconciler.reconcile(&input()).unwrap().plan_fingerprint)
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
