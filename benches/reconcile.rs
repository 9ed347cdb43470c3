//! Performance benchmarks for the reconciliation pipeline.
//!
//! Run with: `cargo bench --bench reconcile`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Classification | <5ms for 10k ids | Two indexed change-sets |
//! | Graph build | <100ms for 10k objects | Regex extraction over code |
//! | Conflict ordering | <20ms for 10k conflicts | Kahn + cycle breaking |
//! | Full reconcile | <500ms for 10k objects | Including guidance diffs |

use criterion::{
    black_box, criterion_group, criterion_main,
    BenchmarkId, Criterion, Throughput,
};

use reconcile_kernel::{
    ChangeEntry, ChangeSet, ClassificationEngine, DependencyGraph, DependencyGraphBuilder,
    ObjectId, ObjectSnapshot, ObjectType, PackageSnapshots, PackageVersion, ReconcileInput,
    Reconciler, TopologicalOrderer,
};

fn object_id(i: usize) -> ObjectId {
    ObjectId::new(format!("obj-{:06}", i))
}

fn rule_name(i: usize) -> String {
    format!("Rule{}", i)
}

/// Code for object `i`: calls its two "parents" plus a body that varies by `flavor`.
fn code(i: usize, flavor: &str) -> String {
    let mut lines = Vec::new();
    if i > 0 {
        lines.push(format!("rule!{}(ri!input)", rule_name(i / 2)));
    }
    if i > 2 {
        lines.push(format!("rule!{}()", rule_name(i - 3)));
    }
    for line in 0..8 {
        lines.push(format!("local!v{line}: {flavor} {i}"));
    }
    lines.join("\n")
}

fn snapshot(i: usize, flavor: &str) -> ObjectSnapshot {
    ObjectSnapshot::new(object_id(i), rule_name(i), ObjectType::ExpressionRule)
        .with_code(code(i, flavor))
        .with_property("description", format!("{flavor} object {i}"))
}

/// A package of `n` objects: the vendor touches every object, the customer
/// every third one, and every seventh customer edit converges with the vendor.
fn make_input(n: usize) -> ReconcileInput {
    let mut snapshots = PackageSnapshots::new();
    let mut vendor = ChangeSet::new();
    let mut customer = ChangeSet::new();

    for i in 0..n {
        let base = snapshot(i, "base");
        let ours = snapshot(i, if i % 7 == 0 { "vendor" } else { "customer" });
        let theirs = snapshot(i, "vendor");

        vendor = vendor.with_modified(ChangeEntry::from_snapshot(&theirs));
        if i % 3 == 0 {
            customer = customer.with_modified(ChangeEntry::from_snapshot(&ours));
            snapshots.insert(PackageVersion::Customer, ours);
        } else {
            snapshots.insert(PackageVersion::Customer, base.clone());
        }
        snapshots.insert(PackageVersion::Base, base);
        snapshots.insert(PackageVersion::Vendor, theirs);
    }

    ReconcileInput::new(vendor, customer, snapshots)
}

/// Dense graph with cycles: every node points at its half and its successor.
fn make_graph(n: usize) -> (Vec<ObjectId>, DependencyGraph) {
    let mut graph = DependencyGraph::new();
    for i in 0..n {
        graph.add_edge(object_id(i), object_id(i / 2));
        graph.add_edge(object_id(i), object_id((i + 1) % n));
    }
    ((0..n).map(object_id).collect(), graph)
}

const SIZES: [usize; 3] = [100, 1_000, 10_000];

/// Benchmark classification alone.
fn bench_classification(c: &mut Criterion) {
    let engine = ClassificationEngine::default();
    let mut group = c.benchmark_group("classification");

    for n in SIZES {
        let input = make_input(n);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("objects", n), &input, |b, input| {
            b.iter(|| {
                engine
                    .classify(black_box(&input.vendor_changes), black_box(&input.customer_changes))
                    .unwrap()
            })
        });
    }

    group.finish();
}

/// Benchmark reference extraction and graph construction.
fn bench_graph_build(c: &mut Criterion) {
    let builder = DependencyGraphBuilder::default();
    let mut group = c.benchmark_group("graph_build");

    for n in SIZES {
        let input = make_input(n);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("objects", n), &input, |b, input| {
            b.iter(|| builder.build(black_box(&input.snapshots.vendor)))
        });
    }

    group.finish();
}

/// Benchmark topological ordering on a cyclic graph.
fn bench_ordering(c: &mut Criterion) {
    let orderer = TopologicalOrderer::new();
    let mut group = c.benchmark_group("ordering");

    for n in SIZES {
        let (ids, graph) = make_graph(n);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("nodes", n), &(ids, graph), |b, (ids, graph)| {
            b.iter(|| {
                let outcome = orderer.order(black_box(ids), black_box(graph));
                assert_eq!(outcome.order.len(), ids.len());
                outcome
            })
        });
    }

    group.finish();
}

/// Benchmark the whole pipeline.
fn bench_full_reconcile(c: &mut Criterion) {
    let reconciler = Reconciler::default();
    let mut group = c.benchmark_group("full_reconcile");
    group.sample_size(20);

    for n in SIZES {
        let input = make_input(n);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("objects", n), &input, |b, input| {
            b.iter(|| reconciler.reconcile(black_box(input)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_classification,
    bench_graph_build,
    bench_ordering,
    bench_full_reconcile,
);
criterion_main!(benches);
