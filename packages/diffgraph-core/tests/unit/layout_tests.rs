// Layout Coordinator Tests
//
// Test Categories:
// 1. Synchronized layout (scenario: 50-node super + combined graphs)
// 2. Geometry propagation to the single graphs (elements and stubs)
// 3. Cancellation (no partial geometry)
// 4. Failure (fail fast, graph content unchanged)
// 5. Independent mode

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;

use diffgraph_core::{
    build_container, AddressPair, CancelToken, DiffViewConfig, GraphScope, GraphsContainer,
    InMemoryMatchStore, LayeredLayoutEngine, LayoutCoordinator, LayoutEngine, LayoutError,
    LayoutInput, LayoutMode, LayoutOutcome, LayoutPhase, LayoutResult, MatchRecord, Point,
    ProximityConfig, RawDiff, RawEdgeKind, StubDirection, ViewKind,
};

// ============================================================
// Test Helpers
// ============================================================

fn chain_diff(length: u64) -> RawDiff {
    let mut diff = RawDiff::new(GraphScope::CallGraph);
    for index in 0..length {
        let primary = 0x1000 + index;
        let secondary = 0x2000 + index;
        diff.primary.push_node(primary, format!("f{index}"));
        diff.secondary.push_node(secondary, format!("f{index}"));
        diff.matches.push(MatchRecord::new(primary, secondary));
        if index > 0 {
            diff.primary
                .push_edge(primary - 1, primary, RawEdgeKind::Call);
            diff.secondary
                .push_edge(secondary - 1, secondary, RawEdgeKind::Call);
        }
    }
    diff
}

fn build(diff: &RawDiff) -> GraphsContainer {
    build_container(
        diff,
        Box::new(InMemoryMatchStore::new()),
        DiffViewConfig::default(),
    )
    .unwrap()
}

fn positions_of(container: &GraphsContainer, view: ViewKind) -> Vec<Option<Point>> {
    let graph = container.view(view);
    graph
        .node_indices()
        .into_iter()
        .map(|index| graph.node(index).unwrap().position)
        .collect()
}

/// Blocks until cancelled; never produces geometry
struct BlockingEngine;

impl LayoutEngine for BlockingEngine {
    fn compute(
        &self,
        _input: &LayoutInput,
        cancel: &CancelToken,
    ) -> Result<LayoutResult, LayoutError> {
        while !cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(2));
        }
        Err(LayoutError::Cancelled)
    }
}

/// Always fails
struct FailingEngine;

impl LayoutEngine for FailingEngine {
    fn compute(
        &self,
        _input: &LayoutInput,
        _cancel: &CancelToken,
    ) -> Result<LayoutResult, LayoutError> {
        Err(LayoutError::Engine("deliberate failure".to_string()))
    }
}

/// First invocation succeeds, the second fails
struct HalfFailingEngine {
    calls: AtomicUsize,
}

impl LayoutEngine for HalfFailingEngine {
    fn compute(
        &self,
        input: &LayoutInput,
        cancel: &CancelToken,
    ) -> Result<LayoutResult, LayoutError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            LayeredLayoutEngine::default().compute(input, cancel)
        } else {
            Err(LayoutError::Engine("second worker failed".to_string()))
        }
    }
}

// ============================================================
// 1. Synchronized Layout (scenario C)
// ============================================================

#[test]
fn test_synchronized_layout_of_fifty_nodes() {
    let mut container = build(&chain_diff(50));
    let coordinator = LayoutCoordinator::new(Arc::new(LayeredLayoutEngine::default()));

    let outcome = coordinator
        .relayout(&mut container, LayoutMode::Synchronized)
        .unwrap();
    assert_eq!(outcome, LayoutOutcome::Done);
    assert_eq!(coordinator.phase(), LayoutPhase::Done);

    for view in [ViewKind::Super, ViewKind::Combined] {
        let positions = positions_of(&container, view);
        assert_eq!(positions.len(), 50);
        assert!(positions.iter().all(|p| p.is_some()), "{view:?} fully laid out");
    }
}

#[test]
fn test_super_geometry_copied_to_single_graphs() {
    let mut container = build(&chain_diff(10));
    let coordinator = LayoutCoordinator::new(Arc::new(LayeredLayoutEngine::default()));
    coordinator
        .relayout(&mut container, LayoutMode::Synchronized)
        .unwrap();

    for index in 0..10u64 {
        let pair = AddressPair::matched(0x1000 + index, 0x2000 + index);
        let entry = container.pair_entry(&pair).unwrap();
        let super_node = container.view(ViewKind::Super).node(entry.super_node).unwrap();
        let super_position = super_node.position.unwrap();

        let primary = super_node.links.primary.unwrap();
        let secondary = super_node.links.secondary.unwrap();
        assert_eq!(
            container.view(ViewKind::Primary).node(primary).unwrap().position,
            Some(super_position)
        );
        assert_eq!(
            container
                .view(ViewKind::Secondary)
                .node(secondary)
                .unwrap()
                .position,
            Some(super_position)
        );
    }
}

#[test]
fn test_relayout_emits_one_batch() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut container = build(&chain_diff(5));
    let batches: Rc<RefCell<usize>> = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&batches);
    container.subscribe(move |_| *sink.borrow_mut() += 1);

    let coordinator = LayoutCoordinator::new(Arc::new(LayeredLayoutEngine::default()));
    coordinator
        .relayout(&mut container, LayoutMode::Synchronized)
        .unwrap();
    assert_eq!(*batches.borrow(), 1);
}

// ============================================================
// 2. Stub Geometry via Structural Adjacency
// ============================================================

#[test]
fn test_stub_positions_found_by_adjacency() {
    let mut container = build_container(
        &chain_diff(4),
        Box::new(InMemoryMatchStore::new()),
        DiffViewConfig {
            proximity: ProximityConfig {
                children_depth: 1,
                parents_depth: 0,
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .unwrap();
    container
        .update_proximity(&[AddressPair::matched(0x1000, 0x2000)])
        .unwrap();

    let coordinator = LayoutCoordinator::new(Arc::new(LayeredLayoutEngine::default()));
    coordinator
        .relayout(&mut container, LayoutMode::Synchronized)
        .unwrap();

    // the frontier node d1 carries the child stub
    let entry = container
        .pair_entry(&AddressPair::matched(0x1001, 0x2001))
        .unwrap();
    let super_stub = container
        .view(ViewKind::Super)
        .stub_of(entry.super_node, StubDirection::Outgoing)
        .unwrap();
    let super_stub_position = container
        .view(ViewKind::Super)
        .node(super_stub)
        .unwrap()
        .position
        .unwrap();

    let primary_owner = container
        .view(ViewKind::Super)
        .node(entry.super_node)
        .unwrap()
        .links
        .primary
        .unwrap();
    let primary_stub = container
        .view(ViewKind::Primary)
        .stub_of(primary_owner, StubDirection::Outgoing)
        .unwrap();
    assert_eq!(
        container
            .view(ViewKind::Primary)
            .node(primary_stub)
            .unwrap()
            .position,
        Some(super_stub_position)
    );
}

// ============================================================
// 3. Cancellation
// ============================================================

#[test]
fn test_cancellation_applies_no_partial_geometry() {
    let mut container = build(&chain_diff(8));

    // lay out once so there is previous geometry to protect
    let first = LayoutCoordinator::new(Arc::new(LayeredLayoutEngine::default()));
    first
        .relayout(&mut container, LayoutMode::Synchronized)
        .unwrap();
    let before = positions_of(&container, ViewKind::Super);

    let coordinator = Arc::new(LayoutCoordinator::new(Arc::new(BlockingEngine)));
    let canceller = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            coordinator.cancel();
        })
    };

    let outcome = coordinator
        .relayout(&mut container, LayoutMode::Synchronized)
        .unwrap();
    canceller.join().unwrap();

    assert_eq!(outcome, LayoutOutcome::Cancelled);
    assert_eq!(coordinator.phase(), LayoutPhase::Cancelled);
    // previous geometry untouched
    assert_eq!(positions_of(&container, ViewKind::Super), before);
}

// ============================================================
// 4. Failure
// ============================================================

#[test]
fn test_engine_failure_leaves_graphs_unchanged() {
    let mut container = build(&chain_diff(6));
    let coordinator = LayoutCoordinator::new(Arc::new(FailingEngine));

    let result = coordinator.relayout(&mut container, LayoutMode::Synchronized);
    assert!(result.is_err());
    assert_eq!(coordinator.phase(), LayoutPhase::Failed);
    assert!(positions_of(&container, ViewKind::Super)
        .iter()
        .all(|p| p.is_none()));
    container.check_consistency().unwrap();
}

#[test]
fn test_one_failed_worker_fails_the_whole_invocation() {
    let mut container = build(&chain_diff(6));
    let coordinator = LayoutCoordinator::new(Arc::new(HalfFailingEngine {
        calls: AtomicUsize::new(0),
    }));

    let result = coordinator.relayout(&mut container, LayoutMode::Synchronized);
    assert!(result.is_err());
    assert_eq!(coordinator.phase(), LayoutPhase::Failed);
    // the successful worker's geometry was discarded too
    assert!(positions_of(&container, ViewKind::Super)
        .iter()
        .all(|p| p.is_none()));
    assert!(positions_of(&container, ViewKind::Combined)
        .iter()
        .all(|p| p.is_none()));
}

// ============================================================
// 5. Independent Mode
// ============================================================

#[test]
fn test_independent_mode_lays_out_focused_graph_only() {
    let mut container = build(&chain_diff(6));
    let coordinator = LayoutCoordinator::new(Arc::new(LayeredLayoutEngine::default()));

    let outcome = coordinator
        .relayout(&mut container, LayoutMode::Independent(ViewKind::Primary))
        .unwrap();
    assert_eq!(outcome, LayoutOutcome::Done);

    assert!(positions_of(&container, ViewKind::Primary)
        .iter()
        .all(|p| p.is_some()));
    for view in [ViewKind::Secondary, ViewKind::Super, ViewKind::Combined] {
        assert!(
            positions_of(&container, view).iter().all(|p| p.is_none()),
            "{view:?} left unchanged"
        );
    }
}

#[test]
fn test_phase_starts_idle() {
    let coordinator = LayoutCoordinator::new(Arc::new(LayeredLayoutEngine::default()));
    assert_eq!(coordinator.phase(), LayoutPhase::Idle);
}
