// Match Editor Tests - Add/Remove Transactions
//
// Test Categories:
// 1. Adding a match (scenario: 3 matched + 2 unmatched functions)
// 2. Removing a match
// 3. Add/remove round trip
// 4. Notification batching
// 5. Preconditions and failure modes

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use diffgraph_core::{
    build_container, Address, AddressPair, DiffViewConfig, GraphChange, GraphScope,
    GraphsContainer, InMemoryMatchStore, MatchRecord, MatchState, RawDiff, RawEdgeKind, Side,
    ViewKind,
};

// ============================================================
// Test Helpers
// ============================================================

/// 3 matched functions (a, b, c), one unmatched per side, with call
/// edges touching the unmatched nodes on both sides:
///   primary:   a -> b, a -> x, x -> b
///   secondary: a -> b, a -> y, y -> b
fn five_function_diff() -> RawDiff {
    let mut diff = RawDiff::new(GraphScope::CallGraph);
    diff.primary.push_node(0x1, "a");
    diff.primary.push_node(0x2, "b");
    diff.primary.push_node(0x3, "c");
    diff.primary.push_node(0x4, "x");
    diff.primary.push_edge(0x1, 0x2, RawEdgeKind::Call);
    diff.primary.push_edge(0x1, 0x4, RawEdgeKind::Call);
    diff.primary.push_edge(0x4, 0x2, RawEdgeKind::Call);

    diff.secondary.push_node(0x101, "a");
    diff.secondary.push_node(0x102, "b");
    diff.secondary.push_node(0x103, "c");
    diff.secondary.push_node(0x104, "y");
    diff.secondary.push_edge(0x101, 0x102, RawEdgeKind::Call);
    diff.secondary.push_edge(0x101, 0x104, RawEdgeKind::Call);
    diff.secondary.push_edge(0x104, 0x102, RawEdgeKind::Call);

    diff.matches.push(MatchRecord::new(0x1, 0x101));
    diff.matches.push(MatchRecord::new(0x2, 0x102));
    diff.matches.push(MatchRecord::new(0x3, 0x103));
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

/// Per-side outgoing adjacency by address, sorted, read off a single graph
fn side_edges(container: &GraphsContainer, side: Side) -> Vec<(Address, Address, RawEdgeKind)> {
    let view = match side {
        Side::Primary => ViewKind::Primary,
        Side::Secondary => ViewKind::Secondary,
    };
    let graph = container.view(view);
    let mut edges = Vec::new();
    for index in graph.edge_indices() {
        let Some(edge) = graph.edge(index) else { continue };
        if edge.is_stub {
            continue;
        }
        let (source, target) = graph.endpoints(index).unwrap();
        let source_addr = graph.node(source).unwrap().pair().unwrap().address(side).unwrap();
        let target_addr = graph.node(target).unwrap().pair().unwrap().address(side).unwrap();
        edges.push((source_addr, target_addr, edge.kind(side).unwrap()));
    }
    edges.sort();
    edges
}

fn side_addresses(container: &GraphsContainer, side: Side) -> Vec<Address> {
    let view = match side {
        Side::Primary => ViewKind::Primary,
        Side::Secondary => ViewKind::Secondary,
    };
    let graph = container.view(view);
    let mut addresses: Vec<Address> = graph
        .node_indices()
        .into_iter()
        .filter_map(|index| graph.node(index)?.pair()?.address(side))
        .collect();
    addresses.sort();
    addresses
}

// ============================================================
// 1. Adding a Match
// ============================================================

#[test]
fn test_add_match_scenario_a() {
    let mut container = build(&five_function_diff());

    let before = container.statistics();
    assert_eq!(before.matched_nodes, 3);
    assert_eq!(before.primary_unmatched_nodes, 1);
    assert_eq!(before.secondary_unmatched_nodes, 1);

    let pair = container.add_match(0x4, 0x104).unwrap();
    assert_eq!(pair, AddressPair::matched(0x4, 0x104));

    let after = container.statistics();
    assert_eq!(after.matched_nodes, 4);
    assert_eq!(after.primary_unmatched_nodes, 0);
    assert_eq!(after.secondary_unmatched_nodes, 0);

    container.check_consistency().unwrap();
}

#[test]
fn test_add_match_retargets_edges_at_new_node() {
    let mut container = build(&five_function_diff());
    container.add_match(0x4, 0x104).unwrap();

    let entry = container
        .pair_entry(&AddressPair::matched(0x4, 0x104))
        .unwrap();
    let super_view = container.view(ViewKind::Super);

    let incoming = super_view.edges_directed(entry.super_node, petgraph::Direction::Incoming);
    let outgoing = super_view.edges_directed(entry.super_node, petgraph::Direction::Outgoing);
    assert_eq!(incoming.len(), 1);
    assert_eq!(outgoing.len(), 1);

    let pred = super_view.node(incoming[0].1).unwrap().pair().unwrap();
    let succ = super_view.node(outgoing[0].1).unwrap().pair().unwrap();
    assert_eq!(pred, AddressPair::matched(0x1, 0x101));
    assert_eq!(succ, AddressPair::matched(0x2, 0x102));
}

#[test]
fn test_add_match_merges_parallel_one_sided_edges() {
    let mut container = build(&five_function_diff());

    // before the edit: a->x and a->y are separate one-sided super edges
    let before = container.statistics();
    assert_eq!(before.primary_unmatched_edges, 2);
    assert_eq!(before.secondary_unmatched_edges, 2);

    container.add_match(0x4, 0x104).unwrap();

    // afterwards both collapse onto one matched edge per direction: this
    // is the case where one combined edge carries raw edges that
    // originated from two separate old edges
    let after = container.statistics();
    assert_eq!(after.matched_edges, 3);
    assert_eq!(after.primary_unmatched_edges, 0);
    assert_eq!(after.secondary_unmatched_edges, 0);

    let entry = container
        .pair_entry(&AddressPair::matched(0x4, 0x104))
        .unwrap();
    let super_view = container.view(ViewKind::Super);
    let (edge_index, _) =
        super_view.edges_directed(entry.super_node, petgraph::Direction::Incoming)[0];
    let edge = super_view.edge(edge_index).unwrap();
    assert!(edge.kind(Side::Primary).is_some());
    assert!(edge.kind(Side::Secondary).is_some());
    assert_eq!(edge.state, MatchState::Matched);
}

#[test]
fn test_add_match_removes_old_nodes_from_all_views() {
    let mut container = build(&five_function_diff());
    container.add_match(0x4, 0x104).unwrap();

    assert!(container
        .pair_entry(&AddressPair::primary_only(0x4))
        .is_none());
    assert!(container
        .pair_entry(&AddressPair::secondary_only(0x104))
        .is_none());
    // the single indices point at the new matched element
    assert!(container.single_node(Side::Primary, 0x4).is_some());
    assert!(container.single_node(Side::Secondary, 0x104).is_some());
    assert_eq!(container.view(ViewKind::Super).node_count(), 4);
    assert_eq!(container.view(ViewKind::Combined).node_count(), 4);
    assert_eq!(container.view(ViewKind::Primary).node_count(), 4);
    assert_eq!(container.view(ViewKind::Secondary).node_count(), 4);
}

#[test]
fn test_add_match_registers_in_store() {
    let mut container = build(&five_function_diff());
    container.add_match(0x4, 0x104).unwrap();

    let record = container.match_store().by_primary(0x4).unwrap();
    assert_eq!(record.secondary, 0x104);
    assert_eq!(container.match_store().len(), 4);
}

#[test]
fn test_add_match_carries_names_and_visibility() {
    let mut container = build(&five_function_diff());
    container.add_match(0x4, 0x104).unwrap();

    let entry = container
        .pair_entry(&AddressPair::matched(0x4, 0x104))
        .unwrap();
    let node = container.view(ViewKind::Super).node(entry.super_node).unwrap();
    assert_eq!(node.primary_name.as_deref(), Some("x"));
    assert_eq!(node.secondary_name.as_deref(), Some("y"));
    assert!(node.visible);
    assert_eq!(node.state, MatchState::Matched);
}

// ============================================================
// 2. Removing a Match
// ============================================================

#[test]
fn test_remove_match_splits_node() {
    let mut container = build(&five_function_diff());
    container.remove_match(0x1, 0x101).unwrap();

    let stats = container.statistics();
    assert_eq!(stats.matched_nodes, 2);
    assert_eq!(stats.primary_unmatched_nodes, 1);
    assert_eq!(stats.secondary_unmatched_nodes, 1);

    assert!(container
        .pair_entry(&AddressPair::primary_only(0x1))
        .is_some());
    assert!(container
        .pair_entry(&AddressPair::secondary_only(0x101))
        .is_some());
    assert!(container
        .pair_entry(&AddressPair::matched(0x1, 0x101))
        .is_none());
    assert_eq!(container.match_store().len(), 2);
    container.check_consistency().unwrap();
}

#[test]
fn test_remove_match_splits_both_sided_edges() {
    let mut container = build(&five_function_diff());
    // a->b was a matched edge; after splitting a it must exist once per side
    container.remove_match(0x1, 0x101).unwrap();

    let primary_entry = container
        .pair_entry(&AddressPair::primary_only(0x1))
        .unwrap();
    let secondary_entry = container
        .pair_entry(&AddressPair::secondary_only(0x101))
        .unwrap();
    let super_view = container.view(ViewKind::Super);

    let primary_out =
        super_view.edges_directed(primary_entry.super_node, petgraph::Direction::Outgoing);
    let secondary_out =
        super_view.edges_directed(secondary_entry.super_node, petgraph::Direction::Outgoing);
    // a -> b and a -> x per side
    assert_eq!(primary_out.len(), 2);
    assert_eq!(secondary_out.len(), 2);
    for (edge_index, _) in primary_out {
        let edge = super_view.edge(edge_index).unwrap();
        assert_eq!(edge.state, MatchState::PrimaryUnmatched);
    }
    for (edge_index, _) in secondary_out {
        let edge = super_view.edge(edge_index).unwrap();
        assert_eq!(edge.state, MatchState::SecondaryUnmatched);
    }
}

// ============================================================
// 3. Round Trip
// ============================================================

#[test]
fn test_add_then_remove_restores_structure() {
    let mut container = build(&five_function_diff());

    let nodes_before_p = side_addresses(&container, Side::Primary);
    let nodes_before_s = side_addresses(&container, Side::Secondary);
    let edges_before_p = side_edges(&container, Side::Primary);
    let edges_before_s = side_edges(&container, Side::Secondary);
    let stats_before = container.statistics();

    container.add_match(0x4, 0x104).unwrap();
    container.remove_match(0x4, 0x104).unwrap();

    assert_eq!(side_addresses(&container, Side::Primary), nodes_before_p);
    assert_eq!(side_addresses(&container, Side::Secondary), nodes_before_s);
    assert_eq!(side_edges(&container, Side::Primary), edges_before_p);
    assert_eq!(side_edges(&container, Side::Secondary), edges_before_s);
    assert_eq!(container.statistics(), stats_before);
    container.check_consistency().unwrap();
}

#[test]
fn test_remove_then_add_restores_structure() {
    let mut container = build(&five_function_diff());
    let edges_before_p = side_edges(&container, Side::Primary);
    let stats_before = container.statistics();

    container.remove_match(0x2, 0x102).unwrap();
    container.add_match(0x2, 0x102).unwrap();

    assert_eq!(side_edges(&container, Side::Primary), edges_before_p);
    assert_eq!(container.statistics(), stats_before);
    container.check_consistency().unwrap();
}

// ============================================================
// 4. Notification Batching
// ============================================================

#[test]
fn test_add_match_fires_single_batch() {
    let mut container = build(&five_function_diff());
    let batches: Rc<RefCell<Vec<Vec<GraphChange>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&batches);
    container.subscribe(move |batch| sink.borrow_mut().push(batch.to_vec()));

    container.add_match(0x4, 0x104).unwrap();

    let recorded = batches.borrow();
    assert_eq!(recorded.len(), 1, "one fan-out per transaction");
    assert!(recorded[0].contains(&GraphChange::MatchAdded {
        pair: AddressPair::matched(0x4, 0x104)
    }));
}

#[test]
fn test_failed_add_fires_no_notifications() {
    let mut container = build(&five_function_diff());
    let batches: Rc<RefCell<Vec<Vec<GraphChange>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&batches);
    container.subscribe(move |batch| sink.borrow_mut().push(batch.to_vec()));

    // 0x1 is already matched
    assert!(container.add_match(0x1, 0x104).is_err());
    assert!(batches.borrow().is_empty());
}

// ============================================================
// 5. Preconditions and Failure Modes
// ============================================================

#[test]
fn test_add_match_rejects_matched_operands() {
    let mut container = build(&five_function_diff());
    assert!(container.add_match(0x1, 0x104).is_err());
    assert!(container.add_match(0x4, 0x101).is_err());
    assert!(container.add_match(0x99, 0x104).is_err());
}

#[test]
fn test_remove_match_rejects_unknown_pair() {
    let mut container = build(&five_function_diff());
    assert!(container.remove_match(0x4, 0x104).is_err());
    assert!(container.remove_match(0x1, 0x102).is_err());
}

#[test]
fn test_add_match_rejects_hidden_operands_while_frozen() {
    let mut container = build(&five_function_diff());
    let entry = container
        .pair_entry(&AddressPair::primary_only(0x4))
        .unwrap();
    let node_ref = diffgraph_core::NodeRef::Super(entry.super_node);
    container.set_node_visibility(&[node_ref], false).unwrap();
    container.set_proximity_frozen(true);

    assert!(container.add_match(0x4, 0x104).is_err());

    container.set_proximity_frozen(false);
    assert!(container.add_match(0x4, 0x104).is_ok());
}

#[test]
fn test_failed_operation_leaves_suppression_balanced() {
    let mut container = build(&five_function_diff());
    assert!(container.add_match(0x1, 0x104).is_err());

    // the next successful edit still notifies
    let batches: Rc<RefCell<usize>> = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&batches);
    container.subscribe(move |_| *sink.borrow_mut() += 1);
    container.add_match(0x4, 0x104).unwrap();
    assert_eq!(*batches.borrow(), 1);
}
