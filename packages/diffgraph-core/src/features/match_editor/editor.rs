//! Transactional match edits
//!
//! Adding a match fuses two one-sided elements into one matched element;
//! removing one splits it back apart. Both operations rewrite all four
//! view graphs under a single notification transaction: snapshot the
//! incident structural edges, replace the nodes, re-wire the snapshot,
//! register with the backing match table, then rebuild visual state.
//! On an invariant violation the operation aborts without rolling graph
//! content back; the suppression state alone is restored.

use ahash::{AHashMap, AHashSet};
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use tracing::debug;

use crate::errors::{DiffGraphError, Result};
use crate::features::graph_build::coloring;
use crate::features::graph_build::combined_raw::{RawCombinedEdge, RawCombinedNode};
use crate::features::graph_build::view_builder::{insert_element_edge, insert_element_node};
use crate::features::graphs::{edge_state, EdgeLinks, GraphsContainer, StubDirection, ViewEdge};
use crate::shared::events::GraphChange;
use crate::shared::models::{
    Address, AddressPair, MatchRecord, MatchState, Point, RawEdge, RawEdgeKind, RawNode, Side,
    ViewKind,
};

/// Where a snapshot edge endpoint pointed before the edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EndpointKey {
    /// One of the nodes being replaced by this edit
    Replaced,
    /// A surviving third node, identified by its address pair
    Pair(AddressPair),
}

/// One structural edge captured before its endpoints are removed
#[derive(Debug, Clone)]
struct EdgeSnapshot {
    source: EndpointKey,
    target: EndpointKey,
    primary_kind: Option<RawEdgeKind>,
    secondary_kind: Option<RawEdgeKind>,
    selected: bool,
}

/// Node state carried across the node swap
#[derive(Debug, Clone, Default)]
struct CapturedNode {
    primary_name: Option<String>,
    secondary_name: Option<String>,
    visible: bool,
    selected: bool,
    position: Option<Point>,
}

impl GraphsContainer {
    /// Fuse a primary-unmatched and a secondary-unmatched element into
    /// one matched element
    ///
    /// Preconditions: both addresses resolve to currently unmatched
    /// elements, and both are visible unless proximity browsing is
    /// unfrozen. All four graphs are rewritten atomically with one
    /// notification batch at the end.
    pub fn add_match(&mut self, primary: Address, secondary: Address) -> Result<AddressPair> {
        let old_primary_pair = AddressPair::primary_only(primary);
        let old_secondary_pair = AddressPair::secondary_only(secondary);

        let primary_entry = self.pair_entry(&old_primary_pair).ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "add_match: primary {primary:#x} is not an unmatched element"
            ))
        })?;
        let secondary_entry = self.pair_entry(&old_secondary_pair).ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "add_match: secondary {secondary:#x} is not an unmatched element"
            ))
        })?;

        let captured_primary = self.capture_node(primary_entry.super_node)?;
        let captured_secondary = self.capture_node(secondary_entry.super_node)?;
        if self.proximity_frozen && !(captured_primary.visible && captured_secondary.visible) {
            return Err(DiffGraphError::invariant(format!(
                "add_match: {primary:#x}/{secondary:#x} not visible while proximity is frozen"
            )));
        }

        self.transaction(|c| {
            // 1. snapshot the union of structural edges touching either node
            let snapshot = snapshot_incident_edges(
                c,
                &[primary_entry.super_node, secondary_entry.super_node],
            )?;

            // 2. remove both old elements from all four graphs
            remove_element(c, &old_primary_pair)?;
            remove_element(c, &old_secondary_pair)?;

            // 3. synthesize the new matched element
            let new_pair = AddressPair::matched(primary, secondary);
            let raw_node = RawCombinedNode {
                primary: Some(RawNode::new(
                    primary,
                    Side::Primary,
                    captured_primary.primary_name.clone().unwrap_or_default(),
                )),
                secondary: Some(RawNode::new(
                    secondary,
                    Side::Secondary,
                    captured_secondary.secondary_name.clone().unwrap_or_default(),
                )),
                changed: false,
            };
            insert_element_node(c, &raw_node)?;
            let merged = CapturedNode {
                primary_name: captured_primary.primary_name.clone(),
                secondary_name: captured_secondary.secondary_name.clone(),
                visible: captured_primary.visible || captured_secondary.visible,
                selected: captured_primary.selected || captured_secondary.selected,
                position: captured_primary.position.or(captured_secondary.position),
            };
            apply_captured_node(c, &new_pair, &merged)?;

            // 4. re-wire the snapshot onto the new node, merging edge
            //    pairs that collapse onto the same endpoints
            rewire_after_add(c, &snapshot, new_pair)?;

            // 5. register the match; listeners of the store may read edge
            //    state, so this runs after re-wiring
            c.match_store_mut()
                .add_match(MatchRecord::new(primary, secondary))?;

            // 6. rebuild colors and entry borders for the whole set
            coloring::recolor(c);
            c.refresh_edge_visibility();
            if c.config().proximity.enabled {
                c.recompute_stubs()?;
            }

            debug!(pair = %new_pair, "match added");
            c.events.emit(GraphChange::MatchAdded { pair: new_pair });
            Ok(new_pair)
        })
    }

    /// Split a matched element back into its two one-sided halves
    pub fn remove_match(
        &mut self,
        primary: Address,
        secondary: Address,
    ) -> Result<(AddressPair, AddressPair)> {
        let pair = AddressPair::matched(primary, secondary);
        let entry = self.pair_entry(&pair).ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "remove_match: {primary:#x}/{secondary:#x} is not a matched element"
            ))
        })?;
        let captured = self.capture_node(entry.super_node)?;

        self.transaction(|c| {
            let snapshot = snapshot_incident_edges(c, &[entry.super_node])?;
            remove_element(c, &pair)?;

            let primary_pair = AddressPair::primary_only(primary);
            let secondary_pair = AddressPair::secondary_only(secondary);
            insert_element_node(
                c,
                &RawCombinedNode {
                    primary: Some(RawNode::new(
                        primary,
                        Side::Primary,
                        captured.primary_name.clone().unwrap_or_default(),
                    )),
                    secondary: None,
                    changed: false,
                },
            )?;
            insert_element_node(
                c,
                &RawCombinedNode {
                    primary: None,
                    secondary: Some(RawNode::new(
                        secondary,
                        Side::Secondary,
                        captured.secondary_name.clone().unwrap_or_default(),
                    )),
                    changed: false,
                },
            )?;
            for split_pair in [&primary_pair, &secondary_pair] {
                apply_captured_node(c, split_pair, &captured)?;
            }

            // re-derive each side's raw edges from the snapshot: a
            // one-sided edge yields one new edge, a both-sided edge
            // yields two, one per split node
            for snap in &snapshot {
                for (side, kind) in [
                    (Side::Primary, snap.primary_kind),
                    (Side::Secondary, snap.secondary_kind),
                ] {
                    let Some(kind) = kind else { continue };
                    let split_pair = match side {
                        Side::Primary => primary_pair,
                        Side::Secondary => secondary_pair,
                    };
                    let source_pair = resolve_endpoint(snap.source, split_pair);
                    let target_pair = resolve_endpoint(snap.target, split_pair);
                    let links = insert_one_sided_edge(
                        c,
                        side,
                        kind,
                        source_pair,
                        target_pair,
                    )?;
                    apply_edge_selection(c, links, snap.selected);
                }
            }

            c.match_store_mut().remove_match(primary, secondary)?;

            // splitting can change which node is the single entry block,
            // so highlighting is re-established for the whole graph
            coloring::recolor(c);
            c.refresh_edge_visibility();
            if c.config().proximity.enabled {
                c.recompute_stubs()?;
            }

            debug!(pair = %pair, "match removed");
            c.events.emit(GraphChange::MatchRemoved { primary, secondary });
            Ok((primary_pair, secondary_pair))
        })
    }

    fn capture_node(&self, super_node: NodeIndex) -> Result<CapturedNode> {
        let node = self
            .view(ViewKind::Super)
            .node(super_node)
            .ok_or_else(|| DiffGraphError::invariant("capture of a missing super node"))?;
        Ok(CapturedNode {
            primary_name: node.primary_name.clone(),
            secondary_name: node.secondary_name.clone(),
            visible: node.visible,
            selected: node.selected,
            position: node.position,
        })
    }
}

fn resolve_endpoint(key: EndpointKey, replacement: AddressPair) -> AddressPair {
    match key {
        EndpointKey::Replaced => replacement,
        EndpointKey::Pair(pair) => pair,
    }
}

/// Capture every non-stub structural edge incident to the given super
/// nodes, deduplicated; stub edges never participate in match edits.
fn snapshot_incident_edges(
    container: &GraphsContainer,
    replaced: &[NodeIndex],
) -> Result<Vec<EdgeSnapshot>> {
    let view = container.view(ViewKind::Super);
    let mut seen: AHashSet<EdgeIndex> = AHashSet::new();
    let mut snapshot = Vec::new();

    for &node in replaced {
        for edge_index in view.incident_edges(node) {
            if !seen.insert(edge_index) {
                continue;
            }
            let edge = view
                .edge(edge_index)
                .ok_or_else(|| DiffGraphError::invariant("incident edge disappeared"))?;
            if edge.is_stub {
                continue;
            }
            let (source, target) = view
                .endpoints(edge_index)
                .ok_or_else(|| DiffGraphError::invariant("incident edge has no endpoints"))?;
            snapshot.push(EdgeSnapshot {
                source: endpoint_key(container, source, replaced)?,
                target: endpoint_key(container, target, replaced)?,
                primary_kind: edge.primary_kind,
                secondary_kind: edge.secondary_kind,
                selected: edge.selected,
            });
        }
    }
    Ok(snapshot)
}

fn endpoint_key(
    container: &GraphsContainer,
    node: NodeIndex,
    replaced: &[NodeIndex],
) -> Result<EndpointKey> {
    if replaced.contains(&node) {
        return Ok(EndpointKey::Replaced);
    }
    container
        .view(ViewKind::Super)
        .node(node)
        .and_then(|weight| weight.pair())
        .map(EndpointKey::Pair)
        .ok_or_else(|| DiffGraphError::invariant("structural edge endpoint has no address pair"))
}

/// Remove one element's nodes from all four graphs, together with any
/// stubs hanging off them, and drop it from the lookup indices.
fn remove_element(container: &mut GraphsContainer, pair: &AddressPair) -> Result<()> {
    let entry = container
        .pair_entry(pair)
        .ok_or_else(|| DiffGraphError::invariant(format!("remove of unknown pair {pair}")))?;
    let links = container
        .view(ViewKind::Super)
        .node(entry.super_node)
        .ok_or_else(|| DiffGraphError::invariant(format!("pair {pair}: super node missing")))?
        .links;

    for view in ViewKind::ALL {
        let Some(index) = links.get(view) else { continue };
        let stubs: Vec<NodeIndex> = {
            let graph = container.view(view);
            [StubDirection::Incoming, StubDirection::Outgoing]
                .iter()
                .filter_map(|&direction| graph.stub_of(index, direction))
                .collect()
        };
        let graph = container.view_mut(view);
        for stub in stubs {
            graph.remove_node(stub);
        }
        if graph.remove_node(index).is_none() {
            return Err(DiffGraphError::invariant(format!(
                "pair {pair}: {view:?} node already removed"
            )));
        }
    }

    if let Some(address) = pair.primary {
        container.unregister_single(Side::Primary, address)?;
    }
    if let Some(address) = pair.secondary {
        container.unregister_single(Side::Secondary, address)?;
    }
    container.unregister_pair(pair)?;
    Ok(())
}

/// Re-wire the snapshot after an add: endpoints that pointed at either
/// removed node are retargeted at the new node; a one-sided edge merges
/// into the first rebuilt edge between the same endpoints whose side
/// slot is still empty, which is the one case where a combined edge
/// carries raw edges that originated from two separate old edges.
fn rewire_after_add(
    container: &mut GraphsContainer,
    snapshot: &[EdgeSnapshot],
    new_pair: AddressPair,
) -> Result<()> {
    let mut rebuilt: AHashMap<(AddressPair, AddressPair), Vec<EdgeIndex>> = AHashMap::new();

    for snap in snapshot {
        let source_pair = resolve_endpoint(snap.source, new_pair);
        let target_pair = resolve_endpoint(snap.target, new_pair);
        let key = (source_pair, target_pair);

        // single-sided edges try to merge into an existing rebuilt edge
        let single_side = match (snap.primary_kind, snap.secondary_kind) {
            (Some(kind), None) => Some((Side::Primary, kind)),
            (None, Some(kind)) => Some((Side::Secondary, kind)),
            _ => None,
        };
        if let Some((side, kind)) = single_side {
            let slot = rebuilt.get(&key).and_then(|edges| {
                edges.iter().copied().find(|&edge| {
                    container
                        .view(ViewKind::Super)
                        .edge(edge)
                        .is_some_and(|weight| weight.kind(side).is_none())
                })
            });
            if let Some(super_edge) = slot {
                merge_side_into_edge(container, super_edge, side, kind, snap.selected)?;
                continue;
            }
        }

        let links = insert_combined_edge(
            container,
            source_pair,
            target_pair,
            snap.primary_kind,
            snap.secondary_kind,
        )?;
        apply_edge_selection(container, links, snap.selected);
        if let Some(super_edge) = links.super_edge {
            rebuilt.entry(key).or_default().push(super_edge);
        }
    }
    Ok(())
}

/// Fill the empty side slot of a rebuilt combined edge and create the
/// matching single-graph edge.
fn merge_side_into_edge(
    container: &mut GraphsContainer,
    super_edge: EdgeIndex,
    side: Side,
    kind: RawEdgeKind,
    selected: bool,
) -> Result<()> {
    let (mut links, source_node, target_node) = {
        let view = container.view(ViewKind::Super);
        let weight = view
            .edge(super_edge)
            .ok_or_else(|| DiffGraphError::invariant("merge target edge missing"))?;
        let (source, target) = view
            .endpoints(super_edge)
            .ok_or_else(|| DiffGraphError::invariant("merge target edge has no endpoints"))?;
        (weight.links, source, target)
    };

    let source_pair = container
        .view(ViewKind::Super)
        .node(source_node)
        .and_then(|n| n.pair())
        .ok_or_else(|| DiffGraphError::invariant("merge source has no pair"))?;
    let target_pair = container
        .view(ViewKind::Super)
        .node(target_node)
        .and_then(|n| n.pair())
        .ok_or_else(|| DiffGraphError::invariant("merge target has no pair"))?;

    // the merged-in side's single edge
    let single_view = match side {
        Side::Primary => ViewKind::Primary,
        Side::Secondary => ViewKind::Secondary,
    };
    let source_single = lookup_single(container, side, source_pair)?;
    let target_single = lookup_single(container, side, target_pair)?;
    let mut single = match side {
        Side::Primary => ViewEdge::element(Some(kind), None),
        Side::Secondary => ViewEdge::element(None, Some(kind)),
    };
    single.state = MatchState::Matched;
    single.selected = selected;
    let single_index =
        container
            .view_mut(single_view)
            .add_edge(source_single, target_single, single);
    links.set(single_view, Some(single_index));

    // update kinds, state and links on every sibling edge
    for view in ViewKind::ALL {
        let Some(index) = links.get(view) else { continue };
        if let Some(weight) = container.view_mut(view).edge_mut(index) {
            match side {
                Side::Primary => weight.primary_kind = Some(kind),
                Side::Secondary => weight.secondary_kind = Some(kind),
            }
            // single projections keep only their own side's kind but
            // share the merged state
            if view == ViewKind::Super || view == ViewKind::Combined {
                weight.state = edge_state(weight.primary_kind, weight.secondary_kind);
            } else {
                weight.state = MatchState::Matched;
                if view != single_view {
                    match side {
                        Side::Primary => weight.primary_kind = None,
                        Side::Secondary => weight.secondary_kind = None,
                    }
                }
            }
            weight.selected = weight.selected || selected;
            weight.links = links;
        }
    }
    Ok(())
}

fn lookup_single(
    container: &GraphsContainer,
    side: Side,
    pair: AddressPair,
) -> Result<NodeIndex> {
    let address = pair.address(side).ok_or_else(|| {
        DiffGraphError::invariant(format!("pair {pair} has no {side:?} side for edge rebuild"))
    })?;
    container.single_node(side, address).ok_or_else(|| {
        DiffGraphError::invariant(format!("{side:?} address {address:#x} has no single node"))
    })
}

/// Materialize a combined edge (and its projections) between two pairs
fn insert_combined_edge(
    container: &mut GraphsContainer,
    source: AddressPair,
    target: AddressPair,
    primary_kind: Option<RawEdgeKind>,
    secondary_kind: Option<RawEdgeKind>,
) -> Result<EdgeLinks> {
    let primary = match primary_kind {
        Some(kind) => {
            let source_address = source.address(Side::Primary).ok_or_else(|| {
                DiffGraphError::invariant(format!("pair {source} missing primary side"))
            })?;
            let target_address = target.address(Side::Primary).ok_or_else(|| {
                DiffGraphError::invariant(format!("pair {target} missing primary side"))
            })?;
            Some(RawEdge::new(source_address, target_address, kind))
        }
        None => None,
    };
    let secondary = match secondary_kind {
        Some(kind) => {
            let source_address = source.address(Side::Secondary).ok_or_else(|| {
                DiffGraphError::invariant(format!("pair {source} missing secondary side"))
            })?;
            let target_address = target.address(Side::Secondary).ok_or_else(|| {
                DiffGraphError::invariant(format!("pair {target} missing secondary side"))
            })?;
            Some(RawEdge::new(source_address, target_address, kind))
        }
        None => None,
    };
    insert_element_edge(
        container,
        &RawCombinedEdge {
            source,
            target,
            primary,
            secondary,
        },
    )
}

fn insert_one_sided_edge(
    container: &mut GraphsContainer,
    side: Side,
    kind: RawEdgeKind,
    source: AddressPair,
    target: AddressPair,
) -> Result<EdgeLinks> {
    match side {
        Side::Primary => insert_combined_edge(container, source, target, Some(kind), None),
        Side::Secondary => insert_combined_edge(container, source, target, None, Some(kind)),
    }
}

fn apply_edge_selection(
    container: &mut GraphsContainer,
    links: EdgeLinks,
    selected: bool,
) {
    if !selected {
        return;
    }
    for view in ViewKind::ALL {
        if let Some(index) = links.get(view) {
            if let Some(weight) = container.view_mut(view).edge_mut(index) {
                weight.selected = true;
            }
        }
    }
}

/// Copy captured visual state onto every view node of a pair
fn apply_captured_node(
    container: &mut GraphsContainer,
    pair: &AddressPair,
    captured: &CapturedNode,
) -> Result<()> {
    let entry = container
        .pair_entry(pair)
        .ok_or_else(|| DiffGraphError::invariant(format!("pair {pair} missing after insert")))?;
    let links = container
        .view(ViewKind::Super)
        .node(entry.super_node)
        .ok_or_else(|| DiffGraphError::invariant(format!("pair {pair}: super node missing")))?
        .links;
    for view in ViewKind::ALL {
        let Some(index) = links.get(view) else { continue };
        if let Some(node) = container.view_mut(view).node_mut(index) {
            node.visible = captured.visible;
            node.selected = captured.selected;
            node.position = captured.position;
        }
    }
    Ok(())
}
