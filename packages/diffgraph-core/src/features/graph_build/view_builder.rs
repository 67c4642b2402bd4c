//! Two-pass view construction
//!
//! Nodes first, so edge endpoints always resolve; then edges. Every
//! combined raw node becomes 0-2 single nodes, exactly one super node
//! and exactly one combined node, all cross-linked; edges likewise.

use tracing::debug;

use crate::config::DiffViewConfig;
use crate::errors::{DiffGraphError, Result};
use crate::shared::events::GraphChange;
use crate::shared::models::{RawDiff, Side, ViewKind};
use crate::shared::ports::MatchStore;

use crate::features::graphs::{
    EdgeLinks, GraphsContainer, PairEntry, SiblingLinks, ViewEdge, ViewNode,
};

use super::coloring;
use super::combined_raw::{build_combined_raw, RawCombinedEdge, RawCombinedNode};

/// Build the four live view graphs from a raw diff
///
/// The match store is seeded with the diff's match table; pass a store
/// that already contains exactly these matches or an empty one.
pub fn build_container(
    diff: &RawDiff,
    match_store: Box<dyn MatchStore>,
    config: DiffViewConfig,
) -> Result<GraphsContainer> {
    config.validate()?;
    let combined_raw = build_combined_raw(diff)?;

    let mut container = GraphsContainer::empty(diff.scope, config, match_store);
    container.set_entry_address(Side::Primary, diff.primary.entry);
    container.set_entry_address(Side::Secondary, diff.secondary.entry);
    for record in &diff.matches {
        container.match_store_mut().add_match(*record)?;
    }

    for node in &combined_raw.nodes {
        insert_element_node(&mut container, node)?;
    }
    for edge in &combined_raw.edges {
        insert_element_edge(&mut container, edge)?;
    }

    coloring::recolor(&mut container);
    container.check_consistency()?;

    debug!(
        pairs = container.view(ViewKind::Super).node_count(),
        super_edges = container.view(ViewKind::Super).edge_count(),
        "built diff view graphs"
    );
    container.events.emit(GraphChange::GraphRebuilt);
    Ok(container)
}

/// Materialize one element in all four views and the lookup indices
pub(crate) fn insert_element_node(
    container: &mut GraphsContainer,
    node: &RawCombinedNode,
) -> Result<PairEntry> {
    let pair = node.pair();
    let mut template = ViewNode::element(pair, node.changed);
    template.primary_name = node.primary.as_ref().map(|n| n.name.clone());
    template.secondary_name = node.secondary.as_ref().map(|n| n.name.clone());

    let super_node = container
        .view_mut(ViewKind::Super)
        .add_node(template.clone());
    let combined = container
        .view_mut(ViewKind::Combined)
        .add_node(template.clone());
    let primary = pair
        .primary
        .map(|_| container.view_mut(ViewKind::Primary).add_node(template.clone()));
    let secondary = pair
        .secondary
        .map(|_| container.view_mut(ViewKind::Secondary).add_node(template.clone()));

    let links = SiblingLinks {
        primary,
        secondary,
        super_node: Some(super_node),
        combined: Some(combined),
    };
    for (view, index) in [
        (ViewKind::Super, Some(super_node)),
        (ViewKind::Combined, Some(combined)),
        (ViewKind::Primary, primary),
        (ViewKind::Secondary, secondary),
    ] {
        if let Some(index) = index {
            if let Some(weight) = container.view_mut(view).node_mut(index) {
                weight.links = links;
            }
        }
    }

    if let Some(address) = pair.primary {
        container.register_single(Side::Primary, address, links.primary.ok_or_else(|| {
            DiffGraphError::invariant(format!("pair {pair}: primary single node not created"))
        })?)?;
    }
    if let Some(address) = pair.secondary {
        container.register_single(Side::Secondary, address, links.secondary.ok_or_else(|| {
            DiffGraphError::invariant(format!("pair {pair}: secondary single node not created"))
        })?)?;
    }
    let entry = PairEntry {
        super_node,
        combined,
    };
    container.register_pair(pair, entry)?;
    Ok(entry)
}

/// Materialize one combined raw edge in all four views
///
/// Endpoint nodes must already exist; a missing endpoint is an
/// invariant violation because the node pass runs first.
pub(crate) fn insert_element_edge(
    container: &mut GraphsContainer,
    edge: &RawCombinedEdge,
) -> Result<EdgeLinks> {
    let source_entry = container.pair_entry(&edge.source).ok_or_else(|| {
        DiffGraphError::invariant(format!("edge source pair {} has no node", edge.source))
    })?;
    let target_entry = container.pair_entry(&edge.target).ok_or_else(|| {
        DiffGraphError::invariant(format!("edge target pair {} has no node", edge.target))
    })?;

    let primary_kind = edge.primary.map(|e| e.kind);
    let secondary_kind = edge.secondary.map(|e| e.kind);
    let template = ViewEdge::element(primary_kind, secondary_kind);

    let super_edge = container.view_mut(ViewKind::Super).add_edge(
        source_entry.super_node,
        target_entry.super_node,
        template.clone(),
    );
    let combined = container.view_mut(ViewKind::Combined).add_edge(
        source_entry.combined,
        target_entry.combined,
        template.clone(),
    );

    let mut single_edges = [None, None];
    for (slot, side, raw) in [
        (0, Side::Primary, &edge.primary),
        (1, Side::Secondary, &edge.secondary),
    ] {
        let Some(raw_edge) = raw else { continue };
        let source = container.single_node(side, raw_edge.source).ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "{side:?} edge source {:#x} has no single node",
                raw_edge.source
            ))
        })?;
        let target = container.single_node(side, raw_edge.target).ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "{side:?} edge target {:#x} has no single node",
                raw_edge.target
            ))
        })?;
        let mut single = match side {
            Side::Primary => ViewEdge::element(primary_kind, None),
            Side::Secondary => ViewEdge::element(None, secondary_kind),
        };
        // a single edge's match state mirrors the combined edge
        single.state = template.state;
        let view = match side {
            Side::Primary => ViewKind::Primary,
            Side::Secondary => ViewKind::Secondary,
        };
        single_edges[slot] = Some(container.view_mut(view).add_edge(source, target, single));
    }

    let links = EdgeLinks {
        primary: single_edges[0],
        secondary: single_edges[1],
        super_edge: Some(super_edge),
        combined: Some(combined),
    };
    for (view, index) in [
        (ViewKind::Super, Some(super_edge)),
        (ViewKind::Combined, Some(combined)),
        (ViewKind::Primary, single_edges[0]),
        (ViewKind::Secondary, single_edges[1]),
    ] {
        if let Some(index) = index {
            if let Some(weight) = container.view_mut(view).edge_mut(index) {
                weight.links = links;
            }
        }
    }
    Ok(links)
}
