//! Pairing pass
//!
//! Folds the two raw side graphs and the match table into one combined
//! raw graph: one node per (primary, secondary) address pair, one edge
//! per structural edge pair. A primary and a secondary edge collapse
//! into the same combined edge when both endpoints are matched pairs;
//! parallel same-side edges stay separate and merge first-wins.

use ahash::AHashMap;

use crate::errors::{DiffGraphError, Result};
use crate::shared::models::{Address, AddressPair, MatchState, RawDiff, RawEdge, RawNode, Side};

/// One node of the combined raw graph, wrapping up to one raw node per side
#[derive(Debug, Clone)]
pub struct RawCombinedNode {
    pub primary: Option<RawNode>,
    pub secondary: Option<RawNode>,
    /// Content differs although matched
    pub changed: bool,
}

impl RawCombinedNode {
    pub fn pair(&self) -> AddressPair {
        AddressPair {
            primary: self.primary.as_ref().map(|n| n.address),
            secondary: self.secondary.as_ref().map(|n| n.address),
        }
    }

    pub fn state(&self) -> MatchState {
        self.pair().state()
    }
}

/// One edge of the combined raw graph, wrapping up to one raw edge per side
#[derive(Debug, Clone)]
pub struct RawCombinedEdge {
    pub source: AddressPair,
    pub target: AddressPair,
    pub primary: Option<RawEdge>,
    pub secondary: Option<RawEdge>,
}

#[derive(Debug, Clone, Default)]
pub struct RawCombinedGraph {
    pub nodes: Vec<RawCombinedNode>,
    pub edges: Vec<RawCombinedEdge>,
}

/// Build the combined raw graph from a raw diff
///
/// Fails fast on malformed input: wrong-side nodes, duplicate
/// addresses, matches referencing absent nodes, or an address matched
/// twice.
pub fn build_combined_raw(diff: &RawDiff) -> Result<RawCombinedGraph> {
    for (graph, side) in [(&diff.primary, Side::Primary), (&diff.secondary, Side::Secondary)] {
        if graph.side != side {
            return Err(DiffGraphError::invariant(format!(
                "{side:?} raw graph labeled {:?}",
                graph.side
            )));
        }
        let mut seen = ahash::AHashSet::new();
        for node in &graph.nodes {
            if node.side != side {
                return Err(DiffGraphError::invariant(format!(
                    "node {:#x} on {side:?} graph labeled {:?}",
                    node.address, node.side
                )));
            }
            if !seen.insert(node.address) {
                return Err(DiffGraphError::invariant(format!(
                    "duplicate {side:?} address {:#x}",
                    node.address
                )));
            }
        }
    }

    let primary_nodes: AHashMap<Address, &RawNode> =
        diff.primary.nodes.iter().map(|n| (n.address, n)).collect();
    let secondary_nodes: AHashMap<Address, &RawNode> =
        diff.secondary.nodes.iter().map(|n| (n.address, n)).collect();

    // match table lookups, validated against the node sets
    let mut match_by_primary: AHashMap<Address, (Address, bool)> = AHashMap::new();
    let mut match_by_secondary: AHashMap<Address, Address> = AHashMap::new();
    for record in &diff.matches {
        if !primary_nodes.contains_key(&record.primary) {
            return Err(DiffGraphError::invariant(format!(
                "match references absent primary node {:#x}",
                record.primary
            )));
        }
        if !secondary_nodes.contains_key(&record.secondary) {
            return Err(DiffGraphError::invariant(format!(
                "match references absent secondary node {:#x}",
                record.secondary
            )));
        }
        if match_by_primary
            .insert(record.primary, (record.secondary, record.changed))
            .is_some()
        {
            return Err(DiffGraphError::invariant(format!(
                "primary node {:#x} matched twice",
                record.primary
            )));
        }
        if match_by_secondary
            .insert(record.secondary, record.primary)
            .is_some()
        {
            return Err(DiffGraphError::invariant(format!(
                "secondary node {:#x} matched twice",
                record.secondary
            )));
        }
    }

    let mut combined = RawCombinedGraph::default();

    // pair up nodes; primary order first, then leftover secondaries
    let mut pair_of_primary: AHashMap<Address, AddressPair> = AHashMap::new();
    let mut pair_of_secondary: AHashMap<Address, AddressPair> = AHashMap::new();

    for node in &diff.primary.nodes {
        match match_by_primary.get(&node.address) {
            Some(&(secondary_address, changed)) => {
                let partner = secondary_nodes[&secondary_address];
                let pair = AddressPair::matched(node.address, secondary_address);
                pair_of_primary.insert(node.address, pair);
                pair_of_secondary.insert(secondary_address, pair);
                combined.nodes.push(RawCombinedNode {
                    primary: Some(node.clone()),
                    secondary: Some(partner.clone()),
                    changed,
                });
            }
            None => {
                let pair = AddressPair::primary_only(node.address);
                pair_of_primary.insert(node.address, pair);
                combined.nodes.push(RawCombinedNode {
                    primary: Some(node.clone()),
                    secondary: None,
                    changed: false,
                });
            }
        }
    }
    for node in &diff.secondary.nodes {
        if match_by_secondary.contains_key(&node.address) {
            continue;
        }
        let pair = AddressPair::secondary_only(node.address);
        pair_of_secondary.insert(node.address, pair);
        combined.nodes.push(RawCombinedNode {
            primary: None,
            secondary: Some(node.clone()),
            changed: false,
        });
    }

    // edge pass: primary edges first, secondary edges merge onto them
    // when both endpoint pairs line up
    let mut edges_by_key: AHashMap<(AddressPair, AddressPair), Vec<usize>> = AHashMap::new();

    for edge in &diff.primary.edges {
        let source = *pair_of_primary.get(&edge.source).ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "primary edge source {:#x} has no node",
                edge.source
            ))
        })?;
        let target = *pair_of_primary.get(&edge.target).ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "primary edge target {:#x} has no node",
                edge.target
            ))
        })?;
        let index = combined.edges.len();
        combined.edges.push(RawCombinedEdge {
            source,
            target,
            primary: Some(*edge),
            secondary: None,
        });
        edges_by_key.entry((source, target)).or_default().push(index);
    }

    for edge in &diff.secondary.edges {
        let source = *pair_of_secondary.get(&edge.source).ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "secondary edge source {:#x} has no node",
                edge.source
            ))
        })?;
        let target = *pair_of_secondary.get(&edge.target).ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "secondary edge target {:#x} has no node",
                edge.target
            ))
        })?;

        let slot = edges_by_key
            .get(&(source, target))
            .and_then(|indices| {
                indices
                    .iter()
                    .copied()
                    .find(|&i| combined.edges[i].secondary.is_none())
            });
        match slot {
            Some(index) => combined.edges[index].secondary = Some(*edge),
            None => {
                let index = combined.edges.len();
                combined.edges.push(RawCombinedEdge {
                    source,
                    target,
                    primary: None,
                    secondary: Some(*edge),
                });
                edges_by_key.entry((source, target)).or_default().push(index);
            }
        }
    }

    Ok(combined)
}
