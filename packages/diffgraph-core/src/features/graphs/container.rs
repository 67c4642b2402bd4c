//! The four live graphs of one diff
//!
//! `GraphsContainer` owns the Primary/Secondary/Super/Combined views,
//! the address and pair lookup indices, the change-notification hub and
//! the backing match-store port. The four graphs are one logical unit
//! of shared mutable state: every operation that touches more than one
//! of them runs inside `transaction` so listeners see a single
//! notification fan-out at the end.

use ahash::AHashMap;
use petgraph::stable_graph::NodeIndex;

use crate::config::DiffViewConfig;
use crate::errors::{DiffGraphError, Result};
use crate::shared::events::{EventHub, GraphChange, ListenerId};
use crate::shared::models::{
    Address, AddressPair, DisplayMode, GraphScope, MatchState, Side, ViewKind,
};
use crate::shared::ports::MatchStore;

use super::view_graph::{NodeRef, ViewGraph};

/// Super and combined node of one address pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEntry {
    pub super_node: NodeIndex,
    pub combined: NodeIndex,
}

/// Node/edge tallies over the super graph plus per-view visible counts
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiffStatistics {
    pub matched_nodes: usize,
    pub primary_unmatched_nodes: usize,
    pub secondary_unmatched_nodes: usize,
    pub matched_edges: usize,
    pub primary_unmatched_edges: usize,
    pub secondary_unmatched_edges: usize,
    pub visible_super_nodes: usize,
    pub stub_nodes: usize,
}

pub struct GraphsContainer {
    scope: GraphScope,
    config: DiffViewConfig,
    primary: ViewGraph,
    secondary: ViewGraph,
    super_graph: ViewGraph,
    combined: ViewGraph,
    primary_index: AHashMap<Address, NodeIndex>,
    secondary_index: AHashMap<Address, NodeIndex>,
    pair_index: AHashMap<AddressPair, PairEntry>,
    primary_entry: Option<Address>,
    secondary_entry: Option<Address>,
    match_store: Box<dyn MatchStore>,
    pub(crate) events: EventHub,
    pub(crate) proximity_frozen: bool,
}

impl GraphsContainer {
    /// Empty container; populated by the graph builder
    pub(crate) fn empty(
        scope: GraphScope,
        config: DiffViewConfig,
        match_store: Box<dyn MatchStore>,
    ) -> Self {
        Self {
            scope,
            config,
            primary: ViewGraph::new(ViewKind::Primary),
            secondary: ViewGraph::new(ViewKind::Secondary),
            super_graph: ViewGraph::new(ViewKind::Super),
            combined: ViewGraph::new(ViewKind::Combined),
            primary_index: AHashMap::new(),
            secondary_index: AHashMap::new(),
            pair_index: AHashMap::new(),
            primary_entry: None,
            secondary_entry: None,
            match_store,
            events: EventHub::new(),
            proximity_frozen: false,
        }
    }

    pub fn scope(&self) -> GraphScope {
        self.scope
    }

    pub fn config(&self) -> &DiffViewConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut DiffViewConfig {
        &mut self.config
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.config.display_mode
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.config.display_mode = mode;
    }

    pub fn view(&self, kind: ViewKind) -> &ViewGraph {
        match kind {
            ViewKind::Primary => &self.primary,
            ViewKind::Secondary => &self.secondary,
            ViewKind::Super => &self.super_graph,
            ViewKind::Combined => &self.combined,
        }
    }

    pub(crate) fn view_mut(&mut self, kind: ViewKind) -> &mut ViewGraph {
        match kind {
            ViewKind::Primary => &mut self.primary,
            ViewKind::Secondary => &mut self.secondary,
            ViewKind::Super => &mut self.super_graph,
            ViewKind::Combined => &mut self.combined,
        }
    }

    pub fn entry_address(&self, side: Side) -> Option<Address> {
        match side {
            Side::Primary => self.primary_entry,
            Side::Secondary => self.secondary_entry,
        }
    }

    pub(crate) fn set_entry_address(&mut self, side: Side, address: Option<Address>) {
        match side {
            Side::Primary => self.primary_entry = address,
            Side::Secondary => self.secondary_entry = address,
        }
    }

    pub fn match_store(&self) -> &dyn MatchStore {
        self.match_store.as_ref()
    }

    pub(crate) fn match_store_mut(&mut self) -> &mut dyn MatchStore {
        self.match_store.as_mut()
    }

    // ------------------------------------------------------------------
    // Lookup indices
    // ------------------------------------------------------------------

    /// Single-graph node of an address, per side
    pub fn single_node(&self, side: Side, address: Address) -> Option<NodeIndex> {
        match side {
            Side::Primary => self.primary_index.get(&address).copied(),
            Side::Secondary => self.secondary_index.get(&address).copied(),
        }
    }

    /// Super/combined nodes of an address pair
    pub fn pair_entry(&self, pair: &AddressPair) -> Option<PairEntry> {
        self.pair_index.get(pair).copied()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &AddressPair> {
        self.pair_index.keys()
    }

    pub(crate) fn register_single(
        &mut self,
        side: Side,
        address: Address,
        index: NodeIndex,
    ) -> Result<()> {
        let map = match side {
            Side::Primary => &mut self.primary_index,
            Side::Secondary => &mut self.secondary_index,
        };
        if map.insert(address, index).is_some() {
            return Err(DiffGraphError::invariant(format!(
                "duplicate {side:?} address {address:#x} in single index"
            )));
        }
        Ok(())
    }

    pub(crate) fn unregister_single(&mut self, side: Side, address: Address) -> Result<()> {
        let map = match side {
            Side::Primary => &mut self.primary_index,
            Side::Secondary => &mut self.secondary_index,
        };
        map.remove(&address).ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "{side:?} address {address:#x} missing from single index"
            ))
        })?;
        Ok(())
    }

    pub(crate) fn register_pair(&mut self, pair: AddressPair, entry: PairEntry) -> Result<()> {
        if self.pair_index.insert(pair, entry).is_some() {
            return Err(DiffGraphError::invariant(format!(
                "duplicate address pair {pair} in pair index"
            )));
        }
        Ok(())
    }

    pub(crate) fn unregister_pair(&mut self, pair: &AddressPair) -> Result<PairEntry> {
        self.pair_index.remove(pair).ok_or_else(|| {
            DiffGraphError::invariant(format!("address pair {pair} missing from pair index"))
        })
    }

    /// The address pair of a node, for any view
    pub fn pair_of(&self, node: NodeRef) -> Option<AddressPair> {
        self.view(node.view()).node(node.index())?.pair()
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl Fn(&[GraphChange]) + 'static) -> ListenerId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Run `f` with notifications suppressed and fire one batch at the end
    ///
    /// On error the suppression state is restored and the queued changes
    /// are dropped; graph content is NOT rolled back.
    pub(crate) fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.events.begin();
        match f(self) {
            Ok(value) => {
                self.events.end();
                Ok(value)
            }
            Err(err) => {
                self.events.abort();
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    pub fn statistics(&self) -> DiffStatistics {
        let mut stats = DiffStatistics::default();
        let graph = self.super_graph.petgraph();
        for index in graph.node_indices() {
            let node = &graph[index];
            if node.is_stub() {
                stats.stub_nodes += 1;
                continue;
            }
            match node.state {
                MatchState::Matched => stats.matched_nodes += 1,
                MatchState::PrimaryUnmatched => stats.primary_unmatched_nodes += 1,
                MatchState::SecondaryUnmatched => stats.secondary_unmatched_nodes += 1,
            }
            if node.visible {
                stats.visible_super_nodes += 1;
            }
        }
        for index in graph.edge_indices() {
            let edge = &graph[index];
            if edge.is_stub {
                continue;
            }
            match edge.state {
                MatchState::Matched => stats.matched_edges += 1,
                MatchState::PrimaryUnmatched => stats.primary_unmatched_edges += 1,
                MatchState::SecondaryUnmatched => stats.secondary_unmatched_edges += 1,
            }
        }
        stats
    }

    // ------------------------------------------------------------------
    // Consistency checks
    // ------------------------------------------------------------------

    /// Verify the cross-view invariants; used by tests and debug builds
    ///
    /// Checks that every pair-index entry resolves to live super and
    /// combined nodes with matching pairs, that single nodes exist
    /// exactly for the sides present on their pair, that sibling links
    /// are mutual, and that every stub has degree 1.
    pub fn check_consistency(&self) -> Result<()> {
        for (pair, entry) in &self.pair_index {
            let super_node = self.super_graph.node(entry.super_node).ok_or_else(|| {
                DiffGraphError::invariant(format!("pair {pair}: super node missing"))
            })?;
            let combined_node = self.combined.node(entry.combined).ok_or_else(|| {
                DiffGraphError::invariant(format!("pair {pair}: combined node missing"))
            })?;
            if super_node.pair() != Some(*pair) || combined_node.pair() != Some(*pair) {
                return Err(DiffGraphError::invariant(format!(
                    "pair {pair}: index entry points at a node with a different pair"
                )));
            }

            for side in [Side::Primary, Side::Secondary] {
                let single = pair.address(side).and_then(|a| self.single_node(side, a));
                match (pair.has_side(side), single) {
                    (true, Some(single_idx)) => {
                        let view = self.view(match side {
                            Side::Primary => ViewKind::Primary,
                            Side::Secondary => ViewKind::Secondary,
                        });
                        let single_node = view.node(single_idx).ok_or_else(|| {
                            DiffGraphError::invariant(format!(
                                "pair {pair}: {side:?} single node missing"
                            ))
                        })?;
                        if single_node.links.super_node != Some(entry.super_node) {
                            return Err(DiffGraphError::invariant(format!(
                                "pair {pair}: {side:?} single node not linked to super node"
                            )));
                        }
                    }
                    (true, None) => {
                        return Err(DiffGraphError::invariant(format!(
                            "pair {pair}: {side:?} side present but single node absent"
                        )));
                    }
                    (false, _) => {}
                }
            }

            if super_node.links.combined != Some(entry.combined)
                || combined_node.links.super_node != Some(entry.super_node)
            {
                return Err(DiffGraphError::invariant(format!(
                    "pair {pair}: super/combined sibling links not mutual"
                )));
            }
        }

        if self.pair_index.len()
            != self
                .super_graph
                .petgraph()
                .node_indices()
                .filter(|i| !self.super_graph.petgraph()[*i].is_stub())
                .count()
        {
            return Err(DiffGraphError::invariant(
                "pair index size disagrees with super element count".to_string(),
            ));
        }

        for kind in ViewKind::ALL {
            let view = self.view(kind);
            for stub in view.stub_indices() {
                if view.incident_edges(stub).len() != 1 {
                    return Err(DiffGraphError::invariant(format!(
                        "{kind:?} stub {stub:?} is not degree 1"
                    )));
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for GraphsContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphsContainer")
            .field("scope", &self.scope)
            .field("pairs", &self.pair_index.len())
            .field("super_nodes", &self.super_graph.node_count())
            .field("super_edges", &self.super_graph.edge_count())
            .field("mode", &self.config.display_mode)
            .finish()
    }
}
