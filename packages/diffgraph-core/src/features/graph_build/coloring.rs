//! Visual state pass
//!
//! Assigns node colors from match state and the changed flag, and
//! border lines from entry-block membership. Both are pure functions of
//! the current graph state, so the pass is idempotent and safe to rerun
//! after reloads and match edits.

use petgraph::stable_graph::NodeIndex;
use rayon::prelude::*;

use crate::shared::models::{
    derive_color, Address, AddressPair, BorderStyle, GraphScope, MatchState, NodeColor, Side,
    ViewKind,
};

use crate::features::graphs::GraphsContainer;

/// Entry-block border is relative to the whole visible set, so it is
/// recomputed for every node of every view, not just edited ones.
pub fn recolor(container: &mut GraphsContainer) {
    let scope = container.scope();
    let primary_entry = container.entry_address(Side::Primary);
    let secondary_entry = container.entry_address(Side::Secondary);

    for kind in ViewKind::ALL {
        let snapshot: Vec<(NodeIndex, MatchState, bool, bool, Option<AddressPair>)> = {
            let graph = container.view(kind).petgraph();
            graph
                .node_indices()
                .map(|index| {
                    let node = &graph[index];
                    (index, node.state, node.changed, node.is_stub(), node.pair())
                })
                .collect()
        };

        let computed: Vec<(NodeIndex, NodeColor, BorderStyle)> = snapshot
            .par_iter()
            .map(|&(index, state, changed, is_stub, pair)| {
                let color = if is_stub {
                    NodeColor::Stub
                } else {
                    derive_color(state, changed)
                };
                let border = if is_stub {
                    BorderStyle::Normal
                } else {
                    border_for(scope, kind, pair, primary_entry, secondary_entry)
                };
                (index, color, border)
            })
            .collect();

        let view = container.view_mut(kind);
        for (index, color, border) in computed {
            if let Some(node) = view.node_mut(index) {
                node.color = color;
                node.border = border;
            }
        }
    }
}

fn border_for(
    scope: GraphScope,
    view: ViewKind,
    pair: Option<AddressPair>,
    primary_entry: Option<Address>,
    secondary_entry: Option<Address>,
) -> BorderStyle {
    if scope != GraphScope::FlowGraph {
        return BorderStyle::Normal;
    }
    let Some(pair) = pair else {
        return BorderStyle::Normal;
    };
    let primary_is_entry = pair.primary.is_some() && pair.primary == primary_entry;
    let secondary_is_entry = pair.secondary.is_some() && pair.secondary == secondary_entry;
    let is_entry = match view {
        ViewKind::Primary => primary_is_entry,
        ViewKind::Secondary => secondary_is_entry,
        ViewKind::Super | ViewKind::Combined => primary_is_entry || secondary_is_entry,
    };
    if is_entry {
        BorderStyle::Entry
    } else {
        BorderStyle::Normal
    }
}
