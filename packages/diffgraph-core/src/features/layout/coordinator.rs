//! Layout coordination
//!
//! Computes geometry for the visible subgraphs and fans it back out
//! across the views. Synchronized mode runs the super and combined
//! layouts on two worker threads, joins both, and fails fast if either
//! failed; the super geometry is then copied onto the single graphs
//! through the address-pair correspondence, with stubs located by
//! structural adjacency since they have no address. A cancelled
//! computation joins its workers and applies no geometry at all.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use tracing::{debug, warn};

use crate::config::LayoutConfig;
use crate::errors::Result;
use crate::features::graphs::{GraphsContainer, ViewNodeKind};
use crate::shared::cancel::CancelToken;
use crate::shared::events::GraphChange;
use crate::shared::models::ViewKind;
use crate::shared::ports::{
    LayoutEdgeSpec, LayoutEngine, LayoutError, LayoutInput, LayoutNodeSpec, LayoutResult,
};

/// Lifecycle of one layout invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPhase {
    Idle,
    Running,
    Done,
    Cancelled,
    Failed,
}

/// Which graphs to lay out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Super and combined concurrently; singles take the super geometry
    Synchronized,
    /// Only the focused graph
    Independent(ViewKind),
}

/// Terminal result of a completed invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOutcome {
    Done,
    Cancelled,
}

/// Drives layout computations and applies their geometry
///
/// Shared-reference API so a cancel request can arrive from another
/// thread while the control thread blocks in `relayout`.
pub struct LayoutCoordinator {
    engine: Arc<dyn LayoutEngine>,
    phase: Mutex<LayoutPhase>,
    current: Mutex<Option<CancelToken>>,
}

impl LayoutCoordinator {
    pub fn new(engine: Arc<dyn LayoutEngine>) -> Self {
        Self {
            engine,
            phase: Mutex::new(LayoutPhase::Idle),
            current: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> LayoutPhase {
        *self.phase.lock()
    }

    /// Request cancellation of the in-flight computation, if any
    pub fn cancel(&self) {
        if let Some(token) = self.current.lock().as_ref() {
            token.cancel();
        }
    }

    /// Lay out the visible subgraphs per `mode` and apply the geometry
    ///
    /// Blocks until the computation finishes or is cancelled; worker
    /// threads are always joined before this returns.
    pub fn relayout(
        &self,
        container: &mut GraphsContainer,
        mode: LayoutMode,
    ) -> Result<LayoutOutcome> {
        let token = CancelToken::new();
        *self.current.lock() = Some(token.clone());
        *self.phase.lock() = LayoutPhase::Running;

        let outcome = match mode {
            LayoutMode::Synchronized => self.run_synchronized(container, &token),
            LayoutMode::Independent(view) => self.run_independent(container, view, &token),
        };

        *self.current.lock() = None;
        *self.phase.lock() = match &outcome {
            Ok(LayoutOutcome::Done) => LayoutPhase::Done,
            Ok(LayoutOutcome::Cancelled) => LayoutPhase::Cancelled,
            Err(_) => LayoutPhase::Failed,
        };
        outcome
    }

    fn run_synchronized(
        &self,
        container: &mut GraphsContainer,
        token: &CancelToken,
    ) -> Result<LayoutOutcome> {
        let layout_config = container.config().layout;
        let super_input = extract_layout_input(container, ViewKind::Super, &layout_config);
        let combined_input = extract_layout_input(container, ViewKind::Combined, &layout_config);

        let (sender, receiver) = mpsc::channel();
        let mut handles = Vec::new();
        for (view, input) in [
            (ViewKind::Super, super_input),
            (ViewKind::Combined, combined_input),
        ] {
            let engine = Arc::clone(&self.engine);
            let worker_token = token.clone();
            let worker_sender = sender.clone();
            handles.push(thread::spawn(move || {
                let result = engine.compute(&input, &worker_token);
                let _ = worker_sender.send((view, result));
            }));
        }
        drop(sender);

        // release both workers before leaving, whatever the outcome
        let mut panicked = false;
        for handle in handles {
            if handle.join().is_err() {
                panicked = true;
            }
        }

        let mut super_result: Option<std::result::Result<LayoutResult, LayoutError>> = None;
        let mut combined_result: Option<std::result::Result<LayoutResult, LayoutError>> = None;
        while let Ok((view, result)) = receiver.try_recv() {
            match view {
                ViewKind::Super => super_result = Some(result),
                ViewKind::Combined => combined_result = Some(result),
                _ => {}
            }
        }

        if token.is_cancelled() {
            debug!("synchronized layout cancelled; no geometry applied");
            return Ok(LayoutOutcome::Cancelled);
        }
        if panicked {
            warn!("layout worker panicked");
            return Err(LayoutError::Engine("layout worker panicked".to_string()).into());
        }

        let super_result = super_result
            .unwrap_or_else(|| Err(LayoutError::Engine("super layout returned nothing".into())));
        let combined_result = combined_result.unwrap_or_else(|| {
            Err(LayoutError::Engine("combined layout returned nothing".into()))
        });
        let (super_geometry, combined_geometry) = match (super_result, combined_result) {
            (Ok(s), Ok(c)) => (s, c),
            (Err(LayoutError::Cancelled), _) | (_, Err(LayoutError::Cancelled)) => {
                return Ok(LayoutOutcome::Cancelled);
            }
            (Err(error), _) | (_, Err(error)) => return Err(error.into()),
        };

        container.transaction(|c| {
            apply_to_view(c, ViewKind::Super, &super_geometry);
            apply_to_view(c, ViewKind::Combined, &combined_geometry);
            propagate_super_to_singles(c, &super_geometry);
            for view in ViewKind::ALL {
                c.events.emit(GraphChange::GeometryChanged { view });
            }
            Ok(())
        })?;
        Ok(LayoutOutcome::Done)
    }

    fn run_independent(
        &self,
        container: &mut GraphsContainer,
        view: ViewKind,
        token: &CancelToken,
    ) -> Result<LayoutOutcome> {
        let layout_config = container.config().layout;
        let input = extract_layout_input(container, view, &layout_config);

        let geometry = match self.engine.compute(&input, token) {
            Ok(geometry) => geometry,
            Err(LayoutError::Cancelled) => return Ok(LayoutOutcome::Cancelled),
            Err(error) => return Err(error.into()),
        };
        if token.is_cancelled() {
            return Ok(LayoutOutcome::Cancelled);
        }

        container.transaction(|c| {
            apply_to_view(c, view, &geometry);
            c.events.emit(GraphChange::GeometryChanged { view });
            Ok(())
        })?;
        Ok(LayoutOutcome::Done)
    }
}

impl GraphsContainer {
    /// Container-surface entry point; delegates to the coordinator
    pub fn relayout(
        &mut self,
        coordinator: &LayoutCoordinator,
        mode: LayoutMode,
    ) -> Result<LayoutOutcome> {
        coordinator.relayout(self, mode)
    }
}

impl std::fmt::Debug for LayoutCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutCoordinator")
            .field("phase", &self.phase())
            .finish()
    }
}

/// Flatten one view's visible subgraph for the engine
fn extract_layout_input(
    container: &GraphsContainer,
    view: ViewKind,
    config: &LayoutConfig,
) -> LayoutInput {
    let graph = container.view(view).petgraph();
    let mut input = LayoutInput::default();

    for index in graph.node_indices() {
        if !graph[index].visible {
            continue;
        }
        input.nodes.push(LayoutNodeSpec {
            id: index.index() as u32,
            width: config.default_node_width,
            height: config.default_node_height,
        });
    }
    for index in graph.edge_indices() {
        if !graph[index].visible {
            continue;
        }
        let Some((source, target)) = graph.edge_endpoints(index) else { continue };
        if !graph[source].visible || !graph[target].visible {
            continue;
        }
        input.edges.push(LayoutEdgeSpec {
            id: index.index() as u32,
            source: source.index() as u32,
            target: target.index() as u32,
        });
    }
    input
}

/// Write a result's geometry onto the view it was computed for
fn apply_to_view(container: &mut GraphsContainer, view: ViewKind, geometry: &LayoutResult) {
    let graph = container.view_mut(view);
    for (&id, &position) in &geometry.positions {
        let index = NodeIndex::new(id as usize);
        if let Some(node) = graph.node_mut(index) {
            node.position = Some(position);
        }
    }
    for (&id, bends) in &geometry.bends {
        let index = EdgeIndex::new(id as usize);
        if let Some(edge) = graph.edge_mut(index) {
            edge.bends = bends.clone();
        }
    }
}

/// Copy super geometry onto the single graphs
///
/// Elements and edges resolve through their sibling links; stubs have
/// none, so a single-graph stub is found as the unique degree-1 stub
/// neighbor of its owner with the matching direction.
fn propagate_super_to_singles(container: &mut GraphsContainer, geometry: &LayoutResult) {
    for (&id, &position) in &geometry.positions {
        let index = NodeIndex::new(id as usize);
        let Some(node) = container.view(ViewKind::Super).node(index) else { continue };

        match node.kind.clone() {
            ViewNodeKind::Element { .. } => {
                let links = node.links;
                for view in [ViewKind::Primary, ViewKind::Secondary] {
                    let Some(sibling) = links.get(view) else { continue };
                    if let Some(weight) = container.view_mut(view).node_mut(sibling) {
                        weight.position = Some(position);
                    }
                }
            }
            ViewNodeKind::Stub {
                owner, direction, ..
            } => {
                let Some(owner_node) = container.view(ViewKind::Super).node(owner) else {
                    continue;
                };
                let owner_links = owner_node.links;
                for view in [ViewKind::Primary, ViewKind::Secondary] {
                    let Some(single_owner) = owner_links.get(view) else { continue };
                    let Some(single_stub) = container.view(view).stub_of(single_owner, direction)
                    else {
                        continue;
                    };
                    if let Some(weight) = container.view_mut(view).node_mut(single_stub) {
                        weight.position = Some(position);
                    }
                }
            }
        }
    }

    for (&id, bends) in &geometry.bends {
        let index = EdgeIndex::new(id as usize);
        let Some(edge) = container.view(ViewKind::Super).edge(index) else { continue };
        let links = edge.links;
        for view in [ViewKind::Primary, ViewKind::Secondary] {
            let Some(sibling) = links.get(view) else { continue };
            if let Some(weight) = container.view_mut(view).edge_mut(sibling) {
                weight.bends = bends.clone();
            }
        }
    }
}
