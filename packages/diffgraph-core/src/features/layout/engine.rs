//! Built-in layered layout
//!
//! Deterministic Kahn-style layering: nodes with no unplaced
//! predecessors form the next layer, cycles are broken at the smallest
//! remaining id. Good enough for headless use and tests; real
//! force-directed/hierarchical engines plug in through the same port.

use ahash::{AHashMap, AHashSet};

use crate::config::LayoutConfig;
use crate::shared::cancel::CancelToken;
use crate::shared::models::Point;
use crate::shared::ports::{LayoutEngine, LayoutError, LayoutInput, LayoutResult};

#[derive(Debug, Clone, Default)]
pub struct LayeredLayoutEngine {
    config: LayoutConfig,
}

impl LayeredLayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }
}

impl LayoutEngine for LayeredLayoutEngine {
    fn compute(
        &self,
        input: &LayoutInput,
        cancel: &CancelToken,
    ) -> Result<LayoutResult, LayoutError> {
        let mut result = LayoutResult::default();
        if input.nodes.is_empty() {
            return Ok(result);
        }

        let mut in_degree: AHashMap<u32, usize> =
            input.nodes.iter().map(|node| (node.id, 0)).collect();
        let mut successors: AHashMap<u32, Vec<u32>> = AHashMap::new();
        for edge in &input.edges {
            // self-loops would deadlock the layering
            if edge.source == edge.target {
                continue;
            }
            if !in_degree.contains_key(&edge.source) || !in_degree.contains_key(&edge.target) {
                continue;
            }
            *in_degree.entry(edge.target).or_insert(0) += 1;
            successors.entry(edge.source).or_default().push(edge.target);
        }

        let mut remaining: Vec<u32> = in_degree.keys().copied().collect();
        remaining.sort_unstable();
        let mut placed: AHashSet<u32> = AHashSet::new();
        let mut layer_index = 0u32;

        while placed.len() < in_degree.len() {
            if cancel.is_cancelled() {
                return Err(LayoutError::Cancelled);
            }

            let mut layer: Vec<u32> = remaining
                .iter()
                .copied()
                .filter(|id| !placed.contains(id) && in_degree[id] == 0)
                .collect();
            if layer.is_empty() {
                // cycle: break it at the smallest unplaced id
                let Some(fallback) = remaining.iter().copied().find(|id| !placed.contains(id))
                else {
                    break;
                };
                layer.push(fallback);
            }
            layer.sort_unstable();

            let width = self.config.default_node_width + self.config.horizontal_spacing;
            let height = self.config.default_node_height + self.config.vertical_spacing;
            for (slot, &id) in layer.iter().enumerate() {
                result
                    .positions
                    .insert(id, Point::new(slot as f32 * width, layer_index as f32 * height));
                placed.insert(id);
                if let Some(next) = successors.get(&id) {
                    for &target in next {
                        if let Some(degree) = in_degree.get_mut(&target) {
                            *degree = degree.saturating_sub(1);
                        }
                    }
                }
            }
            layer_index += 1;
        }

        Ok(result)
    }
}
