//! Last-measured rectangles of every visible node, published as immutable snapshots.

use crate::geom::NodeRect;
use crate::model::NodeId;
use indexmap::IndexMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RectSnapshot {
    generation: u64,
    rects: IndexMap<NodeId, NodeRect>,
}

impl RectSnapshot {
    pub fn from_rects(rects: impl IntoIterator<Item = NodeRect>) -> Self {
        Self {
            generation: 0,
            rects: rects
                .into_iter()
                .map(|r| (r.node_id.clone(), r))
                .collect(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&NodeRect> {
        self.rects.get(node_id)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.rects.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRect> {
        self.rects.values()
    }
}

/// Shared handle. The position tracker is the only writer; readers take an `Arc` snapshot and
/// never observe a partially-updated map.
#[derive(Debug, Clone, Default)]
pub struct RectStore {
    current: Arc<RwLock<Arc<RectSnapshot>>>,
}

impl RectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<RectSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, node_id: &NodeId) -> Option<NodeRect> {
        self.snapshot().get(node_id).cloned()
    }

    /// Replaces the whole map. Returns `false` (and keeps the old snapshot) when nothing changed.
    pub fn publish(&self, rects: IndexMap<NodeId, NodeRect>) -> bool {
        let mut slot = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.rects == rects {
            return false;
        }
        let generation = slot.generation + 1;
        *slot = Arc::new(RectSnapshot { generation, rects });
        true
    }

    pub fn clear(&self) -> bool {
        self.publish(IndexMap::new())
    }
}
