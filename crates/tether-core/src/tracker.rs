//! Position tracking without a layout engine.
//!
//! The host owns layout. It tells the tracker *that* something may have moved (a
//! [`LayoutTrigger`]) and answers *where* tagged elements are (a [`LayoutSource`]). The tracker
//! coalesces triggers into at most one pending frame and publishes a fresh [`RectStore`] snapshot
//! when that frame fires.

use crate::geom::{NodeRect, Rect};
use crate::model::NodeId;
use crate::rect_store::RectStore;
use indexmap::IndexMap;
use std::collections::HashMap;

/// An element carrying (or failing to carry) the node identity marker, in viewport coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedElement {
    pub node_id: Option<String>,
    pub rect: Rect,
}

impl TaggedElement {
    pub fn new(node_id: impl Into<String>, rect: Rect) -> Self {
        Self {
            node_id: Some(node_id.into()),
            rect,
        }
    }
}

pub trait LayoutSource {
    /// Viewport rect of the container, or `None` before it is mounted.
    fn container_rect(&self) -> Option<Rect>;

    /// All identity-tagged descendants of the container, in document order.
    fn tagged_elements(&self) -> Vec<TaggedElement>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Frame-aligned callback scheduling (e.g. `requestAnimationFrame`).
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// "Something told me to remeasure."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutTrigger {
    /// The container became available after `attach` (late mount, portal, lazy panel).
    ContainerMounted,
    ContainerResized,
    WindowResized,
    /// Structural or attribute change inside the container (expand/collapse, re-flow).
    ContentMutated,
    Explicit,
}

pub struct PositionTracker<L, F> {
    source: L,
    scheduler: F,
    store: RectStore,
    pending: Option<FrameHandle>,
    attached: bool,
    initial_owed: bool,
}

impl<L: LayoutSource, F: FrameScheduler> PositionTracker<L, F> {
    pub fn new(source: L, scheduler: F, store: RectStore) -> Self {
        Self {
            source,
            scheduler,
            store,
            pending: None,
            attached: false,
            initial_owed: false,
        }
    }

    pub fn store(&self) -> &RectStore {
        &self.store
    }

    pub fn source(&self) -> &L {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut L {
        &mut self.source
    }

    pub fn scheduler(&self) -> &F {
        &self.scheduler
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Starts tracking. No trigger fires for the very first paint, so this owes one pass; it is
    /// scheduled now if the container exists, otherwise on [`Self::container_ready`].
    pub fn attach(&mut self) {
        self.attached = true;
        self.initial_owed = true;
        self.schedule_measure();
    }

    /// Stops tracking and drops any pending frame. The last snapshot stays readable.
    pub fn detach(&mut self) {
        self.attached = false;
        self.initial_owed = false;
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
    }

    /// Whether the initial pass is still waiting for a container.
    pub fn initial_pass_owed(&self) -> bool {
        self.initial_owed
    }

    /// Schedules the owed initial pass once the container shows up. A no-op otherwise.
    pub fn container_ready(&mut self) {
        if self.initial_owed {
            self.schedule_measure();
        }
    }

    pub fn notify(&mut self, trigger: LayoutTrigger) {
        tracing::trace!(?trigger, "layout trigger");
        match trigger {
            LayoutTrigger::ContainerMounted => self.container_ready(),
            _ => self.schedule_measure(),
        }
    }

    pub fn refresh(&mut self) {
        self.notify(LayoutTrigger::Explicit);
    }

    /// Collapses every call before the next frame into a single measurement pass.
    pub fn schedule_measure(&mut self) {
        if !self.attached || self.source.container_rect().is_none() {
            return;
        }
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.initial_owed = false;
        self.pending = Some(self.scheduler.request_frame());
    }

    /// Frame callback. Returns whether a new snapshot was published.
    pub fn on_frame(&mut self, handle: FrameHandle) -> bool {
        if self.pending != Some(handle) {
            // Cancelled or superseded frame.
            return false;
        }
        self.pending = None;
        self.measure()
    }

    /// Re-measures all tagged elements and publishes the result atomically.
    pub fn measure(&mut self) -> bool {
        let Some(container) = self.source.container_rect() else {
            return false;
        };

        let elements = self.source.tagged_elements();
        let counts = count_ids(&elements);
        let mut next: IndexMap<NodeId, NodeRect> = IndexMap::with_capacity(elements.len());
        for element in elements {
            let Some(raw_id) = element.node_id.filter(|id| !id.is_empty()) else {
                continue;
            };
            if counts.get(&raw_id).copied().unwrap_or(0) > 1 {
                continue;
            }
            let node_id = NodeId::new(raw_id);
            let rect = NodeRect::relative_to(node_id.clone(), element.rect, container);
            next.insert(node_id, rect);
        }

        let node_count = next.len();
        let changed = self.store.publish(next);
        tracing::debug!(node_count, changed, "measured node rects");
        changed
    }
}

fn count_ids(elements: &[TaggedElement]) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for id in elements.iter().filter_map(|e| e.node_id.as_ref()) {
        *counts.entry(id.clone()).or_default() += 1;
    }
    counts
}
