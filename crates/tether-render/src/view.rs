//! `GraphView` wires tracker, store, coordinator and interaction into one host-facing object.

use crate::error::{Error, Result};
use crate::interaction::{EdgeEditor, GraphHost, Interaction};
use crate::scene::{Scene, SceneOptions};
use std::collections::VecDeque;
use tether_core::geom::Point;
use tether_core::{
    Connection, ConnectionId, FrameHandle, FrameScheduler, GraphApi, LayoutSource, LayoutTrigger,
    ListSnapshot, MutationCoordinator, NewConnection, PositionTracker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Non-fatal message for the host to show (toast, status line, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }
}

pub struct GraphView<A, L, F, H> {
    tracker: PositionTracker<L, F>,
    coordinator: MutationCoordinator<A>,
    interaction: Interaction,
    host: H,
    options: SceneOptions,
    notices: VecDeque<Notice>,
}

impl<A, L, F, H> GraphView<A, L, F, H>
where
    A: GraphApi,
    L: LayoutSource,
    F: FrameScheduler,
    H: GraphHost,
{
    pub fn new(
        tracker: PositionTracker<L, F>,
        coordinator: MutationCoordinator<A>,
        host: H,
        options: SceneOptions,
    ) -> Self {
        Self {
            tracker,
            coordinator,
            interaction: Interaction::new(),
            host,
            options,
            notices: VecDeque::new(),
        }
    }

    pub fn tracker(&self) -> &PositionTracker<L, F> {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut PositionTracker<L, F> {
        &mut self.tracker
    }

    pub fn coordinator(&self) -> &MutationCoordinator<A> {
        &self.coordinator
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn editor_mut(&mut self) -> Option<&mut EdgeEditor> {
        self.interaction.editor_mut()
    }

    pub fn mount(&mut self) {
        self.tracker.attach();
    }

    pub fn unmount(&mut self) {
        self.tracker.detach();
    }

    pub fn on_layout(&mut self, trigger: LayoutTrigger) {
        self.tracker.notify(trigger);
    }

    /// Host signal for a container that mounted after [`Self::mount`].
    pub fn container_ready(&mut self) {
        self.tracker.container_ready();
    }

    pub fn on_frame(&mut self, handle: FrameHandle) -> bool {
        self.tracker.on_frame(handle)
    }

    /// Loads (or serves from cache) the connection list.
    pub async fn load(&mut self) -> Result<ListSnapshot> {
        let snapshot = self
            .coordinator
            .store()
            .connections(self.coordinator.api())
            .await?;
        self.interaction
            .sync(snapshot.connections(), &mut self.host);
        Ok(snapshot)
    }

    /// Current overlay. Drops the selection first if its connection is gone.
    pub fn scene(&mut self) -> Scene {
        let list = self.coordinator.store().snapshot();
        self.interaction.sync(list.connections(), &mut self.host);
        let rects = self.tracker.store().snapshot();
        Scene::build(
            &rects,
            list.connections(),
            self.interaction.selected(),
            &self.options,
        )
    }

    pub fn select(&mut self, id: Option<&ConnectionId>) -> bool {
        let list = self.coordinator.store().snapshot();
        self.interaction
            .select(id, list.connections(), &mut self.host)
    }

    pub fn click(&mut self, p: Point) -> Option<ConnectionId> {
        let scene = self.scene();
        let list = self.coordinator.store().snapshot();
        self.interaction
            .click(&scene, p, list.connections(), &mut self.host)
            .cloned()
    }

    /// Where the inline editor should sit: the selected edge's badge center.
    pub fn editor_anchor(&mut self) -> Option<Point> {
        let scene = self.scene();
        scene
            .selected_edge()
            .and_then(|edge| edge.badge.as_ref())
            .map(|badge| badge.center)
    }

    pub fn close_editor(&mut self) {
        self.interaction.close(&mut self.host);
    }

    /// Creates a connection; the edge is drawn immediately and removed again if the remote rejects it.
    pub async fn connect(&mut self, payload: NewConnection) -> Result<Connection> {
        self.coordinator.create(payload).await.map_err(|err| {
            self.notices.push_back(Notice::error(err.to_string()));
            err.into()
        })
    }

    /// Commits the editor's draft. `Ok(None)` when nothing changed (the editor stays open).
    pub async fn save_edit(&mut self) -> Result<Option<Connection>> {
        let editor = self.interaction.editor().ok_or(Error::NoSelection)?;
        let id = editor.connection_id().clone();
        let Some(patch) = editor.save() else {
            return Ok(None);
        };
        if self.coordinator.is_pending(&id) {
            return Err(Error::MutationPending { id });
        }

        match self.coordinator.update(&id, patch).await {
            Ok(updated) => {
                self.interaction.close(&mut self.host);
                self.notices.push_back(Notice::info("Connection updated"));
                Ok(Some(updated))
            }
            Err(err) => {
                self.notices.push_back(Notice::error(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Deletes the selected connection once the editor's confirm step has been taken.
    pub async fn delete_selected(&mut self) -> Result<()> {
        let editor = self.interaction.editor().ok_or(Error::NoSelection)?;
        let id = editor.confirm_delete()?;
        if self.coordinator.is_pending(&id) {
            return Err(Error::MutationPending { id });
        }

        self.interaction.close(&mut self.host);
        match self.coordinator.delete(&id).await {
            Ok(()) => {
                self.notices.push_back(Notice::info("Connection deleted"));
                Ok(())
            }
            Err(err) => {
                self.notices.push_back(Notice::error(err.to_string()));
                Err(err.into())
            }
        }
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }
}
