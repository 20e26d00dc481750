//! Selection and the inline connection editor.

use crate::error::{Error, Result};
use crate::scene::Scene;
use tether_core::geom::Point;
use tether_core::{
    Connection, ConnectionId, ConnectionPatch, ConnectionStatus, ConnectionType, FieldUpdate,
};

/// Host UI callbacks.
pub trait GraphHost {
    fn on_select_connection(&mut self, id: Option<&ConnectionId>);
}

impl GraphHost for () {
    fn on_select_connection(&mut self, _id: Option<&ConnectionId>) {}
}

/// Draft edits for one connection. Nothing reaches the store until [`EdgeEditor::save`] output is
/// committed by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEditor {
    original: Connection,
    connection_type: ConnectionType,
    connection_status: ConnectionStatus,
    description: String,
    confirming_delete: bool,
}

impl EdgeEditor {
    pub fn open(connection: &Connection) -> Self {
        Self {
            original: connection.clone(),
            connection_type: connection.connection_type,
            connection_status: connection.connection_status,
            description: connection.description.clone().unwrap_or_default(),
            confirming_delete: false,
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.original.id
    }

    pub fn original(&self) -> &Connection {
        &self.original
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_type(&mut self, connection_type: ConnectionType) {
        self.connection_type = connection_type;
    }

    pub fn set_status(&mut self, connection_status: ConnectionStatus) {
        self.connection_status = connection_status;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn has_changes(&self) -> bool {
        self.connection_type != self.original.connection_type
            || self.connection_status != self.original.connection_status
            || self.description != self.original.description.as_deref().unwrap_or_default()
    }

    /// Patch holding only the changed fields, or `None` when there is nothing to save.
    /// An emptied description clears the field.
    pub fn save(&self) -> Option<ConnectionPatch> {
        if !self.has_changes() {
            return None;
        }
        let original = &self.original;
        let description = if self.description == original.description.as_deref().unwrap_or_default()
        {
            FieldUpdate::Keep
        } else if self.description.is_empty() {
            FieldUpdate::Clear
        } else {
            FieldUpdate::Set(self.description.clone())
        };
        Some(ConnectionPatch {
            connection_type: (self.connection_type != original.connection_type)
                .then_some(self.connection_type),
            connection_status: (self.connection_status != original.connection_status)
                .then_some(self.connection_status),
            label: FieldUpdate::Keep,
            description,
        })
    }

    pub fn request_delete(&mut self) {
        self.confirming_delete = true;
    }

    pub fn cancel_delete(&mut self) {
        self.confirming_delete = false;
    }

    pub fn is_confirming_delete(&self) -> bool {
        self.confirming_delete
    }

    /// Second step of the delete flow. Fails unless [`EdgeEditor::request_delete`] came first.
    pub fn confirm_delete(&self) -> Result<ConnectionId> {
        if !self.confirming_delete {
            return Err(Error::DeleteNotConfirmed);
        }
        Ok(self.original.id.clone())
    }
}

/// At most one selected edge, plus its editor.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    selected: Option<ConnectionId>,
    editor: Option<EdgeEditor>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&ConnectionId> {
        self.selected.as_ref()
    }

    pub fn editor(&self) -> Option<&EdgeEditor> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut EdgeEditor> {
        self.editor.as_mut()
    }

    /// Sets the selection, opening the editor on the chosen connection. Unknown ids deselect.
    /// Returns whether the selection changed.
    pub fn select(
        &mut self,
        id: Option<&ConnectionId>,
        connections: &[Connection],
        host: &mut impl GraphHost,
    ) -> bool {
        let target = id.and_then(|id| connections.iter().find(|c| &c.id == id));
        let next = target.map(|c| c.id.clone());
        if next == self.selected {
            return false;
        }
        self.editor = target.map(EdgeEditor::open);
        self.selected = next;
        host.on_select_connection(self.selected.as_ref());
        true
    }

    /// Click handling: toggles the edge under `p`; empty space deselects.
    pub fn click(
        &mut self,
        scene: &Scene,
        p: Point,
        connections: &[Connection],
        host: &mut impl GraphHost,
    ) -> Option<&ConnectionId> {
        let hit = scene.hit_test(p).cloned();
        let next = match hit {
            Some(id) if self.selected.as_ref() == Some(&id) => None,
            other => other,
        };
        self.select(next.as_ref(), connections, host);
        self.selected()
    }

    /// Closes the editor without saving, which also drops the selection.
    pub fn close(&mut self, host: &mut impl GraphHost) {
        if self.selected.take().is_some() {
            self.editor = None;
            host.on_select_connection(None);
        }
    }

    /// Drops the selection if its connection is no longer in `connections`.
    pub fn sync(&mut self, connections: &[Connection], host: &mut impl GraphHost) {
        let Some(selected) = &self.selected else {
            return;
        };
        if connections.iter().any(|c| &c.id == selected) {
            return;
        }
        tracing::debug!(connection = %selected, "selected connection vanished; deselecting");
        self.close(host);
    }
}
