use super::{GraphApi, SuggestionApi};
use crate::error::{Error, Result};
use crate::model::{
    AutoConnectSuggestion, Connection, ConnectionId, ConnectionPatch, NewConnection, NodeId,
    ProjectId,
};
use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Map;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    List,
    Create,
    Update,
    Delete,
    Suggest,
    ApplyBulk,
}

#[derive(Debug, Default)]
struct State {
    connections: Vec<Connection>,
    suggestions: IndexMap<ProjectId, Vec<AutoConnectSuggestion>>,
    failures: HashMap<ApiOperation, String>,
    calls: HashMap<ApiOperation, usize>,
}

/// In-process remote. Behaves like the HTTP service (server ids, timestamps, `409` on duplicate
/// pairs, upsert on bulk apply) without a network.
#[derive(Debug, Default)]
pub struct MemoryGraphApi {
    state: Mutex<State>,
}

impl MemoryGraphApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connections(connections: impl IntoIterator<Item = Connection>) -> Self {
        let api = Self::new();
        api.state().connections.extend(connections);
        api
    }

    pub fn set_suggestions(
        &self,
        project_id: impl Into<ProjectId>,
        suggestions: Vec<AutoConnectSuggestion>,
    ) {
        self.state()
            .suggestions
            .insert(project_id.into(), suggestions);
    }

    /// The next call of `operation` is rejected with a `500` carrying `message`.
    pub fn fail_next(&self, operation: ApiOperation, message: impl Into<String>) {
        self.state().failures.insert(operation, message.into());
    }

    pub fn call_count(&self, operation: ApiOperation) -> usize {
        self.state().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Everything stored, across projects.
    pub fn stored(&self) -> Vec<Connection> {
        self.state().connections.clone()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, operation: ApiOperation) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state();
        *state.calls.entry(operation).or_default() += 1;
        if let Some(message) = state.failures.remove(&operation) {
            return Err(Error::api(Some(500), message));
        }
        Ok(state)
    }
}

impl State {
    fn position(&self, id: &ConnectionId) -> Result<usize> {
        self.connections
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| Error::api(Some(404), "Connection not found"))
    }

    fn find_pair(
        &mut self,
        project_id: &ProjectId,
        source: &NodeId,
        target: &NodeId,
    ) -> Option<&mut Connection> {
        self.connections
            .iter_mut()
            .find(|c| &c.project_id == project_id && c.links(source, target))
    }
}

fn persist(payload: &NewConnection) -> Connection {
    let now = Utc::now();
    Connection {
        id: ConnectionId::new(uuid::Uuid::new_v4().to_string()),
        project_id: payload.project_id.clone(),
        source: payload.source.clone(),
        target: payload.target.clone(),
        connection_type: payload.connection_type,
        connection_status: payload.connection_status.unwrap_or_default(),
        environment: None,
        label: payload.label.clone().filter(|s| !s.is_empty()),
        description: payload.description.clone().filter(|s| !s.is_empty()),
        last_verified_at: None,
        metadata: Map::new(),
        created_by: "memory".to_string(),
        created_at: now,
        updated_at: now,
    }
}

impl GraphApi for MemoryGraphApi {
    async fn list(&self, project_id: &ProjectId) -> Result<Vec<Connection>> {
        let state = self.begin(ApiOperation::List)?;
        Ok(state
            .connections
            .iter()
            .filter(|c| &c.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn create(&self, payload: &NewConnection) -> Result<Connection> {
        let mut state = self.begin(ApiOperation::Create)?;
        if payload.source == payload.target {
            return Err(Error::api(Some(400), "Cannot connect a service to itself"));
        }
        if state
            .find_pair(&payload.project_id, &payload.source, &payload.target)
            .is_some()
        {
            return Err(Error::api(Some(409), "Connection already exists"));
        }
        let connection = persist(payload);
        state.connections.push(connection.clone());
        Ok(connection)
    }

    async fn update(&self, id: &ConnectionId, patch: &ConnectionPatch) -> Result<Connection> {
        let mut state = self.begin(ApiOperation::Update)?;
        let index = state.position(id)?;
        let connection = &mut state.connections[index];
        patch.apply_to(connection, Utc::now());
        Ok(connection.clone())
    }

    async fn delete(&self, id: &ConnectionId) -> Result<()> {
        let mut state = self.begin(ApiOperation::Delete)?;
        let index = state.position(id)?;
        state.connections.remove(index);
        Ok(())
    }
}

impl SuggestionApi for MemoryGraphApi {
    async fn suggest(&self, project_id: &ProjectId) -> Result<Vec<AutoConnectSuggestion>> {
        let state = self.begin(ApiOperation::Suggest)?;
        Ok(state
            .suggestions
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn apply_bulk(
        &self,
        project_id: &ProjectId,
        suggestions: &[AutoConnectSuggestion],
    ) -> Result<Vec<Connection>> {
        let mut state = self.begin(ApiOperation::ApplyBulk)?;
        if suggestions.is_empty() {
            return Err(Error::api(Some(400), "No suggestions provided"));
        }

        let mut created = Vec::with_capacity(suggestions.len());
        for suggestion in suggestions {
            if let Some(existing) = state.find_pair(project_id, &suggestion.source, &suggestion.target)
            {
                existing.connection_type = suggestion.connection_type;
                existing.updated_at = Utc::now();
                created.push(existing.clone());
                continue;
            }
            let payload = NewConnection::new(
                project_id.clone(),
                suggestion.source.clone(),
                suggestion.target.clone(),
                suggestion.connection_type,
            );
            let connection = persist(&payload);
            state.connections.push(connection.clone());
            created.push(connection);
        }
        Ok(created)
    }
}
