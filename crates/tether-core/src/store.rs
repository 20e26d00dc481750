//! Per-project connection cache with a staleness window.
//!
//! The store is an explicit object owned by the host (one per "current project"), never global
//! state. Lists are immutable `Arc<[Connection]>` snapshots; every replace is a pointer swap and
//! bumps a generation counter so renderers can detect change without comparing lists.

use crate::api::GraphApi;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::model::{Connection, ConnectionId, ProjectId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Cached list as seen by readers. `connections` is `None` until the first successful fetch.
#[derive(Debug, Clone, Default)]
pub struct ListSnapshot {
    generation: u64,
    connections: Option<Arc<[Connection]>>,
}

impl ListSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loaded(&self) -> bool {
        self.connections.is_some()
    }

    pub fn connections(&self) -> &[Connection] {
        self.connections.as_deref().unwrap_or(&[])
    }

    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections().iter().find(|c| &c.id == id)
    }

    pub fn len(&self) -> usize {
        self.connections().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections().is_empty()
    }
}

/// Opaque pre-mutation state, restored verbatim on rollback.
#[derive(Debug, Clone)]
pub(crate) struct Checkpoint {
    project_id: ProjectId,
    connections: Option<Arc<[Connection]>>,
}

#[derive(Debug)]
struct CacheState {
    project_id: ProjectId,
    connections: Option<Arc<[Connection]>>,
    generation: u64,
    fetched_at: Option<Instant>,
    invalidated: bool,
    /// Sequence number handed to the most recently started fetch.
    fetch_started: u64,
    /// Fetches numbered at or below this may no longer write the cache.
    fetch_floor: u64,
}

#[derive(Debug, Clone)]
pub struct GraphStore {
    config: StoreConfig,
    state: Arc<Mutex<CacheState>>,
}

impl GraphStore {
    pub fn new(project_id: impl Into<ProjectId>, config: StoreConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(CacheState {
                project_id: project_id.into(),
                connections: None,
                generation: 0,
                fetched_at: None,
                invalidated: false,
                fetch_started: 0,
                fetch_floor: 0,
            })),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn project_id(&self) -> ProjectId {
        self.state().project_id.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// Current cached list without any I/O. May be stale or not loaded yet.
    pub fn snapshot(&self) -> ListSnapshot {
        let state = self.state();
        ListSnapshot {
            generation: state.generation,
            connections: state.connections.clone(),
        }
    }

    /// Rebinds the store to another project, dropping the old project's list.
    pub fn switch_project(&self, project_id: impl Into<ProjectId>) {
        let project_id = project_id.into();
        let mut state = self.state();
        if state.project_id == project_id {
            return;
        }
        tracing::debug!(from = %state.project_id, to = %project_id, "switching project");
        state.project_id = project_id;
        state.connections = None;
        state.fetched_at = None;
        state.invalidated = false;
        state.fetch_floor = state.fetch_started;
        state.generation += 1;
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Instant::now())
    }

    pub fn is_stale_at(&self, now: Instant) -> bool {
        let state = self.state();
        if state.connections.is_none() || state.invalidated {
            return true;
        }
        match state.fetched_at {
            Some(fetched_at) => now.saturating_duration_since(fetched_at) >= self.config.stale_time(),
            None => true,
        }
    }

    /// Marks the list stale. The next read (or an explicit `refetch`) goes to the remote.
    pub fn invalidate(&self) {
        let mut state = self.state();
        state.invalidated = true;
        tracing::debug!(project = %state.project_id, "connection list invalidated");
    }

    /// Serves the cached list while fresh, otherwise fetches.
    pub async fn connections<A: GraphApi>(&self, api: &A) -> Result<ListSnapshot> {
        if !self.is_stale() {
            return Ok(self.snapshot());
        }
        self.refetch(api).await
    }

    /// Unconditionally fetches and swaps in the authoritative list.
    pub async fn refetch<A: GraphApi>(&self, api: &A) -> Result<ListSnapshot> {
        let (project_id, seq) = {
            let mut state = self.state();
            state.fetch_started += 1;
            (state.project_id.clone(), state.fetch_started)
        };
        let fetched = api.list(&project_id).await?;

        let mut state = self.state();
        if state.project_id != project_id || seq <= state.fetch_floor {
            // Superseded by a newer fetch, an optimistic edit, or a project switch.
            tracing::debug!(project = %project_id, seq, "discarding outdated connection list");
            return Ok(ListSnapshot {
                generation: state.generation,
                connections: state.connections.clone(),
            });
        }
        tracing::debug!(project = %project_id, count = fetched.len(), "connection list fetched");
        state.connections = Some(Arc::from(fetched));
        state.fetched_at = Some(Instant::now());
        state.invalidated = false;
        state.fetch_floor = seq;
        state.generation += 1;
        Ok(ListSnapshot {
            generation: state.generation,
            connections: state.connections.clone(),
        })
    }

    /// Window regained focus: refetch if stale and enabled. Returns whether a fetch happened.
    pub async fn on_focus<A: GraphApi>(&self, api: &A) -> Result<bool> {
        if !self.config.refetch_on_focus || !self.is_stale() {
            return Ok(false);
        }
        self.refetch(api).await.map(|_| true)
    }

    /// Periodic timer: refetch once the configured interval has elapsed since the last fetch.
    pub async fn on_interval_tick<A: GraphApi>(&self, api: &A) -> Result<bool> {
        let Some(interval) = self.config.refetch_interval() else {
            return Ok(false);
        };
        let due = match self.state().fetched_at {
            Some(fetched_at) => fetched_at.elapsed() >= interval,
            None => true,
        };
        if !due {
            return Ok(false);
        }
        self.refetch(api).await.map(|_| true)
    }

    /// Captures the pre-mutation list and keeps fetches already in flight from overwriting the
    /// optimistic edit that follows.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        let mut state = self.state();
        state.fetch_floor = state.fetch_started;
        Checkpoint {
            project_id: state.project_id.clone(),
            connections: state.connections.clone(),
        }
    }

    /// Copy-on-write edit of the cached list (a missing list edits as empty).
    pub(crate) fn modify(&self, edit: impl FnOnce(&mut Vec<Connection>)) {
        let mut state = self.state();
        let mut next: Vec<Connection> = state.connections.as_deref().unwrap_or(&[]).to_vec();
        edit(&mut next);
        state.connections = Some(Arc::from(next));
        state.generation += 1;
    }

    /// Restores a checkpoint unless the store has moved on to another project since.
    pub(crate) fn restore(&self, checkpoint: Checkpoint) {
        let mut state = self.state();
        if state.project_id != checkpoint.project_id {
            return;
        }
        state.connections = checkpoint.connections;
        state.generation += 1;
    }

    pub(crate) fn is_current_project(&self, project_id: &ProjectId) -> bool {
        &self.state().project_id == project_id
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
