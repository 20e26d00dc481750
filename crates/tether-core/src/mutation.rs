//! Optimistic create / update / delete on top of [`GraphStore`].
//!
//! Every mutation follows the same discipline (see [`MutationCoordinator::with_optimistic_mutation`]):
//! capture the whole list, apply the local edit, commit remotely, restore the captured list on
//! failure, and always re-establish ground truth with an invalidate + refetch once the call
//! settles. The final refetch is what keeps racing mutations from clobbering each other's
//! results: a rollback only ever restores its own checkpoint, and the next fetch replaces it.

use crate::api::{GraphApi, SuggestionApi};
use crate::config::GraphRules;
use crate::error::{Error, Result};
use crate::model::{
    AutoConnectSuggestion, Connection, ConnectionId, ConnectionPatch, NewConnection, NodeId,
};
use crate::store::GraphStore;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type PendingMap = Arc<Mutex<HashMap<ConnectionId, usize>>>;

/// Marks a connection id as having a mutation in flight until dropped.
///
/// Dropping also covers a caller that abandons the future mid-flight.
struct PendingGuard {
    pending: PendingMap,
    id: ConnectionId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = pending.get_mut(&self.id) {
            *count -= 1;
            if *count == 0 {
                pending.remove(&self.id);
            }
        }
    }
}

pub struct MutationCoordinator<A> {
    api: A,
    store: GraphStore,
    rules: GraphRules,
    pending: PendingMap,
}

impl<A: GraphApi> MutationCoordinator<A> {
    pub fn new(api: A, store: GraphStore, rules: GraphRules) -> Self {
        Self {
            api,
            store,
            rules,
            pending: PendingMap::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn rules(&self) -> &GraphRules {
        &self.rules
    }

    /// Whether a mutation for `id` is in flight. Hosts disable the matching controls while true.
    pub fn is_pending(&self, id: &ConnectionId) -> bool {
        self.pending_map().contains_key(id)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_map().is_empty()
    }

    /// Snapshot, apply `apply` locally, run `commit`, roll back on failure, then settle.
    ///
    /// The checkpoint is taken per call, so concurrent mutations never share rollback state.
    pub async fn with_optimistic_mutation<T, C, Fut>(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut Vec<Connection>),
        commit: C,
    ) -> Result<T>
    where
        C: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let checkpoint = self.store.checkpoint();
        self.store.modify(apply);
        tracing::debug!(operation, "optimistic change applied");

        let outcome = commit().await;
        match &outcome {
            Ok(_) => tracing::debug!(operation, "mutation committed"),
            Err(err) => {
                tracing::warn!(operation, error = %err, "mutation failed; rolling back");
                self.store.restore(checkpoint);
            }
        }

        self.settle().await;
        outcome
    }

    /// Adds the edge locally under a `temp-` id, then creates it remotely.
    pub async fn create(&self, payload: NewConnection) -> Result<Connection> {
        payload.validate(&self.rules)?;
        self.check_reverse_edge(&payload.source, &payload.target)?;

        if !self.store.is_current_project(&payload.project_id) {
            // Nothing cached for that project, so there is nothing to show optimistically.
            return self.api.create(&payload).await;
        }

        let optimistic = payload.to_optimistic(Utc::now());
        let _pending = self.track(optimistic.id.clone());
        self.with_optimistic_mutation(
            "create",
            |list| list.push(optimistic),
            || self.api.create(&payload),
        )
        .await
    }

    /// Applies `patch` locally, then remotely. An empty patch returns the cached record untouched.
    pub async fn update(&self, id: &ConnectionId, patch: ConnectionPatch) -> Result<Connection> {
        patch.validate(&self.rules)?;
        if patch.is_empty() {
            return self
                .store
                .snapshot()
                .get(id)
                .cloned()
                .ok_or_else(|| Error::NotFound { id: id.clone() });
        }

        let _pending = self.track(id.clone());
        let now = Utc::now();
        self.with_optimistic_mutation(
            "update",
            |list| {
                if let Some(connection) = list.iter_mut().find(|c| &c.id == id) {
                    patch.apply_to(connection, now);
                }
            },
            || self.api.update(id, &patch),
        )
        .await
    }

    /// Removes the edge locally, then remotely.
    pub async fn delete(&self, id: &ConnectionId) -> Result<()> {
        let _pending = self.track(id.clone());
        self.with_optimistic_mutation(
            "delete",
            |list| list.retain(|c| &c.id != id),
            || self.api.delete(id),
        )
        .await
    }

    async fn settle(&self) {
        self.store.invalidate();
        if let Err(err) = self.store.refetch(&self.api).await {
            tracing::warn!(error = %err, "refetch after mutation failed; cache left stale");
        }
    }

    fn check_reverse_edge(&self, source: &NodeId, target: &NodeId) -> Result<()> {
        if self.rules.allow_reverse_edges {
            return Ok(());
        }
        let snapshot = self.store.snapshot();
        if snapshot.connections().iter().any(|c| c.links(target, source)) {
            return Err(Error::ReverseEdgeExists {
                from: source.clone(),
                to: target.clone(),
            });
        }
        Ok(())
    }

    fn track(&self, id: ConnectionId) -> PendingGuard {
        *self.pending_map().entry(id.clone()).or_default() += 1;
        PendingGuard {
            pending: Arc::clone(&self.pending),
            id,
        }
    }

    fn pending_map(&self) -> MutexGuard<'_, HashMap<ConnectionId, usize>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A: GraphApi + SuggestionApi> MutationCoordinator<A> {
    pub async fn suggest(&self) -> Result<Vec<AutoConnectSuggestion>> {
        self.api.suggest(&self.store.project_id()).await
    }

    /// Creates the accepted suggestions in one bulk call.
    ///
    /// Self-loops, pairs already connected, duplicates within the batch and (when disallowed)
    /// reverse edges are dropped first. Nothing left means no network call.
    pub async fn apply_suggestions(
        &self,
        accepted: Vec<AutoConnectSuggestion>,
    ) -> Result<Vec<Connection>> {
        let snapshot = self.store.snapshot();
        let existing = snapshot.connections();
        let total = accepted.len();

        let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
        let mut valid = Vec::with_capacity(total);
        for suggestion in accepted {
            let (source, target) = (&suggestion.source, &suggestion.target);
            let connected = existing.iter().any(|c| c.links(source, target));
            let reversed = !self.rules.allow_reverse_edges
                && (existing.iter().any(|c| c.links(target, source))
                    || seen.contains(&(target.clone(), source.clone())));
            if source == target
                || connected
                || reversed
                || !seen.insert((source.clone(), target.clone()))
            {
                tracing::debug!(%source, %target, "dropping suggestion");
                continue;
            }
            valid.push(suggestion);
        }

        let dropped = total - valid.len();
        if valid.is_empty() {
            tracing::info!(dropped, "no applicable suggestions");
            return Ok(Vec::new());
        }

        let project_id = self.store.project_id();
        let outcome = self.api.apply_bulk(&project_id, &valid).await;
        self.settle().await;
        let created = outcome?;
        tracing::info!(created = created.len(), dropped, "applied suggestions");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiOperation, MemoryGraphApi};
    use crate::config::StoreConfig;
    use crate::model::{ConnectionStatus, ConnectionType, FieldUpdate};
    use futures::executor::block_on;

    fn coordinator(rules: GraphRules) -> MutationCoordinator<MemoryGraphApi> {
        MutationCoordinator::new(
            MemoryGraphApi::new(),
            GraphStore::new("p", StoreConfig::default()),
            rules,
        )
    }

    #[test]
    fn validation_failures_never_touch_the_cache() {
        let c = coordinator(GraphRules::default());
        let err = block_on(c.create(NewConnection::new("p", "a", "a", ConnectionType::Uses)))
            .unwrap_err();
        assert!(matches!(err, Error::SelfLoop { .. }));
        assert_eq!(c.store().generation(), 0);
        assert_eq!(c.api().call_count(ApiOperation::Create), 0);
    }

    #[test]
    fn reverse_edges_follow_configuration() {
        let c = coordinator(GraphRules {
            allow_reverse_edges: false,
            ..GraphRules::default()
        });
        block_on(c.create(NewConnection::new("p", "a", "b", ConnectionType::Uses))).unwrap();
        let err = block_on(c.create(NewConnection::new("p", "b", "a", ConnectionType::Sdk)))
            .unwrap_err();
        match &err {
            Error::ReverseEdgeExists { from, to } => {
                assert_eq!((from.as_str(), to.as_str()), ("b", "a"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.to_string(),
            "a connection a -> b already exists and reverse edges are disabled"
        );

        let lenient = coordinator(GraphRules::default());
        block_on(lenient.create(NewConnection::new("p", "a", "b", ConnectionType::Uses))).unwrap();
        block_on(lenient.create(NewConnection::new("p", "b", "a", ConnectionType::Sdk))).unwrap();
        assert_eq!(lenient.store().snapshot().len(), 2);
    }

    #[test]
    fn failed_update_restores_previous_fields() {
        let c = coordinator(GraphRules::default());
        let created =
            block_on(c.create(NewConnection::new("p", "a", "b", ConnectionType::Uses))).unwrap();

        c.api().fail_next(ApiOperation::Update, "nope");
        let patch = ConnectionPatch {
            connection_status: Some(ConnectionStatus::Error),
            description: FieldUpdate::Set("flaky".to_string()),
            ..ConnectionPatch::default()
        };
        let err = block_on(c.update(&created.id, patch)).unwrap_err();
        assert_eq!(err.to_string(), "nope");

        let cached = c.store().snapshot();
        let record = cached.get(&created.id).unwrap();
        assert_eq!(record.connection_status, ConnectionStatus::Active);
        assert_eq!(record.description, None);
        assert!(!c.is_pending(&created.id));
    }

    #[test]
    fn empty_patch_is_not_sent() {
        let c = coordinator(GraphRules::default());
        let created =
            block_on(c.create(NewConnection::new("p", "a", "b", ConnectionType::Uses))).unwrap();
        let same = block_on(c.update(&created.id, ConnectionPatch::default())).unwrap();
        assert_eq!(same, created);
        assert_eq!(c.api().call_count(ApiOperation::Update), 0);
    }

    #[test]
    fn suggestions_are_filtered_before_bulk_apply() {
        let c = coordinator(GraphRules::default());
        block_on(c.create(NewConnection::new("p", "a", "b", ConnectionType::Uses))).unwrap();

        let suggestion = |s: &str, t: &str| AutoConnectSuggestion {
            source: NodeId::new(s),
            target: NodeId::new(t),
            connection_type: ConnectionType::ApiCall,
            reason: String::new(),
            dependency_type: String::new(),
        };
        let created = block_on(c.apply_suggestions(vec![
            suggestion("a", "b"),
            suggestion("c", "c"),
            suggestion("b", "c"),
            suggestion("b", "c"),
        ]))
        .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(c.api().call_count(ApiOperation::ApplyBulk), 1);
        assert_eq!(c.store().snapshot().len(), 2);

        let none = block_on(c.apply_suggestions(vec![suggestion("a", "b")])).unwrap();
        assert!(none.is_empty());
        assert_eq!(c.api().call_count(ApiOperation::ApplyBulk), 1);
    }
}
