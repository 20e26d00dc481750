//! Remote collaborators the engine consumes.
//!
//! Both traits use `async fn` and stay executor-agnostic: nothing here spawns tasks or assumes a
//! runtime. Only the optional HTTP transport needs one (because `reqwest` does).

use crate::error::Result;
use crate::model::{
    AutoConnectSuggestion, Connection, ConnectionId, ConnectionPatch, NewConnection, ProjectId,
};

#[cfg(feature = "http")]
pub mod http;
pub mod memory;

#[cfg(feature = "http")]
pub use http::HttpGraphApi;
pub use memory::{ApiOperation, MemoryGraphApi};

/// Connection CRUD against the authoritative store.
#[allow(async_fn_in_trait)]
pub trait GraphApi {
    async fn list(&self, project_id: &ProjectId) -> Result<Vec<Connection>>;
    async fn create(&self, payload: &NewConnection) -> Result<Connection>;
    async fn update(&self, id: &ConnectionId, patch: &ConnectionPatch) -> Result<Connection>;
    async fn delete(&self, id: &ConnectionId) -> Result<()>;
}

/// External dependency-detection collaborator. The engine only consumes its output.
#[allow(async_fn_in_trait)]
pub trait SuggestionApi {
    async fn suggest(&self, project_id: &ProjectId) -> Result<Vec<AutoConnectSuggestion>>;
    async fn apply_bulk(
        &self,
        project_id: &ProjectId,
        suggestions: &[AutoConnectSuggestion],
    ) -> Result<Vec<Connection>>;
}

impl<T: GraphApi + ?Sized> GraphApi for &T {
    async fn list(&self, project_id: &ProjectId) -> Result<Vec<Connection>> {
        (**self).list(project_id).await
    }

    async fn create(&self, payload: &NewConnection) -> Result<Connection> {
        (**self).create(payload).await
    }

    async fn update(&self, id: &ConnectionId, patch: &ConnectionPatch) -> Result<Connection> {
        (**self).update(id, patch).await
    }

    async fn delete(&self, id: &ConnectionId) -> Result<()> {
        (**self).delete(id).await
    }
}

impl<T: SuggestionApi + ?Sized> SuggestionApi for &T {
    async fn suggest(&self, project_id: &ProjectId) -> Result<Vec<AutoConnectSuggestion>> {
        (**self).suggest(project_id).await
    }

    async fn apply_bulk(
        &self,
        project_id: &ProjectId,
        suggestions: &[AutoConnectSuggestion],
    ) -> Result<Vec<Connection>> {
        (**self).apply_bulk(project_id, suggestions).await
    }
}
