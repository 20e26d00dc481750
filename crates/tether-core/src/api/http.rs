//! JSON-over-HTTP transport for the connection and suggestion endpoints.

use super::{GraphApi, SuggestionApi};
use crate::error::{Error, Result};
use crate::model::{
    AutoConnectSuggestion, Connection, ConnectionId, ConnectionPatch, NewConnection, ProjectId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

const CONNECTIONS_PATH: &str = "api/connections";
const AUTO_CONNECT_PATH: &str = "api/connections/auto";

#[derive(Debug, Clone)]
pub struct HttpGraphApi {
    client: reqwest::Client,
    base: Url,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct SuggestionsBody {
    #[serde(default)]
    suggestions: Vec<AutoConnectSuggestion>,
}

#[derive(Serialize)]
struct BulkApplyRequest<'a> {
    project_id: &'a ProjectId,
    suggestions: &'a [AutoConnectSuggestion],
}

#[derive(Deserialize)]
struct BulkApplyBody {
    #[serde(default)]
    created: Vec<Connection>,
}

impl HttpGraphApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|err| Error::InvalidConfig {
            message: format!("invalid API base URL {base_url:?}: {err}"),
        })?;
        Ok(Self::with_client(reqwest::Client::new(), base))
    }

    pub fn with_client(client: reqwest::Client, mut base: Url) -> Self {
        // `Url::join` replaces the last segment unless the base ends with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { client, base }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|err| Error::InvalidConfig {
            message: format!("invalid endpoint {path:?}: {err}"),
        })
    }

    fn with_project(&self, path: &str, project_id: &ProjectId) -> Result<Url> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("project_id", project_id.as_str());
        Ok(url)
    }

    fn connection_url(&self, id: &ConnectionId) -> Result<Url> {
        let mut url = self.endpoint(CONNECTIONS_PATH)?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidConfig {
                message: format!("API base URL cannot be a base: {}", self.base),
            })?
            .push(id.as_str());
        Ok(url)
    }
}

fn transport(err: reqwest::Error) -> Error {
    Error::Transport {
        message: err.to_string(),
    }
}

/// Reads the body and maps non-2xx answers to `Error::Api`, preferring the body's `error` text.
async fn read_body(response: reqwest::Response, fallback: &str) -> Result<String> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;
    if status.is_success() {
        return Ok(body);
    }
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    tracing::debug!(status = status.as_u16(), %message, "remote rejected request");
    Err(Error::api(Some(status.as_u16()), message))
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response, fallback: &str) -> Result<T> {
    let body = read_body(response, fallback).await?;
    Ok(serde_json::from_str(&body)?)
}

impl GraphApi for HttpGraphApi {
    async fn list(&self, project_id: &ProjectId) -> Result<Vec<Connection>> {
        let url = self.with_project(CONNECTIONS_PATH, project_id)?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        read_json(response, "Failed to fetch connections").await
    }

    async fn create(&self, payload: &NewConnection) -> Result<Connection> {
        let url = self.endpoint(CONNECTIONS_PATH)?;
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(transport)?;
        read_json(response, "Failed to create connection").await
    }

    async fn update(&self, id: &ConnectionId, patch: &ConnectionPatch) -> Result<Connection> {
        let url = self.connection_url(id)?;
        let response = self
            .client
            .patch(url)
            .json(patch)
            .send()
            .await
            .map_err(transport)?;
        read_json(response, "Failed to update connection").await
    }

    async fn delete(&self, id: &ConnectionId) -> Result<()> {
        let url = self.connection_url(id)?;
        let response = self.client.delete(url).send().await.map_err(transport)?;
        read_body(response, "Failed to delete connection").await?;
        Ok(())
    }
}

impl SuggestionApi for HttpGraphApi {
    async fn suggest(&self, project_id: &ProjectId) -> Result<Vec<AutoConnectSuggestion>> {
        let url = self.with_project(AUTO_CONNECT_PATH, project_id)?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        let body: SuggestionsBody = read_json(response, "Failed to fetch suggestions").await?;
        Ok(body.suggestions)
    }

    async fn apply_bulk(
        &self,
        project_id: &ProjectId,
        suggestions: &[AutoConnectSuggestion],
    ) -> Result<Vec<Connection>> {
        let url = self.endpoint(AUTO_CONNECT_PATH)?;
        let request = BulkApplyRequest {
            project_id,
            suggestions,
        };
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let body: BulkApplyBody = read_json(response, "Failed to apply suggestions").await?;
        Ok(body.created)
    }
}
