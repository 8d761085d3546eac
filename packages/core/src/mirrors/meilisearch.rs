//! MeilisearchMirror - SearchMirror over the Meilisearch HTTP API
//!
//! Documents go to `POST /indexes/{index}/documents?primaryKey=id`, which adds
//! or replaces by id and creates the index on first use. Writes are accepted
//! asynchronously by the server (HTTP 202); acceptance is treated as success.

use crate::mirrors::{MirrorError, SearchMirror};
use crate::models::SearchDocument;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default service address when none is configured
pub const DEFAULT_MEILI_HOST: &str = "http://meilisearch:7700";

/// Default API key, matching the service's development master key
pub const DEFAULT_MEILI_KEY: &str = "masterKey";

/// Default index name
pub const DEFAULT_MEILI_INDEX: &str = "nodes";

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    limit: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Vec<SearchDocument>,
}

#[derive(Deserialize)]
struct MeiliErrorBody {
    code: Option<String>,
}

/// Meilisearch-backed search mirror
#[derive(Clone)]
pub struct MeilisearchMirror {
    client: Client,
    host: String,
    api_key: Option<String>,
    index: String,
}

impl MeilisearchMirror {
    pub fn new(host: impl Into<String>, api_key: Option<String>, index: impl Into<String>) -> Self {
        Self::with_client(Client::new(), host, api_key, index)
    }

    pub fn with_client(
        client: Client,
        host: impl Into<String>,
        api_key: Option<String>,
        index: impl Into<String>,
    ) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self {
            client,
            host,
            api_key: api_key.filter(|key| !key.is_empty()),
            index: index.into(),
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    fn url(&self, path: &str) -> String {
        format!("{}/indexes/{}{}", self.host, self.index, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response, MirrorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MirrorError::rejected(status.as_u16(), body))
    }

    fn is_index_not_found(status: u16, body: &str) -> bool {
        status == StatusCode::NOT_FOUND.as_u16()
            && serde_json::from_str::<MeiliErrorBody>(body)
                .ok()
                .and_then(|b| b.code)
                .is_some_and(|code| code == "index_not_found")
    }
}

#[async_trait]
impl SearchMirror for MeilisearchMirror {
    async fn upsert_documents(&self, documents: &[SearchDocument]) -> Result<(), MirrorError> {
        if documents.is_empty() {
            return Ok(());
        }

        let request = self
            .client
            .post(self.url("/documents"))
            .query(&[("primaryKey", "id")])
            .json(documents);

        Self::check(self.authorize(request).send().await?).await?;
        debug!(index = %self.index, count = documents.len(), "Search documents enqueued");
        Ok(())
    }

    async fn delete_document(&self, id: i64) -> Result<(), MirrorError> {
        let request = self.client.delete(self.url(&format!("/documents/{}", id)));

        match Self::check(self.authorize(request).send().await?).await {
            Ok(_) => Ok(()),
            Err(MirrorError::Rejected { status, body }) if Self::is_index_not_found(status, &body) => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchDocument>, MirrorError> {
        let request = self
            .client
            .post(self.url("/search"))
            .json(&SearchRequest { q: query, limit });

        match Self::check(self.authorize(request).send().await?).await {
            Ok(response) => Ok(response.json::<SearchResponse>().await?.hits),
            // Nothing has been indexed yet
            Err(MirrorError::Rejected { status, body }) if Self::is_index_not_found(status, &body) => {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
