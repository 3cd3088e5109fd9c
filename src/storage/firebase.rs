//! Realtime database REST storage implementation.
//!
//! Every node is addressable as `{database_url}/{path}.json`:
//! - `GET` reads (`null` body when absent, `shallow=true` lists keys)
//! - `PUT` replaces, `PATCH` merges, `DELETE` removes
//!
//! Authentication is the `auth` query parameter (database secret or ID token).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{AppError, Result};
use crate::storage::{TreeStore, tree};
use crate::utils::path_segments;

/// Tree store backed by the realtime database REST API.
pub struct FirebaseStore {
    client: Client,
    base: Url,
    auth_token: Option<String>,
}

impl FirebaseStore {
    /// Create a store for the database at `database_url`.
    pub fn new(client: Client, database_url: &str, auth_token: Option<String>) -> Result<Self> {
        let base = Url::parse(database_url)?;
        if base.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "database_url is not a base URL: {}",
                database_url
            )));
        }
        Ok(Self {
            client,
            base,
            auth_token,
        })
    }

    /// REST URL of a node.
    fn node_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut segments: Vec<String> = path_segments(path)
            .into_iter()
            .map(str::to_string)
            .collect();
        match segments.last_mut() {
            Some(last) => last.push_str(".json"),
            None => segments.push(".json".to_string()),
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config("database_url is not a base URL"))?
            .pop_if_empty()
            .extend(segments);

        {
            let mut pairs = url.query_pairs_mut();
            if let Some(token) = &self.auth_token {
                pairs.append_pair("auth", token);
            }
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    /// Send a request and turn non-success statuses into store errors.
    async fn send(&self, path: &str, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        Err(AppError::store(path, format!("{}: {}", status, message)))
    }

    async fn read(&self, path: &str, query: &[(&str, &str)]) -> Result<Option<Value>> {
        let url = self.node_url(path, query)?;
        log::debug!("GET {}", path);
        let response = self.send(path, self.client.get(url)).await?;
        let value: Value = response.json().await?;
        Ok((!value.is_null()).then_some(value))
    }
}

#[async_trait]
impl TreeStore for FirebaseStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.read(path, &[]).await
    }

    async fn set(&self, path: &str, value: &Value) -> Result<()> {
        let url = self.node_url(path, &[("print", "silent")])?;
        log::debug!("PUT {}", path);
        self.send(path, self.client.put(url).json(value)).await?;
        Ok(())
    }

    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<()> {
        let url = self.node_url(path, &[("print", "silent")])?;
        log::debug!("PATCH {} ({} fields)", path, fields.len());
        self.send(path, self.client.patch(url).json(fields)).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let url = self.node_url(path, &[("print", "silent")])?;
        log::debug!("DELETE {}", path);
        self.send(path, self.client.delete(url)).await?;
        Ok(())
    }

    async fn child_keys(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .read(path, &[("shallow", "true")])
            .await?
            .map(|value| tree::child_keys(&value))
            .unwrap_or_default())
    }
}
