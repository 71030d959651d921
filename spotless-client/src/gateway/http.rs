//! Hosted REST dialect over reqwest

use super::{ChangeEvent, ChangeFeed, Gateway, RealtimeWorker, SelectQuery, SessionToken};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use shared::Table;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

const PREFER_MINIMAL: &str = "return=minimal";
const PREFER_MERGE: &str = "resolution=merge-duplicates,return=minimal";

/// Gateway client for the hosted database
pub struct HttpGateway {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: SessionToken,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        if !config.is_configured() {
            return Err(ClientError::Config(
                "Gateway URL and key are both required".into(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            access_token: Arc::new(RwLock::new(config.access_token.clone())),
        })
    }

    /// Session token of the signed-in operator (None reverts to the key)
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write() = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn realtime_worker(
        &self,
        tables: &[Table],
        tx: broadcast::Sender<ChangeEvent>,
        shutdown: CancellationToken,
    ) -> RealtimeWorker {
        RealtimeWorker::new(self.realtime_url(), tables.to_vec(), tx, shutdown)
            .with_access_token(self.access_token.clone())
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .clone()
            .unwrap_or_else(|| self.api_key.clone())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<Response> {
        let response = self.authorize(request).send().await?;
        Self::check(response).await
    }

    /// Map non-2xx statuses, carrying the server's message
    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                ["message", "error", "msg"]
                    .iter()
                    .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or_else(|| body.clone());

        Err(match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Rejected(message)
            }
            _ => ClientError::Gateway {
                status: status.as_u16(),
                message,
            },
        })
    }

    fn realtime_url(&self) -> String {
        let ws_base = self
            .base_url
            .replace("https://", "wss://")
            .replace("http://", "ws://");
        format!(
            "{ws_base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            self.api_key
        )
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    #[instrument(skip(self, query), fields(table = %table))]
    async fn select(&self, table: Table, query: &SelectQuery) -> ClientResult<Vec<Value>> {
        let mut params = vec![("select", "*".to_string())];
        if let Some(column) = &query.order_by {
            let direction = if query.descending { "desc" } else { "asc" };
            params.push(("order", format!("{column}.{direction}")));
        }

        let response = self
            .send(self.client.get(self.table_url(table)).query(&params))
            .await?;
        let rows: Value = response.json().await?;
        match rows {
            Value::Array(rows) => {
                debug!(rows = rows.len(), "Fetched");
                Ok(rows)
            }
            Value::Null => Ok(Vec::new()),
            other => Err(ClientError::InvalidResponse(format!(
                "expected an array of rows from {table}, got {other}"
            ))),
        }
    }

    #[instrument(skip(self, rows), fields(table = %table, rows = rows.len()))]
    async fn insert(&self, table: Table, rows: Vec<Value>) -> ClientResult<()> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", PREFER_MINIMAL)
            .json(&rows);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, patch), fields(table = %table))]
    async fn update(&self, table: Table, id: &str, patch: Value) -> ClientResult<()> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", PREFER_MINIMAL)
            .json(&patch);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(table = %table))]
    async fn delete(&self, table: Table, id: &str) -> ClientResult<()> {
        let request = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))]);
        self.send(request).await?;
        Ok(())
    }

    #[instrument(skip(self, rows), fields(table = %table, rows = rows.len()))]
    async fn upsert(&self, table: Table, rows: Vec<Value>) -> ClientResult<()> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", PREFER_MERGE)
            .json(&rows);
        self.send(request).await?;
        Ok(())
    }

    async fn subscribe(&self, tables: &[Table]) -> ClientResult<ChangeFeed> {
        let (tx, rx) = broadcast::channel(256);
        let shutdown = CancellationToken::new();
        let worker = self.realtime_worker(tables, tx, shutdown.clone());
        tokio::spawn(worker.run());
        Ok(ChangeFeed::with_guard(rx, shutdown.drop_guard()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_url_and_key() {
        let config = ClientConfig::new("https://db.example.com", "");
        assert!(matches!(
            HttpGateway::new(&config),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_urls() {
        let gateway =
            HttpGateway::new(&ClientConfig::new("https://db.example.com/", "anon-key")).unwrap();
        assert_eq!(
            gateway.table_url(Table::KanbanColumns),
            "https://db.example.com/rest/v1/kanban_columns"
        );
        assert_eq!(
            gateway.realtime_url(),
            "wss://db.example.com/realtime/v1/websocket?apikey=anon-key&vsn=1.0.0"
        );
        assert_eq!(gateway.bearer(), "anon-key");
        gateway.set_access_token(Some("session".into()));
        assert_eq!(gateway.bearer(), "session");
    }

    #[test]
    fn test_change_feed_rejoins_with_refreshed_session() {
        let gateway =
            HttpGateway::new(&ClientConfig::new("https://db.example.com", "anon-key")).unwrap();
        gateway.set_access_token(Some("first".into()));
        let (tx, _rx) = broadcast::channel(4);
        let mut worker = gateway.realtime_worker(&Table::ALL, tx, CancellationToken::new());
        assert_eq!(worker.join_message()["payload"]["access_token"], "first");

        gateway.set_access_token(Some("refreshed".into()));
        assert_eq!(worker.join_message()["payload"]["access_token"], "refreshed");
    }
}
