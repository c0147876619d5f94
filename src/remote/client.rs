//! REST client for the `pending_commands` collection

use super::traits::{CommandStore, StoreError};
use crate::config::BridgeConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

/// Path of the collection below the store's base URL
const COLLECTION_PATH: &str = "/rest/v1/pending_commands";

/// HTTP client for the hosted store
#[derive(Clone)]
pub struct RemoteStore {
    client: Client,
    base_url: String,
    api_key: String,
    fetch_limit: Option<u32>,
}

impl RemoteStore {
    /// Create a client with a bounded per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        fetch_limit: Option<u32>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            fetch_limit,
        })
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self, StoreError> {
        Self::new(
            config.store_base_url(),
            config.store.api_key.clone(),
            config.http_timeout(),
            config.poll.fetch_limit,
        )
    }

    fn collection_url(&self) -> String {
        format!("{}{}", self.base_url, COLLECTION_PATH)
    }

    /// Attach the `apikey` and bearer credentials
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn fetch_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("status", "eq.pending".to_string()),
            ("order", "created_at.asc".to_string()),
        ];
        if let Some(limit) = self.fetch_limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }
}

#[async_trait]
impl CommandStore for RemoteStore {
    async fn fetch_pending(&self) -> Result<String, StoreError> {
        let response = self
            .authorized(self.client.get(self.collection_url()))
            .query(&self.fetch_query())
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(StoreError::RemoteFetch {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        Ok(response.text().await?)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let response = self
            .authorized(self.client.delete(self.collection_url()))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::RemoteDelete {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer, fetch_limit: Option<u32>) -> RemoteStore {
        RemoteStore::new(server.uri(), "anon-key", Duration::from_secs(5), fetch_limit)
            .expect("client")
    }

    #[tokio::test]
    async fn test_fetch_sends_filter_order_and_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/pending_commands"))
            .and(query_param("status", "eq.pending"))
            .and(query_param("order", "created_at.asc"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .and(header("Content-Type", "application/json"))
            .and(header("Prefer", "return=representation"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":"a1"}]"#))
            .expect(1)
            .mount(&server)
            .await;

        let body = store(&server, None).fetch_pending().await.expect("fetch");
        assert_eq!(body, r#"[{"id":"a1"}]"#);
    }

    #[tokio::test]
    async fn test_fetch_appends_limit_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let body = store(&server, Some(50)).fetch_pending().await.expect("fetch");
        assert_eq!(body, "[]");
    }

    #[tokio::test]
    async fn test_fetch_non_200_is_remote_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = store(&server, None).fetch_pending().await.unwrap_err();
        match err {
            StoreError::RemoteFetch { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_other_success_codes_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(206).set_body_string("[]"))
            .mount(&server)
            .await;

        let err = store(&server, None).fetch_pending().await.unwrap_err();
        assert!(matches!(err, StoreError::RemoteFetch { status: 206, .. }));
    }

    #[tokio::test]
    async fn test_delete_targets_record_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/pending_commands"))
            .and(query_param("id", "eq.a1"))
            .and(header("apikey", "anon-key"))
            .and(header("Authorization", "Bearer anon-key"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        store(&server, None).delete("a1").await.expect("delete");
    }

    #[tokio::test]
    async fn test_delete_failure_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = store(&server, None).delete("a1").await.unwrap_err();
        assert!(matches!(err, StoreError::RemoteDelete { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transport_error() {
        let store = RemoteStore::new("http://127.0.0.1:1", "k", Duration::from_secs(1), None)
            .expect("client");
        let err = store.fetch_pending().await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
