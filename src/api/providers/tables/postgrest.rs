//! Supabase tables over the PostgREST API

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::TableProvider;
use crate::api::error::ApiError;
use crate::config::Config;

const PROVIDER_NAME: &str = "tables";

/// Single-object responses instead of one-element arrays
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Table API of a hosted Supabase project
pub struct SupabaseTables {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SupabaseTables {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let backend = &config.backend;
        if backend.url.is_empty() || backend.anon_key.is_empty() {
            return Err(ApiError::not_configured(PROVIDER_NAME));
        }
        Ok(Self::new(&backend.url, &backend.anon_key))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(PROVIDER_NAME, response).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl TableProvider for SupabaseTables {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn insert(&self, table: &str, record: Value) -> Result<(), ApiError> {
        let url = self.table_url(table);
        debug!("PostgREST insert: {}", url);

        self.send(
            self.client
                .post(&url)
                .header("Prefer", "return=minimal")
                .json(&record),
        )
        .await?;
        Ok(())
    }

    async fn insert_returning(&self, table: &str, record: Value) -> Result<Value, ApiError> {
        let url = self.table_url(table);
        debug!("PostgREST insert (returning): {}", url);

        let response = self
            .send(
                self.client
                    .post(&url)
                    .header("Prefer", "return=representation")
                    .header("Accept", SINGLE_OBJECT)
                    .json(&record),
            )
            .await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::parse(PROVIDER_NAME, e.to_string()))
    }

    async fn select_eq(
        &self,
        table: &str,
        column: &str,
        value: &str,
    ) -> Result<Vec<Value>, ApiError> {
        let url = self.table_url(table);
        debug!("PostgREST select: {} where {} = {}", url, column, value);

        let response = self
            .send(
                self.client
                    .get(&url)
                    .query(&[("select", "*".to_string()), (column, format!("eq.{}", value))]),
            )
            .await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::parse(PROVIDER_NAME, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_returning_reads_single_object() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/users")
            .match_header("prefer", "return=representation")
            .match_header("accept", SINGLE_OBJECT)
            .match_body(Matcher::Json(json!({"name": "Sara"})))
            .with_status(201)
            .with_body(r#"{"id": 12, "name": "Sara"}"#)
            .create_async()
            .await;

        let tables = SupabaseTables::new(server.url(), "key");
        let row = tables
            .insert_returning("users", json!({"name": "Sara"}))
            .await
            .unwrap();
        assert_eq!(row["id"], 12);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_select_eq_builds_filter() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/users")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "*".into()),
                Matcher::UrlEncoded("phone_number".into(), "eq.0500000000".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"id": 3}]"#)
            .create_async()
            .await;

        let tables = SupabaseTables::new(server.url(), "key");
        let rows = tables
            .select_eq("users", "phone_number", "0500000000")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_insert_conflict_is_http_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/rest/v1/companies")
            .with_status(409)
            .with_body(r#"{"code":"23505","message":"duplicate key"}"#)
            .create_async()
            .await;

        let tables = SupabaseTables::new(server.url(), "key");
        let err = tables
            .insert("companies", json!({"id": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpError { status: 409, .. }));
    }
}
