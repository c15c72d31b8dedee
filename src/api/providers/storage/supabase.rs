//! Supabase Storage implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::StorageProvider;
use crate::api::error::ApiError;
use crate::config::Config;
use crate::types::UploadFile;

const PROVIDER_NAME: &str = "storage";

/// Storage API of a hosted Supabase project
pub struct SupabaseStorage {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

impl SupabaseStorage {
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

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

#[async_trait]
impl StorageProvider for SupabaseStorage {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        file: &UploadFile,
        upsert: bool,
    ) -> Result<(), ApiError> {
        let url = self.object_url(bucket, path);
        debug!("Storage upload: {} ({} bytes)", url, file.bytes.len());

        let response = self
            .authorized(self.client.post(&url))
            .header("Content-Type", &file.media_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(file.bytes.clone())
            .send()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(PROVIDER_NAME, response).await);
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), ApiError> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, bucket);
        debug!("Storage remove: {} {:?}", url, paths);

        let response = self
            .authorized(self.client.delete(&url))
            .json(&RemoveRequest { prefixes: paths })
            .send()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(PROVIDER_NAME, response).await);
        }
        Ok(())
    }
}
