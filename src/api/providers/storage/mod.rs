//! Object storage provider trait and implementations
//!
//! Company logos and documents are uploaded here; the public URL of each
//! object is what the tables record.

mod supabase;

pub use supabase::SupabaseStorage;

use async_trait::async_trait;

use crate::api::error::ApiError;
use crate::types::UploadFile;

/// Trait for object storage backends
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the provider name (e.g., "storage")
    fn name(&self) -> &str;

    /// Upload a file to `bucket/path`.
    ///
    /// With `upsert` an existing object at the same path is overwritten, so
    /// repeating an upload is harmless.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        file: &UploadFile,
        upsert: bool,
    ) -> Result<(), ApiError>;

    /// Public URL for an object; no request is made
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Delete objects by path
    async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), ApiError>;
}
